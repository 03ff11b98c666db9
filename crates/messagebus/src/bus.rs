//! The dispatcher: FIFO routing of messages to their handlers.

use std::collections::VecDeque;

use adapters::UnitOfWork;
use common::BatchRef;
use domain::{Command, Event, Message};

use crate::error::MessageBusError;
use crate::registry::HandlerRegistry;
use crate::retry::RetryPolicy;

/// Routes commands and events from a FIFO queue to registered handlers.
///
/// The bus owns no state across [`MessageBus::handle`] calls beyond its
/// read-only registry and retry policy, so one instance can serve
/// concurrent requests, each with its own queue and unit of work.
pub struct MessageBus {
    registry: HandlerRegistry,
    retry_policy: RetryPolicy,
}

impl MessageBus {
    /// Creates a bus over a fully populated registry.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy applied to event handlers.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Dispatches one message and everything it causes.
    ///
    /// The queue starts with `message` alone; events raised by handlers are
    /// drained from the unit of work after every handler invocation and
    /// appended to the tail, so they run breadth-first after messages that
    /// were already queued. Returns the command results in pop order; an
    /// event-only dispatch yields an empty list. The first command-handler
    /// failure aborts the remaining queue and propagates.
    #[tracing::instrument(skip(self, message, uow), fields(message = message.name()))]
    pub async fn handle(
        &self,
        message: Message,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Vec<Option<BatchRef>>, MessageBusError> {
        let mut results = Vec::new();
        let mut queue = VecDeque::from([message]);

        while let Some(message) = queue.pop_front() {
            match message {
                Message::Event(event) => {
                    metrics::counter!("messagebus_messages_total", "kind" => "event").increment(1);
                    self.handle_event(event, &mut queue, uow).await;
                }
                Message::Command(command) => {
                    metrics::counter!("messagebus_messages_total", "kind" => "command")
                        .increment(1);
                    let result = self.handle_command(command, &mut queue, uow).await?;
                    results.push(result);
                }
            }
        }

        Ok(results)
    }

    /// Fans an event out to its handlers, isolating their failures.
    async fn handle_event(
        &self,
        event: Event,
        queue: &mut VecDeque<Message>,
        uow: &mut dyn UnitOfWork,
    ) {
        // Equivalent to `retry::with_retry`, inlined: an `async` closure that
        // borrows `handler`/`event`/`queue`/`uow` across `.await` yields a
        // future rustc cannot prove `Send`, which breaks the axum handler
        // bound on the API's `bus.handle` call. A plain loop avoids that while
        // preserving the retry semantics exactly.
        let max_attempts = self.retry_policy.max_attempts.max(1);
        for handler in self.registry.event_handlers(event.kind()) {
            let mut attempt = 1;
            let exhausted = loop {
                tracing::debug!(handler = handler.name(), event = event.name(), attempt, "handling event");
                let result = handler.handle(event.clone(), uow).await;
                // The handler may have committed partial state before
                // failing, so drain after every attempt.
                drain(queue, uow);
                match result {
                    Ok(()) => break None,
                    Err(error) => {
                        metrics::counter!("messagebus_event_handler_failures_total").increment(1);
                        tracing::debug!(
                            handler = handler.name(),
                            event = event.name(),
                            attempt,
                            %error,
                            "event handler attempt failed"
                        );
                        if attempt >= max_attempts {
                            break Some((attempt, error));
                        }
                        tokio::time::sleep(self.retry_policy.backoff_delay(attempt)).await;
                        attempt += 1;
                    }
                }
            };

            if let Some((attempts, error)) = exhausted {
                metrics::counter!("messagebus_event_handlers_exhausted_total").increment(1);
                tracing::error!(
                    handler = handler.name(),
                    event = event.name(),
                    attempts,
                    error = %error,
                    "event handler exhausted its retries"
                );
            }
        }
    }

    /// Invokes a command's single handler, exactly once.
    async fn handle_command(
        &self,
        command: Command,
        queue: &mut VecDeque<Message>,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Option<BatchRef>, MessageBusError> {
        let Some(handler) = self.registry.command_handler(command.kind()) else {
            tracing::error!(command = command.name(), "no handler registered");
            return Err(MessageBusError::MissingCommandHandler {
                command: command.kind(),
            });
        };

        tracing::debug!(handler = handler.name(), command = command.name(), "handling command");
        match handler.handle(command.clone(), uow).await {
            Ok(result) => {
                drain(queue, uow);
                Ok(result)
            }
            Err(error) => {
                // Events staged before the failure are discarded with the
                // uncommitted transaction: no drain on this path.
                metrics::counter!("messagebus_command_failures_total").increment(1);
                tracing::error!(
                    handler = handler.name(),
                    command = command.name(),
                    %error,
                    "command handler failed"
                );
                Err(MessageBusError::Handler(error))
            }
        }
    }
}

/// Moves newly raised events from the unit of work to the queue tail.
fn drain(queue: &mut VecDeque<Message>, uow: &mut dyn UnitOfWork) {
    queue.extend(uow.collect_new_events().into_iter().map(Message::from));
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use adapters::{AdapterError, ProductRepository};
    use async_trait::async_trait;
    use domain::{
        AllocatedData, Command, DeallocatedData, EventKind, OutOfStockData,
    };

    use super::*;
    use crate::error::HandlerError;
    use crate::registry::{CommandHandler, EventHandler};

    /// Unit-of-work double whose event buffer is shared with test handlers,
    /// so a handler can "raise" events for the bus to drain.
    struct StubUnitOfWork {
        staged: Arc<Mutex<Vec<Event>>>,
    }

    impl StubUnitOfWork {
        fn new() -> (Self, Arc<Mutex<Vec<Event>>>) {
            let staged = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    staged: staged.clone(),
                },
                staged,
            )
        }
    }

    #[async_trait]
    impl UnitOfWork for StubUnitOfWork {
        fn products(&mut self) -> &mut dyn ProductRepository {
            unimplemented!("bus dispatch tests never touch the repository")
        }

        async fn commit(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }

        fn collect_new_events(&mut self) -> Vec<Event> {
            self.staged.lock().unwrap().drain(..).collect()
        }
    }

    fn allocated(orderid: &str) -> Event {
        Event::Allocated(AllocatedData {
            orderid: orderid.into(),
            sku: "SKU".into(),
            qty: 1,
            batchref: "b1".into(),
        })
    }

    fn deallocated(orderid: &str) -> Event {
        Event::Deallocated(DeallocatedData {
            orderid: orderid.into(),
            sku: "SKU".into(),
            qty: 1,
        })
    }

    fn out_of_stock(sku: &str) -> Event {
        Event::OutOfStock(OutOfStockData { sku: sku.into() })
    }

    fn label(event: &Event) -> String {
        match event {
            Event::Allocated(data) => format!("Allocated:{}", data.orderid),
            Event::Deallocated(data) => format!("Deallocated:{}", data.orderid),
            Event::OutOfStock(data) => format!("OutOfStock:{}", data.sku),
        }
    }

    /// Records every invocation and stages a scripted batch of events per
    /// call into the shared buffer.
    struct ScriptedEventHandler {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        staged: Arc<Mutex<Vec<Event>>>,
        raises: Mutex<VecDeque<Vec<Event>>>,
    }

    impl ScriptedEventHandler {
        fn new(
            name: &'static str,
            log: Arc<Mutex<Vec<String>>>,
            staged: Arc<Mutex<Vec<Event>>>,
            raises: Vec<Vec<Event>>,
        ) -> Self {
            Self {
                name,
                log,
                staged,
                raises: Mutex::new(raises.into()),
            }
        }
    }

    #[async_trait]
    impl EventHandler for ScriptedEventHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(
            &self,
            event: Event,
            _uow: &mut dyn UnitOfWork,
        ) -> Result<(), HandlerError> {
            self.log.lock().unwrap().push(label(&event));
            if let Some(events) = self.raises.lock().unwrap().pop_front() {
                self.staged.lock().unwrap().extend(events);
            }
            Ok(())
        }
    }

    /// Fails until the configured attempt, then succeeds and records its
    /// side effect.
    struct FlakyEventHandler {
        succeed_on: u32,
        attempts: AtomicU32,
        effects: Arc<AtomicU32>,
    }

    #[async_trait]
    impl EventHandler for FlakyEventHandler {
        fn name(&self) -> &'static str {
            "FlakyEventHandler"
        }

        async fn handle(
            &self,
            _event: Event,
            _uow: &mut dyn UnitOfWork,
        ) -> Result<(), HandlerError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < self.succeed_on {
                return Err(HandlerError::UnexpectedMessage {
                    handler: "FlakyEventHandler",
                    message: "simulated transient failure",
                });
            }
            self.effects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StaticCommandHandler {
        result: Option<BatchRef>,
        raise: Option<Event>,
        staged: Arc<Mutex<Vec<Event>>>,
    }

    #[async_trait]
    impl CommandHandler for StaticCommandHandler {
        fn name(&self) -> &'static str {
            "StaticCommandHandler"
        }

        async fn handle(
            &self,
            _command: Command,
            _uow: &mut dyn UnitOfWork,
        ) -> Result<Option<BatchRef>, HandlerError> {
            if let Some(event) = self.raise.clone() {
                self.staged.lock().unwrap().push(event);
            }
            Ok(self.result.clone())
        }
    }

    struct FailingCommandHandler {
        staged: Arc<Mutex<Vec<Event>>>,
    }

    #[async_trait]
    impl CommandHandler for FailingCommandHandler {
        fn name(&self) -> &'static str {
            "FailingCommandHandler"
        }

        async fn handle(
            &self,
            _command: Command,
            _uow: &mut dyn UnitOfWork,
        ) -> Result<Option<BatchRef>, HandlerError> {
            // Stage an event, then fail: the bus must not drain it.
            self.staged.lock().unwrap().push(out_of_stock("SKU"));
            Err(HandlerError::InvalidSku { sku: "SKU".into() })
        }
    }

    fn fast_bus(registry: HandlerRegistry) -> MessageBus {
        MessageBus::new(registry).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            multiplier: 2,
        })
    }

    #[tokio::test]
    async fn event_with_no_handlers_is_silently_dropped() {
        let bus = fast_bus(HandlerRegistry::new());
        let (mut uow, _) = StubUnitOfWork::new();

        let results = bus
            .handle(allocated("order-1").into(), &mut uow)
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn command_without_handler_is_a_protocol_error_and_drains_nothing() {
        let bus = fast_bus(HandlerRegistry::new());
        let (mut uow, staged) = StubUnitOfWork::new();
        staged.lock().unwrap().push(out_of_stock("SKU"));

        let err = bus
            .handle(Command::allocate("order-1", "SKU", 1).into(), &mut uow)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MessageBusError::MissingCommandHandler {
                command: domain::CommandKind::Allocate
            }
        ));
        // No drain happened: the staged event is still in the unit of work.
        assert_eq!(staged.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn command_result_is_returned_in_results_list() {
        let (mut uow, staged) = StubUnitOfWork::new();
        let mut registry = HandlerRegistry::new();
        registry.register_command(
            domain::CommandKind::Allocate,
            Box::new(StaticCommandHandler {
                result: Some("batch-001".into()),
                raise: None,
                staged: staged.clone(),
            }),
        );
        let bus = fast_bus(registry);

        let results = bus
            .handle(Command::allocate("order-1", "SKU", 1).into(), &mut uow)
            .await
            .unwrap();

        assert_eq!(results, vec![Some(BatchRef::new("batch-001"))]);
    }

    #[tokio::test]
    async fn events_raised_by_a_command_are_dispatched_but_produce_no_result() {
        let (mut uow, staged) = StubUnitOfWork::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut registry = HandlerRegistry::new();
        registry.register_command(
            domain::CommandKind::Allocate,
            Box::new(StaticCommandHandler {
                result: Some("batch-001".into()),
                raise: Some(out_of_stock("SKU")),
                staged: staged.clone(),
            }),
        );
        registry.register_event(
            EventKind::OutOfStock,
            Box::new(ScriptedEventHandler::new(
                "recorder",
                log.clone(),
                staged.clone(),
                vec![],
            )),
        );
        let bus = fast_bus(registry);

        let results = bus
            .handle(Command::allocate("order-1", "SKU", 1).into(), &mut uow)
            .await
            .unwrap();

        assert_eq!(results, vec![Some(BatchRef::new("batch-001"))]);
        assert_eq!(log.lock().unwrap().clone(), vec!["OutOfStock:SKU"]);
    }

    #[tokio::test]
    async fn queue_is_processed_breadth_first() {
        let (mut uow, staged) = StubUnitOfWork::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        // Allocated raises two Deallocated events; handling the first
        // Deallocated raises an OutOfStock. The OutOfStock must run after
        // the second Deallocated, which was queued earlier.
        let mut registry = HandlerRegistry::new();
        registry.register_event(
            EventKind::Allocated,
            Box::new(ScriptedEventHandler::new(
                "on_allocated",
                log.clone(),
                staged.clone(),
                vec![vec![deallocated("d1"), deallocated("d2")]],
            )),
        );
        registry.register_event(
            EventKind::Deallocated,
            Box::new(ScriptedEventHandler::new(
                "on_deallocated",
                log.clone(),
                staged.clone(),
                vec![vec![out_of_stock("o1")], vec![]],
            )),
        );
        registry.register_event(
            EventKind::OutOfStock,
            Box::new(ScriptedEventHandler::new(
                "on_out_of_stock",
                log.clone(),
                staged.clone(),
                vec![],
            )),
        );
        let bus = fast_bus(registry);

        bus.handle(allocated("a1").into(), &mut uow).await.unwrap();

        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                "Allocated:a1",
                "Deallocated:d1",
                "Deallocated:d2",
                "OutOfStock:o1",
            ]
        );
    }

    #[tokio::test]
    async fn flaky_event_handler_succeeds_on_third_attempt() {
        let (mut uow, _) = StubUnitOfWork::new();
        let effects = Arc::new(AtomicU32::new(0));

        let mut registry = HandlerRegistry::new();
        registry.register_event(
            EventKind::Allocated,
            Box::new(FlakyEventHandler {
                succeed_on: 3,
                attempts: AtomicU32::new(0),
                effects: effects.clone(),
            }),
        );
        let bus = fast_bus(registry);

        let results = bus
            .handle(allocated("order-1").into(), &mut uow)
            .await
            .unwrap();

        assert!(results.is_empty());
        // The side effect happened exactly once, on the successful attempt.
        assert_eq!(effects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_event_handler_does_not_abort_siblings_or_caller() {
        let (mut uow, staged) = StubUnitOfWork::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let effects = Arc::new(AtomicU32::new(0));

        let mut registry = HandlerRegistry::new();
        let exhausted = FlakyEventHandler {
            succeed_on: u32::MAX,
            attempts: AtomicU32::new(0),
            effects: effects.clone(),
        };
        registry.register_event(EventKind::Allocated, Box::new(exhausted));
        registry.register_event(
            EventKind::Allocated,
            Box::new(ScriptedEventHandler::new(
                "sibling",
                log.clone(),
                staged.clone(),
                vec![],
            )),
        );
        let bus = fast_bus(registry);

        let results = bus
            .handle(allocated("order-1").into(), &mut uow)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(effects.load(Ordering::SeqCst), 0);
        // The sibling still ran, exactly once.
        assert_eq!(log.lock().unwrap().clone(), vec!["Allocated:order-1"]);
    }

    #[tokio::test]
    async fn events_staged_during_failed_attempts_are_still_drained() {
        let (mut uow, staged) = StubUnitOfWork::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        /// Stages an event on every attempt and always fails.
        struct LeakyHandler {
            staged: Arc<Mutex<Vec<Event>>>,
            counter: AtomicU32,
        }

        #[async_trait]
        impl EventHandler for LeakyHandler {
            fn name(&self) -> &'static str {
                "LeakyHandler"
            }

            async fn handle(
                &self,
                _event: Event,
                _uow: &mut dyn UnitOfWork,
            ) -> Result<(), HandlerError> {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                self.staged
                    .lock()
                    .unwrap()
                    .push(out_of_stock(&format!("attempt-{n}")));
                Err(HandlerError::UnexpectedMessage {
                    handler: "LeakyHandler",
                    message: "always fails",
                })
            }
        }

        let mut registry = HandlerRegistry::new();
        registry.register_event(
            EventKind::Allocated,
            Box::new(LeakyHandler {
                staged: staged.clone(),
                counter: AtomicU32::new(0),
            }),
        );
        registry.register_event(
            EventKind::OutOfStock,
            Box::new(ScriptedEventHandler::new(
                "recorder",
                log.clone(),
                staged.clone(),
                vec![],
            )),
        );
        let bus = fast_bus(registry);

        bus.handle(allocated("order-1").into(), &mut uow)
            .await
            .unwrap();

        // One partial-state event per attempt reached the queue.
        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                "OutOfStock:attempt-0",
                "OutOfStock:attempt-1",
                "OutOfStock:attempt-2",
            ]
        );
    }

    #[tokio::test]
    async fn command_failure_propagates_and_skips_the_partial_drain() {
        let (mut uow, staged) = StubUnitOfWork::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut registry = HandlerRegistry::new();
        registry.register_command(
            domain::CommandKind::Allocate,
            Box::new(FailingCommandHandler {
                staged: staged.clone(),
            }),
        );
        registry.register_event(
            EventKind::OutOfStock,
            Box::new(ScriptedEventHandler::new(
                "recorder",
                log.clone(),
                staged.clone(),
                vec![],
            )),
        );
        let bus = fast_bus(registry);

        let err = bus
            .handle(Command::allocate("order-1", "SKU", 1).into(), &mut uow)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MessageBusError::Handler(HandlerError::InvalidSku { .. })
        ));
        // The event staged before the failure never reached a handler.
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(staged.lock().unwrap().len(), 1);
    }
}
