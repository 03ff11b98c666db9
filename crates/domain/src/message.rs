//! Message union consumed by the message bus.

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::events::Event;

/// Either a command or an event.
///
/// The hierarchy is closed: a message that is neither kind cannot be
/// constructed, so routing needs no unrecognized-message arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Command(Command),
    Event(Event),
}

impl Message {
    /// Returns the name of the wrapped command or event.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Command(command) => command.name(),
            Message::Event(event) => event.name(),
        }
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Message::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use common::Sku;

    use super::*;
    use crate::events::OutOfStockData;

    #[test]
    fn name_delegates_to_wrapped_message() {
        let message: Message = Command::allocate("order-1", "LAMP", 10).into();
        assert_eq!(message.name(), "Allocate");

        let message: Message = Event::OutOfStock(OutOfStockData {
            sku: Sku::new("LAMP"),
        })
        .into();
        assert_eq!(message.name(), "OutOfStock");
    }
}
