//! Outbound notification port.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::Result;

/// Delivers notifications to the outside world.
///
/// Handlers depend on this port, not on any concrete delivery mechanism.
#[async_trait]
pub trait Notifications: Send + Sync {
    /// Sends a message to a destination.
    async fn send(&self, destination: &str, message: &str) -> Result<()>;
}

/// Notification sink that logs instead of delivering.
///
/// Stands in for real outbound delivery (email, pub/sub) in development
/// and in the default server wiring.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifications;

impl TracingNotifications {
    /// Creates a new tracing-backed sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifications for TracingNotifications {
    async fn send(&self, destination: &str, message: &str) -> Result<()> {
        tracing::info!(destination, message, "notification sent");
        Ok(())
    }
}

/// Recording fake for tests.
#[derive(Clone, Default)]
pub struct InMemoryNotifications {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl InMemoryNotifications {
    /// Creates a new empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all messages sent so far as `(destination, message)` pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("notifications lock poisoned").clone()
    }
}

#[async_trait]
impl Notifications for InMemoryNotifications {
    async fn send(&self, destination: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("notifications lock poisoned")
            .push((destination.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_notifications_record_sends() {
        let notifications = InMemoryNotifications::new();
        notifications
            .send("stock@example.com", "Out of stock for LAMP")
            .await
            .unwrap();

        assert_eq!(
            notifications.sent(),
            vec![(
                "stock@example.com".to_string(),
                "Out of stock for LAMP".to_string()
            )]
        );
    }
}
