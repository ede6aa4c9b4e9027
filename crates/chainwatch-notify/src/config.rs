//! Notifier configuration.

use serde::{Deserialize, Serialize};

/// How events reach a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Called on the publishing thread.
    #[default]
    Inline,
    /// Called from the listener's own worker thread, fed by an unbounded queue.
    Queued,
}

/// Configuration for the listener registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Delivery mode used by [`ListenerRegistry::register`](crate::ListenerRegistry::register).
    pub delivery: DeliveryMode,
    /// Backlog size at which a queued listener is reported as falling behind.
    pub queue_warn_threshold: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Inline,
            queue_warn_threshold: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: NotifierConfig = serde_json::from_str(r#"{ "delivery": "queued" }"#).unwrap();
        assert_eq!(config.delivery, DeliveryMode::Queued);
        assert_eq!(config.queue_warn_threshold, 10_000);
    }
}
