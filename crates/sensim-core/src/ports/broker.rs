//! BrokerClient port - the narrow publish capability the publisher needs.
//!
//! Connection management, reconnection and stream provisioning belong to the
//! implementation behind this trait, not to the core.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single publish did not go through.
///
/// Every variant is per-message and recoverable: the publisher counts it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("broker not connected")]
    NotConnected,

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("broker rejected publish: {0}")]
    Rejected(String),

    #[error("payload encode failed: {0}")]
    Encode(String),
}

impl PublishError {
    /// Short label for per-reason failure counters.
    pub fn reason(&self) -> &'static str {
        match self {
            PublishError::NotConnected => "not_connected",
            PublishError::Timeout(_) => "timeout",
            PublishError::Rejected(_) => "publish_error",
            PublishError::Encode(_) => "encode_error",
        }
    }
}

#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publish one payload. Must not retry internally.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError>;

    /// Current connectivity as seen by the client.
    fn is_connected(&self) -> bool;

    /// Release the connection. Called once, after the publisher finished.
    async fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_stable_labels() {
        assert_eq!(PublishError::NotConnected.reason(), "not_connected");
        assert_eq!(
            PublishError::Timeout(Duration::from_secs(2)).reason(),
            "timeout"
        );
        assert_eq!(
            PublishError::Rejected("nope".into()).reason(),
            "publish_error"
        );
    }
}
