//! InMemoryBroker - in-process stand-in for the message broker.
//!
//! Records every accepted publish, or in loopback mode only counts them so a
//! long run stays flat in memory. Connectivity, latency and rejection can be
//! switched at runtime to drive the publisher through its failure paths.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{BrokerClient, PublishError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

pub struct InMemoryBroker {
    published: Mutex<Vec<PublishedMessage>>,
    /// false = loopback: payloads are counted and discarded.
    record: bool,
    accepted: AtomicU64,
    connected: AtomicBool,
    closed: AtomicBool,

    /// Delay applied inside every publish, in milliseconds (0 = none).
    delay_ms: AtomicU64,

    reject_with: Mutex<Option<String>>,
}

impl InMemoryBroker {
    /// A connected broker that accepts everything immediately.
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            record: true,
            accepted: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            reject_with: Mutex::new(None),
        }
    }

    /// Accepts like [`InMemoryBroker::new`] but keeps no payloads; only
    /// [`InMemoryBroker::accepted`] moves.
    pub fn loopback() -> Self {
        Self {
            record: false,
            ..Self::new()
        }
    }

    /// A broker that reports itself unavailable for every call.
    pub fn disconnected() -> Self {
        let broker = Self::new();
        broker.set_connected(false);
        broker
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Reject every publish with `reason` (`None` to accept again).
    pub fn set_reject(&self, reason: Option<String>) {
        *self
            .reject_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = reason;
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes that went through, recorded or not.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for InMemoryBroker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }

        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let rejection = self
            .reject_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = rejection {
            return Err(PublishError::Rejected(reason));
        }

        self.accepted.fetch_add(1, Ordering::Relaxed);
        if self.record {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(PublishedMessage {
                    subject: subject.to_string(),
                    payload,
                });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.is_closed()
    }

    async fn close(&self) -> Result<(), PublishError> {
        tracing::info!("closing broker connection");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_accepted_publishes() {
        let broker = InMemoryBroker::new();
        broker.publish("a.data.1", b"{}".to_vec()).await.unwrap();

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].subject, "a.data.1");
        assert_eq!(broker.accepted(), 1);
    }

    #[tokio::test]
    async fn loopback_counts_without_keeping_payloads() {
        let broker = InMemoryBroker::loopback();
        for id in 1..=1000 {
            broker
                .publish(&format!("a.data.{id}"), vec![0; 64])
                .await
                .unwrap();
        }

        assert_eq!(broker.accepted(), 1000);
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn disconnected_broker_fails_fast() {
        let broker = InMemoryBroker::disconnected();
        let err = broker.publish("a.data.1", vec![]).await.unwrap_err();

        assert_eq!(err, PublishError::NotConnected);
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn rejection_can_be_toggled() {
        let broker = InMemoryBroker::new();
        broker.set_reject(Some("stream full".into()));
        assert!(matches!(
            broker.publish("s", vec![]).await,
            Err(PublishError::Rejected(_))
        ));

        broker.set_reject(None);
        assert!(broker.publish("s", vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn close_drops_connectivity() {
        let broker = InMemoryBroker::new();
        broker.close().await.unwrap();

        assert!(broker.is_closed());
        assert!(!broker.is_connected());
    }
}
