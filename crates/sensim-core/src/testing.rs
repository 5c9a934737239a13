//! テスト用の Source / Broker 実装（fault injection）と log capture

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::domain::ProducerId;
use crate::ports::{BrokerClient, PublishError, Source, SourceFactory};

/// Always returns the same value.
pub struct ConstSource(pub f64);

impl Source for ConstSource {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Panics on the first sample of a run while the producer still has planned faults.
///
/// The plan is shared across restarts, so `fail(id, k)` yields exactly `k` faults
/// for that slot and a healthy source afterwards.
#[derive(Default)]
pub struct FaultPlan {
    remaining: Arc<Mutex<HashMap<ProducerId, u32>>>,
    created: AtomicU32,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(self, id: u32, times: u32) -> Self {
        self.remaining
            .lock()
            .unwrap()
            .insert(ProducerId::new(id), times);
        self
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

struct FlakySource {
    id: ProducerId,
    remaining: Arc<Mutex<HashMap<ProducerId, u32>>>,
}

impl Source for FlakySource {
    fn sample(&mut self) -> f64 {
        let fault = {
            let mut remaining = self.remaining.lock().unwrap();
            match remaining.get_mut(&self.id) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };
        if fault {
            panic!("injected fault in producer {}", self.id);
        }
        0.5
    }
}

impl SourceFactory for FaultPlan {
    fn create(&self, id: ProducerId) -> Box<dyn Source> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FlakySource {
            id,
            remaining: Arc::clone(&self.remaining),
        })
    }
}

/// Every source panics on its first sample; counts creations after `cancel` fired.
pub struct AlwaysPanics {
    cancel: CancellationToken,
    created: AtomicU32,
    created_after_cancel: AtomicU32,
}

impl AlwaysPanics {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            created: AtomicU32::new(0),
            created_after_cancel: AtomicU32::new(0),
        }
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn created_after_cancel(&self) -> u32 {
        self.created_after_cancel.load(Ordering::SeqCst)
    }
}

struct Boom;

impl Source for Boom {
    fn sample(&mut self) -> f64 {
        panic!("boom");
    }
}

impl SourceFactory for AlwaysPanics {
    fn create(&self, _id: ProducerId) -> Box<dyn Source> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.cancel.is_cancelled() {
            self.created_after_cancel.fetch_add(1, Ordering::SeqCst);
        }
        Box::new(Boom)
    }
}

pub struct ConstFactory(pub f64);

impl SourceFactory for ConstFactory {
    fn create(&self, _id: ProducerId) -> Box<dyn Source> {
        Box::new(ConstSource(self.0))
    }
}

/// Connected broker whose publish panics.
pub struct PanickingBroker;

#[async_trait]
impl BrokerClient for PanickingBroker {
    async fn publish(&self, subject: &str, _payload: Vec<u8>) -> Result<(), PublishError> {
        panic!("broker blew up publishing to {subject}");
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Records event messages and span `component` fields for the current thread.
///
/// `install` only covers the calling thread, so use it from current-thread runtimes.
#[derive(Clone, Default)]
pub struct Captured {
    messages: Arc<Mutex<Vec<String>>>,
    components: Arc<Mutex<Vec<String>>>,
}

impl Captured {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.as_str() == message)
            .count()
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.components
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == component)
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let mut field = FieldValue::named("component");
        attrs.record(&mut field);
        if let Some(component) = field.value {
            self.components.lock().unwrap().push(component);
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut field = FieldValue::named("message");
        event.record(&mut field);
        if let Some(message) = field.value {
            self.messages.lock().unwrap().push(message);
        }
    }
}

struct FieldValue {
    name: &'static str,
    value: Option<String>,
}

impl FieldValue {
    fn named(name: &'static str) -> Self {
        Self { name, value: None }
    }
}

impl Visit for FieldValue {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == self.name {
            self.value = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == self.name {
            self.value = Some(format!("{value:?}"));
        }
    }
}
