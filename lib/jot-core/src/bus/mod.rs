//! Topic based publish/subscribe between the overlay and the main application.
//!
//! Each side owns a [`BusContext`] with its own mailbox. Publishing never blocks: the message
//! is copied into the mailbox of every subscriber registered at that moment, and handlers
//! run later, on whichever thread pumps the subscriber's context. A subscriber that is gone
//! by the time its context is pumped is skipped, so delivery is at most once.

mod topics;

pub use topics::*;

use log::{trace, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("A bus context named '{0}' already exists")]
    DuplicateContext(String),
    #[error("Could not encode payload for '{topic}': {source}")]
    Encode {
        topic: String,
        source: serde_json::Error,
    },
}

/// What subscribers receive.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossWindowMessage {
    pub topic: String,
    pub payload: Value,
    /// Monotonic per emitting context, starting at 1.
    pub sequence: u64,
    /// Name of the emitting context.
    pub source: String,
}

pub type SubscriberId = u64;

type Handler = Box<dyn FnMut(&CrossWindowMessage) + Send>;

struct Subscriber {
    id: SubscriberId,
    topic: String,
    mailbox: UnboundedSender<Delivery>,
    handler: Arc<Mutex<Handler>>,
}

struct Delivery {
    subscriber: SubscriberId,
    message: CrossWindowMessage,
}

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<Vec<Subscriber>>,
    contexts: Mutex<HashSet<String>>,
    next_subscriber: AtomicU64,
}

impl BusInner {
    fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    fn handler(&self, id: SubscriberId) -> Option<Arc<Mutex<Handler>>> {
        let subscribers = self.subscribers.lock().ok()?;
        subscribers
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.handler.clone())
    }
}

/// Shared switchboard. Cheap to clone.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a named execution context. Names are unique while the context is alive.
    pub fn context(&self, name: &str) -> Result<BusContext, BusError> {
        {
            let mut contexts = self
                .inner
                .contexts
                .lock()
                .map_err(|_| BusError::DuplicateContext(name.to_string()))?;
            if !contexts.insert(name.to_string()) {
                return Err(BusError::DuplicateContext(name.to_string()));
            }
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(BusContext {
            name: name.to_string(),
            inner: self.inner.clone(),
            sender,
            receiver,
            sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|subscribers| subscribers.iter().filter(|s| s.topic == topic).count())
            .unwrap_or(0)
    }
}

/// One side of the bus. Handlers subscribed through a context only ever run when that
/// context is pumped.
pub struct BusContext {
    name: String,
    inner: Arc<BusInner>,
    sender: UnboundedSender<Delivery>,
    receiver: UnboundedReceiver<Delivery>,
    sequence: Arc<AtomicU64>,
}

impl BusContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an emitter that publishes under this context's name and sequence.
    pub fn emitter(&self) -> BusEmitter {
        BusEmitter {
            source: Arc::from(self.name.as_str()),
            inner: self.inner.clone(),
            sequence: self.sequence.clone(),
        }
    }

    /// Publishes to every subscriber registered right now. Returns the message sequence.
    pub fn publish<P: Serialize>(&self, topic: &str, payload: &P) -> Result<u64, BusError> {
        let payload = encode(topic, payload)?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        publish_message(
            &self.inner,
            CrossWindowMessage {
                topic: topic.to_string(),
                payload,
                sequence,
                source: self.name.clone(),
            },
        );
        Ok(sequence)
    }

    pub fn publish_topic<T: Topic>(&self, value: &T) -> Result<u64, BusError> {
        self.publish(T::NAME, value)
    }

    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: FnMut(&CrossWindowMessage) + Send + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst) + 1;
        let subscriber = Subscriber {
            id,
            topic: topic.to_string(),
            mailbox: self.sender.clone(),
            handler: Arc::new(Mutex::new(Box::new(handler))),
        };

        if let Ok(mut subscribers) = self.inner.subscribers.lock() {
            subscribers.push(subscriber);
        }
        trace!("{} subscribed to {topic} as #{id}", self.name);

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribes with the payload decoded into `T`. Payloads that do not decode are logged
    /// and skipped.
    pub fn subscribe_topic<T, F>(&self, mut handler: F) -> Subscription
    where
        T: Topic,
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(T::NAME, move |message| {
            match serde_json::from_value::<T>(message.payload.clone()) {
                Ok(value) => handler(value),
                Err(e) => warn!(
                    "Ignoring malformed '{}' message #{} from {}: {e}",
                    message.topic, message.sequence, message.source
                ),
            }
        })
    }

    /// Runs handlers for every message already in the mailbox. Returns how many were
    /// delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(delivery) = self.receiver.try_recv() {
            if self.deliver(delivery) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Waits for at least one message, then drains the mailbox.
    pub async fn pump_async(&mut self) -> usize {
        let Some(first) = self.receiver.recv().await else {
            return 0;
        };
        let mut delivered = usize::from(self.deliver(first));
        delivered += self.pump();
        delivered
    }

    fn deliver(&self, delivery: Delivery) -> bool {
        let Some(handler) = self.inner.handler(delivery.subscriber) else {
            trace!(
                "{}: subscriber #{} is gone, dropping '{}'",
                self.name,
                delivery.subscriber,
                delivery.message.topic
            );
            return false;
        };

        let delivered = match handler.lock() {
            Ok(mut handler) => {
                (*handler)(&delivery.message);
                true
            }
            Err(_) => {
                warn!("{}: handler #{} poisoned", self.name, delivery.subscriber);
                false
            }
        };
        delivered
    }
}

impl Drop for BusContext {
    fn drop(&mut self) {
        if let Ok(mut contexts) = self.inner.contexts.lock() {
            contexts.remove(&self.name);
        }
    }
}

/// A publish-only handle on a context, for code that cannot hold the context itself, such as
/// the overlay controller. Shares the context's sequence counter.
#[derive(Clone)]
pub struct BusEmitter {
    source: Arc<str>,
    inner: Arc<BusInner>,
    sequence: Arc<AtomicU64>,
}

impl BusEmitter {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn publish<P: Serialize>(&self, topic: &str, payload: &P) -> Result<u64, BusError> {
        let payload = encode(topic, payload)?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        publish_message(
            &self.inner,
            CrossWindowMessage {
                topic: topic.to_string(),
                payload,
                sequence,
                source: self.source.to_string(),
            },
        );
        Ok(sequence)
    }

    pub fn publish_topic<T: Topic>(&self, value: &T) -> Result<u64, BusError> {
        self.publish(T::NAME, value)
    }
}

/// Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove_subscriber(self.id) {
                trace!("Unsubscribed #{}", self.id);
            }
        }
    }
}

fn encode<P: Serialize>(topic: &str, payload: &P) -> Result<Value, BusError> {
    serde_json::to_value(payload).map_err(|source| BusError::Encode {
        topic: topic.to_string(),
        source,
    })
}

fn publish_message(inner: &BusInner, message: CrossWindowMessage) {
    let targets: Vec<(SubscriberId, UnboundedSender<Delivery>)> = match inner.subscribers.lock() {
        Ok(subscribers) => subscribers
            .iter()
            .filter(|s| s.topic == message.topic)
            .map(|s| (s.id, s.mailbox.clone()))
            .collect(),
        Err(_) => return,
    };

    trace!(
        "{} #{} '{}' -> {} subscriber(s)",
        message.source,
        message.sequence,
        message.topic,
        targets.len()
    );

    for (subscriber, mailbox) in targets {
        let delivery = Delivery {
            subscriber,
            message: message.clone(),
        };
        if mailbox.send(delivery).is_err() {
            trace!("Mailbox for subscriber #{subscriber} is closed");
        }
    }
}
