//! Pending-waiter bookkeeping and fan-out notification.
//!
//! The registry buffers subscribers per key while the key is refreshing and
//! releases each of them exactly once, in the order they were registered.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::diagnostics::{CallbackKind, Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{CacheError, CallbackResult};

/// Callback receiving the value a refresh resolved to.
pub type SuccessCallback<V> = Box<dyn FnOnce(Option<V>) -> CallbackResult + Send>;

/// Callback receiving the error a refresh was rejected with.
pub type FailureCallback = Box<dyn FnOnce(CacheError) -> CallbackResult + Send>;

/// Receiving half of a channel-backed subscriber.
pub(crate) type Waiter<V> = oneshot::Receiver<Result<Option<V>, CacheError>>;

type WaiterSlot<V> = Arc<Mutex<Option<oneshot::Sender<Result<Option<V>, CacheError>>>>>;

/// A pending reader: one callback for the value, one for the error.
///
/// Exactly one of the two is invoked, at most once.
pub struct Subscriber<V> {
    on_success: SuccessCallback<V>,
    on_failure: FailureCallback,
    /// Set for channel-backed subscribers so a reader that stopped waiting
    /// can be pruned before the next notify.
    liveness: Option<WaiterSlot<V>>,
}

impl<V> Subscriber<V>
where
    V: Send + 'static,
{
    /// Create a subscriber from a pair of callbacks.
    pub fn new<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(Option<V>) -> CallbackResult + Send + 'static,
        F: FnOnce(CacheError) -> CallbackResult + Send + 'static,
    {
        Subscriber {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
            liveness: None,
        }
    }

    /// Whether nobody is waiting for this subscriber's outcome anymore.
    ///
    /// Only channel-backed subscribers can be abandoned.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.liveness
            .as_ref()
            .is_some_and(|slot| slot.lock().as_ref().is_none_or(|tx| tx.is_closed()))
    }

    /// Create a subscriber that forwards its outcome into a oneshot channel.
    ///
    /// If the receiver is gone (the reader stopped waiting), the subscriber
    /// is pruned from the registry, or skipped if it is already being
    /// delivered to.
    pub(crate) fn channel(key: &str) -> (Self, Waiter<V>) {
        let (tx, rx) = oneshot::channel();
        let slot: WaiterSlot<V> = Arc::new(Mutex::new(Some(tx)));
        let failure_slot = Arc::clone(&slot);
        let liveness = Arc::clone(&slot);
        let key = key.to_string();
        let failure_key = key.clone();

        let mut subscriber = Subscriber::new(
            move |value| {
                if let Some(tx) = slot.lock().take()
                    && tx.send(Ok(value)).is_err()
                {
                    tracing::trace!(%key, "reader dropped before value arrived");
                }
                Ok(())
            },
            move |error| {
                if let Some(tx) = failure_slot.lock().take()
                    && tx.send(Err(error)).is_err()
                {
                    tracing::trace!(key = %failure_key, "reader dropped before error arrived");
                }
                Ok(())
            },
        );
        subscriber.liveness = Some(liveness);

        (subscriber, rx)
    }
}

/// What a notify cycle delivers to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<V> {
    /// Resolve every subscriber with this value.
    Value(Option<V>),
    /// Reject every subscriber with this error.
    Error(CacheError),
}

/// Maps each key to the ordered list of subscribers waiting on it.
pub struct SubscriptionRegistry<V> {
    subscribers: Mutex<HashMap<String, Vec<Subscriber<V>>>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<V> Default for SubscriptionRegistry<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SubscriptionRegistry<V>
where
    V: Clone + Send + 'static,
{
    /// Create a registry that logs callback failures through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create a registry reporting callback failures to `sink`.
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        SubscriptionRegistry {
            subscribers: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Append a subscriber to the key's waiting list.
    ///
    /// Readers that stopped waiting are dropped from the list first.
    pub fn add_subscriber(&self, key: &str, subscriber: Subscriber<V>) {
        let mut subscribers = self.subscribers.lock();
        let waiting = subscribers.entry(key.to_string()).or_default();
        waiting.retain(|s| !s.is_abandoned());
        waiting.push(subscriber);
        tracing::trace!(%key, waiting = waiting.len(), "subscriber added");
    }

    /// Number of subscribers still waiting on the key.
    pub fn subscriber_count(&self, key: &str) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(waiting) = subscribers.get_mut(key) else {
            return 0;
        };

        waiting.retain(|s| !s.is_abandoned());
        let count = waiting.len();
        if count == 0 {
            subscribers.remove(key);
        }
        count
    }

    /// Release every subscriber waiting on the key.
    ///
    /// The list is taken in one step, so subscribers added while this call is
    /// delivering belong to the next notify. Returns how many subscribers
    /// were released.
    pub fn notify(&self, key: &str, notification: Notification<V>) -> usize {
        self.take(key).deliver(notification)
    }

    /// Detach the key's subscribers without delivering to them yet.
    pub(crate) fn take(&self, key: &str) -> Pending<V> {
        let subscribers = self.subscribers.lock().remove(key).unwrap_or_default();
        Pending {
            key: key.to_string(),
            subscribers,
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Subscribers detached from the registry, awaiting delivery.
///
/// Separating the take from the delivery lets the cache drain a key under its
/// own lock and invoke the callbacks after releasing it.
pub(crate) struct Pending<V> {
    key: String,
    subscribers: Vec<Subscriber<V>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<V> Pending<V>
where
    V: Clone + Send + 'static,
{
    /// Invoke each subscriber in registration order. Returns the count.
    pub(crate) fn deliver(self, notification: Notification<V>) -> usize {
        let Pending {
            key,
            subscribers,
            sink,
        } = self;
        let count = subscribers.len();
        if count == 0 {
            return 0;
        }

        tracing::debug!(%key, subscribers = count, "notifying subscribers");

        for subscriber in subscribers {
            let (callback, outcome) = match &notification {
                Notification::Value(value) => {
                    let on_success = subscriber.on_success;
                    let value = value.clone();
                    (
                        CallbackKind::Success,
                        catch_unwind(AssertUnwindSafe(move || on_success(value))),
                    )
                }
                Notification::Error(error) => {
                    let on_failure = subscriber.on_failure;
                    let error = error.clone();
                    (
                        CallbackKind::Failure,
                        catch_unwind(AssertUnwindSafe(move || on_failure(error))),
                    )
                }
            };

            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => (e.to_string(), false),
                Err(payload) => (panic_message(payload.as_ref()), true),
            };

            sink.report(Diagnostic::SubscriberFailed {
                key: key.clone(),
                callback,
                message: failure.0,
                panicked: failure.1,
            });
        }

        count
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "subscriber panicked".to_string()
    }
}
