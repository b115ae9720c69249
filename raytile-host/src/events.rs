//! Named-event publish/subscribe with one-shot awaitable subscriptions.
//!
//! Worker threads publish their replies here; request futures on the
//! coordinating thread wait on them through [`EventChannel::await_once`].

use futures::channel::oneshot;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

/// Callback invoked with each published payload.
pub type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Identifies one registration, for [`EventChannel::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<P> {
    id: SubscriptionId,
    once: bool,
    handler: Handler<P>,
}

struct Registry<K, P> {
    next_id: u64,
    topics: HashMap<K, Vec<Subscription<P>>>,
}

/// Publish/subscribe keyed by event name.
///
/// Delivery is synchronous on the publishing thread, in subscription order.
/// The registry lock is released before handlers run, so handlers may
/// subscribe or unsubscribe.
pub struct EventChannel<K, P> {
    registry: Mutex<Registry<K, P>>,
}

impl<K, P> Default for EventChannel<K, P>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> EventChannel<K, P>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                topics: HashMap::new(),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry<K, P>> {
        // A panicking handler never runs under this lock, so the data is intact.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, key: K, handler: Handler<P>, once: bool) -> SubscriptionId {
        let mut registry = self.registry();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry
            .topics
            .entry(key)
            .or_default()
            .push(Subscription { id, once, handler });
        id
    }

    pub fn subscribe<F>(&self, key: K, handler: F) -> SubscriptionId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.insert(key, Arc::new(handler), false)
    }

    /// Like [`subscribe`](Self::subscribe), removed before its first delivery.
    pub fn subscribe_once<F>(&self, key: K, handler: F) -> SubscriptionId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.insert(key, Arc::new(handler), true)
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, key: &K, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let Some(subscriptions) = registry.topics.get_mut(key) else {
            return false;
        };

        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;

        if subscriptions.is_empty() {
            registry.topics.remove(key);
        }
        removed
    }

    /// Deliver `payload` to every handler registered for `key` at the time of
    /// the call. Returns the number of handlers invoked.
    pub fn publish(&self, key: &K, payload: &P) -> usize {
        let handlers: Vec<Handler<P>> = {
            let mut registry = self.registry();
            let Some(subscriptions) = registry.topics.get_mut(key) else {
                return 0;
            };

            let handlers = subscriptions.iter().map(|s| Arc::clone(&s.handler)).collect();
            subscriptions.retain(|s| !s.once);
            if subscriptions.is_empty() {
                registry.topics.remove(key);
            }
            handlers
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn handler_count(&self, key: &K) -> usize {
        self.registry().topics.get(key).map_or(0, Vec::len)
    }
}

struct Pending<K, P> {
    sender: Option<oneshot::Sender<Result<P, P>>>,
    subscriptions: Vec<(K, SubscriptionId)>,
}

impl<K, P> Pending<K, P> {
    /// Take the sender and the registrations to remove. None once settled.
    #[allow(clippy::type_complexity)]
    fn settle(&mut self) -> Option<(oneshot::Sender<Result<P, P>>, Vec<(K, SubscriptionId)>)> {
        let sender = self.sender.take()?;
        Some((sender, std::mem::take(&mut self.subscriptions)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, P> EventChannel<K, P>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    /// Future resolving with the first `success` payload, or failing with the
    /// first `failure` payload, whichever is published first.
    ///
    /// Both registrations are removed together as soon as either fires, and
    /// when the future is dropped unresolved.
    pub fn await_once(self: &Arc<Self>, success: K, failure: Option<K>) -> AwaitOnce<K, P> {
        let (sender, receiver) = oneshot::channel();
        let pending = Arc::new(Mutex::new(Pending {
            sender: Some(sender),
            subscriptions: Vec::with_capacity(2),
        }));

        {
            // Held while subscribing so a handler firing on another thread
            // waits until both registrations are recorded.
            let mut guard = lock(&pending);

            let id = self.subscribe_once(success.clone(), self.settle_with(&pending, Ok));
            guard.subscriptions.push((success, id));

            if let Some(failure) = failure {
                let id = self.subscribe_once(failure.clone(), self.settle_with(&pending, Err));
                guard.subscriptions.push((failure, id));
            }
        }

        AwaitOnce {
            receiver,
            pending,
            channel: Arc::downgrade(self),
        }
    }

    fn settle_with(
        self: &Arc<Self>,
        pending: &Arc<Mutex<Pending<K, P>>>,
        wrap: fn(P) -> Result<P, P>,
    ) -> impl Fn(&P) + Send + Sync + 'static {
        let channel = Arc::downgrade(self);
        let pending = Arc::clone(pending);
        move |payload: &P| {
            let Some((sender, subscriptions)) = lock(&pending).settle() else {
                return;
            };
            let _ = sender.send(wrap(payload.clone()));
            if let Some(channel) = channel.upgrade() {
                for (key, id) in &subscriptions {
                    channel.unsubscribe(key, *id);
                }
            }
        }
    }
}

/// Single-resolution future returned by [`EventChannel::await_once`].
pub struct AwaitOnce<K, P>
where
    K: Eq + Hash + Clone,
{
    receiver: oneshot::Receiver<Result<P, P>>,
    pending: Arc<Mutex<Pending<K, P>>>,
    channel: Weak<EventChannel<K, P>>,
}

impl<K, P> Future for AwaitOnce<K, P>
where
    K: Eq + Hash + Clone,
{
    type Output = Result<P, P>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The sender lives in `pending`, which we own, until a handler
            // consumes it by sending; it cannot be dropped unsent while we exist.
            Poll::Ready(Err(oneshot::Canceled)) | Poll::Pending => Poll::Pending,
        }
    }
}

impl<K, P> Drop for AwaitOnce<K, P>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        let Some((_sender, subscriptions)) = lock(&self.pending).settle() else {
            return;
        };
        if let Some(channel) = self.channel.upgrade() {
            for (key, id) in &subscriptions {
                channel.unsubscribe(key, *id);
            }
        }
    }
}
