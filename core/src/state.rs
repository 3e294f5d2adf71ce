//! Observable state cell with replay to new subscribers.
//!
//! [`State`] holds exactly one current value. Every write is stored and then
//! pushed, synchronously and in subscription order, to every live subscriber
//! before the write returns. A new subscriber first receives the value that
//! is current at the moment it subscribes.
//!
//! Two kinds of subscriber are supported:
//! - callbacks registered with [`Observable::subscribe`], run inline
//! - [`StateStream`]s from [`Observable::stream`], unbounded queues that plug
//!   into the `futures` combinators (`map`, `filter`, ...)
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use unistate_core::state::State;
//!
//! let state = State::new(1);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let _subscription = state
//!     .observable()
//!     .subscribe(move |value: &i32| sink.lock().unwrap().push(*value))
//!     .unwrap();
//!
//! state.set(2).unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```

use crate::error::LifecycleError;
use futures::Stream;
use futures::channel::mpsc;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::task::{Context, Poll};
use std::thread::{self, ThreadId};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

enum Sink<T> {
    Callback(Callback<T>),
    Channel(mpsc::UnboundedSender<T>),
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Callback(callback) => Self::Callback(Arc::clone(callback)),
            Self::Channel(sender) => Self::Channel(sender.clone()),
        }
    }
}

struct Subscriber<T> {
    id: u64,
    sink: Sink<T>,
}

/// Serialises deliveries: a write's fan-out and a new subscriber's replay
/// never interleave. Nested entry from the delivering thread passes through.
struct DeliveryGate {
    lock: Mutex<()>,
    owner: Mutex<Option<ThreadId>>,
}

impl DeliveryGate {
    const fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            owner: Mutex::new(None),
        }
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `None` when this thread is already delivering.
    fn enter(&self) -> Option<DeliveryTurn<'_>> {
        let this_thread = thread::current().id();
        if *self.owner() == Some(this_thread) {
            return None;
        }

        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        *self.owner() = Some(this_thread);
        Some(DeliveryTurn {
            gate: self,
            _guard: guard,
        })
    }
}

struct DeliveryTurn<'a> {
    gate: &'a DeliveryGate,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for DeliveryTurn<'_> {
    fn drop(&mut self) {
        *self.gate.owner() = None;
    }
}

struct Shared<T> {
    current: RwLock<Arc<T>>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
    delivery: DeliveryGate,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

impl<T> Shared<T> {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber<T>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Runs `f` on a snapshot with no lock held.
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.snapshot())
    }

    fn replace(&self, value: Arc<T>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        subscribers.len() != before
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Single-value observable cell.
///
/// `State` is the writable side; hand out [`Observable`] views to readers.
pub struct State<T> {
    shared: Arc<Shared<T>>,
}

impl<T> State<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                current: RwLock::new(Arc::new(initial)),
                subscribers: Mutex::new(Vec::new()),
                delivery: DeliveryGate::new(),
                next_id: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Clone of the latest written value.
    #[must_use]
    pub fn current(&self) -> T {
        self.shared.read(T::clone)
    }

    /// Borrow the latest written value.
    ///
    /// `f` sees a snapshot and runs with no lock held, so it may write.
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.shared.read(f)
    }

    /// Store `value` and deliver it to every subscriber before returning.
    ///
    /// Writes from different threads are delivered one at a time. A
    /// subscriber must not write to the same State from its callback: the
    /// nested write would reach the remaining subscribers before the outer
    /// one. The Store rejects such writes as re-entrant dispatches.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if the cell has been disposed.
    pub fn set(&self, value: T) -> Result<(), LifecycleError> {
        let _turn = self.shared.delivery.enter();
        let value = Arc::new(value);

        // Snapshot under the subscriber lock so that a concurrent subscriber
        // sees either the old value plus this delivery, or only the new value.
        let sinks: Vec<(u64, Sink<T>)> = {
            let subscribers = self.shared.subscribers();
            if self.shared.is_disposed() {
                return Err(LifecycleError::new("set state"));
            }
            self.shared.replace(Arc::clone(&value));
            subscribers
                .iter()
                .map(|subscriber| (subscriber.id, subscriber.sink.clone()))
                .collect()
        };

        tracing::trace!(subscribers = sinks.len(), "Delivering state update");

        let mut closed = Vec::new();
        for (id, sink) in sinks {
            match sink {
                Sink::Callback(callback) => callback(value.as_ref()),
                Sink::Channel(sender) => {
                    if sender.unbounded_send(T::clone(&value)).is_err() {
                        closed.push(id);
                    }
                },
            }
        }

        for id in closed {
            self.shared.remove(id);
        }

        Ok(())
    }

    /// Read-only view for subscribers.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        Observable {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Close the cell: drop every subscriber, end every stream, and reject
    /// further writes and subscriptions. Waits for a delivery in progress on
    /// another thread, so no subscriber is called once this returns.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if the cell was already disposed.
    pub fn dispose(&self) -> Result<(), LifecycleError> {
        let _turn = self.shared.delivery.enter();
        let dropped = {
            let mut subscribers = self.shared.subscribers();
            if self.shared.disposed.swap(true, Ordering::AcqRel) {
                return Err(LifecycleError::new("dispose state"));
            }
            std::mem::take(&mut *subscribers)
        };
        tracing::debug!(subscribers = dropped.len(), "State disposed");
        Ok(())
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Number of live subscribers (callbacks and open streams).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.read(|current| {
            f.debug_struct("State")
                .field("current", current)
                .field("disposed", &self.shared.is_disposed())
                .finish_non_exhaustive()
        })
    }
}

/// Read-only, cloneable view of a [`State`].
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Clone of the latest value.
    #[must_use]
    pub fn current(&self) -> T {
        self.shared.read(T::clone)
    }

    /// Register a callback.
    ///
    /// The callback runs once with the current value before this call
    /// returns, then once per later write, in write order. A write from
    /// another thread waits until the replay has been delivered. Callbacks
    /// run with no state or subscriber lock held, so they may read the state
    /// or (un)subscribe.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if the State has been disposed.
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription, LifecycleError>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let _turn = self.shared.delivery.enter();

        let (id, replay) = {
            let mut subscribers = self.shared.subscribers();
            if self.shared.is_disposed() {
                return Err(LifecycleError::new("subscribe"));
            }
            let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
            subscribers.push(Subscriber {
                id,
                sink: Sink::Callback(Arc::clone(&callback)),
            });
            (id, self.shared.snapshot())
        };

        callback(replay.as_ref());
        Ok(self.subscription(id))
    }

    /// Open a stream of values: the current value first, then every later
    /// write. Nothing is coalesced or dropped. The stream ends when the State
    /// is disposed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if the State has been disposed.
    pub fn stream(&self) -> Result<StateStream<T>, LifecycleError> {
        let (sender, receiver) = mpsc::unbounded();

        let id = {
            let mut subscribers = self.shared.subscribers();
            if self.shared.is_disposed() {
                return Err(LifecycleError::new("open state stream"));
            }
            let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
            // A fresh unbounded channel always accepts the replayed value.
            let _ = sender.unbounded_send(self.current());
            subscribers.push(Subscriber {
                id,
                sink: Sink::Channel(sender),
            });
            id
        };

        Ok(StateStream {
            receiver,
            subscription: self.subscription(id),
        })
    }

    fn subscription(&self, id: u64) -> Subscription {
        let shared: Arc<Shared<T>> = Arc::clone(&self.shared);
        let weak: Weak<dyn Detach> = Arc::downgrade(&shared) as Weak<dyn Detach>;
        Subscription { id, owner: weak }
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<T: Send + Sync> Detach for Shared<T> {
    fn detach(&self, id: u64) -> bool {
        self.remove(id)
    }
}

/// Handle to one subscriber.
///
/// Holds only a weak reference to the State. Dropping the handle leaves the
/// subscriber attached; call [`unsubscribe`](Self::unsubscribe) or wrap it
/// in a [`SubscriptionGuard`] to stop delivery.
pub struct Subscription {
    id: u64,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    /// Stop delivery to this subscriber only.
    ///
    /// Returns `false` if it was already gone (unsubscribed, State disposed
    /// or dropped).
    pub fn unsubscribe(self) -> bool {
        self.detach()
    }

    /// Turn into a guard that unsubscribes when dropped.
    #[must_use]
    pub const fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard {
            subscription: Some(self),
        }
    }

    fn detach(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|owner| owner.detach(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Unsubscribes on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Option<Subscription>,
}

impl SubscriptionGuard {
    /// Keep the subscriber attached after all.
    #[must_use]
    pub fn into_inner(mut self) -> Option<Subscription> {
        self.subscription.take()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.detach();
        }
    }
}

/// Stream of state values, see [`Observable::stream`].
///
/// Dropping the stream unsubscribes it.
pub struct StateStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    subscription: Subscription,
}

impl<T> StateStream<T> {
    /// Stop receiving new values; already queued values are still yielded.
    pub fn close(&mut self) {
        self.subscription.detach();
        self.receiver.close();
    }
}

impl<T> Stream for StateStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.get_mut().receiver).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.receiver.size_hint()
    }
}

impl<T> Drop for StateStream<T> {
    fn drop(&mut self) {
        self.subscription.detach();
    }
}

impl<T> fmt::Debug for StateStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStream")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}
