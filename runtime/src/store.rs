use crate::StoreConfig;
use crate::metrics::{DispatchMetrics, register_metrics};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;
use unistate_core::action::{Action, ActionKind, AnyAction};
use unistate_core::error::{ConfigurationError, LifecycleError, ReducerFailure, StoreError};
use unistate_core::reducer::{ErasedReducer, ReducerMap, Reduction};
use unistate_core::state::{Observable, State, StateStream, Subscription};

/// Whether a dispatch is currently running on a Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// No dispatch in flight
    Idle,
    /// A reducer is running or its result is being delivered to subscribers
    Dispatching,
}

struct Inner<S> {
    state: State<S>,
    reducers: ReducerMap<S>,
    config: StoreConfig,
    /// Serialises dispatches coming from different threads.
    gate: Mutex<()>,
    /// Thread that holds `gate`, if any.
    owner: Mutex<Option<ThreadId>>,
    disposed: AtomicBool,
}

impl<S> Inner<S> {
    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Marks the Store as dispatching for the lifetime of the guard.
///
/// Dropped on every exit path, including unwinding, so a failed dispatch
/// never leaves the Store wedged.
struct PhaseGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
}

impl<'a> PhaseGuard<'a> {
    fn enter(owner: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *owner.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread);
        Self { owner }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// The Store - single owner of one state value
///
/// The Store holds:
/// 1. State (an observable cell, replayed to new subscribers)
/// 2. Reducers (frozen at construction, one per action kind)
/// 3. The dispatch gate (at most one dispatch in flight)
///
/// `Store` is a cheap handle: clones share the same state and reducers, so
/// subscribers may capture a clone. Calling [`dispatch`](Self::dispatch)
/// from a reducer or from a subscriber notified by the current dispatch is
/// rejected with [`StoreError::Reentrancy`]. Dispatches from other threads
/// wait for the current one to finish.
///
/// # Example
///
/// ```
/// use unistate_core::{Action, ReducerMap};
/// use unistate_runtime::Store;
///
/// #[derive(Debug)]
/// struct Rename(String);
/// impl Action for Rename {}
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reducers = ReducerMap::builder()
///     .on(|_: &String, rename: &Rename| rename.0.clone())
///     .build()?;
/// let store = Store::new(String::from("anon"), reducers)?;
///
/// let _subscription = store.subscribe(|name: &String| println!("name = {name}"))?;
/// store.dispatch(Rename("ada".into()))?;
/// assert_eq!(store.current_state(), "ada");
/// # Ok(())
/// # }
/// ```
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Store<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a store with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NoReducers`] if `reducers` is empty.
    pub fn new(initial_state: S, reducers: ReducerMap<S>) -> Result<Self, ConfigurationError> {
        Self::with_config(initial_state, reducers, StoreConfig::default())
    }

    /// Create a store with custom configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::with_config(
    ///     GameState::default(),
    ///     reducers,
    ///     StoreConfig::new("game").with_catch_panics(false),
    /// )?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NoReducers`] if `reducers` is empty.
    pub fn with_config(
        initial_state: S,
        reducers: ReducerMap<S>,
        config: StoreConfig,
    ) -> Result<Self, ConfigurationError> {
        if reducers.is_empty() {
            return Err(ConfigurationError::NoReducers);
        }
        if config.record_metrics {
            register_metrics();
        }

        tracing::debug!(store = %config.label, reducers = reducers.len(), "Store created");

        Ok(Self {
            inner: Arc::new(Inner {
                state: State::new(initial_state),
                reducers,
                config,
                gate: Mutex::new(()),
                owner: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Dispatch an action.
    ///
    /// Routes the action to the reducer registered for its type, runs it on
    /// the current state and publishes the result. Subscribers have been
    /// notified by the time this returns `Ok`. On any error the state is
    /// unchanged and the Store is idle again.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Lifecycle`]: the Store has been disposed
    /// - [`StoreError::Reentrancy`]: called from inside another dispatch on this thread
    /// - [`StoreError::UnknownAction`]: no reducer for this action type
    /// - [`StoreError::ReducerSignature`]: the registered reducer expects another type
    /// - [`StoreError::InvalidReducerResult`]: the reducer produced no state
    /// - [`StoreError::ReducerExecution`]: the reducer returned an error or panicked
    pub fn dispatch<A: Action>(&self, action: A) -> Result<(), StoreError> {
        self.dispatch_any(ActionKind::of::<A>(), std::any::type_name::<A>(), &action)
    }

    /// Dispatch an action whose type is only known at runtime.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub fn dispatch_boxed(&self, action: Box<dyn AnyAction>) -> Result<(), StoreError> {
        self.dispatch_any(action.kind(), action.type_name(), action.as_any())
    }

    #[tracing::instrument(
        skip(self, kind, received, action),
        name = "store_dispatch",
        fields(store = %self.inner.config.label, action = %kind)
    )]
    fn dispatch_any(
        &self,
        kind: ActionKind,
        received: &'static str,
        action: &dyn Any,
    ) -> Result<(), StoreError> {
        let label = &self.inner.config.label;
        let record_metrics = self.inner.config.record_metrics;
        if record_metrics {
            DispatchMetrics::record_dispatch(label);
        }

        match self.run(kind, received, action) {
            Ok(()) => {
                tracing::debug!("Action reduced");
                if record_metrics {
                    DispatchMetrics::record_subscribers(label, self.inner.state.subscriber_count());
                }
                Ok(())
            },
            Err(error) => {
                tracing::warn!(reason = error.reason(), %error, "Dispatch failed");
                if record_metrics {
                    DispatchMetrics::record_failure(label, error.reason());
                }
                Err(error)
            },
        }
    }

    fn run(
        &self,
        kind: ActionKind,
        received: &'static str,
        action: &dyn Any,
    ) -> Result<(), StoreError> {
        let inner = &*self.inner;
        if inner.is_disposed() {
            return Err(LifecycleError::new("dispatch").into());
        }

        let this_thread = thread::current().id();
        if *inner.owner() == Some(this_thread) {
            return Err(StoreError::Reentrancy { kind });
        }

        let reducer = inner
            .reducers
            .get(kind)
            .ok_or(StoreError::UnknownAction { kind })?;

        let _gate = inner.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let _phase = PhaseGuard::enter(&inner.owner, this_thread);
        tracing::trace!("Acquired dispatch gate");

        // Disposal may have happened while waiting for the gate.
        if inner.is_disposed() {
            return Err(LifecycleError::new("dispatch").into());
        }

        let current = inner.state.current();
        let started = Instant::now();
        let outcome = self.invoke(reducer, &current, action);
        if inner.config.record_metrics {
            DispatchMetrics::record_reducer(&inner.config.label, started.elapsed());
        }
        let reduction = outcome.map_err(|source| StoreError::ReducerExecution { kind, source })?;

        let next = match reduction {
            Reduction::Next(next) => next,
            Reduction::Missing => return Err(StoreError::InvalidReducerResult { kind }),
            Reduction::Mismatch { expected } => {
                return Err(StoreError::ReducerSignature {
                    kind,
                    expected,
                    received,
                });
            },
            Reduction::Failed(cause) => {
                return Err(StoreError::ReducerExecution {
                    kind,
                    source: ReducerFailure::Error(cause),
                });
            },
        };

        inner.state.set(next)?;
        Ok(())
    }

    fn invoke(
        &self,
        reducer: &ErasedReducer<S>,
        current: &S,
        action: &dyn Any,
    ) -> Result<Reduction<S>, ReducerFailure> {
        if !self.inner.config.catch_panics {
            return Ok(reducer.invoke(current, action));
        }

        panic::catch_unwind(AssertUnwindSafe(|| reducer.invoke(current, action)))
            .map_err(|payload| ReducerFailure::Panic(panic_message(payload.as_ref())))
    }

    /// Clone of the current state.
    #[must_use]
    pub fn current_state(&self) -> S {
        self.inner.state.current()
    }

    /// Read the current state via a closure, without cloning it.
    ///
    /// The closure borrows a snapshot and holds no lock, so it may dispatch;
    /// the snapshot does not change underneath it.
    ///
    /// ```ignore
    /// let health = store.with_state(|s| s.health);
    /// ```
    pub fn with_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        self.inner.state.with_current(f)
    }

    /// Read-only observable view of the state.
    #[must_use]
    pub fn state_changes(&self) -> Observable<S> {
        self.inner.state.observable()
    }

    /// Subscribe a callback; it receives the current state immediately and
    /// every later state in order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lifecycle`] if the Store has been disposed.
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription, StoreError>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        Ok(self.state_changes().subscribe(callback)?)
    }

    /// Open a stream of states, starting with the current one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lifecycle`] if the Store has been disposed.
    pub fn stream(&self) -> Result<StateStream<S>, StoreError> {
        Ok(self.state_changes().stream()?)
    }

    /// Dispose the Store and its State.
    ///
    /// Subscribers are dropped and open streams end. Later dispatches and
    /// subscriptions fail with [`StoreError::Lifecycle`]; the last state stays
    /// readable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lifecycle`] if the Store was already disposed.
    pub fn dispose(&self) -> Result<(), StoreError> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Err(LifecycleError::new("dispose store").into());
        }

        self.inner.state.dispose()?;
        tracing::debug!(store = %self.inner.config.label, "Store disposed");
        Ok(())
    }
}

impl<S> Store<S> {
    /// Whether a dispatch is currently in flight.
    #[must_use]
    pub fn phase(&self) -> DispatchPhase {
        if self.inner.owner().is_some() {
            DispatchPhase::Dispatching
        } else {
            DispatchPhase::Idle
        }
    }

    /// Whether [`dispose`](Store::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// The frozen reducer map.
    #[must_use]
    pub fn reducers(&self) -> &ReducerMap<S> {
        &self.inner.reducers
    }

    /// The configuration this Store was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.inner.config.label)
            .field("reducers", &self.inner.reducers)
            .field("phase", &self.phase())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
