//! Subscriber that records every notification it receives.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::sync::{Arc, Mutex};
use unistate_core::error::LifecycleError;
use unistate_core::state::{Observable, SubscriptionGuard};

/// Records the values pushed to it by an [`Observable`].
///
/// The first recorded value is the replay of the state current at attach
/// time. Dropping the recorder unsubscribes it.
///
/// # Example
///
/// ```
/// use unistate_core::state::State;
/// use unistate_testing::Recorder;
///
/// let state = State::new(1);
/// let recorder = Recorder::attach(&state.observable()).unwrap();
///
/// state.set(2).unwrap();
/// assert_eq!(recorder.values(), vec![1, 2]);
/// ```
#[derive(Debug)]
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
    guard: Option<SubscriptionGuard>,
}

impl<T> Recorder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Subscribe to `observable` and start recording.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if the underlying State has been disposed.
    pub fn attach(observable: &Observable<T>) -> Result<Self, LifecycleError> {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);
        let subscription =
            observable.subscribe(move |value: &T| sink.lock().unwrap().push(value.clone()))?;

        Ok(Self {
            values,
            guard: Some(subscription.guard()),
        })
    }

    /// Everything recorded so far, oldest first.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values.lock().unwrap().clone()
    }

    /// The first recorded value.
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.values.lock().unwrap().first().cloned()
    }

    /// The most recent recorded value.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.values.lock().unwrap().last().cloned()
    }

    /// Number of recorded notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }

    /// Forget recorded values; keep recording.
    pub fn clear(&self) {
        self.values.lock().unwrap().clear();
    }

    /// Stop recording. Values recorded so far are kept.
    pub fn detach(&mut self) {
        self.guard.take();
    }
}
