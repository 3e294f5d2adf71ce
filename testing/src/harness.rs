//! Scripted dispatch helper for Store-level tests.

#![allow(clippy::panic)] // Test helpers fail loudly
#![allow(clippy::expect_used)] // Test helpers fail loudly
#![allow(clippy::missing_panics_doc)] // Every method panics on unexpected outcomes

use crate::recorder::Recorder;
use std::fmt::Debug;
use unistate_core::action::Action;
use unistate_core::error::StoreError;
use unistate_runtime::Store;

/// Wraps a Store together with a [`Recorder`] attached to its state.
///
/// # Example
///
/// ```ignore
/// let harness = StoreHarness::new(GameStateStore::new()?.into_store());
/// harness
///     .dispatch(UpdateScore(10))
///     .assert_state(|s| assert_eq!(s.score, 10));
/// assert_eq!(harness.notifications().len(), 2);
/// ```
#[derive(Debug)]
pub struct StoreHarness<S> {
    store: Store<S>,
    recorder: Recorder<S>,
}

impl<S> StoreHarness<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Attach to `store`.
    #[must_use]
    pub fn new(store: Store<S>) -> Self {
        let recorder =
            Recorder::attach(&store.state_changes()).expect("store should not be disposed");
        Self { store, recorder }
    }

    /// Dispatch an action that must succeed.
    pub fn dispatch<A: Action>(&self, action: A) -> &Self {
        let description = format!("{action:?}");
        if let Err(error) = self.store.dispatch(action) {
            panic!("Dispatching {description} failed: {error}");
        }
        self
    }

    /// Dispatch an action that must fail, returning the error.
    pub fn dispatch_err<A: Action>(&self, action: A) -> StoreError {
        let description = format!("{action:?}");
        match self.store.dispatch(action) {
            Ok(()) => panic!("Expected {description} to fail, but it succeeded"),
            Err(error) => error,
        }
    }

    /// Run an assertion against the current state.
    pub fn assert_state<F>(&self, assertion: F) -> &Self
    where
        F: FnOnce(&S),
    {
        self.store.with_state(assertion);
        self
    }

    /// Every state the recorder has seen, starting with the replayed one.
    #[must_use]
    pub fn notifications(&self) -> Vec<S> {
        self.recorder.values()
    }

    /// The wrapped store.
    #[must_use]
    pub const fn store(&self) -> &Store<S> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unistate_core::reducer::ReducerMap;

    #[derive(Debug)]
    struct Push(char);
    impl Action for Push {}

    #[derive(Debug)]
    struct Pop;
    impl Action for Pop {}

    fn store() -> Store<String> {
        let reducers = ReducerMap::builder()
            .on(|text: &String, push: &Push| format!("{text}{}", push.0))
            .on(|text: &String, _: &Pop| {
                let mut chars = text.chars();
                chars.next_back().map(|_| chars.as_str().to_string())
            })
            .build()
            .expect("valid reducers");
        Store::new(String::new(), reducers).expect("valid store")
    }

    #[test]
    fn test_harness_records_notifications() {
        let harness = StoreHarness::new(store());
        harness
            .dispatch(Push('a'))
            .dispatch(Push('b'))
            .assert_state(|text| assert_eq!(text, "ab"));

        assert_eq!(harness.notifications(), vec!["", "a", "ab"]);
    }

    #[test]
    fn test_harness_expected_failure() {
        let harness = StoreHarness::new(store());
        let error = harness.dispatch_err(Pop);

        assert!(matches!(error, StoreError::InvalidReducerResult { .. }));
        assert_eq!(harness.notifications(), vec![String::new()]);
    }
}
