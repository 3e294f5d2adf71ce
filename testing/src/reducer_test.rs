//! Ergonomic testing utilities for reducer maps
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.
//! Actions are dispatched through a real Store, so routing and error wrapping are exercised too.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use unistate_core::action::AnyAction;
use unistate_core::error::StoreError;
use unistate_core::reducer::ReducerMap;
use unistate_runtime::{Store, StoreConfig};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for error assertion functions
type ErrorAssertion = Box<dyn FnOnce(&StoreError)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Every action given to [`when_action`](Self::when_action) is dispatched in
/// order. All of them must succeed, except the last one when a
/// [`then_error`](Self::then_error) assertion is present.
///
/// # Example
///
/// ```ignore
/// use unistate_testing::ReducerTest;
///
/// ReducerTest::new(game_reducers())
///     .given_state(GameState { score: 0, health: 3 })
///     .when_action(UpdateScore(10))
///     .then_state(|state| {
///         assert_eq!(state.score, 10);
///     })
///     .run();
/// ```
pub struct ReducerTest<S> {
    reducers: ReducerMap<S>,
    initial_state: Option<S>,
    actions: Vec<Box<dyn AnyAction>>,
    state_assertions: Vec<StateAssertion<S>>,
    error_assertions: Vec<ErrorAssertion>,
}

impl<S> ReducerTest<S>
where
    S: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    /// Create a new reducer test over the given reducer map
    #[must_use]
    pub const fn new(reducers: ReducerMap<S>) -> Self {
        Self {
            reducers,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            error_assertions: Vec::new(),
        }
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to dispatch (When)
    #[must_use]
    pub fn when_action(mut self, action: impl AnyAction + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the last action to fail, and assert on the error (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&StoreError) + 'static,
    {
        self.error_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state or an action is missing, if the reducer
    /// map cannot build a Store, if a dispatch fails unexpectedly (or
    /// succeeds when an error was expected), or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let initial_state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let store = Store::with_config(
            initial_state,
            self.reducers,
            StoreConfig::new("reducer-test").with_metrics(false),
        )
        .expect("reducer map should build a store");

        let expect_error = !self.error_assertions.is_empty();
        let last = self.actions.len() - 1;
        let mut failure = None;

        for (index, action) in self.actions.into_iter().enumerate() {
            let description = format!("{action:?}");
            match store.dispatch_boxed(action) {
                Ok(()) if index == last && expect_error => {
                    panic!("Expected {description} to fail, but it succeeded");
                },
                Ok(()) => {},
                Err(error) if index == last && expect_error => failure = Some(error),
                Err(error) => panic!("Dispatching {description} failed: {error}"),
            }
        }

        if let Some(error) = failure {
            for assertion in self.error_assertions {
                assertion(&error);
            }
        }

        let state = store.current_state();
        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unistate_core::action::Action;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        count: i32,
    }

    #[derive(Debug)]
    struct Increment;
    impl Action for Increment {}

    #[derive(Debug)]
    struct Decrement;
    impl Action for Decrement {}

    #[derive(Debug)]
    struct Unknown;
    impl Action for Unknown {}

    #[allow(clippy::unwrap_used)]
    fn reducers() -> ReducerMap<TestState> {
        ReducerMap::builder()
            .on(|state: &TestState, _: &Increment| TestState {
                count: state.count + 1,
            })
            .on(|state: &TestState, _: &Decrement| TestState {
                count: state.count - 1,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(reducers())
            .given_state(TestState { count: 0 })
            .when_action(Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_sequence() {
        ReducerTest::new(reducers())
            .given_state(TestState { count: 5 })
            .when_action(Decrement)
            .when_action(Decrement)
            .when_action(Increment)
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_expected_error() {
        ReducerTest::new(reducers())
            .given_state(TestState { count: 2 })
            .when_action(Increment)
            .when_action(Unknown)
            .then_error(|error| {
                assert_eq!(error.reason(), "unknown_action");
            })
            .then_state(|state| {
                assert_eq!(state.count, 3);
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected Increment to fail")]
    fn test_reducer_test_unexpected_success() {
        ReducerTest::new(reducers())
            .given_state(TestState { count: 0 })
            .when_action(Increment)
            .then_error(|_| {})
            .run();
    }
}
