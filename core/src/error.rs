//! Error types shared by the state cell, the reducer registry and the Store.
//!
//! Construction problems ([`ConfigurationError`]) are kept apart from the
//! per-dispatch errors ([`StoreError`]): the former is fatal to building a
//! Store, every variant of the latter leaves the Store usable.

use crate::action::ActionKind;
use thiserror::Error;

/// Boxed error type accepted from fallible reducers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building a reducer map or a Store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The reducer map has no entries.
    #[error("a store needs at least one reducer")]
    NoReducers,

    /// Two reducers were registered for the same action kind.
    #[error("more than one reducer registered for action {kind}")]
    DuplicateReducer {
        /// The kind registered twice
        kind: ActionKind,
    },

    /// A type-erased reducer was bound under a kind it does not accept.
    #[error("reducer for action {declared} registered under action {key}")]
    SignatureMismatch {
        /// Kind the reducer was registered under
        key: ActionKind,
        /// Kind the reducer actually accepts
        declared: ActionKind,
    },
}

/// An operation was attempted on a disposed State or Store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {operation}: already disposed")]
pub struct LifecycleError {
    /// The rejected operation (e.g. `"dispatch"`, `"subscribe"`)
    pub operation: &'static str,
}

impl LifecycleError {
    /// Create a lifecycle error for the named operation.
    #[must_use]
    pub const fn new(operation: &'static str) -> Self {
        Self { operation }
    }
}

/// Cause of a failed reducer call.
#[derive(Error, Debug)]
pub enum ReducerFailure {
    /// The reducer returned an error.
    #[error("{0}")]
    Error(#[source] BoxError),

    /// The reducer panicked; the panic payload is kept as text.
    #[error("reducer panicked: {0}")]
    Panic(String),
}

/// Errors returned by `Store::dispatch` and the other Store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// `dispatch` was called while a dispatch on the same Store was running
    /// higher up the call stack.
    #[error("cannot dispatch {kind} while another dispatch is in progress")]
    Reentrancy {
        /// Kind of the rejected nested action
        kind: ActionKind,
    },

    /// No reducer is registered for the action's kind.
    #[error("no reducer registered for action {kind}")]
    UnknownAction {
        /// Kind of the unroutable action
        kind: ActionKind,
    },

    /// The registered reducer does not accept the dispatched action type.
    ///
    /// Only reachable through a hand-written [`AnyAction`](crate::action::AnyAction)
    /// whose `kind` disagrees with its concrete type.
    #[error("reducer for action {expected} cannot take a value of type {received} dispatched as {kind}")]
    ReducerSignature {
        /// Kind the action claimed
        kind: ActionKind,
        /// Kind the reducer was built for
        expected: ActionKind,
        /// Concrete type of the dispatched value
        received: &'static str,
    },

    /// The reducer produced no new state.
    #[error("reducer for action {kind} returned no state")]
    InvalidReducerResult {
        /// Kind of the dispatched action
        kind: ActionKind,
    },

    /// The reducer failed; the original cause is attached.
    #[error("reducer for action {kind} failed")]
    ReducerExecution {
        /// Kind of the dispatched action
        kind: ActionKind,
        /// What went wrong inside the reducer
        #[source]
        source: ReducerFailure,
    },

    /// The Store has been disposed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl StoreError {
    /// Action kind involved in the failure, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ActionKind> {
        match self {
            Self::Reentrancy { kind }
            | Self::UnknownAction { kind }
            | Self::ReducerSignature { kind, .. }
            | Self::InvalidReducerResult { kind }
            | Self::ReducerExecution { kind, .. } => Some(*kind),
            Self::Lifecycle(_) => None,
        }
    }

    /// Whether the Store is still usable after this error.
    ///
    /// Every dispatch failure leaves the state untouched and the Store idle;
    /// only a disposed Store stays unusable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Lifecycle(_))
    }

    /// Short, stable label for logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Reentrancy { .. } => "reentrancy",
            Self::UnknownAction { .. } => "unknown_action",
            Self::ReducerSignature { .. } => "reducer_signature",
            Self::InvalidReducerResult { .. } => "invalid_reducer_result",
            Self::ReducerExecution { .. } => "reducer_execution",
            Self::Lifecycle(_) => "lifecycle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Jump;
    impl Action for Jump {}

    #[test]
    fn messages_name_the_action() {
        let err = StoreError::UnknownAction {
            kind: ActionKind::of::<Jump>(),
        };
        assert_eq!(err.to_string(), "no reducer registered for action Jump");
        assert_eq!(err.kind(), Some(ActionKind::of::<Jump>()));
        assert_eq!(err.reason(), "unknown_action");
    }

    #[test]
    fn execution_error_keeps_cause() {
        let cause: BoxError = "out of lives".into();
        let err = StoreError::ReducerExecution {
            kind: ActionKind::of::<Jump>(),
            source: ReducerFailure::Error(cause),
        };

        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("out of lives"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn lifecycle_is_not_recoverable() {
        let err = StoreError::from(LifecycleError::new("dispatch"));
        assert_eq!(err.to_string(), "cannot dispatch: already disposed");
        assert!(!err.is_recoverable());
        assert_eq!(err.kind(), None);
    }
}
