//! Reducers and the kind-keyed reducer registry.
//!
//! A reducer is a pure function `(&State, &Action) -> State` for exactly one
//! action kind. Reducers for different kinds are type-erased and collected
//! into a [`ReducerMap`], which the Store consults on every dispatch.
//!
//! # Example
//!
//! ```
//! use unistate_core::action::Action;
//! use unistate_core::reducer::ReducerMap;
//!
//! #[derive(Debug)]
//! struct Add(i64);
//! impl Action for Add {}
//!
//! let reducers = ReducerMap::<i64>::builder()
//!     .on(|total: &i64, add: &Add| total + add.0)
//!     .build()
//!     .unwrap();
//!
//! assert!(reducers.contains::<Add>());
//! ```

use crate::action::{Action, ActionKind};
use crate::error::{BoxError, ConfigurationError};
use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

/// Conversion from a reducer's return value into a uniform outcome.
///
/// Reducers may return the new state directly, an `Option` (where `None`
/// means "no state was produced"), or a `Result` of either.
pub trait IntoReduction<S> {
    /// Normalise into `Ok(Some(state))`, `Ok(None)` or `Err(cause)`.
    ///
    /// # Errors
    ///
    /// Returns the reducer's own error, boxed.
    fn into_reduction(self) -> Result<Option<S>, BoxError>;
}

impl<S> IntoReduction<S> for S {
    fn into_reduction(self) -> Result<Option<S>, BoxError> {
        Ok(Some(self))
    }
}

impl<S> IntoReduction<S> for Option<S> {
    fn into_reduction(self) -> Result<Option<S>, BoxError> {
        Ok(self)
    }
}

impl<S, E> IntoReduction<S> for Result<S, E>
where
    E: Into<BoxError>,
{
    fn into_reduction(self) -> Result<Option<S>, BoxError> {
        self.map(Some).map_err(Into::into)
    }
}

impl<S, E> IntoReduction<S> for Result<Option<S>, E>
where
    E: Into<BoxError>,
{
    fn into_reduction(self) -> Result<Option<S>, BoxError> {
        self.map_err(Into::into)
    }
}

/// Struct-style reducer for one action kind.
///
/// Closures and plain functions are usually enough; implement this trait
/// when the reducer carries configuration of its own.
pub trait Reducer<S>: Send + Sync + 'static {
    /// The single action kind this reducer handles
    type Action: Action;

    /// Return type, see [`IntoReduction`]
    type Output: IntoReduction<S>;

    /// Compute the next state. Must not mutate anything reachable from `state`.
    fn reduce(&self, state: &S, action: &Self::Action) -> Self::Output;
}

/// Outcome of invoking a type-erased reducer.
#[derive(Debug)]
pub enum Reduction<S> {
    /// The reducer produced a new state.
    Next(S),
    /// The reducer ran but produced no state.
    Missing,
    /// The action was not of the type the reducer was built for.
    Mismatch {
        /// Kind the reducer accepts
        expected: ActionKind,
    },
    /// The reducer returned an error.
    Failed(BoxError),
}

type ErasedFn<S> = dyn Fn(&S, &dyn Any) -> Reduction<S> + Send + Sync;

/// A reducer with its action type erased.
///
/// The action is downcast back to the declared type on every call; a failed
/// downcast yields [`Reduction::Mismatch`] instead of mis-routing the action.
pub struct ErasedReducer<S> {
    declared: ActionKind,
    call: Arc<ErasedFn<S>>,
}

impl<S: 'static> ErasedReducer<S> {
    /// Erase a reducer function for action type `A`.
    pub fn new<A, F, R>(reducer: F) -> Self
    where
        A: Action,
        F: Fn(&S, &A) -> R + Send + Sync + 'static,
        R: IntoReduction<S>,
    {
        let declared = ActionKind::of::<A>();
        Self {
            declared,
            call: Arc::new(move |state: &S, action: &dyn Any| {
                let Some(action) = action.downcast_ref::<A>() else {
                    return Reduction::Mismatch { expected: declared };
                };
                match reducer(state, action).into_reduction() {
                    Ok(Some(next)) => Reduction::Next(next),
                    Ok(None) => Reduction::Missing,
                    Err(cause) => Reduction::Failed(cause),
                }
            }),
        }
    }

    /// Erase a struct-style [`Reducer`].
    pub fn from_reducer<R>(reducer: R) -> Self
    where
        R: Reducer<S>,
    {
        Self::new(move |state: &S, action: &R::Action| reducer.reduce(state, action))
    }
}

impl<S> ErasedReducer<S> {
    /// The action kind this reducer was built for.
    #[must_use]
    pub const fn declared_kind(&self) -> ActionKind {
        self.declared
    }

    /// Run the reducer against `state` with a type-erased action.
    pub fn invoke(&self, state: &S, action: &dyn Any) -> Reduction<S> {
        (self.call)(state, action)
    }
}

impl<S> Clone for ErasedReducer<S> {
    fn clone(&self) -> Self {
        Self {
            declared: self.declared,
            call: Arc::clone(&self.call),
        }
    }
}

impl<S> fmt::Debug for ErasedReducer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedReducer")
            .field("action", &self.declared)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from action kind to reducer.
///
/// Built once through [`ReducerMap::builder`]; cloning shares the same frozen
/// entries.
pub struct ReducerMap<S> {
    entries: Arc<HashMap<ActionKind, ErasedReducer<S>>>,
}

impl<S: 'static> ReducerMap<S> {
    /// Start collecting reducers.
    #[must_use]
    pub fn builder() -> ReducerMapBuilder<S> {
        ReducerMapBuilder::new()
    }
}

impl<S> ReducerMap<S> {
    /// Reducer registered for `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: ActionKind) -> Option<&ErasedReducer<S>> {
        self.entries.get(&kind)
    }

    /// Whether a reducer is registered for action type `A`.
    #[must_use]
    pub fn contains<A: Action>(&self) -> bool {
        self.entries.contains_key(&ActionKind::of::<A>())
    }

    /// Registered action kinds, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.entries.keys().copied()
    }

    /// Number of registered reducers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a map produced by the builder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Clone for ReducerMap<S> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<S> fmt::Debug for ReducerMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Collects reducers and validates them into a [`ReducerMap`].
pub struct ReducerMapBuilder<S> {
    entries: Vec<(ActionKind, ErasedReducer<S>)>,
}

impl<S: 'static> ReducerMapBuilder<S> {
    /// Create an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a reducer function for action type `A`.
    #[must_use]
    pub fn on<A, F, R>(mut self, reducer: F) -> Self
    where
        A: Action,
        F: Fn(&S, &A) -> R + Send + Sync + 'static,
        R: IntoReduction<S>,
    {
        self.entries
            .push((ActionKind::of::<A>(), ErasedReducer::new(reducer)));
        self
    }

    /// Register a struct-style [`Reducer`].
    #[must_use]
    pub fn with<R>(mut self, reducer: R) -> Self
    where
        R: Reducer<S>,
    {
        self.entries.push((
            ActionKind::of::<R::Action>(),
            ErasedReducer::from_reducer(reducer),
        ));
        self
    }

    /// Bind an already erased reducer under an explicit kind.
    ///
    /// The binding is checked in [`build`](Self::build): the reducer's
    /// declared kind must equal `kind`.
    #[must_use]
    pub fn on_kind(mut self, kind: ActionKind, reducer: ErasedReducer<S>) -> Self {
        self.entries.push((kind, reducer));
        self
    }

    /// Validate and freeze the collected reducers.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::NoReducers`] if nothing was registered
    /// - [`ConfigurationError::SignatureMismatch`] if an erased reducer was
    ///   bound under a kind it does not accept
    /// - [`ConfigurationError::DuplicateReducer`] if a kind was registered twice
    pub fn build(self) -> Result<ReducerMap<S>, ConfigurationError> {
        if self.entries.is_empty() {
            return Err(ConfigurationError::NoReducers);
        }

        let mut entries = HashMap::with_capacity(self.entries.len());
        for (key, reducer) in self.entries {
            let declared = reducer.declared_kind();
            if declared != key {
                return Err(ConfigurationError::SignatureMismatch { key, declared });
            }
            match entries.entry(key) {
                Entry::Occupied(_) => {
                    return Err(ConfigurationError::DuplicateReducer { kind: key });
                },
                Entry::Vacant(slot) => {
                    slot.insert(reducer);
                },
            }
        }

        Ok(ReducerMap {
            entries: Arc::new(entries),
        })
    }
}

impl<S: 'static> Default for ReducerMapBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
