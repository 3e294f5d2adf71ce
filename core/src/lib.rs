//! # Unistate Core
//!
//! Core traits and types for unistate, a minimal unidirectional state container.
//!
//! ## Core Concepts
//!
//! - **State**: an observable cell holding one current value, replayed to
//!   every new subscriber
//! - **Action**: an immutable value whose Rust type is its routing kind
//! - **Reducer**: pure function `(&State, &Action) -> State` for one action kind
//! - **`ReducerMap`**: the frozen set of reducers a Store routes through
//!
//! The Store itself, which ties these together under a single-writer
//! dispatch protocol, lives in `unistate-runtime`.
//!
//! ## Example
//!
//! ```
//! use unistate_core::action::Action;
//! use unistate_core::reducer::ReducerMap;
//! use unistate_core::state::State;
//!
//! #[derive(Debug)]
//! struct Increment;
//! impl Action for Increment {}
//!
//! let reducers = ReducerMap::<u32>::builder()
//!     .on(|count: &u32, _: &Increment| count + 1)
//!     .build()
//!     .unwrap();
//!
//! let state = State::new(0_u32);
//! assert_eq!(reducers.len(), 1);
//! assert_eq!(state.current(), 0);
//! ```

pub mod action;
pub mod error;
pub mod reducer;
pub mod state;

pub use action::{Action, ActionKind, AnyAction};
pub use error::{BoxError, ConfigurationError, LifecycleError, ReducerFailure, StoreError};
pub use reducer::{ErasedReducer, IntoReduction, Reducer, ReducerMap, ReducerMapBuilder, Reduction};
pub use state::{Observable, State, StateStream, Subscription, SubscriptionGuard};
