//! # Unistate Runtime
//!
//! Store runtime for unistate.
//!
//! This crate provides the [`Store`]: the single owner of one observable
//! state value and the only path through which it changes.
//!
//! ## Core Components
//!
//! - **Store**: routes each dispatched action to its reducer and publishes
//!   the result
//! - **`StoreConfig`**: label, panic handling and metrics switches
//! - **Metrics**: dispatch counters and reducer timings via the `metrics` facade
//!
//! ## Example
//!
//! ```
//! use unistate_core::{Action, ReducerMap};
//! use unistate_runtime::Store;
//!
//! #[derive(Debug)]
//! struct Increment;
//! impl Action for Increment {}
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reducers = ReducerMap::builder()
//!     .on(|count: &u32, _: &Increment| count + 1)
//!     .build()?;
//! let store = Store::new(0_u32, reducers)?;
//!
//! store.dispatch(Increment)?;
//! assert_eq!(store.current_state(), 1);
//! # Ok(())
//! # }
//! ```

/// Dispatch metrics via the `metrics` facade
pub mod metrics;

/// The Store and its dispatch protocol
pub mod store;

pub use store::{DispatchPhase, Store};
pub use unistate_core::error::{ConfigurationError, LifecycleError, ReducerFailure, StoreError};

/// Store configuration.
///
/// # Example
///
/// ```
/// use unistate_runtime::StoreConfig;
///
/// let config = StoreConfig::new("game")
///     .with_catch_panics(false)
///     .with_metrics(false);
/// assert_eq!(config.label, "game");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name used in tracing spans and metric labels
    pub label: String,
    /// Convert reducer panics into [`StoreError::ReducerExecution`]
    pub catch_panics: bool,
    /// Record dispatch metrics
    pub record_metrics: bool,
}

impl StoreConfig {
    /// Create a configuration with the given label and default switches.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Choose whether reducer panics are caught.
    ///
    /// When disabled the panic unwinds through `dispatch`; the Store is
    /// still left idle and its state unchanged.
    #[must_use]
    pub const fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// Choose whether dispatch metrics are recorded.
    #[must_use]
    pub const fn with_metrics(mut self, record_metrics: bool) -> Self {
        self.record_metrics = record_metrics;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label: "store".to_string(),
            catch_panics: true,
            record_metrics: true,
        }
    }
}
