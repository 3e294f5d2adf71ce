//! # Unistate Testing
//!
//! Testing utilities and helpers for unistate.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then assertions over a reducer map
//! - [`Recorder`]: a subscriber that captures every state it is sent
//! - [`StoreHarness`]: a Store plus a Recorder with fail-fast dispatch helpers
//!
//! ## Example
//!
//! ```ignore
//! use unistate_testing::StoreHarness;
//!
//! #[test]
//! fn test_score_flow() {
//!     let harness = StoreHarness::new(game_store());
//!
//!     harness
//!         .dispatch(UpdateScore(10))
//!         .dispatch(IncreaseHealth(1))
//!         .assert_state(|s| assert_eq!((s.score, s.health), (10, 4)));
//! }
//! ```

/// Scripted dispatch helper
pub mod harness;

/// Notification recorder
pub mod recorder;

/// Ergonomic reducer testing with Given-When-Then syntax
pub mod reducer_test;

// Re-export commonly used items
pub use harness::StoreHarness;
pub use recorder::Recorder;
pub use reducer_test::ReducerTest;
