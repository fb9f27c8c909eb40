//! # votetoken-types
//!
//! Shared types, errors, and configuration for the **votetoken** ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`RoundId`], [`Amount`]
//! - **Event stream**: [`Event`], [`EventRecord`], [`EventLog`]
//! - **Time**: [`Clock`], [`SystemClock`], [`ManualClock`]
//! - **Configuration**: [`TokenConfig`], [`VestingConfig`]
//! - **Errors**: [`VotetokenError`] with string reason keys
//! - **Constants**: defaults and protocol limits

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;

// Re-export all primary types at crate root for ergonomic imports:
//   use votetoken_types::{Address, Event, VotetokenError, ...};

pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;

// Constants are accessed via `votetoken_types::constants::FOO`
// (not re-exported to avoid name collisions).
