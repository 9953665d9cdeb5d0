//! Swing Index System trading rules.
//!
//! [`PositionStateMachine`] owns one leg's state and turns an enriched
//! window into a [`Signal`](crate::domain::Signal). The entry, SAR and
//! trailing-SAR scans it relies on live in [`sar`].

pub mod sar;
pub mod state_machine;

pub use state_machine::{PositionStateMachine, StateMachineParams};
