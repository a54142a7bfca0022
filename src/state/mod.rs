//! Finite-state machines.
//!
//! ## Contents
//! - [`StateMachine`] generic machine over a static transition table
//! - [`State`] trait implemented by state enums
//! - [`TestState`] lifecycle of a single test node
//! - [`RunnerState`] lifecycle of a whole run
//!
//! The machine itself holds no listeners: a successful move returns a [`Transition`]
//! and the owner (test node, runner) publishes the matching change events.

mod machine;
mod states;

pub use machine::{State, StateMachine, Transition};
pub use states::{RunnerState, TestState};
