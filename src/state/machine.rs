//! # Generic state machine.
//!
//! A [`StateMachine`] starts in an initial state and only moves along the `(from, to)`
//! pairs of its transition table.
//!
//! ## Rules
//! - Requesting the current state is a no-op (`Ok(None)`).
//! - A target no rule leads to → [`StateError::UnknownTarget`].
//! - A target reachable only from other states → [`StateError::InvalidMove`].
//! - [`StateMachine::reset`] returns to the initial state unconditionally.

use std::fmt;

use crate::error::StateError;

/// A state enum usable with [`StateMachine`].
pub trait State: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Stable kebab-case name (also used as event name).
    fn as_str(&self) -> &'static str;
}

/// A completed move, returned so the owner can publish change events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

/// Finite-state object with a declared transition table.
#[derive(Clone, Debug)]
pub struct StateMachine<S: State> {
    initial: S,
    current: S,
    moves: &'static [(S, S)],
}

impl<S: State> StateMachine<S> {
    /// Creates a machine in `initial` that accepts the given `(from, to)` moves.
    pub fn new(initial: S, moves: &'static [(S, S)]) -> Self {
        Self {
            initial,
            current: initial,
            moves,
        }
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> S {
        self.current
    }

    /// True if `to` can be entered from the current state.
    pub fn can_move(&self, to: S) -> bool {
        self.moves
            .iter()
            .any(|(from, target)| *from == self.current && *target == to)
    }

    /// Moves to `to`.
    ///
    /// Returns `Ok(None)` when already in `to`, `Ok(Some(transition))` on a move.
    pub fn set_state(&mut self, to: S) -> Result<Option<Transition<S>>, StateError> {
        if self.current == to {
            return Ok(None);
        }

        let valid_from: Vec<&'static str> = self
            .moves
            .iter()
            .filter(|(_, target)| *target == to)
            .map(|(from, _)| from.as_str())
            .collect();
        if valid_from.is_empty() {
            return Err(StateError::UnknownTarget {
                attempted: to.as_str(),
            });
        }
        if !self.can_move(to) {
            return Err(StateError::InvalidMove {
                attempted: to.as_str(),
                current: self.current.as_str(),
                valid_from,
            });
        }

        let from = self.current;
        self.current = to;
        Ok(Some(Transition { from, to }))
    }

    /// Returns to the initial state, yielding the state that was left.
    pub fn reset(&mut self) -> S {
        std::mem::replace(&mut self.current, self.initial)
    }
}
