//! Game-related type definitions
//!
//! Supporting types shared by the quiz engine and anything observing its events.

use serde::{Deserialize, Serialize};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Configured but not yet started
    NotStarted,
    /// A turn is running and its countdown is live
    InProgress,
    /// The turn is resolved and the answer is shown
    Revealing,
    /// Terminal: max turns reached or no playable track left
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::NotStarted => write!(f, "not started"),
            SessionPhase::InProgress => write!(f, "in progress"),
            SessionPhase::Revealing => write!(f, "revealing"),
            SessionPhase::Ended => write!(f, "ended"),
        }
    }
}

/// How a turn was resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuessOutcome {
    Correct,
    Partial,
    Wrong,
}

impl GuessOutcome {
    /// Correct and partial guesses keep a streak alive
    pub fn extends_streak(&self) -> bool {
        !matches!(self, GuessOutcome::Wrong)
    }
}

impl std::fmt::Display for GuessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuessOutcome::Correct => write!(f, "correct"),
            GuessOutcome::Partial => write!(f, "partial"),
            GuessOutcome::Wrong => write!(f, "wrong"),
        }
    }
}

/// Why a turn left the in-progress phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnResolution {
    Guessed,
    GaveUp,
    TimeUp,
}
