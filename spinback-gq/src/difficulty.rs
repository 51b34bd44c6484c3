//! Difficulty table and penalty constants

use serde::{Deserialize, Serialize};
use spinback_common::config::GameConfig;
use std::str::FromStr;

/// Named difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Per-difficulty session parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    pub max_turns: u32,
    /// Seconds per turn
    pub turn_time_limit: u32,
    pub hint_allowance: u32,
    pub score_multiplier: f64,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn settings(&self) -> DifficultySettings {
        match self {
            Difficulty::Easy => DifficultySettings {
                max_turns: 5,
                turn_time_limit: 30,
                hint_allowance: 5,
                score_multiplier: 1.0,
            },
            Difficulty::Medium => DifficultySettings {
                max_turns: 10,
                turn_time_limit: 20,
                hint_allowance: 3,
                score_multiplier: 1.5,
            },
            Difficulty::Hard => DifficultySettings {
                max_turns: 15,
                turn_time_limit: 15,
                hint_allowance: 1,
                score_multiplier: 2.0,
            },
        }
    }

    /// Longest session any difficulty can run
    pub fn max_turns_across_difficulties() -> u32 {
        Self::ALL
            .iter()
            .map(|d| d.settings().max_turns)
            .max()
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Point penalties (positive values, subtracted from the score)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalties {
    pub give_up: u32,
    pub time_up: u32,
    pub wrong_guess: u32,
    pub hint: u32,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            give_up: 3,
            time_up: 2,
            wrong_guess: 2,
            hint: 1,
        }
    }
}

impl Penalties {
    /// Defaults overridden by whatever the `[game]` section sets
    pub fn from_config(config: &GameConfig) -> Self {
        let defaults = Self::default();
        Self {
            give_up: config.give_up_penalty.unwrap_or(defaults.give_up),
            time_up: config.time_up_penalty.unwrap_or(defaults.time_up),
            wrong_guess: config.wrong_guess_penalty.unwrap_or(defaults.wrong_guess),
            hint: config.hint_penalty.unwrap_or(defaults.hint),
        }
    }
}
