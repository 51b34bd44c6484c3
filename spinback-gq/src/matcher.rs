//! Guess matching and turn scoring
//!
//! Guesses and targets are normalized (lowercase, punctuation stripped,
//! whitespace collapsed) and compared against the track title, the primary
//! artist, and the combined "title artist" string.

use crate::difficulty::{DifficultySettings, Penalties};
use spinback_common::events::GuessOutcome;
use spinback_common::Track;

/// Similarity for containment in either direction
pub const CONTAINMENT_SCORE: f64 = 0.8;

/// At or above: full credit
pub const CORRECT_THRESHOLD: f64 = 0.8;

/// At or above: partial credit
pub const PARTIAL_THRESHOLD: f64 = 0.6;

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two normalized strings in `[0, 1]`
///
/// Exact match scores 1.0, containment either way 0.8. Otherwise the score is
/// the number of guess tokens that contain or are contained in some target
/// token, divided by the larger of the two token counts.
pub fn similarity(guess: &str, target: &str) -> f64 {
    if guess.is_empty() || target.is_empty() {
        return 0.0;
    }
    if guess == target {
        return 1.0;
    }
    if target.contains(guess) || guess.contains(target) {
        return CONTAINMENT_SCORE;
    }

    let guess_tokens: Vec<&str> = guess.split_whitespace().collect();
    let target_tokens: Vec<&str> = target.split_whitespace().collect();

    let matched = guess_tokens
        .iter()
        .filter(|g| {
            target_tokens
                .iter()
                .any(|t| t.contains(**g) || g.contains(*t))
        })
        .count();

    matched as f64 / guess_tokens.len().max(target_tokens.len()) as f64
}

/// Score a raw guess against a track
pub fn score_guess(guess: &str, track: &Track) -> GuessScores {
    let guess = normalize(guess);
    let title = normalize(&track.name);
    let artist = normalize(track.primary_artist_name());
    let combined = normalize(&format!("{} {}", track.name, track.primary_artist_name()));

    GuessScores {
        title: similarity(&guess, &title),
        artist: similarity(&guess, &artist),
        combined: similarity(&guess, &combined),
        title_blank: title.is_empty(),
    }
}

/// Similarity of a guess against each target
///
/// `title_blank` is set when the title normalizes to nothing (punctuation or
/// emoji only), so the title score carries no signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuessScores {
    pub title: f64,
    pub artist: f64,
    pub combined: f64,
    pub title_blank: bool,
}

impl GuessScores {
    fn best(&self) -> f64 {
        self.title.max(self.artist).max(self.combined)
    }
}

/// Classify a scored guess
///
/// The combined score only earns full credit when the title itself matched at
/// least partially, or the title has no comparable text; otherwise an
/// artist-only guess would ride on containment in "title artist".
pub fn classify(scores: &GuessScores) -> GuessOutcome {
    let title_matched = scores.title_blank || scores.title >= PARTIAL_THRESHOLD;
    let combined_hit = scores.combined >= CORRECT_THRESHOLD && title_matched;
    let both_hit = scores.title >= CORRECT_THRESHOLD && scores.artist >= CORRECT_THRESHOLD;

    if combined_hit || both_hit {
        GuessOutcome::Correct
    } else if scores.best() >= PARTIAL_THRESHOLD {
        GuessOutcome::Partial
    } else {
        GuessOutcome::Wrong
    }
}

/// Signed score change for a resolved guess
///
/// `streak` is the streak before this guess. Correct and partial guesses made
/// with more than 70% of the turn left earn a speed bonus.
pub fn score_delta(
    outcome: GuessOutcome,
    settings: &DifficultySettings,
    penalties: &Penalties,
    streak: u32,
    remaining_seconds: u32,
) -> i64 {
    let m = settings.score_multiplier;

    let base = match outcome {
        GuessOutcome::Correct => (10.0 * m * (1.0 + streak as f64 * 0.1)).round() as i64,
        GuessOutcome::Partial => (5.0 * m).round() as i64,
        GuessOutcome::Wrong => return -(penalties.wrong_guess as i64),
    };

    // remaining > 0.7 * limit, in integers
    let fast = remaining_seconds as u64 * 10 > settings.turn_time_limit as u64 * 7;
    if fast {
        base + (3.0 * m).round() as i64
    } else {
        base
    }
}
