//! Guess-the-song session state machine
//!
//! NotStarted → InProgress → Revealing → InProgress (next turn) → … → Ended
//!
//! [`reduce`] is a pure transition function: it takes the current immutable
//! snapshot plus an event and returns the next snapshot together with the
//! side effects the driver must perform (start/cancel the countdown, persist
//! the final score, surface a rejection). Every path out of `InProgress`
//! emits [`Effect::CancelCountdown`] before any other effect.
//!
//! Countdown ticks carry the epoch of the countdown that produced them; a tick
//! whose epoch is not the session's current one is ignored, so a stale timer
//! can never touch a later turn.

use crate::difficulty::{Difficulty, DifficultySettings, Penalties};
use crate::matcher;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use spinback_common::events::{GuessOutcome, SessionPhase, TurnResolution};
use spinback_common::time::release_year;
use spinback_common::Track;

/// Playable tracks required before a session may start
pub const MIN_PLAYABLE_TRACKS: usize = 3;

/// Session snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSession {
    pub difficulty: Difficulty,
    pub settings: DifficultySettings,
    pub penalties: Penalties,
    pub phase: SessionPhase,
    /// 1-based; 0 before the first turn
    pub turn: u32,
    pub remaining_seconds: u32,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub hints_remaining: u32,
    /// Hint already revealed this turn
    pub hint_shown: bool,
    /// Track ids in play order, each at most once
    pub played: Vec<String>,
    pub current_track: Option<Track>,
    pub last_outcome: Option<GuessOutcome>,
    /// Signed change requested by the last resolution or hint
    pub last_delta: i64,
    pub turns_completed: u32,
    /// Identifies the live countdown
    pub countdown_epoch: u64,
}

impl GameSession {
    /// Fresh, not-started session for `difficulty`
    pub fn new(difficulty: Difficulty, penalties: Penalties) -> Self {
        let settings = difficulty.settings();
        Self {
            difficulty,
            settings,
            penalties,
            phase: SessionPhase::NotStarted,
            turn: 0,
            remaining_seconds: settings.turn_time_limit,
            score: 0,
            streak: 0,
            best_streak: 0,
            hints_remaining: settings.hint_allowance,
            hint_shown: false,
            played: Vec::new(),
            current_track: None,
            last_outcome: None,
            last_delta: 0,
            turns_completed: 0,
            countdown_epoch: 0,
        }
    }

    /// Same difficulty and penalties, counters reset, epoch carried forward
    fn reset(&self) -> Self {
        Self {
            countdown_epoch: self.countdown_epoch,
            ..Self::new(self.difficulty, self.penalties)
        }
    }

    pub fn has_played(&self, track_id: &str) -> bool {
        self.played.iter().any(|id| id == track_id)
    }

    /// Album name and release year once a hint is revealed this turn
    pub fn hint(&self) -> Option<(String, Option<u16>)> {
        if !self.hint_shown {
            return None;
        }
        let track = self.current_track.as_ref()?;
        let year = track.album.release_date.as_deref().and_then(release_year);
        Some((track.album.name.clone(), year))
    }

    fn apply_delta(&mut self, delta: i64) {
        self.last_delta = delta;
        self.score = (self.score as i64 + delta).max(0) as u32;
    }

    fn final_score(&self) -> FinalScore {
        FinalScore {
            difficulty: self.difficulty,
            score: self.score,
            best_streak: self.best_streak,
            turns_completed: self.turns_completed,
        }
    }
}

/// Input to [`reduce`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ConfigureDifficulty(Difficulty),
    Start,
    /// One second elapsed on the countdown with this epoch
    Tick { epoch: u64 },
    SubmitGuess(String),
    UseHint,
    GiveUp,
    Advance,
    Restart,
}

/// Precondition failure surfaced to the player; the session is unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotEnoughPlayableTracks { available: usize, required: usize },
    AlreadyStarted,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotEnoughPlayableTracks {
                available,
                required,
            } => write!(
                f,
                "Need at least {} tracks with previews to start, only {} available yet",
                required, available
            ),
            Rejection::AlreadyStarted => {
                write!(f, "A game is already running; restart it first")
            }
        }
    }
}

/// Result handed to score persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalScore {
    pub difficulty: Difficulty,
    pub score: u32,
    pub best_streak: u32,
    pub turns_completed: u32,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start a one-second countdown tagged with `epoch`
    StartCountdown { epoch: u64, seconds: u32 },
    /// Cancel whatever countdown is live
    CancelCountdown,
    TurnStarted,
    CountdownTicked,
    TurnResolved {
        outcome: GuessOutcome,
        resolution: TurnResolution,
        delta: i64,
    },
    HintRevealed {
        album_name: String,
        release_year: Option<u16>,
    },
    GameEnded { exhausted: bool },
    /// Session went back to `NotStarted`
    SessionReset,
    PersistScore(FinalScore),
    Rejected(Rejection),
}

/// Next snapshot plus effects, in the order they must be applied
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: GameSession,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(session: &GameSession) -> Self {
        Self {
            session: session.clone(),
            effects: Vec::new(),
        }
    }

    fn rejected(session: &GameSession, rejection: Rejection) -> Self {
        Self {
            session: session.clone(),
            effects: vec![Effect::Rejected(rejection)],
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.effects.iter().find_map(|e| match e {
            Effect::Rejected(r) => Some(r),
            _ => None,
        })
    }
}

/// Count of pool tracks carrying a preview
pub fn playable_count(pool: &[Track]) -> usize {
    pool.iter().filter(|t| t.has_preview()).count()
}

/// Advance the session by one event
pub fn reduce<R: Rng + ?Sized>(
    session: &GameSession,
    event: SessionEvent,
    pool: &[Track],
    rng: &mut R,
) -> Transition {
    match event {
        SessionEvent::ConfigureDifficulty(difficulty) => {
            if session.phase != SessionPhase::NotStarted {
                return Transition::rejected(session, Rejection::AlreadyStarted);
            }
            let next = GameSession {
                countdown_epoch: session.countdown_epoch,
                ..GameSession::new(difficulty, session.penalties)
            };
            Transition {
                session: next,
                effects: Vec::new(),
            }
        }

        SessionEvent::Start => start(session, pool, rng),

        SessionEvent::Tick { epoch } => {
            if session.phase != SessionPhase::InProgress || epoch != session.countdown_epoch {
                return Transition::unchanged(session);
            }
            let mut next = session.clone();
            let mut effects = Vec::new();
            next.remaining_seconds = next.remaining_seconds.saturating_sub(1);
            effects.push(Effect::CountdownTicked);
            if next.remaining_seconds == 0 {
                let delta = -(next.penalties.time_up as i64);
                resolve_turn(
                    &mut next,
                    GuessOutcome::Wrong,
                    TurnResolution::TimeUp,
                    delta,
                    &mut effects,
                );
            }
            Transition {
                session: next,
                effects,
            }
        }

        SessionEvent::SubmitGuess(text) => {
            if session.phase != SessionPhase::InProgress || text.trim().is_empty() {
                return Transition::unchanged(session);
            }
            let Some(track) = session.current_track.as_ref() else {
                return Transition::unchanged(session);
            };

            let scores = matcher::score_guess(&text, track);
            let outcome = matcher::classify(&scores);
            let delta = matcher::score_delta(
                outcome,
                &session.settings,
                &session.penalties,
                session.streak,
                session.remaining_seconds,
            );
            tracing::debug!(
                title = scores.title,
                artist = scores.artist,
                combined = scores.combined,
                outcome = %outcome,
                "Guess scored"
            );

            let mut next = session.clone();
            let mut effects = Vec::new();
            resolve_turn(
                &mut next,
                outcome,
                TurnResolution::Guessed,
                delta,
                &mut effects,
            );
            Transition {
                session: next,
                effects,
            }
        }

        SessionEvent::UseHint => {
            if session.phase != SessionPhase::InProgress
                || session.hints_remaining == 0
                || session.hint_shown
                || session.current_track.is_none()
            {
                return Transition::unchanged(session);
            }
            let mut next = session.clone();
            next.hints_remaining -= 1;
            next.hint_shown = true;
            next.apply_delta(-(next.penalties.hint as i64));

            let (album_name, release_year) = next.hint().unwrap_or_default();
            Transition {
                session: next,
                effects: vec![Effect::HintRevealed {
                    album_name,
                    release_year,
                }],
            }
        }

        SessionEvent::GiveUp => {
            if session.phase != SessionPhase::InProgress {
                return Transition::unchanged(session);
            }
            let mut next = session.clone();
            let mut effects = Vec::new();
            let delta = -(next.penalties.give_up as i64);
            resolve_turn(
                &mut next,
                GuessOutcome::Wrong,
                TurnResolution::GaveUp,
                delta,
                &mut effects,
            );
            Transition {
                session: next,
                effects,
            }
        }

        SessionEvent::Advance => {
            if session.phase != SessionPhase::Revealing {
                return Transition::unchanged(session);
            }
            let mut next = session.clone();
            let mut effects = Vec::new();
            if next.turn >= next.settings.max_turns {
                end_game(&mut next, false, &mut effects);
            } else {
                match pick_track(&next, pool, rng) {
                    Some(track) => {
                        next.turn += 1;
                        begin_turn(&mut next, track, &mut effects);
                    }
                    None => end_game(&mut next, true, &mut effects),
                }
            }
            Transition {
                session: next,
                effects,
            }
        }

        SessionEvent::Restart => Transition {
            session: session.reset(),
            effects: vec![Effect::CancelCountdown, Effect::SessionReset],
        },
    }
}

fn start<R: Rng + ?Sized>(session: &GameSession, pool: &[Track], rng: &mut R) -> Transition {
    if matches!(
        session.phase,
        SessionPhase::InProgress | SessionPhase::Revealing
    ) {
        return Transition::rejected(session, Rejection::AlreadyStarted);
    }

    let available = playable_count(pool);
    if available < MIN_PLAYABLE_TRACKS {
        return Transition::rejected(
            session,
            Rejection::NotEnoughPlayableTracks {
                available,
                required: MIN_PLAYABLE_TRACKS,
            },
        );
    }

    let mut next = session.reset();
    let mut effects = Vec::new();
    match pick_track(&next, pool, rng) {
        Some(track) => {
            next.turn = 1;
            begin_turn(&mut next, track, &mut effects);
        }
        None => end_game(&mut next, true, &mut effects),
    }
    Transition {
        session: next,
        effects,
    }
}

/// Uniformly random playable track not yet played this session
fn pick_track<R: Rng + ?Sized>(session: &GameSession, pool: &[Track], rng: &mut R) -> Option<Track> {
    let candidates: Vec<&Track> = pool
        .iter()
        .filter(|t| t.has_preview() && !session.has_played(&t.id))
        .collect();
    candidates.choose(rng).map(|t| (*t).clone())
}

fn begin_turn(session: &mut GameSession, track: Track, effects: &mut Vec<Effect>) {
    session.played.push(track.id.clone());
    session.current_track = Some(track);
    session.phase = SessionPhase::InProgress;
    session.remaining_seconds = session.settings.turn_time_limit;
    session.hint_shown = false;
    session.last_outcome = None;
    session.last_delta = 0;
    session.countdown_epoch += 1;

    effects.push(Effect::StartCountdown {
        epoch: session.countdown_epoch,
        seconds: session.settings.turn_time_limit,
    });
    effects.push(Effect::TurnStarted);
}

fn resolve_turn(
    session: &mut GameSession,
    outcome: GuessOutcome,
    resolution: TurnResolution,
    delta: i64,
    effects: &mut Vec<Effect>,
) {
    effects.push(Effect::CancelCountdown);

    session.apply_delta(delta);
    if outcome.extends_streak() {
        session.streak += 1;
        session.best_streak = session.best_streak.max(session.streak);
    } else {
        session.streak = 0;
    }
    session.last_outcome = Some(outcome);
    session.turns_completed += 1;
    session.phase = SessionPhase::Revealing;

    effects.push(Effect::TurnResolved {
        outcome,
        resolution,
        delta,
    });
}

fn end_game(session: &mut GameSession, exhausted: bool, effects: &mut Vec<Effect>) {
    effects.push(Effect::CancelCountdown);
    session.phase = SessionPhase::Ended;
    effects.push(Effect::GameEnded { exhausted });
    effects.push(Effect::PersistScore(session.final_score()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use spinback_common::models::{Album, ArtistRef};
    use std::collections::HashMap;

    fn track(id: &str, title: &str, artist: &str, preview: bool) -> Track {
        Track {
            id: id.into(),
            name: title.into(),
            artists: vec![ArtistRef {
                id: format!("a-{}", id),
                name: artist.into(),
            }],
            album: Album {
                name: format!("{} LP", title),
                release_date: Some("1999-09-09".into()),
                images: Vec::new(),
            },
            popularity: 50,
            preview_url: preview.then(|| format!("http://preview/{}", id)),
            external_urls: HashMap::new(),
        }
    }

    fn pool(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| track(&format!("t{}", i), &format!("Song{}", i), &format!("Band{}", i), true))
            .collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn apply(s: &GameSession, e: SessionEvent, pool: &[Track], rng: &mut StdRng) -> GameSession {
        reduce(s, e, pool, rng).session
    }

    fn started(difficulty: Difficulty, pool: &[Track], rng: &mut StdRng) -> GameSession {
        let s = GameSession::new(difficulty, Penalties::default());
        apply(&s, SessionEvent::Start, pool, rng)
    }

    #[test]
    fn test_start_rejected_below_three_playable() {
        let mut rng = rng();
        let mut p = pool(2);
        p.push(track("x", "X", "Y", false));
        let s = GameSession::new(Difficulty::Easy, Penalties::default());

        let t = reduce(&s, SessionEvent::Start, &p, &mut rng);

        assert_eq!(
            t.rejection(),
            Some(&Rejection::NotEnoughPlayableTracks {
                available: 2,
                required: 3
            })
        );
        assert_eq!(t.session, s);
    }

    #[test]
    fn test_start_accepted_at_exactly_three() {
        let mut rng = rng();
        let t = reduce(
            &GameSession::new(Difficulty::Easy, Penalties::default()),
            SessionEvent::Start,
            &pool(3),
            &mut rng,
        );
        assert!(t.rejection().is_none());
        assert_eq!(t.session.phase, SessionPhase::InProgress);
        assert_eq!(t.session.turn, 1);
        assert_eq!(t.session.played.len(), 1);
        assert_eq!(t.session.remaining_seconds, 30);
        assert!(t
            .effects
            .contains(&Effect::StartCountdown { epoch: 1, seconds: 30 }));
    }

    #[test]
    fn test_start_never_picks_track_without_preview() {
        let mut p = pool(3);
        p.push(track("np", "NoPreview", "Band", false));
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let s = started(Difficulty::Easy, &p, &mut rng);
            assert_ne!(s.current_track.unwrap().id, "np");
        }
    }

    #[test]
    fn test_configure_only_before_start() {
        let mut rng = rng();
        let s = GameSession::new(Difficulty::Easy, Penalties::default());
        let s = apply(&s, SessionEvent::ConfigureDifficulty(Difficulty::Hard), &[], &mut rng);
        assert_eq!(s.settings.max_turns, 15);
        assert_eq!(s.hints_remaining, 1);
        assert_eq!(s.remaining_seconds, 15);

        let running = apply(&s, SessionEvent::Start, &pool(5), &mut rng);
        let t = reduce(
            &running,
            SessionEvent::ConfigureDifficulty(Difficulty::Easy),
            &pool(5),
            &mut rng,
        );
        assert_eq!(t.rejection(), Some(&Rejection::AlreadyStarted));
        assert_eq!(t.session.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_correct_guess_scores_and_reveals() {
        let mut rng = rng();
        let p = pool(3);
        let s = started(Difficulty::Easy, &p, &mut rng);
        let current = s.current_track.clone().unwrap();
        let guess = format!("{} {}", current.name, current.primary_artist_name());

        let t = reduce(&s, SessionEvent::SubmitGuess(guess), &p, &mut rng);

        assert_eq!(t.session.phase, SessionPhase::Revealing);
        assert_eq!(t.session.last_outcome, Some(GuessOutcome::Correct));
        // full time left: 10 + speed bonus 3
        assert_eq!(t.session.score, 13);
        assert_eq!(t.session.streak, 1);
        assert_eq!(t.effects[0], Effect::CancelCountdown);
    }

    #[test]
    fn test_empty_guess_is_silent_noop() {
        let mut rng = rng();
        let p = pool(3);
        let s = started(Difficulty::Easy, &p, &mut rng);
        let t = reduce(&s, SessionEvent::SubmitGuess("   ".into()), &p, &mut rng);
        assert_eq!(t.session, s);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_guess_ignored_while_revealing() {
        let mut rng = rng();
        let p = pool(3);
        let s = started(Difficulty::Easy, &p, &mut rng);
        let s = apply(&s, SessionEvent::GiveUp, &p, &mut rng);
        let t = reduce(&s, SessionEvent::SubmitGuess("anything".into()), &p, &mut rng);
        assert_eq!(t.session, s);
    }

    #[test]
    fn test_wrong_guess_floors_at_zero_and_resets_streak() {
        let mut rng = rng();
        let p = pool(3);
        let s = started(Difficulty::Easy, &p, &mut rng);
        let s = apply(&s, SessionEvent::SubmitGuess("zzzz qqqq".into()), &p, &mut rng);
        assert_eq!(s.last_outcome, Some(GuessOutcome::Wrong));
        assert_eq!(s.score, 0);
        assert_eq!(s.streak, 0);
        assert_eq!(s.last_delta, -2);
    }

    #[test]
    fn test_hint_once_per_turn() {
        let mut rng = rng();
        let p = pool(3);
        let mut s = started(Difficulty::Medium, &p, &mut rng);
        s.score = 5;

        let t = reduce(&s, SessionEvent::UseHint, &p, &mut rng);
        assert_eq!(t.session.hints_remaining, 2);
        assert_eq!(t.session.score, 4);
        let album = s.current_track.as_ref().unwrap().album.name.clone();
        assert_eq!(
            t.effects,
            vec![Effect::HintRevealed {
                album_name: album,
                release_year: Some(1999)
            }]
        );

        let again = reduce(&t.session, SessionEvent::UseHint, &p, &mut rng);
        assert_eq!(again.session, t.session);
        assert!(again.effects.is_empty());
    }

    #[test]
    fn test_hint_unavailable_when_allowance_spent() {
        let mut rng = rng();
        let p = pool(3);
        let mut s = started(Difficulty::Hard, &p, &mut rng);
        s.hints_remaining = 0;
        let t = reduce(&s, SessionEvent::UseHint, &p, &mut rng);
        assert_eq!(t.session, s);
    }

    #[test]
    fn test_hint_penalty_respects_floor() {
        let mut rng = rng();
        let p = pool(3);
        let s = started(Difficulty::Easy, &p, &mut rng);
        let s = apply(&s, SessionEvent::UseHint, &p, &mut rng);
        assert_eq!(s.score, 0);
        assert!(s.hint_shown);
    }

    #[test]
    fn test_give_up_penalty_and_streak_reset() {
        let mut rng = rng();
        let p = pool(5);
        let mut s = started(Difficulty::Easy, &p, &mut rng);
        s.score = 10;
        s.streak = 4;

        let t = reduce(&s, SessionEvent::GiveUp, &p, &mut rng);

        assert_eq!(t.session.score, 7);
        assert_eq!(t.session.streak, 0);
        assert_eq!(t.session.phase, SessionPhase::Revealing);
        assert_eq!(t.session.last_outcome, Some(GuessOutcome::Wrong));
        assert_eq!(t.effects[0], Effect::CancelCountdown);
        assert!(t.effects.contains(&Effect::TurnResolved {
            outcome: GuessOutcome::Wrong,
            resolution: TurnResolution::GaveUp,
            delta: -3
        }));
    }

    #[test]
    fn test_easy_five_give_ups_ends_at_zero() {
        let mut rng = rng();
        let p = pool(5);
        let mut s = started(Difficulty::Easy, &p, &mut rng);
        let mut persisted = Vec::new();

        for turn in 1..=5 {
            assert_eq!(s.turn, turn);
            s = apply(&s, SessionEvent::GiveUp, &p, &mut rng);
            let t = reduce(&s, SessionEvent::Advance, &p, &mut rng);
            persisted.extend(t.effects.iter().filter_map(|e| match e {
                Effect::PersistScore(f) => Some(*f),
                _ => None,
            }));
            s = t.session;
        }

        assert_eq!(s.phase, SessionPhase::Ended);
        assert_eq!(s.score, 0);
        assert_eq!(s.turn, 5);
        assert_eq!(
            persisted,
            vec![FinalScore {
                difficulty: Difficulty::Easy,
                score: 0,
                best_streak: 0,
                turns_completed: 5
            }]
        );
    }

    #[test]
    fn test_played_tracks_never_repeat() {
        let mut rng = rng();
        let p = pool(20);
        let mut s = started(Difficulty::Hard, &p, &mut rng);
        while s.phase != SessionPhase::Ended {
            s = apply(&s, SessionEvent::GiveUp, &p, &mut rng);
            s = apply(&s, SessionEvent::Advance, &p, &mut rng);
        }
        let mut ids = s.played.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), s.played.len());
        assert_eq!(s.played.len(), 15);
        assert!(s.turn <= s.settings.max_turns);
    }

    #[test]
    fn test_exhausted_pool_ends_game() {
        let mut rng = rng();
        let p = pool(3);
        let mut s = started(Difficulty::Medium, &p, &mut rng);
        for _ in 0..2 {
            s = apply(&s, SessionEvent::GiveUp, &p, &mut rng);
            s = apply(&s, SessionEvent::Advance, &p, &mut rng);
            assert_eq!(s.phase, SessionPhase::InProgress);
        }
        s = apply(&s, SessionEvent::GiveUp, &p, &mut rng);
        let t = reduce(&s, SessionEvent::Advance, &p, &mut rng);

        assert_eq!(t.session.phase, SessionPhase::Ended);
        assert_eq!(t.session.turn, 3);
        assert!(t.effects.contains(&Effect::GameEnded { exhausted: true }));
    }

    #[test]
    fn test_countdown_expiry_applies_exactly_once() {
        let mut rng = rng();
        let p = pool(3);
        let mut s = started(Difficulty::Hard, &p, &mut rng);
        s.score = 10;
        s.streak = 2;
        let epoch = s.countdown_epoch;

        let mut resolutions = 0;
        for _ in 0..s.settings.turn_time_limit {
            let t = reduce(&s, SessionEvent::Tick { epoch }, &p, &mut rng);
            resolutions += t
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::TurnResolved { .. }))
                .count();
            s = t.session;
        }
        assert_eq!(s.phase, SessionPhase::Revealing);
        assert_eq!(s.last_outcome, Some(GuessOutcome::Wrong));
        assert_eq!(s.score, 8);
        assert_eq!(s.streak, 0);
        assert_eq!(resolutions, 1);

        // A late duplicate tick changes nothing
        let t = reduce(&s, SessionEvent::Tick { epoch }, &p, &mut rng);
        assert_eq!(t.session, s);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_stale_epoch_tick_ignored_on_next_turn() {
        let mut rng = rng();
        let p = pool(5);
        let s = started(Difficulty::Easy, &p, &mut rng);
        let old_epoch = s.countdown_epoch;
        let s = apply(&s, SessionEvent::GiveUp, &p, &mut rng);
        let s = apply(&s, SessionEvent::Advance, &p, &mut rng);
        assert_eq!(s.countdown_epoch, old_epoch + 1);

        let t = reduce(&s, SessionEvent::Tick { epoch: old_epoch }, &p, &mut rng);
        assert_eq!(t.session.remaining_seconds, 30);
    }

    #[test]
    fn test_restart_resets_to_difficulty_defaults() {
        let mut rng = rng();
        let p = pool(5);
        let mut s = started(Difficulty::Medium, &p, &mut rng);
        s.score = 42;
        s = apply(&s, SessionEvent::UseHint, &p, &mut rng);

        let t = reduce(&s, SessionEvent::Restart, &p, &mut rng);

        assert_eq!(t.effects, vec![Effect::CancelCountdown, Effect::SessionReset]);
        assert_eq!(t.session.phase, SessionPhase::NotStarted);
        assert_eq!(t.session.score, 0);
        assert_eq!(t.session.hints_remaining, 3);
        assert!(t.session.played.is_empty());
        assert_eq!(t.session.difficulty, Difficulty::Medium);
        assert_eq!(t.session.countdown_epoch, s.countdown_epoch);
    }

    #[test]
    fn test_score_never_negative_under_mixed_actions() {
        let p = pool(20);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut s = started(Difficulty::Hard, &p, &mut rng);
            let mut step = 0u64;
            while s.phase != SessionPhase::Ended {
                let event = match (step + seed) % 5 {
                    0 => SessionEvent::UseHint,
                    1 => SessionEvent::SubmitGuess("nothing like it".into()),
                    2 => SessionEvent::Tick {
                        epoch: s.countdown_epoch,
                    },
                    3 => SessionEvent::GiveUp,
                    _ => SessionEvent::Advance,
                };
                s = apply(&s, event, &p, &mut rng);
                if s.phase == SessionPhase::Revealing && step % 3 == 0 {
                    s = apply(&s, SessionEvent::Advance, &p, &mut rng);
                }
                step += 1;
                assert!(s.turn <= s.settings.max_turns);
            }
        }
    }
}
