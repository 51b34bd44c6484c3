//! Game engine driver
//!
//! Owns the live [`GameSession`] and performs the effects [`reduce`] asks for:
//! countdown start/cancel, event broadcast, and score persistence. All events
//! (player actions and countdown ticks) go through one lock, so transitions
//! are applied strictly one at a time.

use crate::countdown::Countdown;
use crate::difficulty::{Difficulty, Penalties};
use crate::pool::TrackPool;
use crate::services::score_store::{ScoreMetadata, ScoreStore, GUESS_QUIZ_VARIANT};
use crate::session::{reduce, Effect, FinalScore, GameSession, Rejection, SessionEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use spinback_common::events::{EventBus, SpinbackEvent};
use spinback_common::time;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

const TICK_CHANNEL_CAPACITY: usize = 16;

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub difficulty: Difficulty,
    pub penalties: Penalties,
    pub player_name: String,
    /// Fixed RNG seed for reproducible track order
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            penalties: Penalties::default(),
            player_name: "Player".to_string(),
            seed: None,
        }
    }
}

struct EngineState {
    session: GameSession,
    countdown: Option<Countdown>,
    rng: StdRng,
    /// Score saves not yet awaited; never aborted
    pending_saves: Vec<JoinHandle<()>>,
}

struct EngineInner {
    state: Mutex<EngineState>,
    pool: TrackPool,
    store: Arc<dyn ScoreStore>,
    player_name: String,
    events: EventBus,
    tick_tx: mpsc::Sender<SessionEvent>,
}

/// Guess-the-song game driver
pub struct GameEngine {
    inner: Arc<EngineInner>,
    tick_pump: JoinHandle<()>,
}

impl GameEngine {
    /// Create the engine; must be called inside a tokio runtime
    pub fn new(
        pool: TrackPool,
        store: Arc<dyn ScoreStore>,
        events: EventBus,
        options: EngineOptions,
    ) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (tick_tx, mut tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);

        let inner = Arc::new(EngineInner {
            state: Mutex::new(EngineState {
                session: GameSession::new(options.difficulty, options.penalties),
                countdown: None,
                rng,
                pending_saves: Vec::new(),
            }),
            pool,
            store,
            player_name: options.player_name,
            events,
            tick_tx,
        });

        let pump_inner = Arc::clone(&inner);
        let tick_pump = tokio::spawn(async move {
            while let Some(tick) = tick_rx.recv().await {
                pump_inner.dispatch(tick).await;
            }
        });

        Self { inner, tick_pump }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn pool(&self) -> &TrackPool {
        &self.inner.pool
    }

    pub fn player_name(&self) -> &str {
        &self.inner.player_name
    }

    /// Current session snapshot
    pub async fn snapshot(&self) -> GameSession {
        self.inner.state.lock().await.session.clone()
    }

    pub async fn configure_difficulty(&self, level: Difficulty) -> Result<GameSession, Rejection> {
        self.inner
            .dispatch(SessionEvent::ConfigureDifficulty(level))
            .await
    }

    pub async fn start(&self) -> Result<GameSession, Rejection> {
        self.inner.dispatch(SessionEvent::Start).await
    }

    pub async fn submit_guess(&self, text: &str) -> Result<GameSession, Rejection> {
        self.inner
            .dispatch(SessionEvent::SubmitGuess(text.to_string()))
            .await
    }

    pub async fn use_hint(&self) -> Result<GameSession, Rejection> {
        self.inner.dispatch(SessionEvent::UseHint).await
    }

    pub async fn give_up(&self) -> Result<GameSession, Rejection> {
        self.inner.dispatch(SessionEvent::GiveUp).await
    }

    pub async fn advance(&self) -> Result<GameSession, Rejection> {
        self.inner.dispatch(SessionEvent::Advance).await
    }

    pub async fn restart(&self) -> Result<GameSession, Rejection> {
        self.inner.dispatch(SessionEvent::Restart).await
    }

    /// Wait for every in-flight score save
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut self.inner.state.lock().await.pending_saves);
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Score save task failed");
            }
        }
    }

    /// Stop the countdown, close the pool and finish pending saves
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if let Some(countdown) = state.countdown.take() {
                countdown.cancel();
            }
        }
        self.inner.pool.close().await;
        self.flush().await;
        self.tick_pump.abort();
        tracing::info!("Game engine shut down");
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        self.tick_pump.abort();
    }
}

impl EngineInner {
    async fn dispatch(&self, event: SessionEvent) -> Result<GameSession, Rejection> {
        let pool = self.pool.snapshot().await;
        let mut state = self.state.lock().await;

        let EngineState {
            session, rng, ..
        } = &mut *state;
        let transition = reduce(session, event, &pool, rng);

        let mut outgoing = Vec::new();
        let mut rejection = None;
        let mut persist = None;

        for effect in transition.effects {
            match effect {
                Effect::CancelCountdown => {
                    if let Some(countdown) = state.countdown.take() {
                        countdown.cancel();
                    }
                }
                Effect::StartCountdown { epoch, seconds } => {
                    if let Some(previous) = state.countdown.take() {
                        previous.cancel();
                    }
                    state.countdown = Some(Countdown::start(epoch, seconds, self.tick_tx.clone()));
                }
                Effect::Rejected(r) => {
                    tracing::info!(reason = %r, "Action rejected");
                    rejection = Some(r);
                }
                Effect::PersistScore(final_score) => persist = Some(final_score),
                other => outgoing.push(other),
            }
        }

        state.session = transition.session;
        let snapshot = state.session.clone();

        if let Some(final_score) = persist {
            state.pending_saves.retain(|handle| !handle.is_finished());
            state.pending_saves.push(self.spawn_save(final_score));
        }
        drop(state);

        for effect in outgoing {
            if let Some(event) = Self::to_event(&effect, &snapshot) {
                self.events.emit_lossy(event);
            }
        }

        match rejection {
            Some(r) => Err(r),
            None => Ok(snapshot),
        }
    }

    fn spawn_save(&self, final_score: FinalScore) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let player_name = self.player_name.clone();

        tokio::spawn(async move {
            let metadata = ScoreMetadata {
                difficulty: final_score.difficulty.as_str().to_string(),
                best_streak: final_score.best_streak,
                turns_completed: final_score.turns_completed,
            };

            let result = store
                .save_score(&player_name, final_score.score, GUESS_QUIZ_VARIANT, &metadata)
                .await;

            let event = match result {
                Ok(saved) if saved.success => SpinbackEvent::ScoreSaved {
                    player_name,
                    score: final_score.score,
                },
                Ok(saved) => {
                    tracing::warn!(message = %saved.message, "Score store declined save");
                    SpinbackEvent::ScoreSaveFailed {
                        player_name,
                        score: final_score.score,
                        error: saved.message,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Score save failed");
                    SpinbackEvent::ScoreSaveFailed {
                        player_name,
                        score: final_score.score,
                        error: e.to_string(),
                    }
                }
            };
            events.emit_lossy(event);
        })
    }

    fn to_event(effect: &Effect, session: &GameSession) -> Option<SpinbackEvent> {
        let track_id = session
            .current_track
            .as_ref()
            .map(|t| t.id.clone())
            .unwrap_or_default();

        match effect {
            Effect::TurnStarted => {
                tracing::info!(turn = session.turn, track_id = %track_id, "Turn started");
                Some(SpinbackEvent::TurnStarted {
                    turn: session.turn,
                    max_turns: session.settings.max_turns,
                    track_id,
                    preview_url: session
                        .current_track
                        .as_ref()
                        .and_then(|t| t.preview_url.clone()),
                    seconds: session.remaining_seconds,
                    timestamp: time::now(),
                })
            }
            Effect::CountdownTicked => Some(SpinbackEvent::CountdownTick {
                turn: session.turn,
                remaining_seconds: session.remaining_seconds,
            }),
            Effect::TurnResolved {
                outcome,
                resolution,
                delta,
            } => {
                tracing::info!(
                    turn = session.turn,
                    outcome = %outcome,
                    delta,
                    score = session.score,
                    "Turn resolved"
                );
                Some(SpinbackEvent::TurnResolved {
                    turn: session.turn,
                    track_id,
                    outcome: *outcome,
                    resolution: *resolution,
                    score_delta: *delta,
                    score: session.score,
                    streak: session.streak,
                    timestamp: time::now(),
                })
            }
            Effect::HintRevealed {
                album_name,
                release_year,
            } => Some(SpinbackEvent::HintRevealed {
                turn: session.turn,
                album_name: album_name.clone(),
                release_year: *release_year,
                hints_remaining: session.hints_remaining,
            }),
            Effect::SessionReset => {
                tracing::info!("Session reset");
                Some(SpinbackEvent::SessionReset {
                    timestamp: time::now(),
                })
            }
            Effect::GameEnded { exhausted } => {
                tracing::info!(
                    score = session.score,
                    turns = session.turns_completed,
                    exhausted,
                    "Game ended"
                );
                Some(SpinbackEvent::GameEnded {
                    score: session.score,
                    best_streak: session.best_streak,
                    turns_completed: session.turns_completed,
                    exhausted: *exhausted,
                    timestamp: time::now(),
                })
            }
            Effect::CancelCountdown
            | Effect::StartCountdown { .. }
            | Effect::PersistScore(_)
            | Effect::Rejected(_) => None,
        }
    }
}
