//! Event types for the Spinback event system
//!
//! Provides the shared event enum and the EventBus observers subscribe to.

mod game_types;

pub use game_types::{GuessOutcome, SessionPhase, TurnResolution};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Spinback event types
///
/// Events are broadcast via [`EventBus`]. Emitting never blocks game logic;
/// observers that fall behind simply miss old events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpinbackEvent {
    /// Track pool grew or gained previews
    PoolUpdated {
        /// Tracks in the pool
        total: usize,
        /// Tracks carrying a preview URL
        playable: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new turn began
    TurnStarted {
        turn: u32,
        max_turns: u32,
        track_id: String,
        /// Preview to play for this turn
        preview_url: Option<String>,
        seconds: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One second elapsed on the live countdown
    CountdownTick {
        turn: u32,
        remaining_seconds: u32,
    },

    /// Turn resolved (guess, give-up or timeout)
    TurnResolved {
        turn: u32,
        track_id: String,
        outcome: GuessOutcome,
        resolution: TurnResolution,
        /// Signed score change applied this turn
        score_delta: i64,
        score: u32,
        streak: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Hint revealed for the current turn
    HintRevealed {
        turn: u32,
        album_name: String,
        release_year: Option<u16>,
        hints_remaining: u32,
    },

    /// Session reached its terminal phase
    GameEnded {
        score: u32,
        best_streak: u32,
        turns_completed: u32,
        /// True when the pool ran out of unplayed tracks
        exhausted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session returned to `NotStarted`; any live turn was abandoned
    SessionReset {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Final score persisted
    ScoreSaved {
        player_name: String,
        score: u32,
    },

    /// Final score could not be persisted
    ScoreSaveFailed {
        player_name: String,
        score: u32,
        error: String,
    },
}

impl SpinbackEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SpinbackEvent::PoolUpdated { .. } => "PoolUpdated",
            SpinbackEvent::TurnStarted { .. } => "TurnStarted",
            SpinbackEvent::CountdownTick { .. } => "CountdownTick",
            SpinbackEvent::TurnResolved { .. } => "TurnResolved",
            SpinbackEvent::HintRevealed { .. } => "HintRevealed",
            SpinbackEvent::GameEnded { .. } => "GameEnded",
            SpinbackEvent::SessionReset { .. } => "SessionReset",
            SpinbackEvent::ScoreSaved { .. } => "ScoreSaved",
            SpinbackEvent::ScoreSaveFailed { .. } => "ScoreSaveFailed",
        }
    }
}

/// Broadcast bus for [`SpinbackEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SpinbackEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use spinback_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SpinbackEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SpinbackEvent,
    ) -> Result<usize, broadcast::error::SendError<SpinbackEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SpinbackEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
