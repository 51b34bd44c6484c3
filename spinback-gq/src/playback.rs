//! Single-slot preview playback
//!
//! Previews are played by an external command (for example `mpv --no-video`)
//! with the preview URL appended as its last argument. Only one preview plays
//! at a time: starting another kills the previous process, and dropping the
//! player stops playback.

use thiserror::Error;
use tokio::process::{Child, Command};

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Player command is empty")]
    EmptyCommand,

    #[error("Player binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Failed to start player: {0}")]
    SpawnError(String),
}

struct Playing {
    track_id: String,
    child: Option<Child>,
}

/// Owner of the single playback slot
pub struct PreviewPlayer {
    program: Option<(String, Vec<String>)>,
    current: Option<Playing>,
}

impl PreviewPlayer {
    /// Player using `command` (whitespace-separated); `None` plays nothing
    pub fn new(command: Option<&str>) -> Result<Self, PlaybackError> {
        let program = match command {
            Some(cmd) => {
                let mut parts = cmd.split_whitespace().map(String::from);
                let program = parts.next().ok_or(PlaybackError::EmptyCommand)?;
                Some((program, parts.collect()))
            }
            None => None,
        };
        Ok(Self {
            program,
            current: None,
        })
    }

    /// Player that only tracks which preview is "playing"
    pub fn silent() -> Self {
        Self {
            program: None,
            current: None,
        }
    }

    /// Start `url` for `track_id`, stopping whatever was playing
    pub fn play(&mut self, track_id: &str, url: &str) -> Result<(), PlaybackError> {
        self.stop();

        let child = match &self.program {
            Some((program, args)) => {
                let child = Command::new(program)
                    .args(args)
                    .arg(url)
                    .stdin(std::process::Stdio::null())
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::NotFound => {
                            PlaybackError::BinaryNotFound(program.clone())
                        }
                        _ => PlaybackError::SpawnError(e.to_string()),
                    })?;
                Some(child)
            }
            None => None,
        };

        tracing::debug!(track_id, "Preview playback started");
        self.current = Some(Playing {
            track_id: track_id.to_string(),
            child,
        });
        Ok(())
    }

    /// Stop the active preview, if any
    pub fn stop(&mut self) {
        if let Some(mut playing) = self.current.take() {
            if let Some(child) = playing.child.as_mut() {
                if let Err(e) = child.start_kill() {
                    tracing::debug!(error = %e, "Player already exited");
                }
            }
            tracing::debug!(track_id = %playing.track_id, "Preview playback stopped");
        }
    }

    /// Track id of the active preview
    pub fn current_track(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.track_id.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for PreviewPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
