//! Leaderboard persistence
//!
//! One row per finished session in the `scores` table of the root folder's
//! SQLite database. Rows are never updated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spinback_common::models::{LeaderboardEntry, UserStats};
use spinback_common::{Error, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::path::Path;

/// Database file created in the root folder
pub const DATABASE_FILE_NAME: &str = "spinback.db";

/// Game variant tag for the guessing game
pub const GUESS_QUIZ_VARIANT: &str = "guess_quiz";

/// Per-game metadata stored next to the score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub difficulty: String,
    pub best_streak: u32,
    pub turns_completed: u32,
}

/// Outcome of a save attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    pub success: bool,
    pub message: String,
}

/// Score persistence collaborator
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn save_score(
        &self,
        player_name: &str,
        score: u32,
        game_variant: &str,
        metadata: &ScoreMetadata,
    ) -> Result<SaveResult>;

    /// Entries ordered by score, then best streak, both descending
    async fn leaderboard(
        &self,
        game_variant: Option<&str>,
        difficulty: Option<&str>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>>;

    async fn user_stats(&self, player_name: &str, game_variant: Option<&str>)
        -> Result<UserStats>;
}

/// Open (creating if needed) the leaderboard database
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the `scores` table if missing
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_name TEXT NOT NULL,
            score INTEGER NOT NULL,
            game_variant TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            best_streak INTEGER NOT NULL DEFAULT 0,
            turns_completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scores_ranking ON scores (game_variant, score DESC, best_streak DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (scores)");
    Ok(())
}

/// SQLite-backed [`ScoreStore`]
#[derive(Debug, Clone)]
pub struct SqliteScoreStore {
    pool: SqlitePool,
}

impl SqliteScoreStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database inside `root_folder`
    pub async fn open(root_folder: &Path) -> Result<Self> {
        let pool = init_database_pool(&root_folder.join(DATABASE_FILE_NAME)).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn save_score(
        &self,
        player_name: &str,
        score: u32,
        game_variant: &str,
        metadata: &ScoreMetadata,
    ) -> Result<SaveResult> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(Error::InvalidInput("player name is empty".to_string()));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO scores (
                player_name, score, game_variant, difficulty,
                best_streak, turns_completed, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(player_name)
        .bind(score as i64)
        .bind(game_variant)
        .bind(&metadata.difficulty)
        .bind(metadata.best_streak as i64)
        .bind(metadata.turns_completed as i64)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(player = player_name, score, variant = game_variant, "Score saved");
        Ok(SaveResult {
            success: true,
            message: format!("Saved {} points for {}", score, player_name),
        })
    }

    async fn leaderboard(
        &self,
        game_variant: Option<&str>,
        difficulty: Option<&str>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT player_name, score, game_variant, difficulty,
                   best_streak, turns_completed, created_at
            FROM scores
            WHERE (?1 IS NULL OR game_variant = ?1)
              AND (?2 IS NULL OR difficulty = ?2)
            ORDER BY score DESC, best_streak DESC, id ASC
            LIMIT ?3
            "#,
        )
        .bind(game_variant)
        .bind(difficulty)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| Error::Parse(format!("created_at: {}", e)))?
                    .with_timezone(&chrono::Utc);

                Ok(LeaderboardEntry {
                    player_name: row.get("player_name"),
                    score: row.get::<i64, _>("score") as u32,
                    game_variant: row.get("game_variant"),
                    difficulty: row.get("difficulty"),
                    best_streak: row.get::<i64, _>("best_streak") as u32,
                    turns_completed: row.get::<i64, _>("turns_completed") as u32,
                    created_at,
                })
            })
            .collect()
    }

    async fn user_stats(
        &self,
        player_name: &str,
        game_variant: Option<&str>,
    ) -> Result<UserStats> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(MAX(score), 0) AS best_score,
                   COALESCE(MAX(best_streak), 0) AS best_streak,
                   COUNT(*) AS total_games,
                   COALESCE(AVG(score), 0.0) AS average_score
            FROM scores
            WHERE player_name = ?1
              AND (?2 IS NULL OR game_variant = ?2)
            "#,
        )
        .bind(player_name)
        .bind(game_variant)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            best_score: row.get::<i64, _>("best_score") as u32,
            best_streak: row.get::<i64, _>("best_streak") as u32,
            total_games: row.get::<i64, _>("total_games") as u32,
            average_score: row.get::<f64, _>("average_score"),
        })
    }
}
