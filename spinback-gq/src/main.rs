//! Guess-the-song terminal front-end (spinback-gq)
//!
//! Loads the user's top tracks, backfills previews in the background and runs
//! a game on stdin/stdout. Type a guess, or one of `:hint`, `:giveup`,
//! `:next`, `:restart`, `:quit`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spinback_common::api::{resolve_player_name, AuthToken, CatalogClient, TokenStore};
use spinback_common::config::{self, TomlConfig};
use spinback_common::events::{SessionPhase, SpinbackEvent};
use spinback_gq::pipeline::{pool_ceiling, EnhanceThrottle};
use spinback_gq::playback::PreviewPlayer;
use spinback_gq::services::{
    NoPreviewLookup, PreviewLookup, PreviewSearchClient, ScoreStore, SqliteScoreStore,
    GUESS_QUIZ_VARIANT,
};
use spinback_gq::{AcquisitionPipeline, Difficulty, EngineOptions, GameEngine, Penalties, TrackPool};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for spinback-gq
#[derive(Parser, Debug)]
#[command(name = "spinback-gq")]
#[command(about = "Guess the song from your own top tracks")]
#[command(version)]
struct Args {
    /// Root folder holding the leaderboard database and token
    #[arg(short, long, env = "SPINBACK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to ~/.config/spinback/spinback.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// easy, medium or hard
    #[arg(short, long, env = "SPINBACK_DIFFICULTY")]
    difficulty: Option<Difficulty>,

    /// Leaderboard name (defaults to the catalog profile name)
    #[arg(short, long, env = "SPINBACK_PLAYER")]
    player: Option<String>,

    /// Catalog access token; persisted for later runs
    #[arg(long, env = "SPINBACK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Lifetime of --token in seconds
    #[arg(long, default_value = "3600")]
    token_expires_in: i64,

    /// Print the leaderboard and exit
    #[arg(long)]
    leaderboard: bool,

    /// Leaderboard rows to show
    #[arg(long, default_value = "10")]
    limit: u32,

    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = config::load_config(args.config.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    config::ensure_root_folder(&root_folder).context("Failed to create root folder")?;
    info!("Root folder: {}", root_folder.display());

    let store = Arc::new(
        SqliteScoreStore::open(&root_folder)
            .await
            .context("Failed to open leaderboard database")?,
    );

    let difficulty = resolve_difficulty(args.difficulty, &toml_config);

    if args.leaderboard {
        return print_leaderboard(store.as_ref(), difficulty, args.limit).await;
    }

    let tokens = Arc::new(TokenStore::new(&root_folder));
    match args.token {
        Some(token) => tokens
            .obtain(AuthToken::obtain(token, args.token_expires_in))
            .context("Failed to persist access token")?,
        None => {
            tokens.load().context("Failed to read persisted token")?;
        }
    }
    if !tokens.has_valid_token() {
        anyhow::bail!("No valid access token; pass --token or set SPINBACK_TOKEN");
    }

    let catalog = Arc::new(
        CatalogClient::new(toml_config.catalog.base_url.clone(), Arc::clone(&tokens))
            .context("Failed to build catalog client")?,
    );

    let previews: Arc<dyn PreviewLookup> = match toml_config.preview.base_url.as_deref() {
        Some(url) => Arc::new(
            PreviewSearchClient::new(url).context("Failed to build preview client")?,
        ),
        None => {
            info!("No preview service configured; using catalog previews only");
            Arc::new(NoPreviewLookup)
        }
    };

    let fallback_name = toml_config
        .game
        .player_name
        .clone()
        .unwrap_or_else(|| "Player".to_string());
    let player_name = match args.player {
        Some(name) => name,
        None => resolve_player_name(catalog.as_ref(), &fallback_name).await,
    };

    let events = spinback_common::events::EventBus::default();
    let pool = TrackPool::new(pool_ceiling());
    let pipeline = Arc::new(AcquisitionPipeline::new(
        catalog,
        previews,
        pool.clone(),
        events.clone(),
        EnhanceThrottle::from_config(&toml_config.preview),
    ));

    println!("Loading your top tracks...");
    pipeline.prepare().await;
    let background = Arc::clone(&pipeline).spawn_background();

    let engine = GameEngine::new(
        pool,
        store.clone(),
        events.clone(),
        EngineOptions {
            difficulty,
            penalties: Penalties::from_config(&toml_config.game),
            player_name,
            seed: args.seed,
        },
    );

    let player = match PreviewPlayer::new(toml_config.preview.player_command.as_deref()) {
        Ok(player) => player,
        Err(e) => {
            tracing::warn!(error = %e, "Preview player disabled");
            PreviewPlayer::silent()
        }
    };
    let printer = tokio::spawn(print_events(events.subscribe(), player));

    run_game(&engine).await?;

    engine.shutdown().await;
    background.abort();
    printer.abort();

    let stats = store
        .user_stats(engine.player_name(), Some(GUESS_QUIZ_VARIANT))
        .await
        .context("Failed to read player stats")?;
    println!(
        "{}: best {} | best streak {} | games {} | average {:.1}",
        engine.player_name(),
        stats.best_score,
        stats.best_streak,
        stats.total_games,
        stats.average_score
    );
    Ok(())
}

fn resolve_difficulty(cli: Option<Difficulty>, toml_config: &TomlConfig) -> Difficulty {
    if let Some(d) = cli {
        return d;
    }
    match toml_config.game.difficulty.as_deref().map(str::parse) {
        Some(Ok(d)) => d,
        Some(Err(e)) => {
            tracing::warn!("{}; using default difficulty", e);
            Difficulty::default()
        }
        None => Difficulty::default(),
    }
}

async fn run_game(engine: &GameEngine) -> Result<()> {
    println!(
        "Difficulty: {}. Type a guess, or :hint :giveup :next :restart :quit. Press Enter to start.",
        engine.snapshot().await.difficulty
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let input = line.trim();
        let snapshot = engine.snapshot().await;

        let result = match input {
            ":quit" => break,
            ":hint" => engine.use_hint().await,
            ":giveup" => engine.give_up().await,
            ":restart" => engine.restart().await,
            ":next" | "" if snapshot.phase == SessionPhase::Revealing => engine.advance().await,
            "" if snapshot.phase != SessionPhase::InProgress => engine.start().await,
            ":next" => continue,
            guess => engine.submit_guess(guess).await,
        };

        match result {
            Ok(session) if session.phase == SessionPhase::Ended => {
                engine.flush().await;
                println!("Press Enter to play again or :quit.");
            }
            Ok(_) => {}
            Err(rejection) => println!("{}", rejection),
        }
    }
    Ok(())
}

/// Render engine events and drive preview playback
async fn print_events(
    mut rx: tokio::sync::broadcast::Receiver<SpinbackEvent>,
    mut player: PreviewPlayer,
) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                tracing::debug!(missed = n, "Event printer lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            SpinbackEvent::TurnStarted {
                turn,
                max_turns,
                track_id,
                preview_url,
                seconds,
                ..
            } => {
                println!("Turn {}/{}: {} seconds. What's playing?", turn, max_turns, seconds);
                if let Some(url) = preview_url {
                    if let Err(e) = player.play(&track_id, &url) {
                        tracing::warn!(error = %e, "Preview playback failed");
                    }
                }
            }
            SpinbackEvent::CountdownTick {
                remaining_seconds, ..
            } if remaining_seconds <= 5 && remaining_seconds > 0 => {
                println!("  {}...", remaining_seconds);
            }
            SpinbackEvent::TurnResolved {
                outcome,
                score_delta,
                score,
                streak,
                ..
            } => {
                player.stop();
                println!(
                    "  {} ({:+}) score {} streak {}. Press Enter for the next track.",
                    outcome, score_delta, score, streak
                );
            }
            SpinbackEvent::HintRevealed {
                album_name,
                release_year,
                hints_remaining,
                ..
            } => {
                let year = release_year.map(|y| y.to_string()).unwrap_or_else(|| "?".into());
                println!(
                    "  Hint: from \"{}\" ({}); {} hints left",
                    album_name, year, hints_remaining
                );
            }
            SpinbackEvent::GameEnded {
                score,
                best_streak,
                exhausted,
                ..
            } => {
                player.stop();
                if exhausted {
                    println!("Out of tracks!");
                }
                println!("Game over: {} points, best streak {}", score, best_streak);
            }
            SpinbackEvent::SessionReset { .. } => {
                player.stop();
                println!("Game reset. Press Enter to start.");
            }
            SpinbackEvent::ScoreSaved { player_name, score } => {
                println!("Saved {} points for {}", score, player_name);
            }
            SpinbackEvent::ScoreSaveFailed { error, .. } => {
                println!("Could not save score: {}", error);
            }
            SpinbackEvent::PoolUpdated { total, playable, .. } => {
                tracing::debug!(total, playable, "Pool updated");
            }
            SpinbackEvent::CountdownTick { .. } => {}
        }
    }
}

async fn print_leaderboard(store: &dyn ScoreStore, difficulty: Difficulty, limit: u32) -> Result<()> {
    let entries = store
        .leaderboard(Some(GUESS_QUIZ_VARIANT), Some(difficulty.as_str()), limit)
        .await
        .context("Failed to read leaderboard")?;

    println!("Leaderboard ({})", difficulty);
    if entries.is_empty() {
        println!("  no scores yet");
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. {:<20} {:>5}  streak {:>2}  {}",
            rank + 1,
            entry.player_name,
            entry.score,
            entry.best_streak,
            entry.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
