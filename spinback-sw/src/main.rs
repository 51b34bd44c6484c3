//! Swipe-to-like terminal front-end (spinback-sw)
//!
//! Ranks recommendations against the user's top track and shows them one at a
//! time. Answer `l` (like), `p` (pass) or `q` (stop). Liked tracks are saved
//! as a private playlist at the end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spinback_common::api::{AuthToken, CatalogClient, TokenStore};
use spinback_common::config;
use spinback_sw::scoring::MAX_MATCHES;
use spinback_sw::{Recommender, ScoringWeights, Swipe, SwipeDeck};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for spinback-sw
#[derive(Parser, Debug)]
#[command(name = "spinback-sw")]
#[command(about = "Swipe through recommendations ranked against your top track")]
#[command(version)]
struct Args {
    /// Root folder holding the persisted token
    #[arg(short, long, env = "SPINBACK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to ~/.config/spinback/spinback.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog access token; persisted for later runs
    #[arg(long, env = "SPINBACK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Lifetime of --token in seconds
    #[arg(long, default_value = "3600")]
    token_expires_in: i64,

    /// Cards in the deck
    #[arg(long, env = "SPINBACK_DECK_SIZE")]
    deck_size: Option<usize>,

    /// Name for the playlist of liked tracks
    #[arg(long)]
    playlist_name: Option<String>,

    /// Do not save liked tracks
    #[arg(long)]
    no_save: bool,
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

    let recommender = Recommender::new(
        catalog.clone(),
        ScoringWeights::from_config(&toml_config.recommendations),
    );
    println!("Finding tracks like your favourite...");
    let set = recommender
        .recommend()
        .await
        .context("Failed to build recommendations")?;

    let mut deck = SwipeDeck::new(set.seed, set.matches);
    let deck_size = args
        .deck_size
        .or(toml_config.recommendations.deck_size)
        .unwrap_or(MAX_MATCHES);
    deck.truncate(deck_size);

    println!(
        "Seed: {} by {}{}",
        deck.seed().name,
        deck.seed().primary_artist_name(),
        set.seed_genre
            .map(|g| format!(" [{}]", g))
            .unwrap_or_default()
    );

    run_deck(&mut deck).await?;

    println!(
        "Liked {}, passed {}.",
        deck.liked().len(),
        deck.passed()
    );
    if args.no_save {
        return Ok(());
    }

    let name = args
        .playlist_name
        .unwrap_or_else(|| deck.default_playlist_name());
    match deck
        .save_liked_as_playlist(catalog.as_ref(), &name)
        .await
        .context("Failed to save playlist")?
    {
        Some(playlist) => {
            let link = playlist
                .external_urls
                .values()
                .next()
                .cloned()
                .unwrap_or_default();
            println!("Saved playlist \"{}\" {}", playlist.name, link);
        }
        None => println!("Nothing liked, no playlist saved."),
    }
    Ok(())
}

async fn run_deck(deck: &mut SwipeDeck) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(card) = deck.current() {
        println!(
            "\n{} by {}  ({} / 100)",
            card.track.name,
            card.track.primary_artist_name(),
            card.score
        );
        for reason in &card.reasons {
            println!("  - {}", reason);
        }
        if let Some(url) = &card.track.preview_url {
            println!("  preview: {}", url);
        }
        println!("[l]ike, [p]ass, [q]uit ({} left)", deck.remaining());

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "l" | "like" => {
                deck.swipe(Swipe::Like);
            }
            "p" | "pass" => {
                deck.swipe(Swipe::Pass);
            }
            "q" | "quit" => break,
            other => println!("Unknown answer '{}'", other),
        }
    }
    Ok(())
}
