//! External collaborators of the guessing game

pub mod preview_client;
pub mod score_store;

pub use preview_client::{
    NoPreviewLookup, PreviewError, PreviewLookup, PreviewQuery, PreviewSearchClient,
};
pub use score_store::{
    SaveResult, ScoreMetadata, ScoreStore, SqliteScoreStore, GUESS_QUIZ_VARIANT,
};
