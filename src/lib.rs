//! Transcript Harvester - A Rust CLI tool for building cleaned transcript corpora
//!
//! This library discovers YouTube videos for a search query (and the playlists they belong to),
//! fetches their captions, repairs the machine-generated text and archives every result as a
//! `.trans.txt` artifact that later runs can recognise and skip.

pub mod captions;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod pipeline;
pub mod repair;
pub mod storage;
pub mod utils;

pub use captions::{CaptionTrack, TranscriptLookup, TranscriptProvider, TranscriptVariant};
pub use catalog::{Candidate, VideoCatalog};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use pipeline::{HarvestPipeline, HarvestRequest, RunSummary};
pub use repair::{RejectReason, RepairOutcome, TextRepairChain};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the harvester
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("YouTube API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Transcript unavailable for video {0}: {1}")]
    TranscriptUnavailable(String, String),

    #[error("Punctuation model failed: {0}")]
    PunctuationFailed(String),

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Language could not be detected")]
    UndetectedLanguage,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
