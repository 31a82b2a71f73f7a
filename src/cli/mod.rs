use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::parse_published_after;

#[derive(Parser)]
#[command(
    name = "harvester",
    about = "Transcript Harvester - Build a cleaned transcript corpus from YouTube searches",
    version,
    long_about = "Searches YouTube for a query, follows the playlists the results belong to, repairs each caption track (punctuation, unknown tokens, translation to English) and archives it as a .trans.txt file. Videos already archived are skipped, so interrupted runs can simply be restarted."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search, repair and archive transcripts
    Harvest {
        /// Search query; also names the output sub-directory
        #[arg(value_name = "QUERY")]
        query: String,

        /// Maximum number of search results to process
        #[arg(short = 'n', long, default_value = "50")]
        max_results: usize,

        /// Only consider videos published on or after this date (YYYY-MM-DD)
        #[arg(short, long, value_name = "DATE", value_parser = parse_date)]
        after: DateTime<Utc>,

        /// Skip videos shorter than this many minutes
        #[arg(short, long, value_name = "MINUTES", default_value = "0")]
        min_duration: u64,

        /// Root directory for transcripts (overrides the config file)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// YouTube Data API key (overrides the config file)
        #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Show which videos are already archived
    Processed {
        /// Root directory for transcripts (overrides the config file)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// List every archived video ID
        #[arg(short, long)]
        list: bool,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    parse_published_after(value).map_err(|e| e.to_string())
}
