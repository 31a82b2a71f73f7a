use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use transcript_harvester::storage::ProcessedSet;
use transcript_harvester::utils;
use transcript_harvester::{Cli, Commands, Config, HarvestPipeline, HarvestRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // YOUTUBE_API_KEY may live in a .env file in the working directory or a parent
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose {
        "transcript_harvester=debug"
    } else {
        "transcript_harvester=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match cli.command {
        Commands::Harvest {
            query,
            max_results,
            after,
            min_duration,
            output,
            api_key,
        } => {
            let mut config = Config::load().await?.with_api_key(api_key);
            if let Some(output) = output {
                config.pipeline.output_root = output;
            }

            if !utils::check_command_available(&config.youtube.yt_dlp_path).await {
                eprintln!(
                    "⚠️  {} not found or not runnable; transcripts will be unavailable",
                    config.youtube.yt_dlp_path
                );
            }

            let pipeline = HarvestPipeline::from_config(&config, !cli.quiet)?;
            let request = HarvestRequest {
                query,
                max_results,
                published_after: after,
                min_duration_minutes: min_duration,
            };

            tracing::info!(
                "Harvesting '{}' into {}",
                request.query,
                pipeline.output_root().display()
            );

            let summary = pipeline.run(&request).await?;
            println!("{}", summary);
        }
        Commands::Processed { output, list } => {
            let root = match output {
                Some(path) => path,
                None => output_root_from_config().await?,
            };

            let processed = ProcessedSet::scan(&root);
            println!(
                "{} videos already processed under {}",
                processed.len(),
                root.display()
            );
            if list {
                for id in processed.sorted() {
                    println!("  {}", id);
                }
            }
        }
        Commands::Config { show } => {
            let config = Config::load()
                .await?
                .with_api_key(std::env::var("YOUTUBE_API_KEY").ok());
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!(
                    "Edit it to set youtube.api_key and the service endpoints, or run with --show."
                );
            }
        }
    }

    Ok(())
}

async fn output_root_from_config() -> Result<PathBuf> {
    Ok(Config::load().await?.pipeline.output_root)
}
