use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::captions::{self, ytdlp::YtDlpCaptions, TranscriptLookup, TranscriptProvider};
use crate::catalog::{Candidate, SearchRequest, VideoCatalog, YoutubeCatalog, MAX_PAGE_SIZE};
use crate::config::Config;
use crate::discovery;
use crate::repair::{
    HttpPunctuator, HttpTranslator, RejectReason, RepairOutcome, TextRepairChain,
    WhatlangDetector,
};
use crate::storage::{Artifact, ArtifactStore, ProcessedSet};

pub mod filter;

pub use filter::{DurationCheck, DurationFilter};

/// What the operator asked for in one run
#[derive(Debug, Clone)]
pub struct HarvestRequest {
    pub query: String,
    pub max_results: usize,
    pub published_after: DateTime<Utc>,
    pub min_duration_minutes: u64,
}

/// Random pause between top-level videos
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Uniformly drawn from `[min, max]`
    pub fn delay(&self) -> Duration {
        if self.max == self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Where and how a pipeline writes
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_root: PathBuf,
    pub watch_host: String,
    pub pacing: Pacing,
    pub show_progress: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let pace = |secs: f64| {
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid pace bound {}s", secs))
        };

        Ok(Self {
            output_root: config.pipeline.output_root.clone(),
            watch_host: config.youtube.watch_host.clone(),
            pacing: Pacing::new(
                pace(config.pipeline.pace_min_secs)?,
                pace(config.pipeline.pace_max_secs)?,
            ),
            show_progress: true,
        })
    }
}

/// How a single video was handled
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    AlreadyProcessed,
    TooShort,
    NoTranscript,
    Rejected(RejectReason),
    Written(PathBuf),
    WriteFailed,
}

impl CandidateOutcome {
    /// Whether the video got past the cheap checks and its transcript was looked up
    fn reached_fetch(&self) -> bool {
        !matches!(
            self,
            CandidateOutcome::AlreadyProcessed | CandidateOutcome::TooShort
        )
    }
}

/// Tally of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub written: usize,
    pub already_processed: usize,
    pub too_short: usize,
    pub no_transcript: usize,
    pub rejected: usize,
    pub write_failed: usize,
    pub playlists_expanded: usize,
    pub written_paths: Vec<PathBuf>,
}

impl RunSummary {
    fn record(&mut self, outcome: CandidateOutcome) {
        match outcome {
            CandidateOutcome::AlreadyProcessed => self.already_processed += 1,
            CandidateOutcome::TooShort => self.too_short += 1,
            CandidateOutcome::NoTranscript => self.no_transcript += 1,
            CandidateOutcome::Rejected(_) => self.rejected += 1,
            CandidateOutcome::Written(path) => {
                self.written += 1;
                self.written_paths.push(path);
            }
            CandidateOutcome::WriteFailed => self.write_failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search results: {}", self.discovered)?;
        writeln!(f, "Transcripts saved: {}", self.written)?;
        writeln!(f, "Already processed: {}", self.already_processed)?;
        writeln!(f, "Too short: {}", self.too_short)?;
        writeln!(f, "No transcript: {}", self.no_transcript)?;
        writeln!(f, "Rejected: {}", self.rejected)?;
        writeln!(f, "Write failures: {}", self.write_failed)?;
        write!(f, "Playlists expanded: {}", self.playlists_expanded)
    }
}

/// Main harvesting pipeline
pub struct HarvestPipeline {
    catalog: Box<dyn VideoCatalog>,
    captions: Box<dyn TranscriptProvider>,
    repair: TextRepairChain,
    output_root: PathBuf,
    watch_base: Url,
    pacing: Pacing,
    show_progress: bool,
}

impl HarvestPipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        catalog: Box<dyn VideoCatalog>,
        captions: Box<dyn TranscriptProvider>,
        repair: TextRepairChain,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let watch_base = Url::parse(&format!("https://{}/watch", settings.watch_host))
            .with_context(|| format!("Invalid watch host: {}", settings.watch_host))?;

        Ok(Self {
            catalog,
            captions,
            repair,
            output_root: settings.output_root,
            watch_base,
            pacing: settings.pacing,
            show_progress: settings.show_progress,
        })
    }

    /// Build the YouTube, yt-dlp and HTTP service backed pipeline described by `config`
    pub fn from_config(config: &Config, show_progress: bool) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let timeout = config.service_timeout();

        let catalog = YoutubeCatalog::new(api_key, config.youtube.api_base_url.as_str())?;
        let captions = YtDlpCaptions::new(
            config.youtube.yt_dlp_path.as_str(),
            config.youtube.watch_host.as_str(),
        );
        let repair = TextRepairChain::new(
            Box::new(HttpPunctuator::new(config.services.punctuation_url.as_str(), timeout)?),
            Box::new(WhatlangDetector::new()),
            Box::new(HttpTranslator::new(
                config.services.translation_url.as_str(),
                config.services.translation_api_key.clone(),
                timeout,
            )?),
            config.pipeline.min_length_ratio,
        );

        let settings = PipelineSettings {
            show_progress,
            ..PipelineSettings::from_config(config)?
        };

        Self::new(Box::new(catalog), Box::new(captions), repair, settings)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Watch link recorded in an artifact's header
    pub fn watch_link(&self, video_id: &str) -> String {
        let mut url = self.watch_base.clone();
        url.query_pairs_mut().append_pair("v", video_id);
        url.to_string()
    }

    /// Run one harvest: discover, then handle every candidate and the playlist it sits in
    pub async fn run(&self, request: &HarvestRequest) -> Result<RunSummary> {
        let store = ArtifactStore::for_query(&self.output_root, &request.query)?;
        let mut processed = ProcessedSet::scan(&self.output_root);
        tracing::info!(
            "{} videos already processed under {}",
            processed.len(),
            self.output_root.display()
        );

        let search = SearchRequest {
            query: request.query.clone(),
            published_after: request.published_after,
            page_size: MAX_PAGE_SIZE,
        };
        let candidates: Vec<Candidate> =
            discovery::search_candidates(self.catalog.as_ref(), search, request.max_results)
                .try_collect()
                .await
                .context("Search request failed")?;

        tracing::info!("Total results found: {}", candidates.len());

        let filter = DurationFilter::new(request.min_duration_minutes);
        let mut summary = RunSummary {
            discovered: candidates.len(),
            ..Default::default()
        };

        let progress = self.progress_bar(candidates.len() as u64);
        let total = candidates.len();

        for (index, candidate) in candidates.iter().enumerate() {
            let label = format!("video {}/{}", index + 1, total);
            progress.set_message(candidate.title.clone());

            let outcome = self
                .process_candidate(candidate, &label, &filter, &store, &mut processed)
                .await;
            let reached_fetch = outcome.reached_fetch();
            summary.record(outcome);

            if reached_fetch {
                self.expand_playlist(candidate, &filter, &store, &mut processed, &mut summary)
                    .await;
            }

            progress.inc(1);

            if reached_fetch {
                let delay = self.pacing.delay();
                tracing::debug!("Sleeping {:.1}s before the next video", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
        }

        progress.finish_with_message("Harvest complete");
        tracing::info!(
            "Run finished: {} saved, {} skipped as processed, {} rejected",
            summary.written,
            summary.already_processed,
            summary.rejected
        );

        Ok(summary)
    }

    /// Skip, filter, fetch, repair and persist one video
    async fn process_candidate(
        &self,
        candidate: &Candidate,
        label: &str,
        filter: &DurationFilter,
        store: &ArtifactStore,
        processed: &mut ProcessedSet,
    ) -> CandidateOutcome {
        if processed.contains(&candidate.id) {
            tracing::info!(
                "Skipping {}: {} (ID: {}) - already processed",
                label,
                candidate.title,
                candidate.id
            );
            return CandidateOutcome::AlreadyProcessed;
        }

        let check = filter.check(self.catalog.as_ref(), candidate).await;
        if let DurationCheck::TooShort(duration) = check {
            tracing::info!(
                "Skipping {}: {} (ID: {}) - duration {} is below the minimum",
                label,
                candidate.title,
                candidate.id,
                crate::utils::format_duration(duration.num_seconds() as f64)
            );
            return CandidateOutcome::TooShort;
        }

        tracing::info!("Processing {}: {} (ID: {})", label, candidate.title, candidate.id);

        let lookup = captions::fetch_transcript(self.captions.as_ref(), &candidate.id).await;
        let variant = match lookup {
            TranscriptLookup::Found(variant) => variant,
            TranscriptLookup::Absent => {
                tracing::info!("No transcript available for {}", candidate.title);
                return CandidateOutcome::NoTranscript;
            }
        };

        let text = match self.repair.repair(&variant.raw_text()).await {
            RepairOutcome::Accepted(text) => text,
            RepairOutcome::Rejected(reason) => {
                tracing::info!("Skipping {} ({}): {}", candidate.title, candidate.id, reason);
                return CandidateOutcome::Rejected(reason);
            }
        };

        let artifact = Artifact::new(self.watch_link(&candidate.id), text);
        match store.write(&candidate.title, &artifact) {
            Ok(path) => {
                processed.insert(candidate.id.clone());
                tracing::info!("Transcript for {} saved to {}", candidate.title, path.display());
                CandidateOutcome::Written(path)
            }
            Err(e) => {
                tracing::warn!("Could not save transcript for {}: {:#}", candidate.id, e);
                CandidateOutcome::WriteFailed
            }
        }
    }

    /// Handle every member of the playlist `candidate` belongs to, if it belongs to one
    async fn expand_playlist(
        &self,
        candidate: &Candidate,
        filter: &DurationFilter,
        store: &ArtifactStore,
        processed: &mut ProcessedSet,
        summary: &mut RunSummary,
    ) {
        let playlist_id = match self.catalog.video_playlist(&candidate.id).await {
            Ok(Some(playlist_id)) => playlist_id,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Playlist lookup failed for {}: {:#}", candidate.id, e);
                return;
            }
        };

        tracing::info!(
            "Video {} is part of playlist {}. Processing playlist...",
            candidate.title,
            playlist_id
        );
        summary.playlists_expanded += 1;

        let mut members =
            discovery::playlist_candidates(self.catalog.as_ref(), playlist_id.clone());
        while let Some(member) = members.next().await {
            match member {
                Ok(member) => {
                    let outcome = self
                        .process_candidate(&member, "playlist video", filter, store, processed)
                        .await;
                    summary.record(outcome);
                }
                Err(e) => {
                    tracing::warn!("Listing playlist {} failed: {:#}", playlist_id, e);
                    break;
                }
            }
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len);
        progress.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress
    }
}
