use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod ytdlp;

use crate::Result;

/// One caption track a video offers, before its text is downloaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported by the provider (`en`, `fr`, `pt-BR`, ...)
    pub language_code: String,

    /// Whether the track is speech recognition output rather than uploaded subtitles
    pub is_auto_generated: bool,

    /// Provider-specific handle used to download the segments
    pub source: String,
}

/// A timed piece of caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A selected track together with its downloaded segments
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptVariant {
    pub language_code: String,
    pub is_auto_generated: bool,
    pub segments: Vec<Segment>,
}

impl TranscriptVariant {
    /// All segment texts joined with single spaces
    pub fn raw_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of looking for a video's transcript
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptLookup {
    Found(TranscriptVariant),
    Absent,
}

/// Source of caption tracks for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// List the tracks a video offers, in the provider's order
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// Download the segments of one track
    async fn fetch_segments(&self, track: &CaptionTrack) -> Result<Vec<Segment>>;
}

/// Pick the track to archive: exact English first, then any auto-generated track, then
/// whatever the provider listed first.
pub fn select(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|track| track.language_code == "en")
        .or_else(|| tracks.iter().find(|track| track.is_auto_generated))
        .or_else(|| tracks.first())
}

/// Look up, select and download a video's transcript.
///
/// Provider failures (captions disabled, network trouble, private video) are reported as
/// [`TranscriptLookup::Absent`]; a missing transcript never ends the run.
pub async fn fetch_transcript(
    provider: &dyn TranscriptProvider,
    video_id: &str,
) -> TranscriptLookup {
    let tracks = match provider.list_tracks(video_id).await {
        Ok(tracks) => tracks,
        Err(e) => {
            tracing::warn!("Could not retrieve transcript for video {}: {:#}", video_id, e);
            return TranscriptLookup::Absent;
        }
    };

    let Some(track) = select(&tracks) else {
        return TranscriptLookup::Absent;
    };

    tracing::debug!(
        "Selected {} track ({}) for video {} out of {}",
        track.language_code,
        if track.is_auto_generated { "auto" } else { "manual" },
        video_id,
        tracks.len()
    );

    match provider.fetch_segments(track).await {
        Ok(segments) => TranscriptLookup::Found(TranscriptVariant {
            language_code: track.language_code.clone(),
            is_auto_generated: track.is_auto_generated,
            segments,
        }),
        Err(e) => {
            tracing::warn!("Could not download transcript for video {}: {:#}", video_id, e);
            TranscriptLookup::Absent
        }
    }
}
