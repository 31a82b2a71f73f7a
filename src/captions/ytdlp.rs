use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

use super::{CaptionTrack, Segment, TranscriptProvider};
use crate::{HarvestError, Result};

/// Subtitle format yt-dlp is asked to point at; it carries timing per event
const CAPTION_FORMAT: &str = "json3";

/// Caption provider backed by yt-dlp metadata and the timedtext endpoints it reports
pub struct YtDlpCaptions {
    yt_dlp_path: String,
    watch_host: String,
    client: Client,
}

/// Caption formats per language, in the order yt-dlp reports them
type LanguageFormats = Vec<(String, Vec<SubtitleFormat>)>;

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default, deserialize_with = "in_listed_order")]
    subtitles: LanguageFormats,
    #[serde(default, deserialize_with = "in_listed_order")]
    automatic_captions: LanguageFormats,
}

#[derive(Debug, Deserialize)]
struct SubtitleFormat {
    ext: String,
    url: String,
}

/// Read a JSON object into its entries without reordering them; `null` reads as empty
fn in_listed_order<'de, D>(deserializer: D) -> std::result::Result<LanguageFormats, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = LanguageFormats;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of language codes to caption formats")
        }

        fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(EntriesVisitor)
}

#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

impl YtDlpCaptions {
    pub fn new(yt_dlp_path: impl Into<String>, watch_host: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            watch_host: watch_host.into(),
            client: Client::new(),
        }
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let url = format!("https://{}/watch?v={}", self.watch_host, video_id);
        tracing::debug!("Listing caption tracks for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", &url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.yt_dlp_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(HarvestError::TranscriptUnavailable(
                video_id.to_string(),
                error.trim().to_string(),
            )
            .into());
        }

        serde_json::from_slice(&output.stdout).context("Failed to parse yt-dlp output")
    }
}

/// Flatten yt-dlp's subtitle maps into tracks: uploaded subtitles first, then speech
/// recognition tracks in the video's own language, each group in the order yt-dlp listed them.
/// Machine-translated tracks are dropped.
fn tracks_from_info(info: &VideoInfo) -> Vec<CaptionTrack> {
    let mut tracks = Vec::new();
    let mut seen = HashSet::new();

    let manual = info
        .subtitles
        .iter()
        .filter(|(language, _)| language.as_str() != "live_chat")
        .map(|entry| (entry, false));
    let automatic = info.automatic_captions.iter().map(|entry| (entry, true));

    for ((language, formats), is_auto_generated) in manual.chain(automatic) {
        let Some(format) = formats.iter().find(|f| f.ext == CAPTION_FORMAT) else {
            continue;
        };
        if is_auto_generated && format.url.contains("tlang=") {
            continue;
        }

        let language_code = language.trim_end_matches("-orig").to_string();
        if !seen.insert((language_code.clone(), is_auto_generated)) {
            continue;
        }

        tracks.push(CaptionTrack {
            language_code,
            is_auto_generated,
            source: format.url.clone(),
        });
    }

    tracks
}

fn segments_from_json3(captions: Json3Captions) -> Vec<Segment> {
    captions
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs?
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            if text.is_empty() {
                return None;
            }

            Some(Segment {
                text,
                start: event.start_ms as f64 / 1000.0,
                duration: event.duration_ms as f64 / 1000.0,
            })
        })
        .collect()
}

#[async_trait]
impl TranscriptProvider for YtDlpCaptions {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let info = self.get_video_info(video_id).await?;
        Ok(tracks_from_info(&info))
    }

    async fn fetch_segments(&self, track: &CaptionTrack) -> Result<Vec<Segment>> {
        let response = self
            .client
            .get(&track.source)
            .send()
            .await
            .context("Failed to download captions")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download captions: HTTP {}", response.status());
        }

        let captions: Json3Captions = response
            .json()
            .await
            .context("Failed to parse caption payload")?;

        Ok(segments_from_json3(captions))
    }
}
