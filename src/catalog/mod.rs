use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod youtube;

pub use youtube::YoutubeCatalog;

use crate::Result;

/// Upper bound the listing endpoints accept for one page
pub const MAX_PAGE_SIZE: u32 = 50;

/// A video found by search or playlist listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque video identifier
    pub id: String,

    /// Display title
    pub title: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Candidate>,
    pub next_page_token: Option<String>,
}

/// Parameters of a query search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub published_after: DateTime<Utc>,
    pub page_size: u32,
}

/// Listing and metadata lookups against the video platform
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// One page of videos matching a query
    async fn search_page(&self, request: &SearchRequest, page_token: Option<&str>) -> Result<Page>;

    /// One page of a playlist's members
    async fn playlist_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<Page>;

    /// ISO 8601 duration of a video, if the platform reports one
    async fn video_duration(&self, video_id: &str) -> Result<Option<String>>;

    /// Playlist the video belongs to, if any
    async fn video_playlist(&self, video_id: &str) -> Result<Option<String>>;
}
