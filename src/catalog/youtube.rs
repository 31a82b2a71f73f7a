use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{Candidate, Page, SearchRequest, VideoCatalog, MAX_PAGE_SIZE};
use crate::{HarvestError, Result};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube Data API v3 client
pub struct YoutubeCatalog {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
    #[serde(rename = "resourceId")]
    resource_id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ContentDetailsItem {
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippetItem {
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    #[serde(rename = "playlistId")]
    playlist_id: Option<String>,
}

impl YoutubeCatalog {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}/{}?key={}",
            self.base_url,
            resource,
            urlencoding::encode(&self.api_key)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HarvestError::Api { status, body }.into());
        }

        Ok(response.json().await?)
    }
}

fn page_size(requested: u32) -> String {
    requested.clamp(1, MAX_PAGE_SIZE).to_string()
}

#[async_trait]
impl VideoCatalog for YoutubeCatalog {
    async fn search_page(&self, request: &SearchRequest, page_token: Option<&str>) -> Result<Page> {
        let published_after = request
            .published_after
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = page_size(request.page_size);

        let mut params = vec![
            ("part", "id,snippet"),
            ("type", "video"),
            ("q", request.query.as_str()),
            ("maxResults", max_results.as_str()),
            ("publishedAfter", published_after.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        tracing::debug!("Searching for '{}' (page token {:?})", request.query, page_token);
        let response: SearchResponse = self.get(&self.endpoint("search", &params)).await?;

        let items = response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                Some(Candidate::new(id, item.snippet.title))
            })
            .collect();

        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    async fn playlist_page(
        &self,
        playlist_id: &str,
        page_size_hint: u32,
        page_token: Option<&str>,
    ) -> Result<Page> {
        let max_results = page_size(page_size_hint);
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        tracing::debug!("Listing playlist {} (page token {:?})", playlist_id, page_token);
        let response: PlaylistItemsResponse =
            self.get(&self.endpoint("playlistItems", &params)).await?;

        let items = response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.snippet.resource_id.video_id?;
                Some(Candidate::new(id, item.snippet.title))
            })
            .collect();

        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    async fn video_duration(&self, video_id: &str) -> Result<Option<String>> {
        let url = self.endpoint("videos", &[("part", "contentDetails"), ("id", video_id)]);
        let response: VideosResponse<ContentDetailsItem> = self.get(&url).await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details.duration))
    }

    async fn video_playlist(&self, video_id: &str) -> Result<Option<String>> {
        let url = self.endpoint("videos", &[("part", "snippet"), ("id", video_id)]);
        let response: VideosResponse<VideoSnippetItem> = self.get(&url).await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.snippet.playlist_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_parameters() {
        let catalog = YoutubeCatalog::new("k3y", "https://api.example.com/v3/").unwrap();
        let url = catalog.endpoint("search", &[("q", "rust & wasm"), ("maxResults", "50")]);
        assert_eq!(
            url,
            "https://api.example.com/v3/search?key=k3y&q=rust%20%26%20wasm&maxResults=50"
        );
    }

    #[test]
    fn test_page_size_is_capped() {
        assert_eq!(page_size(500), "50");
        assert_eq!(page_size(0), "1");
        assert_eq!(page_size(20), "20");
    }

    #[test]
    fn test_search_response_skips_non_video_items() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "abc"}, "snippet": {"title": "A"}},
                {"id": {"kind": "youtube#channel", "channelId": "xyz"}, "snippet": {"title": "C"}}
            ],
            "nextPageToken": "CAUQAA"
        }))
        .unwrap();

        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].id.video_id.as_deref(), Some("abc"));
        assert!(response.items[1].id.video_id.is_none());
        assert_eq!(response.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn test_videos_response_without_items() {
        let response: VideosResponse<ContentDetailsItem> =
            serde_json::from_str(r#"{"kind": "youtube#videoListResponse"}"#).unwrap();
        assert!(response.items.is_empty());
    }
}
