//! Paginated candidate discovery.
//!
//! Both traversals are exposed as lazy streams: a page is only requested once the previous
//! one has been consumed, and a search stops requesting pages as soon as enough candidates
//! were produced. Cursors are held by the provider, so a stream cannot be rewound.

use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::future::Future;

use crate::catalog::{Candidate, Page, SearchRequest, VideoCatalog, MAX_PAGE_SIZE};
use crate::Result;

pub type CandidateStream<'a> = BoxStream<'a, Result<Candidate>>;

enum Cursor {
    First,
    Next(String),
    Exhausted,
}

/// Videos matching `request` in the order the provider yields them, capped at `max_results`
pub fn search_candidates<'a>(
    catalog: &'a dyn VideoCatalog,
    request: SearchRequest,
    max_results: usize,
) -> CandidateStream<'a> {
    let request = SearchRequest {
        page_size: request.page_size.min(MAX_PAGE_SIZE),
        ..request
    };

    paginate(move |token| {
        let request = request.clone();
        async move { catalog.search_page(&request, token.as_deref()).await }
    })
    .take(max_results)
    .boxed()
}

/// Every member of a playlist, in playlist order
pub fn playlist_candidates<'a>(
    catalog: &'a dyn VideoCatalog,
    playlist_id: String,
) -> CandidateStream<'a> {
    paginate(move |token| {
        let playlist_id = playlist_id.clone();
        async move {
            catalog
                .playlist_page(&playlist_id, MAX_PAGE_SIZE, token.as_deref())
                .await
        }
    })
}

/// Turn a page fetcher into a flat stream, following `next_page_token` until it runs out
fn paginate<'a, F, Fut>(fetch_page: F) -> CandidateStream<'a>
where
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page>> + Send + 'a,
{
    stream::try_unfold(
        (fetch_page, Cursor::First),
        |(mut fetch_page, cursor)| async move {
            let token = match cursor {
                Cursor::First => None,
                Cursor::Next(token) => Some(token),
                Cursor::Exhausted => return Ok(None),
            };

            let page = fetch_page(token).await?;
            tracing::debug!("Fetched page with {} items", page.items.len());

            let cursor = match page.next_page_token {
                Some(token) if !token.is_empty() => Cursor::Next(token),
                _ => Cursor::Exhausted,
            };

            Ok::<_, anyhow::Error>(Some((page.items, (fetch_page, cursor))))
        },
    )
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<Candidate, anyhow::Error>)))
    .try_flatten()
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves pages keyed by the token that requests them (`""` for the first page)
    #[derive(Default)]
    struct PagedCatalog {
        pages: HashMap<String, Page>,
        requested: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl PagedCatalog {
        fn with_pages(pages: Vec<(&str, Vec<&str>, Option<&str>)>) -> Self {
            let pages = pages
                .into_iter()
                .map(|(token, ids, next)| {
                    let page = Page {
                        items: ids
                            .into_iter()
                            .map(|id| Candidate::new(id, format!("Video {}", id)))
                            .collect(),
                        next_page_token: next.map(str::to_string),
                    };
                    (token.to_string(), page)
                })
                .collect();
            Self {
                pages,
                ..Default::default()
            }
        }

        fn serve(&self, token: Option<&str>) -> Result<Page> {
            let key = token.unwrap_or("").to_string();
            self.requested.lock().unwrap().push(key.clone());
            if self.fail_on.as_deref() == Some(key.as_str()) {
                anyhow::bail!("quota exceeded");
            }
            Ok(self.pages.get(&key).cloned().unwrap_or_default())
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VideoCatalog for PagedCatalog {
        async fn search_page(&self, request: &SearchRequest, token: Option<&str>) -> Result<Page> {
            assert!(request.page_size <= MAX_PAGE_SIZE);
            self.serve(token)
        }

        async fn playlist_page(
            &self,
            _: &str,
            page_size: u32,
            token: Option<&str>,
        ) -> Result<Page> {
            assert!(page_size <= MAX_PAGE_SIZE);
            self.serve(token)
        }

        async fn video_duration(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn video_playlist(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn request() -> SearchRequest {
        SearchRequest {
            query: "rust".to_string(),
            published_after: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            page_size: 500,
        }
    }

    fn ids(candidates: Vec<Candidate>) -> Vec<String> {
        candidates.into_iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn test_search_follows_cursors_in_order() {
        let catalog = PagedCatalog::with_pages(vec![
            ("", vec!["a", "b"], Some("p2")),
            ("p2", vec!["c"], Some("p3")),
            ("p3", vec!["d", "e"], None),
        ]);

        let found: Vec<Candidate> = search_candidates(&catalog, request(), 100)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids(found), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(catalog.requested(), vec!["", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_search_stops_at_max_results_without_fetching_more() {
        let catalog = PagedCatalog::with_pages(vec![
            ("", vec!["a", "b"], Some("p2")),
            ("p2", vec!["c", "d"], Some("p3")),
            ("p3", vec!["e"], None),
        ]);

        let found: Vec<Candidate> = search_candidates(&catalog, request(), 3)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids(found), vec!["a", "b", "c"]);
        assert_eq!(catalog.requested(), vec!["", "p2"]);
    }

    #[tokio::test]
    async fn test_playlist_drains_every_page() {
        let catalog = PagedCatalog::with_pages(vec![
            ("", vec!["a"], Some("p2")),
            ("p2", vec![], Some("p3")),
            ("p3", vec!["b", "c"], Some("")),
        ]);

        let found: Vec<Candidate> = playlist_candidates(&catalog, "PL1".to_string())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids(found), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_page_error_is_yielded_after_earlier_items() {
        let catalog = PagedCatalog {
            fail_on: Some("p2".to_string()),
            ..PagedCatalog::with_pages(vec![("", vec!["a"], Some("p2"))])
        };

        let mut stream = playlist_candidates(&catalog, "PL1".to_string());
        assert_eq!(stream.next().await.unwrap().unwrap().id, "a");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_nothing_is_requested_until_polled() {
        let catalog = PagedCatalog::with_pages(vec![("", vec!["a"], None)]);
        let stream = search_candidates(&catalog, request(), 10);
        assert!(catalog.requested().is_empty());
        drop(stream);
    }
}
