use chrono::Duration;

use crate::catalog::{Candidate, VideoCatalog};
use crate::utils::parse_iso8601_duration;

/// Outcome of checking a candidate against the minimum duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationCheck {
    /// Long enough, or the duration could not be determined
    Passed(Option<Duration>),
    TooShort(Duration),
}

/// Rejects videos shorter than a minimum length. Unknown lengths pass.
#[derive(Debug, Clone, Copy)]
pub struct DurationFilter {
    min_duration: Duration,
}

impl DurationFilter {
    /// Floors beyond what a `Duration` can hold saturate, rejecting every known length
    pub fn new(min_minutes: u64) -> Self {
        let min_duration = i64::try_from(min_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX);

        Self { min_duration }
    }

    pub async fn check(&self, catalog: &dyn VideoCatalog, candidate: &Candidate) -> DurationCheck {
        let duration = match catalog.video_duration(&candidate.id).await {
            Ok(Some(iso)) => {
                let parsed = parse_iso8601_duration(&iso);
                if parsed.is_none() {
                    tracing::debug!("Unparsable duration '{}' for {}", iso, candidate.id);
                }
                parsed
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Duration lookup failed for {}: {:#}", candidate.id, e);
                None
            }
        };

        match duration {
            Some(duration) if duration < self.min_duration => DurationCheck::TooShort(duration),
            other => DurationCheck::Passed(other),
        }
    }

    pub async fn passes(&self, catalog: &dyn VideoCatalog, candidate: &Candidate) -> bool {
        matches!(self.check(catalog, candidate).await, DurationCheck::Passed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Page, SearchRequest};
    use crate::Result;
    use async_trait::async_trait;

    /// Answers duration lookups from the candidate id: `ok:<iso>`, `none` or anything else fails
    struct DurationCatalog;

    #[async_trait]
    impl VideoCatalog for DurationCatalog {
        async fn search_page(&self, _: &SearchRequest, _: Option<&str>) -> Result<Page> {
            unimplemented!()
        }

        async fn playlist_page(&self, _: &str, _: u32, _: Option<&str>) -> Result<Page> {
            unimplemented!()
        }

        async fn video_duration(&self, video_id: &str) -> Result<Option<String>> {
            match video_id {
                "none" => Ok(None),
                id => match id.strip_prefix("ok:") {
                    Some(iso) => Ok(Some(iso.to_string())),
                    None => anyhow::bail!("video not found"),
                },
            }
        }

        async fn video_playlist(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn candidate(id: &str) -> Candidate {
        Candidate::new(id, "title")
    }

    #[tokio::test]
    async fn test_long_enough_passes() {
        let filter = DurationFilter::new(10);
        assert_eq!(
            filter.check(&DurationCatalog, &candidate("ok:PT12M")).await,
            DurationCheck::Passed(Some(Duration::minutes(12)))
        );
        assert!(filter.passes(&DurationCatalog, &candidate("ok:PT10M")).await);
    }

    #[tokio::test]
    async fn test_short_video_is_rejected() {
        let filter = DurationFilter::new(10);
        assert_eq!(
            filter.check(&DurationCatalog, &candidate("ok:PT9M59S")).await,
            DurationCheck::TooShort(Duration::seconds(599))
        );
    }

    #[tokio::test]
    async fn test_unknown_duration_passes() {
        let filter = DurationFilter::new(10);
        assert!(filter.passes(&DurationCatalog, &candidate("none")).await);
        assert!(filter.passes(&DurationCatalog, &candidate("missing")).await);
        assert!(filter.passes(&DurationCatalog, &candidate("ok:P1M")).await);
    }

    #[tokio::test]
    async fn test_oversized_minimum_saturates() {
        for minutes in [1u64 << 60, u64::MAX] {
            let filter = DurationFilter::new(minutes);
            assert_eq!(
                filter.check(&DurationCatalog, &candidate("ok:P7DT1H")).await,
                DurationCheck::TooShort(Duration::hours(7 * 24 + 1))
            );
            assert!(filter.passes(&DurationCatalog, &candidate("none")).await);
        }
    }

    #[test]
    fn test_zero_minimum_passes_everything() {
        let filter = DurationFilter::new(0);
        assert!(tokio_test::block_on(
            filter.passes(&DurationCatalog, &candidate("ok:PT0S"))
        ));
    }
}
