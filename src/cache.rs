//! Time-bounded feed cache.
//!
//! Memoizes normalized events per source so concurrent dashboard viewers
//! share one fetch per TTL window instead of hammering the upstream API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::client::FeedSource;
use crate::errors::FetchError;
use crate::models::EarthquakeEvent;

/// One cached fetch result.
#[derive(Debug, Clone)]
struct CacheEntry {
    events: Arc<Vec<EarthquakeEvent>>,
    fetched_at: Instant,
}

/// Shared, read-mostly cache of normalized feeds.
///
/// Concurrency model: the map lock is held only for lookups and stores,
/// never across a fetch. Concurrent readers racing an unpopulated key may
/// each trigger an independent fetch; that is acceptable because fetches
/// are idempotent reads of a read-only feed, and stores are
/// last-write-wins per key.
#[derive(Debug)]
pub struct FeedCache {
    entries: Mutex<HashMap<FeedSource, CacheEntry>>,
    ttl: Duration,
}

impl FeedCache {
    /// Create a cache whose entries stay valid for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached events for `source`, fetching on a miss.
    ///
    /// A failed fetch is never stored, and a successful-but-empty fetch is
    /// returned without being stored, so neither masks a later good fetch
    /// for the remainder of a TTL window.
    ///
    /// # Errors
    ///
    /// Propagates the fetch closure's error on a miss.
    pub fn get_or_fetch<F>(
        &self,
        source: FeedSource,
        fetch: F,
    ) -> Result<Arc<Vec<EarthquakeEvent>>, FetchError>
    where
        F: FnOnce() -> Result<Vec<EarthquakeEvent>, FetchError>,
    {
        if let Some(events) = self.lookup(source) {
            debug!(source = source.as_str(), "cache hit");
            return Ok(events);
        }

        let events = Arc::new(fetch()?);

        if !events.is_empty() {
            let entry = CacheEntry {
                events: Arc::clone(&events),
                fetched_at: Instant::now(),
            };
            if let Ok(mut entries) = self.entries.lock() {
                entries.insert(source, entry);
            }
        }

        Ok(events)
    }

    /// Invalidate every entry (manual refresh).
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn lookup(&self, source: FeedSource) -> Option<Arc<Vec<EarthquakeEvent>>> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(&source)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(Arc::clone(&entry.events))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(magnitude: f64) -> EarthquakeEvent {
        EarthquakeEvent {
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            latitude: -6.0,
            longitude: 130.0,
            magnitude,
            depth_km: 10.0,
            region: "Laut Banda".into(),
            felt_reports: None,
            shakemap_url: None,
            potential: None,
        }
    }

    #[test]
    fn test_second_read_hits_cache() {
        let cache = FeedCache::new(Duration::from_secs(60));
        let mut calls = 0;

        for _ in 0..3 {
            let events = cache
                .get_or_fetch(FeedSource::RecentM5, || {
                    calls += 1;
                    Ok(vec![event(5.0)])
                })
                .unwrap();
            assert_eq!(events.len(), 1);
        }

        assert_eq!(calls, 1);
    }

    #[test]
    fn test_expired_entry_refetches() {
        let cache = FeedCache::new(Duration::ZERO);
        let mut calls = 0;

        for _ in 0..2 {
            cache
                .get_or_fetch(FeedSource::RecentM5, || {
                    calls += 1;
                    Ok(vec![event(5.0)])
                })
                .unwrap();
        }

        assert_eq!(calls, 2);
    }

    #[test]
    fn test_clear_forces_refetch() {
        let cache = FeedCache::new(Duration::from_secs(60));
        let mut calls = 0;

        cache
            .get_or_fetch(FeedSource::FeltReports, || {
                calls += 1;
                Ok(vec![event(4.2)])
            })
            .unwrap();
        cache.clear();
        cache
            .get_or_fetch(FeedSource::FeltReports, || {
                calls += 1;
                Ok(vec![event(4.2)])
            })
            .unwrap();

        assert_eq!(calls, 2);
    }

    #[test]
    fn test_sources_are_independent_keys() {
        let cache = FeedCache::new(Duration::from_secs(60));

        cache
            .get_or_fetch(FeedSource::RecentM5, || Ok(vec![event(5.5)]))
            .unwrap();
        let felt = cache
            .get_or_fetch(FeedSource::FeltReports, || Ok(vec![event(3.1), event(4.4)]))
            .unwrap();

        assert_eq!(felt.len(), 2);
        let m5 = cache
            .get_or_fetch(FeedSource::RecentM5, || panic!("should be cached"))
            .unwrap();
        assert_eq!(m5.len(), 1);
    }

    #[test]
    fn test_failed_fetch_is_not_cached() {
        let cache = FeedCache::new(Duration::from_secs(60));
        let mut calls = 0;

        let result = cache.get_or_fetch(FeedSource::Realtime, || {
            calls += 1;
            Err(FetchError::Api {
                status: 503,
                message: "unavailable".into(),
            })
        });
        assert!(result.is_err());

        // The next cycle retries instead of seeing a poisoned entry.
        let events = cache
            .get_or_fetch(FeedSource::Realtime, || {
                calls += 1;
                Ok(vec![event(6.1)])
            })
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_empty_fetch_is_returned_but_not_stored() {
        let cache = FeedCache::new(Duration::from_secs(60));
        let mut calls = 0;

        let empty = cache
            .get_or_fetch(FeedSource::Realtime, || {
                calls += 1;
                Ok(Vec::new())
            })
            .unwrap();
        assert!(empty.is_empty());

        // An empty result does not occupy the TTL window.
        let events = cache
            .get_or_fetch(FeedSource::Realtime, || {
                calls += 1;
                Ok(vec![event(5.9)])
            })
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(calls, 2);
    }
}
