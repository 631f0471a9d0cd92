//! Runtime configuration for feed access and caching.
//!
//! Defaults match the public BMKG endpoints; everything here is overridable
//! from the command line so nothing network-facing is a hardcoded invariant.

use std::time::Duration;

/// BMKG base URL for earthquake feeds.
pub const BMKG_BASE_URL: &str = "https://data.bmkg.go.id/DataMKG/TEWS";

/// Default request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default cache time-to-live in seconds.
pub const CACHE_TTL_SECS: u64 = 60;

/// Feed access and caching configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL the per-source suffixes are joined onto.
    pub base_url: String,

    /// Base URL for shakemap image assets referenced by bare filename.
    /// BMKG serves these from the same prefix as the feeds.
    pub asset_base_url: String,

    /// How long a fetched feed stays valid in the cache.
    pub cache_ttl: Duration,

    /// Bound on a single feed request.
    pub request_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: BMKG_BASE_URL.to_string(),
            asset_base_url: BMKG_BASE_URL.to_string(),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl FeedConfig {
    /// Build a config from optional command-line overrides.
    #[must_use]
    pub fn with_overrides(
        base_url: Option<String>,
        ttl_secs: Option<u64>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(base) = base_url {
            let base = base.trim_end_matches('/').to_string();
            config.asset_base_url.clone_from(&base);
            config.base_url = base;
        }
        if let Some(secs) = ttl_secs {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.base_url.starts_with("https://"));
    }

    #[test]
    fn test_overrides_trim_trailing_slash() {
        let config =
            FeedConfig::with_overrides(Some("http://localhost:9000/".into()), Some(5), None);
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.asset_base_url, "http://localhost:9000");
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }
}
