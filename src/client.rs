//! BMKG earthquake API client.
//!
//! Provides blocking HTTP access to the three public BMKG feeds.
//! Uses reqwest with rustls for TLS.

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::FeedConfig;
use crate::errors::FetchError;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("gempawatch/", env!("CARGO_PKG_VERSION"));

/// The three upstream BMKG feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSource {
    /// Felt earthquakes with intensity reports ("gempa dirasakan")
    FeltReports,
    /// Recent earthquakes of magnitude 5.0 and above ("gempa terkini")
    RecentM5,
    /// Latest single event, automatic solution ("autogempa")
    Realtime,
}

impl FeedSource {
    /// Get the URL suffix for this source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FeltReports => "gempadirasakan.json",
            Self::RecentM5 => "gempaterkini.json",
            Self::Realtime => "autogempa.json",
        }
    }

    /// Human-readable label for headers and the dashboard source picker.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FeltReports => "Felt earthquakes",
            Self::RecentM5 => "Recent M5.0+",
            Self::Realtime => "Real-time (automatic)",
        }
    }

    /// All sources, in picker order.
    pub const ALL: [Self; 3] = [Self::FeltReports, Self::RecentM5, Self::Realtime];
}

impl serde::Serialize for FeedSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Self::FeltReports => "felt",
            Self::RecentM5 => "m5",
            Self::Realtime => "realtime",
        })
    }
}

impl std::str::FromStr for FeedSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "felt" | "gempadirasakan.json" => Ok(Self::FeltReports),
            "m5" | "recent" | "gempaterkini.json" => Ok(Self::RecentM5),
            "realtime" | "auto" | "autogempa.json" => Ok(Self::Realtime),
            _ => Err(format!("unknown feed source: {s} (expected: felt, m5, realtime)")),
        }
    }
}

/// Client for the BMKG earthquake API.
pub struct BmkgClient {
    client: Client,
    base_url: String,
}

impl BmkgClient {
    /// Create a new BMKG client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Fetch one feed and decode the body as JSON.
    ///
    /// The decoded value is handed to normalization as-is: depending on the
    /// source, the payload under `Infogempa.gempa` is a bare object or an
    /// array of objects, and the normalizer accepts both.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is non-2xx, or the
    /// body is not JSON. The caller treats every case as "no data", never
    /// as fatal.
    #[instrument(skip(self), fields(source = source.as_str()))]
    pub fn fetch_feed(&self, source: FeedSource) -> Result<Value, FetchError> {
        let url = format!("{}/{}", self.base_url, source.as_str());

        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: Value = response.json()?;

        debug!("fetched feed body");
        Ok(payload)
    }
}
