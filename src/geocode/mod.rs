//! Address geocoding with a session cache and rate limiting
//!
//! [`GeoResolver`] owns the correctness-first success/failure cache and the
//! rate limiter; the actual lookup sits behind the [`GeoFetch`] seam so the
//! cache and limiter behavior is testable without a network.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::job::GeoPoint;

pub mod limiter;

pub use limiter::MinIntervalLimiter;

/// Floor between consecutive geocoder requests
pub const GEOCODE_MIN_INTERVAL: Duration = Duration::from_millis(1100);

/// Errors from a single geocoder lookup
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("geocoder returned HTTP {0}")]
    Status(u16),
}

/// One uncached lookup. `Ok(None)` means the geocoder answered but had no
/// candidate for the address.
#[async_trait]
pub trait GeoFetch {
    async fn fetch(&self, address: &str) -> Result<Option<GeoPoint>, GeoError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Nominatim search client. Constrains results to the configured country
/// list and requests at most one candidate.
pub struct NominatimFetch {
    client: Client,
    base_url: String,
    country_codes: String,
}

impl NominatimFetch {
    pub fn new(
        base_url: impl Into<String>,
        country_codes: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeoError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            country_codes: country_codes.into(),
        })
    }
}

#[async_trait]
impl GeoFetch for NominatimFetch {
    async fn fetch(&self, address: &str) -> Result<Option<GeoPoint>, GeoError> {
        let response = self
            .client
            .get(&self.base_url)
            // Nominatim's policy requires an identifying User-Agent
            .header(USER_AGENT, concat!("fleetmap/", env!("CARGO_PKG_VERSION")))
            .query(&[
                ("q", address),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", self.country_codes.as_str()),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeoError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| GeoError::Transport(e.to_string()))?;

        let Some(hit) = hits.first() else {
            return Ok(None);
        };

        match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => Ok(Some(GeoPoint { lat, lng })),
            _ => {
                warn!(address, lat = %hit.lat, lon = %hit.lon, "unparsable coordinates in geocoder hit");
                Ok(None)
            }
        }
    }
}

/// Rate-limited resolver with a process-lifetime cache keyed by the trimmed
/// address. Failed lookups are cached too, so a repeat of the same bad
/// address costs no network call within a session; a retry requires an
/// explicit [`GeoResolver::clear`].
pub struct GeoResolver<F> {
    fetch: F,
    limiter: MinIntervalLimiter,
    cache: HashMap<String, Option<GeoPoint>>,
}

impl<F: GeoFetch> GeoResolver<F> {
    pub fn new(fetch: F) -> Self {
        Self::with_interval(fetch, GEOCODE_MIN_INTERVAL)
    }

    pub fn with_interval(fetch: F, min_interval: Duration) -> Self {
        Self {
            fetch,
            limiter: MinIntervalLimiter::new(min_interval),
            cache: HashMap::new(),
        }
    }

    /// Resolve an address to coordinates.
    ///
    /// Blank input returns `None` immediately with no network call and no
    /// cache write. Cache hits (success or failure) return without delay.
    /// Every uncached address pays the rate-limit spacing before its single
    /// network attempt; transport errors and empty results both resolve to
    /// `None` and are cached.
    pub async fn resolve(&mut self, address: &str) -> Option<GeoPoint> {
        let key = address.trim();
        if key.is_empty() {
            return None;
        }

        // Presence, not truthiness: a cached failure is still a hit.
        if let Some(hit) = self.cache.get(key) {
            return *hit;
        }

        self.limiter.acquire().await;

        let resolved = match self.fetch.fetch(key).await {
            Ok(point) => point,
            Err(e) => {
                warn!(address = key, error = %e, "geocoding failed");
                None
            }
        };

        self.cache.insert(key.to_string(), resolved);
        resolved
    }

    /// Drop all cached results, including cached failures
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn fetch(&self) -> &F {
        &self.fetch
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
