use std::sync::Arc;
use std::time::Duration;

use concord_cache::{stable_hash, CacheTier};
use concord_resilience::{retry_with_backoff, CircuitBreaker, RetryPolicy};

use crate::error::GeoError;
use crate::quota::DailyQuota;
use crate::simulation::simulate_travel_time;
use crate::{DistanceMatrix, GeoUpstream, Location, TravelMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoMode {
    ApiOnly,
    Simulation,
    Hybrid,
}

#[derive(Clone)]
pub struct GeoClientConfig {
    pub mode: GeoMode,
    pub daily_quota: u64,
    pub upstream_ttl: Duration,
    pub simulation_ttl: Duration,
    pub timeout: Duration,
}

impl Default for GeoClientConfig {
    fn default() -> Self {
        Self {
            mode: GeoMode::Hybrid,
            daily_quota: 2_500,
            upstream_ttl: Duration::from_secs(7 * 24 * 3600),
            simulation_ttl: Duration::from_secs(24 * 3600),
            timeout: Duration::from_secs(5),
        }
    }
}

/// `GeoClient` implements the §4.2 policy: cache-first, quota-gated
/// upstream calls guarded by a circuit breaker, with deterministic
/// simulation as the fallback (or the only source, in `Simulation` mode).
pub struct GeoClient {
    config: GeoClientConfig,
    cache: Arc<CacheTier>,
    upstream: Option<Arc<dyn GeoUpstream>>,
    quota: DailyQuota,
    breaker: CircuitBreaker,
}

impl GeoClient {
    pub fn new(
        config: GeoClientConfig,
        cache: Arc<CacheTier>,
        upstream: Option<Arc<dyn GeoUpstream>>,
    ) -> Self {
        let quota = DailyQuota::new(config.daily_quota);
        Self {
            config,
            cache,
            upstream,
            quota,
            breaker: CircuitBreaker::new(Default::default()),
        }
    }

    pub async fn travel_time(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<i64, GeoError> {
        let key = format!(
            "geo:travel_time:{}",
            stable_hash(&[origin, destination, mode.as_str()])
        );
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(bytes) = cached.try_into() {
                return Ok(i64::from_le_bytes(bytes));
            }
        }

        let minutes = self.resolve(&key, origin, destination, mode).await?;
        Ok(minutes)
    }

    async fn resolve(
        &self,
        key: &str,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<i64, GeoError> {
        if self.config.mode == GeoMode::Simulation || self.upstream.is_none() {
            let minutes = simulate_travel_time(origin, destination, mode);
            self.cache_minutes(key, minutes, self.config.simulation_ttl)
                .await;
            return Ok(minutes);
        }

        if !self.quota.try_consume().await {
            return match self.config.mode {
                GeoMode::Hybrid => {
                    let minutes = simulate_travel_time(origin, destination, mode);
                    self.cache_minutes(key, minutes, self.config.simulation_ttl)
                        .await;
                    Ok(minutes)
                }
                _ => Err(GeoError::QuotaExhausted),
            };
        }

        let upstream = self.upstream.as_ref().unwrap().clone();
        let policy = RetryPolicy::default();
        let result = retry_with_backoff(
            &policy,
            &self.breaker,
            self.config.timeout,
            GeoError::classify,
            || {
                let upstream = upstream.clone();
                let origin = origin.to_string();
                let destination = destination.to_string();
                async move { upstream.directions(&origin, &destination, mode).await }
            },
        )
        .await;

        match result {
            Ok(minutes) => {
                self.cache_minutes(key, minutes, self.config.upstream_ttl)
                    .await;
                Ok(minutes)
            }
            Err(_) if self.config.mode == GeoMode::Hybrid => {
                let minutes = simulate_travel_time(origin, destination, mode);
                self.cache_minutes(key, minutes, self.config.simulation_ttl)
                    .await;
                Ok(minutes)
            }
            Err(e) => Err(e.classify_into_geo_error()),
        }
    }

    async fn cache_minutes(&self, key: &str, minutes: i64, ttl: Duration) {
        self.cache.set(key, minutes.to_le_bytes().to_vec(), ttl).await;
    }

    pub async fn geocode(&self, address: &str) -> Result<Location, GeoError> {
        match &self.upstream {
            Some(upstream) => upstream.geocode(address).await,
            None => Err(GeoError::Validation(
                "no upstream configured for geocode".into(),
            )),
        }
    }

    pub async fn distance_matrix(
        &self,
        origins: &[String],
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<DistanceMatrix, GeoError> {
        match &self.upstream {
            Some(upstream) => upstream.matrix(origins, destinations, mode).await,
            None => {
                let minutes = origins
                    .iter()
                    .map(|o| {
                        destinations
                            .iter()
                            .map(|d| simulate_travel_time(o, d, mode))
                            .collect()
                    })
                    .collect();
                Ok(DistanceMatrix { minutes })
            }
        }
    }
}

// Helper to fold a resilience-layer failure (circuit open / cancelled / inner
// GeoError) back into a plain GeoError for api-only callers.
trait IntoGeoError {
    fn classify_into_geo_error(self) -> GeoError;
}

impl IntoGeoError for concord_resilience::ResilienceError<GeoError> {
    fn classify_into_geo_error(self) -> GeoError {
        match self {
            concord_resilience::ResilienceError::Inner(e) => e,
            concord_resilience::ResilienceError::CircuitOpen { .. } => {
                GeoError::Upstream("circuit open".to_string())
            }
            concord_resilience::ResilienceError::Cancelled => {
                GeoError::Upstream("timed out".to_string())
            }
        }
    }
}

/// Default [`GeoUpstream`] talking to a Google-Maps-Directions-shaped HTTP
/// API: origin/destination/mode query params, JSON response with
/// `rows[].elements[].duration.value` (seconds).
pub struct ReqwestGeoUpstream {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReqwestGeoUpstream {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct DirectionsResponse {
    rows: Vec<DirectionsRow>,
}

#[derive(serde::Deserialize)]
struct DirectionsRow {
    elements: Vec<DirectionsElement>,
}

#[derive(serde::Deserialize)]
struct DirectionsElement {
    duration: DirectionsDuration,
}

#[derive(serde::Deserialize)]
struct DirectionsDuration {
    value: i64,
}

#[async_trait::async_trait]
impl GeoUpstream for ReqwestGeoUpstream {
    async fn directions(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<i64, GeoError> {
        let response = self
            .http
            .get(format!("{}/distancematrix/json", self.base_url))
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("mode", mode.as_str()),
                ("key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| GeoError::Upstream(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeoError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(GeoError::Upstream(format!(
                "status {}",
                response.status()
            )));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Upstream(e.to_string()))?;

        body.rows
            .first()
            .and_then(|r| r.elements.first())
            .map(|e| e.duration.value / 60)
            .ok_or_else(|| GeoError::Upstream("empty distance matrix response".into()))
    }

    async fn geocode(&self, address: &str) -> Result<Location, GeoError> {
        #[derive(serde::Deserialize)]
        struct GeocodeResponse {
            results: Vec<GeocodeResult>,
        }
        #[derive(serde::Deserialize)]
        struct GeocodeResult {
            geometry: GeocodeGeometry,
        }
        #[derive(serde::Deserialize)]
        struct GeocodeGeometry {
            location: GeocodeLocation,
        }
        #[derive(serde::Deserialize)]
        struct GeocodeLocation {
            lat: f64,
            lng: f64,
        }

        let response = self
            .http
            .get(format!("{}/geocode/json", self.base_url))
            .query(&[("address", address), ("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| GeoError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Upstream(format!(
                "status {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Upstream(e.to_string()))?;

        body.results
            .first()
            .map(|r| Location {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })
            .ok_or_else(|| GeoError::Validation(format!("no geocode match for '{address}'")))
    }

    async fn matrix(
        &self,
        origins: &[String],
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<DistanceMatrix, GeoError> {
        let response = self
            .http
            .get(format!("{}/distancematrix/json", self.base_url))
            .query(&[
                ("origins", origins.join("|")),
                ("destinations", destinations.join("|")),
                ("mode", mode.as_str().to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| GeoError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Upstream(format!(
                "status {}",
                response.status()
            )));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Upstream(e.to_string()))?;

        let minutes = body
            .rows
            .iter()
            .map(|row| row.elements.iter().map(|e| e.duration.value / 60).collect())
            .collect();
        Ok(DistanceMatrix { minutes })
    }
}
