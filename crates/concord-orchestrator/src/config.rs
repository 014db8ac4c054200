//! A single config struct covering every recognized key from the external
//! interfaces table, all defaulted. Environment variables are a valid
//! source but not required — callers may build a [`Config`] directly.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use concord_core::ScoringConfig;
use concord_geo::{GeoClientConfig, GeoMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePriorityOverride {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub result_ttl_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitOverride {
    pub threshold: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryDefaults {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSection {
    pub pool_size: Option<usize>,
    pub priorities: Vec<String>,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            pool_size: None,
            priorities: vec!["premium".to_string(), "standard".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    pub local_size: usize,
    #[serde(with = "duration_seconds")]
    pub default_ttl: Duration,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            local_size: 10_000,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSection {
    pub mode: GeoMode,
    pub daily_quota: u64,
}

impl Default for GeoSection {
    fn default() -> Self {
        Self {
            mode: GeoMode::Hybrid,
            daily_quota: 2_500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmsSection {
    pub enabled: Vec<String>,
    pub ml_model_path: Option<String>,
}

impl Default for AlgorithmsSection {
    fn default() -> Self {
        Self {
            enabled: vec!["rule".to_string(), "ml".to_string(), "semantic".to_string()],
            ml_model_path: None,
        }
    }
}

/// Recognized config keys from the external interfaces contract (§6), all
/// defaulted so a bare `Config::default()` yields a usable system.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub weights: ScoringConfig,
    #[serde(default)]
    pub geo: GeoSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub queue: HashMap<String, QueuePriorityOverride>,
    #[serde(default)]
    pub worker: WorkerSection,
    #[serde(default)]
    pub circuit: HashMap<String, CircuitOverride>,
    #[serde(default)]
    pub retry: RetryDefaults,
    #[serde(default)]
    pub algorithms: AlgorithmsSection,
    #[serde(default)]
    pub embeddings_enabled: bool,
}

impl Config {
    /// Reads the subset of keys that commonly vary per deployment from the
    /// environment; everything else keeps its struct default.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(mode) = std::env::var("GEO_MODE") {
            config.geo.mode = match mode.as_str() {
                "api-only" => GeoMode::ApiOnly,
                "simulation" => GeoMode::Simulation,
                _ => GeoMode::Hybrid,
            };
        }
        if let Ok(quota) = std::env::var("GEO_DAILY_QUOTA") {
            config.geo.daily_quota = quota.parse().context("invalid GEO_DAILY_QUOTA")?;
        }
        if let Ok(size) = std::env::var("CACHE_LOCAL_SIZE") {
            config.cache.local_size = size.parse().context("invalid CACHE_LOCAL_SIZE")?;
        }
        if let Ok(pool_size) = std::env::var("WORKER_POOL_SIZE") {
            config.worker.pool_size = Some(pool_size.parse().context("invalid WORKER_POOL_SIZE")?);
        }
        if let Ok(model_path) = std::env::var("ALGORITHMS_ML_MODEL_PATH") {
            config.algorithms.ml_model_path = Some(model_path);
        }
        if let Ok(enabled) = std::env::var("EMBEDDINGS_ENABLED") {
            config.embeddings_enabled = enabled == "1" || enabled.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }

    pub fn geo_client_config(&self) -> GeoClientConfig {
        GeoClientConfig {
            mode: self.geo.mode,
            daily_quota: self.geo.daily_quota,
            ..GeoClientConfig::default()
        }
    }

    /// A stable identifier for the active weight set, part of the cache
    /// fingerprint (§4.14) so a weight reload invalidates stale results
    /// instead of serving them under the old scoring.
    pub fn feature_config_version(&self) -> String {
        let mut category: Vec<_> = self.weights.category_weights.iter().collect();
        category.sort_by_key(|(k, _)| k.clone());
        let mut feature: Vec<_> = self.weights.feature_weights.iter().collect();
        feature.sort_by_key(|(k, _)| k.clone());
        let mut parts: Vec<String> = category.iter().map(|(k, v)| format!("{k}={v}")).collect();
        parts.extend(feature.iter().map(|(k, v)| format!("{k}={v}")));
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        concord_cache::stable_hash(&refs)
    }
}

mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
