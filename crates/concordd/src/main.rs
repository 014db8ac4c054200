//! concordd — the matching worker daemon. Pulls jobs off the in-process
//! queue and runs them through the Orchestrator until terminated.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use concord_cache::CacheTier;
use concord_core::{AlgorithmSelector, MLRanker, RuleMatcher, SemanticMatcher, TaxonomyHandle};
use concord_geo::{GeoClient, ReqwestGeoUpstream};
use concord_orchestrator::{Config, InMemoryProfileStore, MatchTaskHandler, Orchestrator, PlainTextExtractor, ReqwestEmbeddingsProvider};
use concord_queue::{JobQueue, MetricsRegistry, Worker, WorkerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("loading config from environment")?;
    info!("starting concordd");

    let taxonomy = TaxonomyHandle::embedded();

    let geo_upstream = match (std::env::var("GEO_BASE_URL"), std::env::var("GEO_API_KEY")) {
        (Ok(base_url), Ok(api_key)) => Some(Arc::new(ReqwestGeoUpstream::new(base_url, api_key)) as Arc<dyn concord_geo::GeoUpstream>),
        _ => None,
    };
    let geo_cache = Arc::new(CacheTier::new(concord_cache::CacheConfig {
        local_size: config.cache.local_size,
        default_ttl: config.cache.default_ttl,
        ..Default::default()
    }));
    let geo = Arc::new(GeoClient::new(config.geo_client_config(), geo_cache, geo_upstream));

    let embeddings: Option<Arc<dyn concord_core::EmbeddingsProvider>> = if config.embeddings_enabled {
        match (std::env::var("EMBEDDINGS_BASE_URL"), std::env::var("EMBEDDINGS_API_KEY")) {
            (Ok(base_url), Ok(api_key)) => {
                let model = std::env::var("EMBEDDINGS_MODEL").unwrap_or_else(|_| "text-embedding-3-small".to_string());
                Some(Arc::new(ReqwestEmbeddingsProvider::new(base_url, api_key, model)))
            }
            _ => {
                tracing::warn!("embeddings.enabled is set but EMBEDDINGS_BASE_URL/EMBEDDINGS_API_KEY are missing, running without embeddings");
                None
            }
        }
    } else {
        None
    };

    let rule = Arc::new(RuleMatcher::new(taxonomy.clone(), Some(geo.clone()), embeddings.clone(), config.weights.clone()));

    let ml = config
        .algorithms
        .ml_model_path
        .as_ref()
        .filter(|_| config.algorithms.enabled.iter().any(|a| a == "ml"))
        .and_then(|path| {
            match MLRanker::load(Path::new(path), taxonomy.clone(), Some(geo.clone()), embeddings.clone()) {
                Ok(ranker) => Some(Arc::new(ranker)),
                Err(e) => {
                    tracing::warn!(error = %e, "ml ranker model failed to load, running without it");
                    None
                }
            }
        });

    let semantic = if config.algorithms.enabled.iter().any(|a| a == "semantic") {
        match SemanticMatcher::new(taxonomy.clone(), Some(geo.clone()), embeddings.clone()) {
            Ok(matcher) => Some(Arc::new(matcher)),
            Err(e) => {
                tracing::warn!(error = %e, "semantic matcher unavailable, running without it");
                None
            }
        }
    } else {
        None
    };

    let selector = AlgorithmSelector::new(rule, ml, semantic);
    let match_cache = Arc::new(CacheTier::new(concord_cache::CacheConfig {
        local_size: config.cache.local_size,
        default_ttl: config.cache.default_ttl,
        ..Default::default()
    }));
    let metrics = MetricsRegistry::new();
    let store = Arc::new(InMemoryProfileStore::new());
    let feature_config_version = config.feature_config_version();

    let orchestrator = Arc::new(Orchestrator::new(
        selector,
        match_cache,
        metrics.clone(),
        store.clone() as Arc<dyn concord_core::ProfileStore>,
        feature_config_version,
    ));

    let handler = Arc::new(MatchTaskHandler::new(orchestrator, Arc::new(PlainTextExtractor)));
    let queue = JobQueue::in_memory(10_000);
    let webhook_secret = std::env::var("WEBHOOK_SECRET").unwrap_or_default();
    let webhook = Arc::new(concord_queue::WebhookDispatcher::new(webhook_secret));

    let worker_config = match config.worker.pool_size {
        Some(pool_size) => WorkerConfig {
            pool_size,
            ..WorkerConfig::standard()
        },
        None => WorkerConfig::standard(),
    };

    let worker = Arc::new(Worker::new(queue, handler, webhook, metrics, worker_config));

    info!("worker pool running, waiting for SIGTERM/SIGINT");
    worker.run(shutdown_signal()).await;
    info!("concordd shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
