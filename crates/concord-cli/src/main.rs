//! Local/offline single-shot matching, no daemon or queue required.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use concord_cache::CacheTier;
use concord_core::{
    AlgorithmSelector, CandidateProfile, JobPosting, MatchOptions, MatchRequest, ProfileStore, RuleMatcher, TaxonomyHandle,
};
use concord_geo::GeoClient;
use concord_orchestrator::{Config, InMemoryProfileStore, Orchestrator};
use concord_queue::MetricsRegistry;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "concord")]
#[command(about = "Local matching CLI for dry-running a candidate/job pair")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match one candidate file against one job file
    Match {
        /// Path to a JSON-encoded CandidateProfile
        #[arg(short, long)]
        candidate: PathBuf,

        /// Path to a JSON-encoded JobPosting
        #[arg(short, long)]
        job: PathBuf,

        /// Force a specific algorithm instead of letting the selector choose
        #[arg(long)]
        algorithm: Option<String>,
    },

    /// Validate that a candidate or job file parses
    Validate {
        /// "candidate" or "job"
        kind: String,
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Match { candidate, job, algorithm } => run_match(&candidate, &job, algorithm).await?,
        Commands::Validate { kind, path } => validate_file(&kind, &path)?,
    }

    Ok(())
}

async fn run_match(candidate_path: &PathBuf, job_path: &PathBuf, algorithm: Option<String>) -> Result<()> {
    let candidate: CandidateProfile =
        serde_json::from_str(&std::fs::read_to_string(candidate_path).context("reading candidate file")?)
            .context("parsing candidate JSON")?;
    let job: JobPosting = serde_json::from_str(&std::fs::read_to_string(job_path).context("reading job file")?)
        .context("parsing job JSON")?;

    info!(candidate = %candidate.id, job = %job.id, "loaded profiles");

    let config = Config::default();
    let taxonomy = TaxonomyHandle::embedded();
    let geo_cache = Arc::new(CacheTier::new(concord_cache::CacheConfig {
        local_size: config.cache.local_size,
        default_ttl: config.cache.default_ttl,
        ..Default::default()
    }));
    let geo = Arc::new(GeoClient::new(config.geo_client_config(), geo_cache, None));

    let rule = Arc::new(RuleMatcher::new(taxonomy.clone(), Some(geo.clone()), None, config.weights.clone()));
    let selector = AlgorithmSelector::new(rule, None, None);

    let store = Arc::new(InMemoryProfileStore::new());
    store.put_candidate(candidate.clone()).await;
    store.put_job(job.clone()).await;

    let match_cache = Arc::new(CacheTier::new(concord_cache::CacheConfig {
        local_size: config.cache.local_size,
        default_ttl: config.cache.default_ttl,
        ..Default::default()
    }));
    let metrics = MetricsRegistry::new();
    let orchestrator = Orchestrator::new(
        selector,
        match_cache,
        metrics,
        store as Arc<dyn ProfileStore>,
        config.feature_config_version(),
    );

    let mut options = MatchOptions::default();
    options.algorithm_hint = algorithm;

    let result = orchestrator
        .match_profiles(MatchRequest {
            candidate,
            job,
            options,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn validate_file(kind: &str, path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path).context("reading file")?;
    match kind {
        "candidate" => {
            let candidate: CandidateProfile = serde_json::from_str(&content).context("parsing candidate JSON")?;
            println!("Candidate is valid: {} ({} skills)", candidate.id, candidate.skills.len());
        }
        "job" => {
            let job: JobPosting = serde_json::from_str(&content).context("parsing job JSON")?;
            println!("Job is valid: {} ({} required skills)", job.id, job.required_skills.len());
        }
        other => anyhow::bail!("unknown kind '{other}', expected 'candidate' or 'job'"),
    }
    Ok(())
}
