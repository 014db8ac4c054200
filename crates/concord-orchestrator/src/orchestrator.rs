use std::sync::Arc;
use std::time::Instant;

use concord_cache::CacheTier;
use concord_core::{AlgorithmSelector, MatchError, MatchOptions, MatchRequest, MatchResult, ProfileStore};
use concord_queue::metrics::{AlgorithmLabel, AlgorithmResultLabel};
use concord_queue::MetricsRegistry;

use crate::fingerprint::result_key;

/// Public entry point (§4.14): fingerprint, check the cache, select and
/// score, cache the result, emit metrics. Never blocks on webhook delivery
/// or metrics writes — both are fire-and-forget at the worker layer, not
/// something this type waits on.
pub struct Orchestrator {
    selector: AlgorithmSelector,
    cache: Arc<CacheTier>,
    metrics: MetricsRegistry,
    store: Arc<dyn ProfileStore>,
    feature_config_version: String,
}

impl Orchestrator {
    pub fn new(
        selector: AlgorithmSelector,
        cache: Arc<CacheTier>,
        metrics: MetricsRegistry,
        store: Arc<dyn ProfileStore>,
        feature_config_version: impl Into<String>,
    ) -> Self {
        Self {
            selector,
            cache,
            metrics,
            store,
            feature_config_version: feature_config_version.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Matches an already-resolved candidate/job pair.
    pub async fn match_profiles(&self, request: MatchRequest) -> Result<MatchResult, MatchError> {
        let key = result_key(
            &request.candidate.id,
            &request.job.id,
            request.options.algorithm_hint.as_deref(),
            &self.feature_config_version,
        );

        if let Some(bytes) = self.cache.get(&key).await {
            if let Ok(mut cached) = serde_json::from_slice::<MatchResult>(&bytes) {
                cached.algorithm_used = format!("{}+cache", cached.algorithm_used);
                self.record_success(&cached);
                return Ok(cached);
            }
        }

        let start = Instant::now();
        let outcome = self.selector.select_and_score(&request).await;

        match outcome {
            Ok(mut result) => {
                result.latency = start.elapsed();
                if let Ok(bytes) = serde_json::to_vec(&result) {
                    self.cache.set(&key, bytes, request.options.cache_ttl).await;
                }
                self.record_success(&result);
                Ok(result)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Resolves `candidateId`/`jobId` via the [`ProfileStore`] and matches
    /// them. The path a `JobTask::Match` task body takes.
    pub async fn match_by_id(
        &self,
        candidate_id: &str,
        job_id: &str,
        options: MatchOptions,
    ) -> Result<MatchResult, MatchError> {
        let candidate = self.store.get_candidate(candidate_id).await?;
        let job = self.store.get_job(job_id).await?;
        self.match_profiles(MatchRequest { candidate, job, options }).await
    }

    fn record_success(&self, result: &MatchResult) {
        self.metrics
            .match_requests_total
            .get_or_create(&AlgorithmResultLabel {
                algorithm: result.algorithm_used.clone(),
                result: "success".to_string(),
            })
            .inc();
        self.metrics
            .match_latency_seconds
            .get_or_create(&AlgorithmLabel(result.algorithm_used.clone()))
            .observe(result.latency.as_secs_f64());
    }

    fn record_failure(&self, err: &MatchError) {
        let result = match err.classify() {
            concord_resilience::ErrorClass::Validation => "validation",
            concord_resilience::ErrorClass::NotFound => "not_found",
            concord_resilience::ErrorClass::Transient => "transient",
            concord_resilience::ErrorClass::RateLimited => "rate_limited",
            concord_resilience::ErrorClass::CircuitOpen => "circuit_open",
            concord_resilience::ErrorClass::Cancelled => "cancelled",
            concord_resilience::ErrorClass::Internal => "internal",
        };
        self.metrics
            .match_requests_total
            .get_or_create(&AlgorithmResultLabel {
                algorithm: "none".to_string(),
                result: result.to_string(),
            })
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::model::{ContractType, EducationLevel, WorkMode};
    use concord_core::{CandidateProfile, JobPosting, RuleMatcher, TaxonomyHandle};

    struct EmptyStore;

    #[async_trait::async_trait]
    impl ProfileStore for EmptyStore {
        async fn get_candidate(&self, id: &str) -> Result<CandidateProfile, MatchError> {
            Err(MatchError::NotFound(id.to_string()))
        }
        async fn get_job(&self, id: &str) -> Result<JobPosting, MatchError> {
            Err(MatchError::NotFound(id.to_string()))
        }
        async fn list_active_jobs(&self) -> Result<Vec<JobPosting>, MatchError> {
            Ok(vec![])
        }
        async fn list_active_candidates(&self) -> Result<Vec<CandidateProfile>, MatchError> {
            Ok(vec![])
        }
    }

    fn candidate() -> CandidateProfile {
        CandidateProfile {
            id: "c1".into(),
            name: "Jane".into(),
            skills: vec![],
            experiences: vec![],
            education: vec![],
            languages: vec![],
            location: String::new(),
            preferences: Default::default(),
            values: vec![],
            free_text: String::new(),
        }
    }

    fn job() -> JobPosting {
        JobPosting {
            id: "j1".into(),
            title: "Engineer".into(),
            company: "Acme".into(),
            required_skills: vec![],
            preferred_skills: vec![],
            location: String::new(),
            min_years_experience: 0,
            max_years_experience: 0,
            required_education_level: EducationLevel::None,
            salary_range: Default::default(),
            work_mode: WorkMode::Remote,
            contract_type: ContractType::Permanent,
            industry: String::new(),
            free_text: String::new(),
        }
    }

    fn orchestrator() -> Orchestrator {
        let rule = Arc::new(RuleMatcher::new(
            TaxonomyHandle::embedded(),
            None,
            None,
            Default::default(),
        ));
        let selector = AlgorithmSelector::new(rule, None, None);
        Orchestrator::new(
            selector,
            Arc::new(CacheTier::new(Default::default())),
            MetricsRegistry::new(),
            Arc::new(EmptyStore),
            "v1",
        )
    }

    #[tokio::test]
    async fn second_identical_request_is_served_from_cache() {
        let orchestrator = orchestrator();
        let request = MatchRequest {
            candidate: candidate(),
            job: job(),
            options: Default::default(),
        };
        let first = orchestrator.match_profiles(request.clone()).await.unwrap();
        assert_eq!(first.algorithm_used, "rule");

        let second = orchestrator.match_profiles(request).await.unwrap();
        assert_eq!(second.algorithm_used, "rule+cache");
    }

    #[tokio::test]
    async fn unknown_candidate_surfaces_not_found() {
        let orchestrator = orchestrator();
        let err = orchestrator
            .match_by_id("missing", "j1", Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));
    }
}
