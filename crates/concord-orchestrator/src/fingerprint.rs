use concord_cache::stable_hash;

/// Stable cache key for `(candidateId, jobId, algorithmHint, featureConfigVersion)`,
/// the cache key for match results (§4.14, GLOSSARY "Feature fingerprint").
pub fn result_key(candidate_id: &str, job_id: &str, algorithm_hint: Option<&str>, feature_config_version: &str) -> String {
    let hint = algorithm_hint.unwrap_or("");
    format!("result:{}", stable_hash(&[candidate_id, job_id, hint, feature_config_version]))
}
