use std::collections::HashMap;

use async_trait::async_trait;
use concord_core::{CandidateProfile, JobPosting, MatchError};
use tokio::sync::RwLock;

/// `HashMap`-backed [`concord_core::ProfileStore`] seeded at construction.
/// Sufficient for the CLI binary and tests; a real deployment brings its
/// own store (Postgres, a document DB, ...) behind the same trait.
#[derive(Default)]
pub struct InMemoryProfileStore {
    candidates: RwLock<HashMap<String, CandidateProfile>>,
    jobs: RwLock<HashMap<String, JobPosting>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_candidate(&self, candidate: CandidateProfile) {
        self.candidates.write().await.insert(candidate.id.clone(), candidate);
    }

    pub async fn put_job(&self, job: JobPosting) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }
}

#[async_trait]
impl concord_core::ProfileStore for InMemoryProfileStore {
    async fn get_candidate(&self, id: &str) -> Result<CandidateProfile, MatchError> {
        self.candidates
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MatchError::NotFound(format!("candidate {id}")))
    }

    async fn get_job(&self, id: &str) -> Result<JobPosting, MatchError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MatchError::NotFound(format!("job {id}")))
    }

    async fn list_active_jobs(&self) -> Result<Vec<JobPosting>, MatchError> {
        Ok(self.jobs.read().await.values().cloned().collect())
    }

    async fn list_active_candidates(&self) -> Result<Vec<CandidateProfile>, MatchError> {
        Ok(self.candidates.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::ProfileStore;

    fn candidate(id: &str) -> CandidateProfile {
        CandidateProfile {
            id: id.to_string(),
            name: "Jane".to_string(),
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

    #[tokio::test]
    async fn missing_candidate_is_not_found() {
        let store = InMemoryProfileStore::new();
        let err = store.get_candidate("nope").await.unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn seeded_candidate_round_trips() {
        let store = InMemoryProfileStore::new();
        store.put_candidate(candidate("c1")).await;
        let fetched = store.get_candidate("c1").await.unwrap();
        assert_eq!(fetched.id, "c1");
        assert_eq!(store.list_active_candidates().await.unwrap().len(), 1);
    }
}
