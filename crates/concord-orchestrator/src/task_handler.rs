use std::sync::Arc;

use async_trait::async_trait;
use concord_core::model::{Skill, SkillLevel};
use concord_core::{CandidateProfile, DocumentExtractor, MatchError, MatchOptions, MatchRequest};
use concord_queue::{JobTask, TaskError, TaskHandler};
use serde::Deserialize;
use serde_json::Value;

use crate::orchestrator::Orchestrator;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchPayload {
    #[serde(rename = "candidateID")]
    candidate_id: String,
    #[serde(rename = "jobID")]
    job_id: String,
    #[serde(default)]
    options: MatchOptions,
}

/// A document to parse, hex-encoded so the payload stays plain JSON.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseAndMatchPayload {
    document_hex: String,
    filename: String,
    #[serde(rename = "jobID")]
    job_id: String,
    #[serde(default)]
    options: MatchOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsePayload {
    document_hex: String,
    filename: String,
}

/// Wires `JobTask::{Parse, Match, ParseAndMatch}` into the [`Orchestrator`]
/// so a [`concord_queue::Worker`] can run match jobs as task bodies (§4.11
/// "Task bodies").
pub struct MatchTaskHandler {
    orchestrator: Arc<Orchestrator>,
    extractor: Arc<dyn DocumentExtractor>,
}

impl MatchTaskHandler {
    pub fn new(orchestrator: Arc<Orchestrator>, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { orchestrator, extractor }
    }

    async fn handle_match(&self, payload: &Value) -> Result<Value, TaskError> {
        let request: MatchPayload = serde_json::from_value(payload.clone())
            .map_err(|e| TaskError::terminal(format!("malformed match payload: {e}")))?;
        let result = self
            .orchestrator
            .match_by_id(&request.candidate_id, &request.job_id, request.options)
            .await
            .map_err(classify)?;
        to_value(&result)
    }

    async fn handle_parse_and_match(&self, payload: &Value) -> Result<Value, TaskError> {
        let request: ParseAndMatchPayload = serde_json::from_value(payload.clone())
            .map_err(|e| TaskError::terminal(format!("malformed parse_and_match payload: {e}")))?;
        let bytes = hex::decode(&request.document_hex)
            .map_err(|e| TaskError::terminal(format!("invalid hex document: {e}")))?;
        let extracted = self
            .extractor
            .extract(&bytes, &request.filename)
            .await
            .map_err(classify)?;

        let candidate = CandidateProfile {
            id: format!("parsed:{}", request.filename),
            name: request.filename.clone(),
            skills: extracted
                .detected_skills
                .into_iter()
                .map(|name| Skill {
                    name,
                    level: SkillLevel::Intermediate,
                    weight: 1.0,
                    required: false,
                })
                .collect(),
            experiences: vec![],
            education: vec![],
            languages: vec![],
            location: String::new(),
            preferences: Default::default(),
            values: vec![],
            free_text: extracted.free_text,
        };

        let job = self.orchestrator.store().get_job(&request.job_id).await.map_err(classify)?;

        let result = self
            .orchestrator
            .match_profiles(MatchRequest {
                candidate,
                job,
                options: request.options,
            })
            .await
            .map_err(classify)?;
        to_value(&result)
    }

    async fn handle_parse(&self, payload: &Value) -> Result<Value, TaskError> {
        let request: ParsePayload = serde_json::from_value(payload.clone())
            .map_err(|e| TaskError::terminal(format!("malformed parse payload: {e}")))?;
        let bytes = hex::decode(&request.document_hex)
            .map_err(|e| TaskError::terminal(format!("invalid hex document: {e}")))?;
        let extracted = self
            .extractor
            .extract(&bytes, &request.filename)
            .await
            .map_err(classify)?;
        to_value(&extracted)
    }
}

#[async_trait]
impl TaskHandler for MatchTaskHandler {
    async fn handle(&self, task: &JobTask) -> Result<Value, TaskError> {
        match task {
            JobTask::Match { payload } => self.handle_match(payload).await,
            JobTask::ParseAndMatch { payload } => self.handle_parse_and_match(payload).await,
            JobTask::Parse { payload } => self.handle_parse(payload).await,
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, TaskError> {
    serde_json::to_value(value).map_err(|e| TaskError::terminal(format!("unserializable result: {e}")))
}

/// `Validation`/`NotFound` are never worth retrying; everything else might
/// clear up on its own (a transient upstream failure, a construction
/// refusal that will resolve once the model file appears).
fn classify(err: MatchError) -> TaskError {
    use concord_resilience::ErrorClass;
    match err.classify() {
        ErrorClass::Validation | ErrorClass::NotFound => TaskError::terminal(err.to_string()),
        _ => TaskError::retryable(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PlainTextExtractor;
    use crate::profile_store::InMemoryProfileStore;
    use concord_cache::CacheTier;
    use concord_core::model::{ContractType, EducationLevel, WorkMode};
    use concord_core::{AlgorithmSelector, JobPosting, ProfileStore, RuleMatcher, TaxonomyHandle};
    use concord_queue::MetricsRegistry;

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

    async fn handler() -> MatchTaskHandler {
        let store = Arc::new(InMemoryProfileStore::new());
        store.put_job(job()).await;
        let rule = Arc::new(RuleMatcher::new(TaxonomyHandle::embedded(), None, None, Default::default()));
        let selector = AlgorithmSelector::new(rule, None, None);
        let orchestrator = Arc::new(Orchestrator::new(
            selector,
            Arc::new(CacheTier::new(Default::default())),
            MetricsRegistry::new(),
            store.clone() as Arc<dyn ProfileStore>,
            "v1",
        ));
        MatchTaskHandler::new(orchestrator, Arc::new(PlainTextExtractor))
    }

    #[tokio::test]
    async fn match_against_unknown_candidate_is_terminal() {
        let handler = handler().await;
        let task = JobTask::Match {
            payload: serde_json::json!({"candidateID": "missing", "jobID": "j1"}),
        };
        let err = handler.handle(&task).await.unwrap_err();
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn parse_and_match_builds_a_candidate_from_document_text() {
        let handler = handler().await;
        let hex = hex::encode(b"Experienced backend engineer");
        let task = JobTask::ParseAndMatch {
            payload: serde_json::json!({"documentHex": hex, "filename": "cv.txt", "jobID": "j1"}),
        };
        let result = handler.handle(&task).await.unwrap();
        assert!(result.get("overall_score").is_some());
    }

    #[tokio::test]
    async fn parse_returns_extracted_text() {
        let handler = handler().await;
        let hex = hex::encode(b"hello world");
        let task = JobTask::Parse {
            payload: serde_json::json!({"documentHex": hex, "filename": "cv.txt"}),
        };
        let result = handler.handle(&task).await.unwrap();
        assert_eq!(result.get("free_text").unwrap(), "hello world");
    }
}
