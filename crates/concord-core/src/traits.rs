use async_trait::async_trait;

use crate::error::MatchError;
use crate::model::{CandidateProfile, JobPosting};

/// Consumed interface (§6): the core never owns canonical candidate/job
/// records. Implementations live outside this crate.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_candidate(&self, id: &str) -> Result<CandidateProfile, MatchError>;
    async fn get_job(&self, id: &str) -> Result<JobPosting, MatchError>;
    async fn list_active_jobs(&self) -> Result<Vec<JobPosting>, MatchError>;
    async fn list_active_candidates(&self) -> Result<Vec<CandidateProfile>, MatchError>;
}

/// Consumed interface (§6). A normalized profile pulled out of CV/job-posting
/// bytes; the actual extraction logic (PDF/DOCX/TXT) is out of scope.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractedProfile, MatchError>;
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExtractedProfile {
    pub free_text: String,
    pub detected_skills: Vec<String>,
}

/// Consumed interface (§6), optional. Absence disables semantic features
/// (§4.7, §4.9 "Optional dependencies").
#[async_trait]
pub trait EmbeddingsProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError>;
}

/// Capability consumed by `MLRanker` (§4.7). A missing or incompatible model
/// causes `MLRanker` to refuse construction rather than silently fall back.
pub trait Ranker: Send + Sync {
    fn predict(&self, features: &std::collections::HashMap<String, f64>) -> f64;
    fn feature_importance(&self) -> std::collections::HashMap<String, f64>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Mean-pools a list of embeddings into a single vector (used by
/// `skills_semantic` and `cultural_implicit`).
pub fn mean_pool(vectors: &[Vec<f32>]) -> Vec<f32> {
    if vectors.is_empty() {
        return Vec::new();
    }
    let dim = vectors[0].len();
    let mut sum = vec![0f32; dim];
    for v in vectors {
        for (i, x) in v.iter().enumerate().take(dim) {
            sum[i] += x;
        }
    }
    let n = vectors.len() as f32;
    sum.iter().map(|x| x / n).collect()
}
