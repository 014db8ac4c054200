use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use concord_geo::GeoClient;
use serde::{Deserialize, Serialize};

use crate::aggregator::aggregate;
use crate::config::ScoringConfig;
use crate::error::MatchError;
use crate::explainer::Explainer;
use crate::features::{cultural, experience, preference, skills, textual, FeatureMap};
use crate::model::{MatchRequest, MatchResult};
use crate::taxonomy::TaxonomyHandle;
use crate::traits::{EmbeddingsProvider, Ranker};

use super::Matcher;

/// One split node or leaf in a shallow decision tree. Pinned wire format
/// (§ DESIGN.md Open Question): a small JSON ensemble-of-shallow-trees this
/// workspace owns, since training and the upstream model format are both
/// out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TreeNode {
    Split {
        feature: String,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        value: f64,
    },
}

impl TreeNode {
    fn eval(&self, features: &HashMap<String, f64>) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let v = features.get(feature).copied().unwrap_or(0.0);
                if v < *threshold {
                    left.eval(features)
                } else {
                    right.eval(features)
                }
            }
        }
    }

    fn accumulate_importance(&self, out: &mut HashMap<String, f64>) {
        if let TreeNode::Split {
            feature,
            left,
            right,
            ..
        } = self
        {
            *out.entry(feature.clone()).or_insert(0.0) += 1.0;
            left.accumulate_importance(out);
            right.accumulate_importance(out);
        }
    }
}

/// An ensemble of shallow trees whose outputs sum to a raw score, then pass
/// through a logistic link into `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmModel {
    trees: Vec<TreeNode>,
    #[serde(default = "default_bias")]
    bias: f64,
}

fn default_bias() -> f64 {
    0.0
}

impl GbmModel {
    pub fn from_json(raw: &str) -> Result<Self, MatchError> {
        serde_json::from_str(raw)
            .map_err(|e| MatchError::ConstructionRefused(format!("incompatible ml model: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, MatchError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MatchError::ConstructionRefused(format!("ml model file unreadable: {e}")))?;
        Self::from_json(&raw)
    }
}

impl Ranker for GbmModel {
    fn predict(&self, features: &HashMap<String, f64>) -> f64 {
        let raw: f64 = self.bias + self.trees.iter().map(|t| t.eval(features)).sum::<f64>();
        1.0 / (1.0 + (-raw).exp())
    }

    fn feature_importance(&self) -> HashMap<String, f64> {
        let mut counts = HashMap::new();
        for tree in &self.trees {
            tree.accumulate_importance(&mut counts);
        }
        let total: f64 = counts.values().sum();
        if total > 0.0 {
            for v in counts.values_mut() {
                *v /= total;
            }
        }
        counts
    }
}

/// Replaces `ScoreAggregator` with a pre-trained gradient-boosted ranker
/// mapping the feature vector directly to `overallScore` (§4.7). Category
/// sub-scores still come from [`aggregate`] so `MatchResult.categoryScores`
/// keeps the same shape regardless of which matcher produced the result.
/// A missing or incompatible model file causes construction to fail rather
/// than silently falling back to rule-based scoring.
pub struct MLRanker {
    taxonomy: TaxonomyHandle,
    geo: Option<Arc<GeoClient>>,
    embeddings: Option<Arc<dyn EmbeddingsProvider>>,
    model: Arc<GbmModel>,
    config: ScoringConfig,
}

impl MLRanker {
    pub fn load(
        model_path: &Path,
        taxonomy: TaxonomyHandle,
        geo: Option<Arc<GeoClient>>,
        embeddings: Option<Arc<dyn EmbeddingsProvider>>,
    ) -> Result<Self, MatchError> {
        let model = GbmModel::load(model_path)?;
        Ok(Self {
            taxonomy,
            geo,
            embeddings,
            model: Arc::new(model),
            config: ScoringConfig::default(),
        })
    }

    pub fn from_model(
        model: GbmModel,
        taxonomy: TaxonomyHandle,
        geo: Option<Arc<GeoClient>>,
        embeddings: Option<Arc<dyn EmbeddingsProvider>>,
    ) -> Self {
        Self {
            taxonomy,
            geo,
            embeddings,
            model: Arc::new(model),
            config: ScoringConfig::default(),
        }
    }

    pub fn model(&self) -> Arc<GbmModel> {
        self.model.clone()
    }
}

#[async_trait]
impl Matcher for MLRanker {
    async fn score(&self, request: &MatchRequest) -> Result<MatchResult, MatchError> {
        let started = std::time::Instant::now();
        let taxonomy = self.taxonomy.load();
        let candidate = &request.candidate;
        let job = &request.job;
        let embeddings = self.embeddings.as_deref();

        let (skills_features, cultural_features, preference_features, commute_minutes) = tokio::join!(
            skills::generate(candidate, job, &taxonomy, embeddings),
            cultural::generate(candidate, &job.free_text, embeddings),
            preference::generate(candidate, job, self.geo.as_deref()),
            resolve_commute_minutes(candidate, job, self.geo.as_deref(), request.options.with_commute_time),
        );
        let textual_features = textual::generate(candidate, job);
        let experience_features = experience::generate(candidate, job);

        let mut features = FeatureMap::new();
        features.extend(skills_features);
        features.extend(textual_features);
        features.extend(preference_features);
        features.extend(cultural_features);
        features.extend(experience_features);

        let overall_score = self.model.predict(&features).clamp(0.0, 1.0);
        let category = crate::model::MatchCategory::from_score(overall_score);
        let category_scores = aggregate(&features, &self.config).category_scores;

        let explanation = Explainer::explain_with_attribution(
            &features,
            &candidate.skills,
            job,
            &taxonomy,
            self.model.as_ref(),
        );

        Ok(MatchResult {
            overall_score,
            category,
            category_scores,
            matches: explanation.matches,
            missing: explanation.missing,
            strengths: explanation.strengths,
            gaps: explanation.gaps,
            commute_minutes,
            algorithm_used: "ml".to_string(),
            latency: started.elapsed(),
        })
    }

    fn name(&self) -> &'static str {
        "ml"
    }
}

async fn resolve_commute_minutes(
    candidate: &crate::model::CandidateProfile,
    job: &crate::model::JobPosting,
    geo: Option<&GeoClient>,
    requested: bool,
) -> Option<i64> {
    if !requested {
        return None;
    }
    let geo = geo?;
    if candidate.location.is_empty() || job.location.is_empty() {
        return None;
    }
    geo.travel_time(&candidate.location, &job.location, concord_geo::TravelMode::Driving)
        .await
        .ok()
}
