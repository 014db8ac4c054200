pub mod ml;
pub mod rule;
pub mod semantic;

use async_trait::async_trait;

use crate::error::MatchError;
use crate::model::{MatchCategory, MatchRequest, MatchResult};

/// The single interface all three scorers implement (§4.7, §9 "Deep
/// inheritance... replace with a single Matcher interface").
#[async_trait]
pub trait Matcher: Send + Sync {
    async fn score(&self, request: &MatchRequest) -> Result<MatchResult, MatchError>;
    fn name(&self) -> &'static str;
}

pub use ml::MLRanker;
pub use rule::RuleMatcher;
pub use semantic::SemanticMatcher;

use std::time::Instant;

use concord_geo::GeoClient;

use crate::aggregator::aggregate;
use crate::config::ScoringConfig;
use crate::explainer::Explainer;
use crate::features::{cultural, experience, preference, skills, textual, FeatureMap};
use crate::taxonomy::SkillsTaxonomy;
use crate::traits::EmbeddingsProvider;

/// Runs all four [`crate::features`] generators concurrently and folds the
/// result through [`aggregate`] and [`Explainer`]. Shared by [`RuleMatcher`]
/// and [`SemanticMatcher`], which differ only in `config` and embeddings
/// availability (§9: "shared logic lives in free functions").
pub(crate) async fn score_with_feature_config(
    request: &MatchRequest,
    taxonomy: &SkillsTaxonomy,
    geo: Option<&GeoClient>,
    embeddings: Option<&dyn EmbeddingsProvider>,
    config: &ScoringConfig,
    algorithm_name: &str,
) -> MatchResult {
    let started = Instant::now();
    let candidate = &request.candidate;
    let job = &request.job;

    let (skills_features, cultural_features, preference_features, commute_minutes) = tokio::join!(
        skills::generate(candidate, job, taxonomy, embeddings),
        cultural::generate(candidate, &job.free_text, embeddings),
        preference::generate(candidate, job, geo),
        resolve_commute_minutes(candidate, job, geo, request.options.with_commute_time),
    );
    let textual_features = textual::generate(candidate, job);
    let experience_features = experience::generate(candidate, job);

    let mut features = FeatureMap::new();
    features.extend(skills_features);
    features.extend(textual_features);
    features.extend(preference_features);
    features.extend(cultural_features);
    features.extend(experience_features);

    let aggregated = aggregate(&features, config);
    let explanation = Explainer::explain(&features, &candidate.skills, job, taxonomy);

    // A hard requirement is a gate, not just one more weighted input: a
    // candidate missing a skill the job marks `required` never reads as a
    // good match, regardless of how well everything else lines up.
    // `categoryScores` still reports the raw weighted sub-scores (useful for
    // the caller to see exactly what weighed in); only the headline score
    // and its derived category are gated.
    let missing_required = explanation.missing.iter().any(|m| m.required);
    let overall_score = if missing_required {
        aggregated.overall_score.min(0.35)
    } else {
        aggregated.overall_score
    };

    MatchResult {
        overall_score,
        category: MatchCategory::from_score(overall_score),
        category_scores: aggregated.category_scores,
        matches: explanation.matches,
        missing: explanation.missing,
        strengths: explanation.strengths,
        gaps: explanation.gaps,
        commute_minutes,
        algorithm_used: algorithm_name.to_string(),
        latency: started.elapsed(),
    }
}

/// Direct commute lookup for `MatchResult.commuteMinutes`, independent of
/// `pref_location`'s own (possibly substring-fallback) geo usage.
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
