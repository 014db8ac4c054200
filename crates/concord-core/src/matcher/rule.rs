use std::sync::Arc;

use async_trait::async_trait;
use concord_geo::GeoClient;

use crate::config::ScoringConfig;
use crate::error::MatchError;
use crate::model::{MatchRequest, MatchResult};
use crate::taxonomy::TaxonomyHandle;
use crate::traits::EmbeddingsProvider;

use super::{score_with_feature_config, Matcher};

/// Runs all `FeatureGenerators`, then `ScoreAggregator` with configured
/// weights. Deterministic, cheap, no external dependencies beyond
/// `SkillsTaxonomy` and (optionally) `GeoClient` (§4.7).
pub struct RuleMatcher {
    taxonomy: TaxonomyHandle,
    geo: Option<Arc<GeoClient>>,
    embeddings: Option<Arc<dyn EmbeddingsProvider>>,
    config: ScoringConfig,
}

impl RuleMatcher {
    pub fn new(
        taxonomy: TaxonomyHandle,
        geo: Option<Arc<GeoClient>>,
        embeddings: Option<Arc<dyn EmbeddingsProvider>>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            taxonomy,
            geo,
            embeddings,
            config,
        }
    }
}

#[async_trait]
impl Matcher for RuleMatcher {
    async fn score(&self, request: &MatchRequest) -> Result<MatchResult, MatchError> {
        let taxonomy = self.taxonomy.load();
        Ok(score_with_feature_config(
            request,
            &taxonomy,
            self.geo.as_deref(),
            self.embeddings.as_deref().map(|e| e as &dyn EmbeddingsProvider),
            &self.config,
            "rule",
        )
        .await)
    }

    fn name(&self) -> &'static str {
        "rule"
    }
}
