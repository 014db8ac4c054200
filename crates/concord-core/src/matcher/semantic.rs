use std::sync::Arc;

use async_trait::async_trait;
use concord_geo::GeoClient;

use crate::config::ScoringConfig;
use crate::error::MatchError;
use crate::model::{MatchRequest, MatchResult};
use crate::taxonomy::TaxonomyHandle;
use crate::traits::EmbeddingsProvider;

use super::{score_with_feature_config, Matcher};

/// Same pipeline as [`super::RuleMatcher`] but weighted toward the
/// embeddings-driven features (`skills_semantic`, `cultural_implicit`),
/// per §4.7: "the semantic matcher differs from the rule matcher only in
/// feature weighting and a hard dependency on embeddings." Refuses
/// construction without an [`EmbeddingsProvider`] rather than silently
/// degrading to rule-based scoring.
pub struct SemanticMatcher {
    taxonomy: TaxonomyHandle,
    geo: Option<Arc<GeoClient>>,
    embeddings: Arc<dyn EmbeddingsProvider>,
    config: ScoringConfig,
}

impl SemanticMatcher {
    pub fn new(
        taxonomy: TaxonomyHandle,
        geo: Option<Arc<GeoClient>>,
        embeddings: Option<Arc<dyn EmbeddingsProvider>>,
    ) -> Result<Self, MatchError> {
        let embeddings = embeddings.ok_or_else(|| {
            MatchError::ConstructionRefused("semantic matcher requires an embeddings provider".into())
        })?;
        Ok(Self {
            taxonomy,
            geo,
            embeddings,
            config: semantic_weights(),
        })
    }
}

/// Boosts the embeddings-backed features over their rule-based siblings,
/// while leaving category weights untouched (§4.5's category split is part
/// of the external contract regardless of which matcher produced it).
fn semantic_weights() -> ScoringConfig {
    let mut config = ScoringConfig::default();
    config.feature_weights.insert("skills_semantic".to_string(), 1.6);
    config.feature_weights.insert("cultural_implicit".to_string(), 1.8);
    config
}

#[async_trait]
impl Matcher for SemanticMatcher {
    async fn score(&self, request: &MatchRequest) -> Result<MatchResult, MatchError> {
        let taxonomy = self.taxonomy.load();
        Ok(score_with_feature_config(
            request,
            &taxonomy,
            self.geo.as_deref(),
            Some(self.embeddings.as_ref()),
            &self.config,
            "semantic",
        )
        .await)
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}
