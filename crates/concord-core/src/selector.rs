use std::collections::HashMap;
use std::sync::Arc;

use concord_resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitStateKind};

use crate::error::MatchError;
use crate::matcher::{MLRanker, Matcher, RuleMatcher, SemanticMatcher};
use crate::model::{MatchRequest, MatchResult, Preferences};

const TEXT_HEAVY_THRESHOLD: usize = 500;

/// Chooses a registered [`Matcher`] per request shape and tracks per-matcher
/// health via a [`CircuitBreaker`] keyed by matcher name (§4.8). Rule
/// evaluation order: hinted matcher if healthy, then MLRanker for
/// questionnaire-bearing candidates, then SemanticMatcher for text-heavy
/// pairs, else RuleMatcher. On failure, falls back in the fixed order
/// `ml -> semantic -> rule`; RuleMatcher is never skipped.
pub struct AlgorithmSelector {
    rule: Arc<RuleMatcher>,
    ml: Option<Arc<MLRanker>>,
    semantic: Option<Arc<SemanticMatcher>>,
    breakers: HashMap<&'static str, CircuitBreaker>,
}

impl AlgorithmSelector {
    pub fn new(
        rule: Arc<RuleMatcher>,
        ml: Option<Arc<MLRanker>>,
        semantic: Option<Arc<SemanticMatcher>>,
    ) -> Self {
        let mut breakers = HashMap::new();
        breakers.insert("rule", CircuitBreaker::new(CircuitBreakerConfig::default()));
        breakers.insert("ml", CircuitBreaker::new(CircuitBreakerConfig::default()));
        breakers.insert("semantic", CircuitBreaker::new(CircuitBreakerConfig::default()));
        Self {
            rule,
            ml,
            semantic,
            breakers,
        }
    }

    async fn is_healthy(&self, name: &str) -> bool {
        match self.breakers.get(name) {
            Some(breaker) => breaker.snapshot().await.state != CircuitStateKind::Open,
            None => false,
        }
    }

    fn matcher_by_name(&self, name: &str) -> Option<Arc<dyn Matcher>> {
        match name {
            "rule" => Some(self.rule.clone() as Arc<dyn Matcher>),
            "ml" => self.ml.clone().map(|m| m as Arc<dyn Matcher>),
            "semantic" => self.semantic.clone().map(|m| m as Arc<dyn Matcher>),
            _ => None,
        }
    }

    fn has_questionnaire_data(request: &MatchRequest) -> bool {
        !request.candidate.values.is_empty() || request.candidate.preferences != Preferences::default()
    }

    fn is_text_heavy(request: &MatchRequest) -> bool {
        request.candidate.free_text.len() > TEXT_HEAVY_THRESHOLD
            && request.job.free_text.len() > TEXT_HEAVY_THRESHOLD
    }

    /// Rule table from §4.8, evaluated in order, first match wins.
    async fn primary_choice(&self, request: &MatchRequest) -> &'static str {
        if let Some(hint) = request.options.algorithm_hint.as_deref() {
            if self.matcher_by_name(hint).is_some() && self.is_healthy(hint).await {
                return match hint {
                    "ml" => "ml",
                    "semantic" => "semantic",
                    _ => "rule",
                };
            }
        }
        if Self::has_questionnaire_data(request) && self.ml.is_some() && self.is_healthy("ml").await {
            return "ml";
        }
        if Self::is_text_heavy(request) && self.semantic.is_some() {
            return "semantic";
        }
        "rule"
    }

    /// Runs the selected matcher, falling back deterministically through
    /// `ml -> semantic -> rule` on failure. `enableFallback = false`
    /// surfaces the primary matcher's error instead of trying the chain.
    pub async fn select_and_score(&self, request: &MatchRequest) -> Result<MatchResult, MatchError> {
        let primary = self.primary_choice(request).await;
        let breaker = self.breakers.get(primary);

        let outcome = match self.matcher_by_name(primary) {
            Some(matcher) => matcher.score(request).await,
            None => Err(MatchError::Unavailable(format!("matcher {primary} not registered"))),
        };

        match outcome {
            Ok(mut result) => {
                if let Some(breaker) = breaker {
                    breaker.record_success().await;
                }
                result.algorithm_used = primary.to_string();
                Ok(result)
            }
            Err(primary_err) => {
                if let Some(breaker) = breaker {
                    breaker.record_failure().await;
                }
                if !request.options.enable_fallback {
                    return Err(primary_err);
                }
                self.fallback_from(primary, request, primary_err).await
            }
        }
    }

    /// Deterministic fallback order `ml -> semantic -> rule`, skipping the
    /// matcher that already failed and any unregistered matcher.
    /// RuleMatcher is always attempted last and is never skipped.
    async fn fallback_from(
        &self,
        failed: &str,
        request: &MatchRequest,
        primary_err: MatchError,
    ) -> Result<MatchResult, MatchError> {
        let mut last_err = primary_err;
        for candidate in ["ml", "semantic", "rule"] {
            if candidate == failed {
                continue;
            }
            let Some(matcher) = self.matcher_by_name(candidate) else {
                continue;
            };
            let breaker = self.breakers.get(candidate);
            match matcher.score(request).await {
                Ok(mut result) => {
                    if let Some(breaker) = breaker {
                        breaker.record_success().await;
                    }
                    result.algorithm_used = format!("{failed}/{candidate}");
                    return Ok(result);
                }
                Err(e) => {
                    if let Some(breaker) = breaker {
                        breaker.record_failure().await;
                    }
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
