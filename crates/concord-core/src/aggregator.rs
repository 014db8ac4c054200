use std::collections::HashMap;

use crate::config::ScoringConfig;
use crate::features::FeatureMap;
use crate::model::{MatchCategory, CATEGORY_KEYS};

/// Maps a feature's prefix (`"skills_"`, `"text_"`, ...) to the fixed
/// category key (`"skills"`, `"textual"`, ...) from §3.
fn category_of(feature: &str) -> Option<&'static str> {
    if feature.starts_with("skills_") {
        Some("skills")
    } else if feature.starts_with("text_") {
        Some("textual")
    } else if feature.starts_with("pref_") {
        Some("preferences")
    } else if feature.starts_with("cultural_") {
        Some("cultural")
    } else if feature.starts_with("experience_") {
        Some("experience")
    } else {
        None
    }
}

pub struct AggregatedScore {
    pub overall_score: f64,
    pub category: MatchCategory,
    pub category_scores: HashMap<String, f64>,
}

/// Weighted combination of the union of feature maps into an overall score
/// and five category sub-scores, §4.5.
pub fn aggregate(features: &FeatureMap, config: &ScoringConfig) -> AggregatedScore {
    let mut by_category: HashMap<&'static str, Vec<(&str, f64)>> = HashMap::new();
    for (name, value) in features {
        if let Some(cat) = category_of(name) {
            by_category.entry(cat).or_default().push((name.as_str(), *value));
        }
    }

    let mut category_scores = HashMap::new();
    for key in CATEGORY_KEYS {
        if let Some(members) = by_category.get(key) {
            let weighted_sum: f64 = members
                .iter()
                .map(|(name, value)| config.feature_weight(name) * value)
                .sum();
            let weight_sum: f64 = members.iter().map(|(name, _)| config.feature_weight(name)).sum();
            let sub_score = if weight_sum > 0.0 {
                (weighted_sum / weight_sum).clamp(0.0, 1.0)
            } else {
                0.0
            };
            category_scores.insert(key.to_string(), sub_score);
        }
    }

    // Renormalize category weights over present categories only.
    let present_weight_sum: f64 = category_scores
        .keys()
        .map(|k| config.category_weights.get(k).copied().unwrap_or(0.0))
        .sum();

    let overall_score = if present_weight_sum > 0.0 {
        category_scores
            .iter()
            .map(|(k, v)| config.category_weights.get(k).copied().unwrap_or(0.0) * v)
            .sum::<f64>()
            / present_weight_sum
    } else {
        0.0
    }
    .clamp(0.0, 1.0);

    AggregatedScore {
        overall_score,
        category: MatchCategory::from_score(overall_score),
        category_scores,
    }
}
