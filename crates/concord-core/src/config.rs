use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `weights.categories` / `weights.features` from §6's configuration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub category_weights: HashMap<String, f64>,
    /// Per-feature-prefix weight, e.g. `"skills_exact_f1" -> 1.2`. Absent
    /// features default to `1.0`.
    pub feature_weights: HashMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let category_weights = [
            ("skills", 0.40),
            ("cultural", 0.20),
            ("textual", 0.20),
            ("preferences", 0.15),
            ("experience", 0.05),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        // `pref_salary` outweighs its six `pref_*` siblings by default: a
        // compensation mismatch should dominate the preferences category the
        // way it dominates a real candidate's decision, not get averaged
        // away by neutral signals like company-size or industry fit.
        let feature_weights = [("pref_salary", 15.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            category_weights,
            feature_weights,
        }
    }
}

impl ScoringConfig {
    pub fn feature_weight(&self, feature: &str) -> f64 {
        self.feature_weights.get(feature).copied().unwrap_or(1.0)
    }
}
