pub mod cultural;
pub mod experience;
pub mod preference;
pub mod skills;
pub mod textual;

use std::collections::HashMap;

/// Labeled `[0,1]` features keyed by name, e.g. `"skills_exact_f1"`.
pub type FeatureMap = HashMap<String, f64>;

/// Every generator is pure given `(inputs, config, taxonomy version)` per
/// invariant 3 (§8); a failing generator degrades to this instead of
/// propagating an error (§4.4, §7 "Propagation").
pub fn zero_features(keys: &[&str]) -> FeatureMap {
    keys.iter().map(|k| (k.to_string(), 0.0)).collect()
}
