use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

const EMBEDDED_TAXONOMY: &str = include_str!("../assets/skills_taxonomy.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillCategory {
    Technical,
    Soft,
    Language,
    Methodology,
    Domain,
}

impl SkillCategory {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "technical" => Some(SkillCategory::Technical),
            "soft" => Some(SkillCategory::Soft),
            "language" => Some(SkillCategory::Language),
            "methodology" => Some(SkillCategory::Methodology),
            "domain" => Some(SkillCategory::Domain),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTaxonomy {
    skills: Vec<RawSkill>,
}

#[derive(Debug, Deserialize)]
struct RawSkill {
    name: String,
    category: String,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    related: Vec<String>,
}

struct Node {
    canonical: String,
    category: SkillCategory,
    parent: Option<String>,
    related: Vec<String>,
}

/// Directed graph of canonical skill nodes, loaded once from an embedded
/// JSON document and swappable at runtime via [`TaxonomyHandle::reload`].
pub struct SkillsTaxonomy {
    nodes: HashMap<String, Node>,
    synonym_to_canonical: HashMap<String, String>,
}

impl SkillsTaxonomy {
    pub fn from_embedded() -> Self {
        Self::from_json(EMBEDDED_TAXONOMY).expect("embedded taxonomy must parse")
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawTaxonomy = serde_json::from_str(json)?;
        let mut nodes = HashMap::new();
        let mut synonym_to_canonical = HashMap::new();

        for skill in raw.skills {
            let canonical = normalize(&skill.name);
            let category = SkillCategory::parse(&skill.category).unwrap_or(SkillCategory::Technical);
            for synonym in &skill.synonyms {
                synonym_to_canonical.insert(normalize(synonym), canonical.clone());
            }
            nodes.insert(
                canonical.clone(),
                Node {
                    canonical: canonical.clone(),
                    category,
                    parent: skill.parent.as_deref().map(normalize),
                    related: skill.related.iter().map(|s| normalize(s)).collect(),
                },
            );
        }

        Ok(Self {
            nodes,
            synonym_to_canonical,
        })
    }

    /// Lowercases, strips punctuation, resolves synonyms. Unknown terms are
    /// returned unchanged (normalized) rather than erroring.
    pub fn canonical(&self, name: &str) -> String {
        let normalized = normalize(name);
        if self.nodes.contains_key(&normalized) {
            return normalized;
        }
        self.synonym_to_canonical
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    pub fn related(&self, name: &str) -> Vec<String> {
        let canonical = self.canonical(name);
        self.nodes
            .get(&canonical)
            .map(|n| n.related.clone())
            .unwrap_or_default()
    }

    pub fn category(&self, name: &str) -> SkillCategory {
        let canonical = self.canonical(name);
        self.nodes
            .get(&canonical)
            .map(|n| n.category)
            .unwrap_or(SkillCategory::Technical)
    }

    /// `1.0` on canonical equality, `0.9` on synonym, `0.7` on shared parent,
    /// `0.5` on any shared related neighbor, else `0.0`.
    pub fn taxonomy_distance(&self, a: &str, b: &str) -> f64 {
        let raw_a = normalize(a);
        let raw_b = normalize(b);
        let canon_a = self.canonical(a);
        let canon_b = self.canonical(b);

        if canon_a == canon_b {
            if raw_a == raw_b {
                return 1.0;
            }
            // One side resolved through a synonym table to reach the other.
            return 0.9;
        }

        let node_a = self.nodes.get(&canon_a);
        let node_b = self.nodes.get(&canon_b);
        if let (Some(node_a), Some(node_b)) = (node_a, node_b) {
            let parent_a = node_a.parent.as_deref().unwrap_or(&node_a.canonical);
            let parent_b = node_b.parent.as_deref().unwrap_or(&node_b.canonical);
            if parent_a == parent_b && node_a.parent.is_some() && node_b.parent.is_some() {
                return 0.7;
            }
            if node_a.parent.as_deref() == Some(node_b.canonical.as_str())
                || node_b.parent.as_deref() == Some(node_a.canonical.as_str())
            {
                return 0.7;
            }
            if node_a.related.iter().any(|r| node_b.related.contains(r))
                || node_a.related.contains(&node_b.canonical)
                || node_b.related.contains(&node_a.canonical)
            {
                return 0.5;
            }
        }
        0.0
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '.' || *c == '+' || *c == '-')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Atomically-swappable handle so a taxonomy reload never blocks a reader
/// mid-lookup (§5 "Shared resources").
#[derive(Clone)]
pub struct TaxonomyHandle {
    inner: Arc<ArcSwap<SkillsTaxonomy>>,
}

impl TaxonomyHandle {
    pub fn new(taxonomy: SkillsTaxonomy) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(taxonomy)),
        }
    }

    pub fn embedded() -> Self {
        Self::new(SkillsTaxonomy::from_embedded())
    }

    pub fn load(&self) -> Arc<SkillsTaxonomy> {
        self.inner.load_full()
    }

    pub fn reload(&self, taxonomy: SkillsTaxonomy) {
        self.inner.store(Arc::new(taxonomy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_taxonomy_parses() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.canonical("Python"), "python");
    }

    #[test]
    fn synonym_resolves_to_canonical() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.canonical("JS"), "javascript");
        assert_eq!(taxonomy.canonical("k8s"), "kubernetes");
    }

    #[test]
    fn unknown_term_returns_itself() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.canonical("quantum knitting"), "quantum knitting");
    }

    #[test]
    fn distance_exact_match_is_one() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.taxonomy_distance("python", "python"), 1.0);
    }

    #[test]
    fn distance_shared_parent_is_point_seven() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.taxonomy_distance("django", "flask"), 0.7);
    }

    #[test]
    fn distance_parent_child_is_point_seven() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.taxonomy_distance("python", "django"), 0.7);
    }

    #[test]
    fn distance_unrelated_is_zero() {
        let taxonomy = SkillsTaxonomy::from_embedded();
        assert_eq!(taxonomy.taxonomy_distance("python", "healthcare"), 0.0);
    }

    #[test]
    fn reload_swaps_atomically() {
        let handle = TaxonomyHandle::embedded();
        let before = handle.load();
        assert_eq!(before.canonical("python"), "python");
        handle.reload(SkillsTaxonomy::from_json(r#"{"skills":[]}"#).unwrap());
        let after = handle.load();
        assert_eq!(after.canonical("python"), "python"); // unknown term, now returned unchanged
    }
}
