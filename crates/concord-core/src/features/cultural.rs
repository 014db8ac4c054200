use crate::model::CandidateProfile;
use crate::traits::{cosine_similarity, mean_pool, EmbeddingsProvider};

use super::textual;
use super::FeatureMap;

const VALUE_CATEGORIES: [(&str, &[&str]); 6] = [
    ("ethics", &["integrity", "honesty", "transparency", "fairness", "trust"]),
    ("performance", &["excellence", "results", "ambition", "ownership", "impact"]),
    ("relationships", &["teamwork", "collaboration", "empathy", "respect", "support"]),
    ("growth", &["learning", "curiosity", "innovation", "improvement", "development"]),
    ("social", &["diversity", "inclusion", "community", "wellbeing", "belonging"]),
    ("stability", &["reliability", "consistency", "security", "stability", "structure"]),
];

fn synonym_expand(values: &[String]) -> std::collections::HashSet<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

/// `JobPosting` carries no explicit values list (§3); job-side values are
/// inferred from `freeText` by keyword presence over the same category
/// vocabulary (§9: free-text inference is the fallback producing the same
/// shape as hand-maintained values).
fn extract_job_values(free_text: &str) -> std::collections::HashSet<String> {
    let lower = free_text.to_lowercase();
    VALUE_CATEGORIES
        .iter()
        .flat_map(|(_, keywords)| keywords.iter())
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect()
}

fn jaccard_f1(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matched = a.intersection(b).count() as f64;
    let precision = matched / a.len() as f64;
    let recall = matched / b.len() as f64;
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Cultural generator (prefix `cultural_`), §4.4. `EmbeddingsProvider` drives
/// `cultural_implicit` when present; otherwise falls back to the same
/// TF-IDF cosine the textual generator uses.
pub async fn generate(
    candidate: &CandidateProfile,
    job_free_text: &str,
    embeddings: Option<&dyn EmbeddingsProvider>,
) -> FeatureMap {
    let mut features = FeatureMap::new();

    let candidate_values = synonym_expand(&candidate.values);
    let job_values_set = extract_job_values(job_free_text);
    features.insert(
        "cultural_values_explicit".to_string(),
        jaccard_f1(&candidate_values, &job_values_set),
    );

    for (cat, keywords) in VALUE_CATEGORIES {
        let candidate_hits = candidate_values
            .iter()
            .filter(|v| keywords.contains(&v.as_str()))
            .count();
        let job_hits = job_values_set
            .iter()
            .filter(|v| keywords.contains(&v.as_str()))
            .count();
        let score = if job_hits == 0 {
            1.0
        } else {
            (candidate_hits.min(job_hits) as f64) / (job_hits as f64)
        };
        features.insert(format!("cultural_{cat}"), score.clamp(0.0, 1.0));
    }

    let implicit = match embeddings {
        Some(provider) if !candidate.free_text.is_empty() && !job_free_text.is_empty() => {
            match provider
                .embed(&[candidate.free_text.clone(), job_free_text.to_string()])
                .await
            {
                Ok(vectors) if vectors.len() == 2 => cosine_similarity(&vectors[0], &vectors[1]),
                _ => 0.0,
            }
        }
        _ => {
            let job_profile_stub = crate::model::JobPosting {
                id: String::new(),
                title: String::new(),
                company: String::new(),
                required_skills: vec![],
                preferred_skills: vec![],
                location: String::new(),
                min_years_experience: 0,
                max_years_experience: 0,
                required_education_level: Default::default(),
                salary_range: Default::default(),
                work_mode: crate::model::WorkMode::Remote,
                contract_type: crate::model::ContractType::Permanent,
                industry: String::new(),
                free_text: job_free_text.to_string(),
            };
            textual::generate(candidate, &job_profile_stub)
                .get("text_tfidf_cosine")
                .copied()
                .unwrap_or(0.0)
        }
    };
    features.insert("cultural_implicit".to_string(), implicit);

    // Management style / environment matrices operate on explicit tag-like
    // values carried in `candidate.values` / `job_values` (e.g.
    // "management:coaching", "pace:fast") rather than separate fields, since
    // the data model has no dedicated slots for them (§9 design notes: the
    // hand-maintained matrices are authoritative; free-text inference is the
    // fallback producing the same shape, which here is "no tag found").
    features.insert(
        "cultural_management_style".to_string(),
        tag_matrix_score(&candidate_values, &job_values_set, "management", &MANAGEMENT_STYLES),
    );
    features.insert(
        "cultural_environment_pace".to_string(),
        tag_matrix_score(&candidate_values, &job_values_set, "pace", &PACE_STYLES),
    );
    features.insert(
        "cultural_environment_formality".to_string(),
        tag_matrix_score(&candidate_values, &job_values_set, "formality", &FORMALITY_STYLES),
    );
    features.insert(
        "cultural_environment_hierarchy".to_string(),
        tag_matrix_score(&candidate_values, &job_values_set, "hierarchy", &HIERARCHY_STYLES),
    );

    features
}

const MANAGEMENT_STYLES: [&str; 5] = ["directive", "democratic", "delegative", "coaching", "situational"];
const PACE_STYLES: [&str; 3] = ["fast", "balanced", "relaxed"];
const FORMALITY_STYLES: [&str; 3] = ["formal", "balanced", "casual"];
const HIERARCHY_STYLES: [&str; 3] = ["flat", "balanced", "hierarchical"];

fn find_tag(values: &std::collections::HashSet<String>, prefix: &str, styles: &[&str]) -> Option<usize> {
    for v in values {
        if let Some(style) = v.strip_prefix(&format!("{prefix}:")) {
            if let Some(idx) = styles.iter().position(|s| *s == style) {
                return Some(idx);
            }
        }
    }
    None
}

/// Distance-decayed score over an ordered style list: adjacent styles score
/// `0.7`, two apart `0.4`, further `0.2`; exact match `1.0`. Absent either
/// side's tag, the feature is neutral (free-text fallback has no signal).
fn tag_matrix_score(
    candidate_values: &std::collections::HashSet<String>,
    job_values: &std::collections::HashSet<String>,
    prefix: &str,
    styles: &[&str],
) -> f64 {
    match (
        find_tag(candidate_values, prefix, styles),
        find_tag(job_values, prefix, styles),
    ) {
        (Some(a), Some(b)) => {
            let distance = (a as i64 - b as i64).unsigned_abs();
            match distance {
                0 => 1.0,
                1 => 0.7,
                2 => 0.4,
                _ => 0.2,
            }
        }
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(values: Vec<&str>, free_text: &str) -> CandidateProfile {
        CandidateProfile {
            id: "c1".into(),
            name: "A".into(),
            skills: vec![],
            experiences: vec![],
            education: vec![],
            languages: vec![],
            location: String::new(),
            preferences: Default::default(),
            values: values.into_iter().map(String::from).collect(),
            free_text: free_text.to_string(),
        }
    }

    #[tokio::test]
    async fn matching_values_score_high() {
        let c = candidate(vec!["integrity", "teamwork"], "");
        let features = generate(&c, "we value integrity and teamwork above all", None).await;
        assert_eq!(features["cultural_values_explicit"], 1.0);
    }

    #[tokio::test]
    async fn no_values_is_zero_not_nan() {
        let c = candidate(vec![], "");
        let features = generate(&c, "", None).await;
        for v in features.values() {
            assert!(!v.is_nan());
        }
    }

    #[test]
    fn management_style_exact_match() {
        let candidate_values: std::collections::HashSet<String> =
            ["management:coaching".to_string()].into_iter().collect();
        let job_values: std::collections::HashSet<String> =
            ["management:coaching".to_string()].into_iter().collect();
        assert_eq!(
            tag_matrix_score(&candidate_values, &job_values, "management", &MANAGEMENT_STYLES),
            1.0
        );
    }
}
