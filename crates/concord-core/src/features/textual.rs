use std::collections::{HashMap, HashSet};

use crate::model::{CandidateProfile, JobPosting};

use super::FeatureMap;

const BM25_K1: f64 = 1.5;
const BM25_B: f64 = 0.75;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<String, f64> {
    let mut tf = HashMap::new();
    for t in tokens {
        *tf.entry(t.clone()).or_insert(0.0) += 1.0;
    }
    tf
}

/// TF-IDF cosine over a two-document corpus (candidate vs job); IDF collapses
/// to presence/absence across the two documents, which is the entire
/// available corpus at scoring time.
fn tfidf_cosine(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let tf_a = term_frequencies(&tokens_a);
    let tf_b = term_frequencies(&tokens_b);
    let vocab: HashSet<&String> = tf_a.keys().chain(tf_b.keys()).collect();

    let idf = |term: &str| -> f64 {
        let doc_count = [tf_a.contains_key(term), tf_b.contains_key(term)]
            .iter()
            .filter(|x| **x)
            .count();
        (1.0 + 2.0 / doc_count as f64).ln()
    };

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for term in vocab {
        let w = idf(term);
        let va = tf_a.get(term).copied().unwrap_or(0.0) * w;
        let vb = tf_b.get(term).copied().unwrap_or(0.0) * w;
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
    }
}

/// BM25 score of `document` queried against `query`, normalized into `[0,1]`
/// via a saturating transform (BM25 is unbounded above).
fn bm25(query: &str, document: &str) -> f64 {
    let query_terms = tokenize(query);
    let doc_terms = tokenize(document);
    if query_terms.is_empty() || doc_terms.is_empty() {
        return 0.0;
    }
    let doc_len = doc_terms.len() as f64;
    let avg_doc_len = doc_len; // single-document corpus at scoring time
    let doc_tf = term_frequencies(&doc_terms);

    let mut score = 0.0;
    let query_set: HashSet<&String> = query_terms.iter().collect();
    for term in query_set {
        let f = doc_tf.get(term).copied().unwrap_or(0.0);
        if f == 0.0 {
            continue;
        }
        // Single-document IDF: a query term present in the only document in
        // the corpus gets the standard BM25 IDF floor.
        let idf = 0.5_f64.ln();
        let numerator = f * (BM25_K1 + 1.0);
        let denominator = f + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / avg_doc_len);
        score += idf.abs() * numerator / denominator;
    }
    // Saturate into [0,1]: a handful of query-term hits already approaches 1.
    (score / (score + 2.0)).clamp(0.0, 1.0)
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

const ACTION_VERBS: &[&str] = &[
    "led", "built", "designed", "implemented", "managed", "developed", "created", "launched",
    "delivered", "improved", "optimized", "architected", "mentored", "drove", "owned",
    "coordinated", "automated", "scaled", "shipped", "reduced", "increased",
];

fn action_verb_set(text: &str) -> HashSet<String> {
    let tokens: HashSet<String> = tokenize(text).into_iter().collect();
    ACTION_VERBS
        .iter()
        .filter(|v| tokens.contains(**v))
        .map(|v| v.to_string())
        .collect()
}

/// A coarse named-entity proxy: capitalized multi-word runs in the original
/// (pre-lowercasing) text, treated as organization/role mentions.
fn entity_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()) && w.len() > 2)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Textual generator (prefix `text_`), §4.4.
pub fn generate(candidate: &CandidateProfile, job: &JobPosting) -> FeatureMap {
    let mut features = FeatureMap::new();

    features.insert(
        "text_tfidf_cosine".to_string(),
        tfidf_cosine(&candidate.free_text, &job.free_text),
    );
    features.insert(
        "text_bm25".to_string(),
        bm25(&job.free_text, &candidate.free_text),
    );
    features.insert(
        "text_title_similarity".to_string(),
        tfidf_cosine(&candidate.name, &job.title),
    );

    let candidate_entities = entity_set(&candidate.free_text);
    let job_entities = entity_set(&job.free_text);
    features.insert(
        "text_entity_overlap".to_string(),
        jaccard(&candidate_entities, &job_entities),
    );

    let candidate_verbs = action_verb_set(&candidate.free_text);
    let job_verbs = action_verb_set(&job.free_text);
    features.insert(
        "text_action_verb_overlap".to_string(),
        jaccard(&candidate_verbs, &job_verbs),
    );

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(free_text: &str) -> CandidateProfile {
        CandidateProfile {
            id: "c1".into(),
            name: "Jane".into(),
            skills: vec![],
            experiences: vec![],
            education: vec![],
            languages: vec![],
            location: String::new(),
            preferences: Default::default(),
            values: vec![],
            free_text: free_text.to_string(),
        }
    }

    fn job(free_text: &str) -> JobPosting {
        JobPosting {
            id: "j1".into(),
            title: "Engineer".into(),
            company: "Acme".into(),
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
            free_text: free_text.to_string(),
        }
    }

    #[test]
    fn identical_text_is_high_similarity() {
        let text = "led the backend team building scalable services";
        let features = generate(&profile(text), &job(text));
        assert!(features["text_tfidf_cosine"] > 0.9);
    }

    #[test]
    fn empty_text_is_zero_not_nan() {
        let features = generate(&profile(""), &job(""));
        assert_eq!(features["text_tfidf_cosine"], 0.0);
        assert_eq!(features["text_bm25"], 0.0);
        for v in features.values() {
            assert!(!v.is_nan());
        }
    }

    #[test]
    fn disjoint_text_is_low_similarity() {
        let features = generate(
            &profile("gardening and watercolor painting"),
            &job("distributed systems and kubernetes"),
        );
        assert!(features["text_tfidf_cosine"] < 0.3);
    }
}
