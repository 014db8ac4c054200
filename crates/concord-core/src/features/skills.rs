use crate::model::{CandidateProfile, JobPosting, Skill};
use crate::taxonomy::{SkillCategory, SkillsTaxonomy};
use crate::traits::{cosine_similarity, mean_pool, EmbeddingsProvider};

use super::FeatureMap;

/// Substring match, used by `skills_coverage`'s "partial-substring" branch.
fn is_partial_match(candidate: &str, required: &str) -> bool {
    candidate.contains(required) || required.contains(candidate)
}

fn best_candidate_match<'a>(
    taxonomy: &SkillsTaxonomy,
    required: &Skill,
    candidate_skills: &'a [Skill],
) -> Option<(&'a Skill, f64)> {
    let required_canon = taxonomy.canonical(&required.name);
    candidate_skills
        .iter()
        .filter_map(|c| {
            let candidate_canon = taxonomy.canonical(&c.name);
            if candidate_canon == required_canon {
                Some((c, 1.0))
            } else if is_partial_match(&candidate_canon, &required_canon) {
                Some((c, 0.85))
            } else {
                let d = taxonomy.taxonomy_distance(&c.name, &required.name);
                if d > 0.0 {
                    Some((c, d))
                } else {
                    None
                }
            }
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
}

/// Skills generator (prefix `skills_`). Operations on required-vs-candidate
/// skill sets, §4.4.
pub async fn generate(
    candidate: &CandidateProfile,
    job: &JobPosting,
    taxonomy: &SkillsTaxonomy,
    embeddings: Option<&dyn EmbeddingsProvider>,
) -> FeatureMap {
    let mut features = FeatureMap::new();

    let required = &job.required_skills;

    // skills_exact_f1 — 2PR/(P+R) over canonical-equality intersection.
    let exact_f1 = if required.is_empty() {
        1.0
    } else if candidate.skills.is_empty() {
        0.0
    } else {
        let matched = required
            .iter()
            .filter(|r| {
                candidate
                    .skills
                    .iter()
                    .any(|c| taxonomy.canonical(&c.name) == taxonomy.canonical(&r.name))
            })
            .count() as f64;
        let precision = matched / candidate.skills.len() as f64;
        let recall = matched / required.len() as f64;
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    };
    features.insert("skills_exact_f1".to_string(), exact_f1);

    // skills_coverage — any-of {exact, partial-substring, taxonomy-match},
    // with a level-mismatch penalty on required-but-underleveled skills.
    let coverage = if required.is_empty() {
        1.0
    } else if candidate.skills.is_empty() {
        0.0
    } else {
        let total: f64 = required
            .iter()
            .map(|r| match best_candidate_match(taxonomy, r, &candidate.skills) {
                Some((matched_skill, _)) if matched_skill.level < r.level => {
                    matched_skill.level.weight() / r.level.weight()
                }
                Some(_) => 1.0,
                None => 0.0,
            })
            .sum();
        total / required.len() as f64
    };
    features.insert("skills_coverage".to_string(), coverage.clamp(0.0, 1.0));

    // skills_semantic — cosine of mean-pooled embeddings. Omitted entirely
    // (not zero-filled) when no embeddings provider is configured: the
    // capability is simply absent rather than scoring as a semantic mismatch.
    if let Some(provider) = embeddings {
        if !candidate.skills.is_empty() && !required.is_empty() {
            let candidate_names: Vec<String> = candidate.skills.iter().map(|s| s.name.clone()).collect();
            let job_names: Vec<String> = required.iter().map(|s| s.name.clone()).collect();
            if let (Ok(candidate_vecs), Ok(job_vecs)) =
                (provider.embed(&candidate_names).await, provider.embed(&job_names).await)
            {
                if !candidate_vecs.is_empty() && !job_vecs.is_empty() {
                    features.insert(
                        "skills_semantic".to_string(),
                        cosine_similarity(&mean_pool(&candidate_vecs), &mean_pool(&job_vecs)),
                    );
                }
            }
        }
    }

    // skills_taxonomy — mean over job skills of max taxonomyDistance to any
    // candidate skill.
    let taxonomy_score = if required.is_empty() {
        1.0
    } else if candidate.skills.is_empty() {
        0.0
    } else {
        let total: f64 = required
            .iter()
            .map(|r| {
                candidate
                    .skills
                    .iter()
                    .map(|c| taxonomy.taxonomy_distance(&c.name, &r.name))
                    .fold(0.0_f64, f64::max)
            })
            .sum();
        total / required.len() as f64
    };
    features.insert("skills_taxonomy".to_string(), taxonomy_score);

    // skills_<cat>_coverage — per-category coverage over all job skills
    // (required + preferred).
    let all_job_skills: Vec<&Skill> = job
        .required_skills
        .iter()
        .chain(job.preferred_skills.iter())
        .collect();
    for cat in [
        SkillCategory::Technical,
        SkillCategory::Soft,
        SkillCategory::Language,
        SkillCategory::Methodology,
        SkillCategory::Domain,
    ] {
        let cat_skills: Vec<&&Skill> = all_job_skills
            .iter()
            .filter(|s| taxonomy.category(&s.name) == cat)
            .collect();
        // A category the job doesn't ask for at all carries no signal; omit
        // rather than insert a vacuous 1.0 that would dilute categories the
        // job actually requires.
        if cat_skills.is_empty() {
            continue;
        }
        let key = format!("skills_{}_coverage", category_label(cat));
        let covered = cat_skills
            .iter()
            .filter(|s| {
                candidate
                    .skills
                    .iter()
                    .any(|c| taxonomy.taxonomy_distance(&c.name, &s.name) > 0.0)
            })
            .count() as f64;
        features.insert(key, covered / cat_skills.len() as f64);
    }

    features
}

fn category_label(cat: SkillCategory) -> &'static str {
    match cat {
        SkillCategory::Technical => "technical",
        SkillCategory::Soft => "soft",
        SkillCategory::Language => "language",
        SkillCategory::Methodology => "methodology",
        SkillCategory::Domain => "domain",
    }
}
