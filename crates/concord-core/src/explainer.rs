use crate::features::FeatureMap;
use crate::model::{Factor, JobPosting, MissingRequirement, SkillMatch};
use crate::taxonomy::SkillsTaxonomy;
use crate::traits::Ranker;

/// Renders per-feature impact, strengths/gaps, and improvement suggestions.
/// Never calls external services (§4.6).
pub struct Explainer;

pub struct Explanation {
    pub strengths: Vec<Factor>,
    pub gaps: Vec<Factor>,
    pub matches: Vec<SkillMatch>,
    pub missing: Vec<MissingRequirement>,
    pub suggestions: Vec<String>,
}

impl Explainer {
    /// Rule-based explanation: ranks features by value and renders a fixed
    /// template.
    pub fn explain(
        features: &FeatureMap,
        candidate_skills: &[crate::model::Skill],
        job: &JobPosting,
        taxonomy: &SkillsTaxonomy,
    ) -> Explanation {
        let mut ranked: Vec<(&String, &f64)> = features.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap());

        let strengths = ranked
            .iter()
            .filter(|(_, v)| **v >= 0.7)
            .take(5)
            .map(|(name, value)| Factor {
                feature: name.to_string(),
                value: **value,
                description: format!("Strong match on {name}: {:.0}%", **value * 100.0),
            })
            .collect();

        let (matches, missing) = Self::skill_breakdown(candidate_skills, job, taxonomy);

        let mut required_gap_candidates: Vec<(&String, &f64)> = ranked
            .iter()
            .filter(|(name, value)| name.starts_with("skills_") && **value < 0.5)
            .cloned()
            .collect();
        required_gap_candidates.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap());
        let gaps: Vec<Factor> = required_gap_candidates
            .into_iter()
            .take(3)
            .map(|(name, value)| Factor {
                feature: name.to_string(),
                value: *value,
                description: format!("Weak match on {name}: {:.0}%", *value * 100.0),
            })
            .collect();

        let suggestions = if missing.is_empty() {
            Vec::new()
        } else {
            let names: Vec<&str> = missing.iter().map(|m| m.skill.as_str()).collect();
            vec![format!("Develop: {}", names.join(", "))]
        };

        Explanation {
            strengths,
            gaps,
            matches,
            missing,
            suggestions,
        }
    }

    /// Attribution mode: when the matcher is the ML ranker, computes
    /// feature contributions via the model's own importance table instead
    /// of raw feature value ranking.
    pub fn explain_with_attribution(
        features: &FeatureMap,
        candidate_skills: &[crate::model::Skill],
        job: &JobPosting,
        taxonomy: &SkillsTaxonomy,
        ranker: &dyn Ranker,
    ) -> Explanation {
        let importance = ranker.feature_importance();
        let mut contributions: FeatureMap = features
            .iter()
            .map(|(name, value)| {
                let weight = importance.get(name).copied().unwrap_or(0.0);
                (name.clone(), value * weight)
            })
            .collect();

        let mut ranked: Vec<(&String, &f64)> = contributions.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap());
        let strengths = ranked
            .iter()
            .take(5)
            .map(|(name, value)| Factor {
                feature: name.to_string(),
                value: features.get(*name).copied().unwrap_or(0.0),
                description: format!("Drives score via {name} (attribution {:.3})", **value),
            })
            .collect();

        let (matches, missing) = Self::skill_breakdown(candidate_skills, job, taxonomy);

        ranked.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap());
        let gaps = ranked
            .iter()
            .take(3)
            .map(|(name, value)| Factor {
                feature: name.to_string(),
                value: features.get(*name).copied().unwrap_or(0.0),
                description: format!("Limits score via {name} (attribution {:.3})", **value),
            })
            .collect();

        let suggestions = if missing.is_empty() {
            Vec::new()
        } else {
            let names: Vec<&str> = missing.iter().map(|m| m.skill.as_str()).collect();
            vec![format!("Develop: {}", names.join(", "))]
        };

        contributions.clear();
        Explanation {
            strengths,
            gaps,
            matches,
            missing,
            suggestions,
        }
    }

    fn skill_breakdown(
        candidate_skills: &[crate::model::Skill],
        job: &JobPosting,
        taxonomy: &SkillsTaxonomy,
    ) -> (Vec<SkillMatch>, Vec<MissingRequirement>) {
        let mut matches = Vec::new();
        let mut missing = Vec::new();
        for required in &job.required_skills {
            let found = candidate_skills
                .iter()
                .find(|c| taxonomy.canonical(&c.name) == taxonomy.canonical(&required.name));
            match found {
                Some(candidate_skill) => matches.push(SkillMatch {
                    skill: required.name.clone(),
                    candidate_level: Some(candidate_skill.level),
                    required_level: Some(required.level),
                    score: if candidate_skill.level >= required.level {
                        1.0
                    } else {
                        candidate_skill.level.weight() / required.level.weight()
                    },
                }),
                None => missing.push(MissingRequirement {
                    skill: required.name.clone(),
                    required: required.required,
                }),
            }
        }
        (matches, missing)
    }
}
