use chrono::Local;

use crate::model::{total_years_of_experience, CandidateProfile, JobPosting};

use super::FeatureMap;

/// Experience sub-score (SPEC_FULL §4.4 ADDED): the sole feature feeding the
/// `experience` category. `1.0` within `[min,max]` (or `>= min` when
/// `max == 0`, i.e. unbounded); `ratio * 0.8` below `min`; `0.9` above `max`.
pub fn generate(candidate: &CandidateProfile, job: &JobPosting) -> FeatureMap {
    let as_of = Local::now().date_naive();
    let candidate_years = total_years_of_experience(&candidate.experiences, as_of);
    let min = job.min_years_experience as f64;
    let max = job.max_years_experience as f64;

    let score = if candidate_years < min {
        if min == 0.0 {
            1.0
        } else {
            (candidate_years / min) * 0.8
        }
    } else if max == 0.0 || candidate_years <= max {
        1.0
    } else {
        0.9
    };

    let mut features = FeatureMap::new();
    features.insert("experience_years".to_string(), score.clamp(0.0, 1.0));
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Experience;
    use chrono::NaiveDate;

    fn candidate_with_years(years: i64) -> CandidateProfile {
        let today = Local::now().date_naive();
        let start = today - chrono::Duration::days(years * 365);
        CandidateProfile {
            id: "c1".into(),
            name: "A".into(),
            skills: vec![],
            experiences: vec![Experience {
                title: "Engineer".into(),
                company: "Acme".into(),
                start_date: start,
                end_date: None,
                description: String::new(),
            }],
            education: vec![],
            languages: vec![],
            location: String::new(),
            preferences: Default::default(),
            values: vec![],
            free_text: String::new(),
        }
    }

    fn job_with_range(min: i64, max: i64) -> JobPosting {
        JobPosting {
            id: "j1".into(),
            title: "Engineer".into(),
            company: "Acme".into(),
            required_skills: vec![],
            preferred_skills: vec![],
            location: String::new(),
            min_years_experience: min,
            max_years_experience: max,
            required_education_level: Default::default(),
            salary_range: Default::default(),
            work_mode: crate::model::WorkMode::Remote,
            contract_type: crate::model::ContractType::Permanent,
            industry: String::new(),
            free_text: String::new(),
        }
    }

    #[test]
    fn within_range_is_full_score() {
        let features = generate(&candidate_with_years(5), &job_with_range(3, 7));
        assert_eq!(features["experience_years"], 1.0);
    }

    #[test]
    fn below_min_is_partial_credit() {
        let features = generate(&candidate_with_years(1), &job_with_range(4, 7));
        assert!(features["experience_years"] < 1.0 && features["experience_years"] > 0.0);
    }

    #[test]
    fn above_max_is_point_nine() {
        let features = generate(&candidate_with_years(15), &job_with_range(3, 7));
        assert_eq!(features["experience_years"], 0.9);
    }

    #[test]
    fn unbounded_max_above_min_is_full_score() {
        let features = generate(&candidate_with_years(20), &job_with_range(3, 0));
        assert_eq!(features["experience_years"], 1.0);
    }

    #[test]
    fn zero_min_with_no_experience_is_full_score() {
        let mut candidate = candidate_with_years(0);
        candidate.experiences.clear();
        let features = generate(&candidate, &job_with_range(0, 0));
        assert_eq!(features["experience_years"], 1.0);
    }

    #[test]
    #[allow(unused)]
    fn uses_naive_date_arithmetic() {
        let _ = NaiveDate::from_ymd_opt(2020, 1, 1);
    }
}
