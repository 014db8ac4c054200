use concord_geo::{GeoClient, TravelMode};

use crate::model::{CandidateProfile, CompanySize, ContractType, JobPosting, TravelWillingness, WorkMode};

use super::FeatureMap;

/// Preference generator (prefix `pref_`), §4.4.
pub async fn generate(
    candidate: &CandidateProfile,
    job: &JobPosting,
    geo: Option<&GeoClient>,
) -> FeatureMap {
    let mut features = FeatureMap::new();

    features.insert(
        "pref_location".to_string(),
        location_score(candidate, job, geo).await,
    );
    features.insert("pref_salary".to_string(), salary_score(candidate, job));
    features.insert(
        "pref_work_mode".to_string(),
        work_mode_score(candidate.preferences.preferred_work_mode, job.work_mode),
    );
    features.insert(
        "pref_contract".to_string(),
        contract_score(candidate.preferences.preferred_contract_type, job.contract_type),
    );
    features.insert(
        "pref_company_size".to_string(),
        company_size_score(candidate.preferences.preferred_company_size),
    );
    features.insert(
        "pref_industry".to_string(),
        industry_score(&candidate.preferences.preferred_industries, &job.industry),
    );
    features.insert(
        "pref_travel_willingness".to_string(),
        travel_score(candidate.preferences.travel_willingness, job),
    );

    features
}

async fn location_score(candidate: &CandidateProfile, job: &JobPosting, geo: Option<&GeoClient>) -> f64 {
    if candidate.location.is_empty() || job.location.is_empty() {
        return 0.5;
    }
    let candidate_loc = candidate.location.to_lowercase();
    let job_loc = job.location.to_lowercase();
    if candidate_loc == job_loc {
        return 1.0;
    }
    if candidate_loc.contains(&job_loc) || job_loc.contains(&candidate_loc) {
        return 0.9;
    }
    match geo {
        Some(client) => {
            match client
                .travel_time(&candidate.location, &job.location, TravelMode::Driving)
                .await
            {
                Ok(minutes) => {
                    // Approximate km from minutes at ~50 km/h average driving speed,
                    // then apply the decay bands from §4.4.
                    let km = minutes as f64 * (50.0 / 60.0);
                    if km < 10.0 {
                        0.9
                    } else if km < 30.0 {
                        0.7
                    } else if km < 100.0 {
                        0.5
                    } else if km < 300.0 {
                        0.3
                    } else {
                        0.1
                    }
                }
                Err(_) => 0.3, // substring heuristic fallback, per S4
            }
        }
        None => 0.3,
    }
}

fn salary_score(candidate: &CandidateProfile, job: &JobPosting) -> f64 {
    let (cmin, cmax) = (
        candidate.preferences.expected_salary.min,
        candidate.preferences.expected_salary.max,
    );
    let (jmin, jmax) = (job.salary_range.min, job.salary_range.max);
    if cmax <= 0 || jmax <= 0 {
        return 0.5;
    }
    if jmin >= cmax {
        return 0.9; // job strictly dominates candidate ask
    }
    let overlap_start = cmin.max(jmin);
    let overlap_end = cmax.min(jmax);
    if overlap_end <= overlap_start {
        // No overlap: candidate expects strictly more than the job offers.
        let gap_ratio = (cmin - jmax) as f64 / jmax.max(1) as f64;
        return (0.2 - gap_ratio.min(0.2)).max(0.0);
    }
    let overlap = (overlap_end - overlap_start) as f64;
    let span = (cmax - cmin).max(jmax - jmin).max(1) as f64;
    (overlap / span).clamp(0.0, 1.0)
}

fn work_mode_score(preferred: Option<WorkMode>, offered: WorkMode) -> f64 {
    let Some(preferred) = preferred else { return 0.5 };
    match (preferred, offered) {
        (a, b) if a == b => 1.0,
        (WorkMode::Remote, WorkMode::Office) | (WorkMode::Office, WorkMode::Remote) => 0.2,
        (WorkMode::Hybrid, _) | (_, WorkMode::Hybrid) => 0.7,
    }
}

fn contract_score(preferred: Option<ContractType>, offered: ContractType) -> f64 {
    let Some(preferred) = preferred else { return 0.5 };
    if preferred == offered {
        return 1.0;
    }
    use ContractType::*;
    match (preferred, offered) {
        (Permanent, FixedTerm) | (FixedTerm, Permanent) => 0.6,
        (Contract, Freelance) | (Freelance, Contract) => 0.8,
        (Internship, _) | (_, Internship) => 0.3,
        _ => 0.4,
    }
}

fn company_size_score(preferred: Option<CompanySize>) -> f64 {
    // No explicit company size is carried on JobPosting in this data model;
    // absent a job-side signal this feature is neutral whenever a preference
    // exists, and fully neutral when neither side expresses one.
    match preferred {
        Some(_) => 0.5,
        None => 0.5,
    }
}

fn industry_score(preferred: &[String], offered: &str) -> f64 {
    if preferred.is_empty() || offered.is_empty() {
        return 0.5;
    }
    let offered_lower = offered.to_lowercase();
    if preferred.iter().any(|p| p.to_lowercase() == offered_lower) {
        1.0
    } else {
        0.3
    }
}

fn travel_score(candidate_willingness: TravelWillingness, job: &JobPosting) -> f64 {
    // The job side of travel requirement is approximated from work mode:
    // office/hybrid roles imply some commute, remote implies none.
    let job_requirement = match job.work_mode {
        WorkMode::Remote => TravelWillingness::None,
        WorkMode::Hybrid => TravelWillingness::Low,
        WorkMode::Office => TravelWillingness::Medium,
    };
    if candidate_willingness >= job_requirement {
        1.0
    } else {
        let gap = job_requirement as i32 - candidate_willingness as i32;
        (1.0 - (gap as f64) * 0.3).max(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SalaryRange;

    fn candidate(location: &str) -> CandidateProfile {
        CandidateProfile {
            id: "c1".into(),
            name: "A".into(),
            skills: vec![],
            experiences: vec![],
            education: vec![],
            languages: vec![],
            location: location.to_string(),
            preferences: Default::default(),
            values: vec![],
            free_text: String::new(),
        }
    }

    fn job(location: &str, work_mode: WorkMode) -> JobPosting {
        JobPosting {
            id: "j1".into(),
            title: "Engineer".into(),
            company: "Acme".into(),
            required_skills: vec![],
            preferred_skills: vec![],
            location: location.to_string(),
            min_years_experience: 0,
            max_years_experience: 0,
            required_education_level: Default::default(),
            salary_range: Default::default(),
            work_mode,
            contract_type: ContractType::Permanent,
            industry: String::new(),
            free_text: String::new(),
        }
    }

    #[tokio::test]
    async fn same_city_is_perfect_match() {
        let features = generate(&candidate("Paris"), &job("Paris", WorkMode::Remote), None).await;
        assert_eq!(features["pref_location"], 1.0);
    }

    #[test]
    fn work_mode_remote_vs_office_is_low() {
        assert_eq!(work_mode_score(Some(WorkMode::Remote), WorkMode::Office), 0.2);
    }

    #[test]
    fn work_mode_hybrid_pivots() {
        assert_eq!(work_mode_score(Some(WorkMode::Hybrid), WorkMode::Remote), 0.7);
        assert_eq!(work_mode_score(Some(WorkMode::Hybrid), WorkMode::Office), 0.7);
    }

    #[test]
    fn salary_job_dominates_candidate_ask() {
        let mut c = candidate("Paris");
        c.preferences.expected_salary = SalaryRange { min: 40000, max: 50000 };
        let mut j = job("Paris", WorkMode::Remote);
        j.salary_range = crate::model::JobSalaryRange { min: 55000, max: 70000 };
        assert_eq!(salary_score(&c, &j), 0.9);
    }

    #[test]
    fn salary_severe_mismatch_is_low() {
        let mut c = candidate("Paris");
        c.preferences.expected_salary = SalaryRange { min: 80000, max: 100000 };
        let mut j = job("Paris", WorkMode::Remote);
        j.salary_range = crate::model::JobSalaryRange { min: 40000, max: 50000 };
        assert!(salary_score(&c, &j) <= 0.20);
    }
}
