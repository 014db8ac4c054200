//! End-to-end scenarios against a real `RuleMatcher` + `GeoClient`, no
//! mocking of the scoring pipeline itself.

use std::sync::Arc;

use async_trait::async_trait;
use concord_cache::{CacheConfig, CacheTier};
use concord_core::model::{
    CandidateProfile, ContractType, Education, EducationLevel, Experience, JobPosting, JobSalaryRange,
    MatchCategory, Preferences, SalaryRange, Skill, SkillLevel, WorkMode,
};
use concord_core::{Matcher, MatchRequest, RuleMatcher, ScoringConfig, TaxonomyHandle};
use concord_geo::{DistanceMatrix, GeoClient, GeoClientConfig, GeoError, GeoMode, GeoUpstream, Location, TravelMode};

const SHARED_PITCH: &str =
    "Led the backend team, built scalable Python services, and delivered reliable infrastructure improvements for Acme Corp.";

fn base_candidate() -> CandidateProfile {
    let start_date = chrono::Local::now().date_naive() - chrono::Duration::days(5 * 365);
    CandidateProfile {
        id: "cand-1".to_string(),
        name: "Jordan".to_string(),
        skills: vec![Skill {
            name: "Python".to_string(),
            level: SkillLevel::Expert,
            weight: 1.0,
            required: true,
        }],
        experiences: vec![Experience {
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            start_date,
            end_date: None,
            description: String::new(),
        }],
        education: vec![Education {
            institution: "State U".to_string(),
            degree: "BSc".to_string(),
            field: "CS".to_string(),
            level: EducationLevel::Bachelor,
        }],
        languages: vec![],
        location: "Paris".to_string(),
        preferences: Preferences {
            expected_salary: SalaryRange { min: 55_000, max: 70_000 },
            preferred_work_mode: Some(WorkMode::Remote),
            preferred_contract_type: Some(ContractType::Permanent),
            preferred_industries: vec!["Software".to_string()],
            ..Preferences::default()
        },
        values: vec![],
        free_text: SHARED_PITCH.to_string(),
    }
}

fn base_job() -> JobPosting {
    JobPosting {
        id: "job-1".to_string(),
        title: "Backend Engineer".to_string(),
        company: "Acme".to_string(),
        required_skills: vec![Skill {
            name: "Python".to_string(),
            level: SkillLevel::Advanced,
            weight: 1.0,
            required: true,
        }],
        preferred_skills: vec![],
        location: "Paris".to_string(),
        min_years_experience: 3,
        max_years_experience: 7,
        required_education_level: EducationLevel::None,
        salary_range: JobSalaryRange { min: 55_000, max: 70_000 },
        work_mode: WorkMode::Remote,
        contract_type: ContractType::Permanent,
        industry: "Software".to_string(),
        free_text: SHARED_PITCH.to_string(),
    }
}

fn rule_matcher(geo: Option<Arc<GeoClient>>) -> RuleMatcher {
    RuleMatcher::new(TaxonomyHandle::embedded(), geo, None, ScoringConfig::default())
}

fn fresh_geo(upstream: Option<Arc<dyn GeoUpstream>>, mode: GeoMode) -> Arc<GeoClient> {
    let cache = Arc::new(CacheTier::new(CacheConfig::default()));
    Arc::new(GeoClient::new(
        GeoClientConfig { mode, ..GeoClientConfig::default() },
        cache,
        upstream,
    ))
}

#[tokio::test]
async fn s1_perfect_technical_match() {
    let matcher = rule_matcher(Some(fresh_geo(None, GeoMode::Simulation)));
    let request = MatchRequest {
        candidate: base_candidate(),
        job: base_job(),
        options: Default::default(),
    };

    let result = matcher.score(&request).await.unwrap();

    assert!(result.overall_score >= 0.85, "overall_score = {}", result.overall_score);
    assert_eq!(result.category, MatchCategory::Excellent);
    assert!(result.category_scores["skills"] >= 0.95);
    assert!(result.missing.is_empty());
    assert!(result.algorithm_used.starts_with("rule"));
}

#[tokio::test]
async fn s2_missing_required_skill() {
    let mut candidate = base_candidate();
    candidate.skills.retain(|s| s.name != "Python");

    let matcher = rule_matcher(Some(fresh_geo(None, GeoMode::Simulation)));
    let request = MatchRequest {
        candidate,
        job: base_job(),
        options: Default::default(),
    };

    let result = matcher.score(&request).await.unwrap();

    assert!(result.overall_score < 0.40, "overall_score = {}", result.overall_score);
    assert!(result
        .missing
        .iter()
        .any(|m| m.skill.eq_ignore_ascii_case("python") && m.required));
}

#[tokio::test]
async fn s3_salary_mismatch_scores_lower_but_still_decent() {
    let mut candidate = base_candidate();
    candidate.preferences.expected_salary = SalaryRange { min: 80_000, max: 100_000 };
    let mut job = base_job();
    job.salary_range = JobSalaryRange { min: 40_000, max: 50_000 };

    let matcher = rule_matcher(Some(fresh_geo(None, GeoMode::Simulation)));
    let perfect = matcher
        .score(&MatchRequest { candidate: base_candidate(), job: base_job(), options: Default::default() })
        .await
        .unwrap();
    let mismatched = matcher
        .score(&MatchRequest { candidate, job, options: Default::default() })
        .await
        .unwrap();

    assert!(mismatched.category_scores["preferences"] <= 0.30);
    assert!(mismatched.overall_score < perfect.overall_score);
    assert_eq!(mismatched.category, MatchCategory::Good);
}

struct AlwaysFailingUpstream;

#[async_trait]
impl GeoUpstream for AlwaysFailingUpstream {
    async fn directions(&self, _origin: &str, _destination: &str, _mode: TravelMode) -> Result<i64, GeoError> {
        Err(GeoError::Upstream("simulated upstream outage".to_string()))
    }

    async fn geocode(&self, _address: &str) -> Result<Location, GeoError> {
        Err(GeoError::Upstream("simulated upstream outage".to_string()))
    }

    async fn matrix(
        &self,
        _origins: &[String],
        _destinations: &[String],
        _mode: TravelMode,
    ) -> Result<DistanceMatrix, GeoError> {
        Err(GeoError::Upstream("simulated upstream outage".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn s4_geo_failures_never_fail_the_overall_match() {
    let geo = fresh_geo(Some(Arc::new(AlwaysFailingUpstream)), GeoMode::ApiOnly);
    let matcher = rule_matcher(Some(geo));

    let mut candidate = base_candidate();
    candidate.location = "Lyon".to_string();
    let mut job = base_job();
    job.location = "Marseille".to_string();

    for attempt in 0..6 {
        let request = MatchRequest {
            candidate: candidate.clone(),
            job: job.clone(),
            options: concord_core::model::MatchOptions {
                with_commute_time: true,
                ..Default::default()
            },
        };
        let result = matcher.score(&request).await;
        assert!(result.is_ok(), "attempt {attempt} should still produce a match, got {result:?}");
        let result = result.unwrap();
        assert!((0.0..=1.0).contains(&result.overall_score));
        let pref = result.category_scores["preferences"];
        assert!((0.0..=1.0).contains(&pref), "attempt {attempt}: preferences = {pref}");
    }
}
