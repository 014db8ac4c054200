use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Junior,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    /// Mapping used by the level-mismatch penalty in §4.4's skills generator.
    pub fn weight(self) -> f64 {
        match self {
            SkillLevel::Beginner => 0.5,
            SkillLevel::Junior => 0.6,
            SkillLevel::Intermediate => 0.8,
            SkillLevel::Advanced => 0.9,
            SkillLevel::Expert => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub level: SkillLevel,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub required: bool,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    None,
    HighSchool,
    Bachelor,
    Master,
    Doctorate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub level: EducationLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageProficiency {
    Basic,
    Conversational,
    Professional,
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub proficiency: LanguageProficiency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

impl Experience {
    /// Years this single experience spans, measured to `asOf` (or today's
    /// date for still-current roles, per the caller).
    pub fn years(&self, as_of: NaiveDate) -> f64 {
        let end = self.end_date.unwrap_or(as_of).min(as_of);
        if end <= self.start_date {
            return 0.0;
        }
        (end - self.start_date).num_days() as f64 / 365.25
    }
}

/// Sums non-overlapping experience ranges into a total years figure, used by
/// the experience sub-score (§4.4 ADDED) and by `minYearsExperience` /
/// `maxYearsExperience` boundary checks.
pub fn total_years_of_experience(experiences: &[Experience], as_of: NaiveDate) -> f64 {
    if experiences.is_empty() {
        return 0.0;
    }
    let mut ranges: Vec<(NaiveDate, NaiveDate)> = experiences
        .iter()
        .map(|e| (e.start_date, e.end_date.unwrap_or(as_of).min(as_of)))
        .filter(|(start, end)| end > start)
        .collect();
    ranges.sort_by_key(|r| r.0);

    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    for (start, end) in ranges.drain(..) {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                if end > *last_end {
                    *last_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }

    merged
        .iter()
        .map(|(start, end)| (*end - *start).num_days() as f64 / 365.25)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    Remote,
    Hybrid,
    Office,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Permanent,
    FixedTerm,
    Contract,
    Freelance,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Startup,
    Small,
    Medium,
    Large,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelWillingness {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default)]
    pub expected_salary: SalaryRange,
    #[serde(default)]
    pub preferred_work_mode: Option<WorkMode>,
    #[serde(default)]
    pub preferred_contract_type: Option<ContractType>,
    #[serde(default)]
    pub preferred_company_size: Option<CompanySize>,
    #[serde(default)]
    pub preferred_industries: Vec<String>,
    #[serde(default)]
    pub max_commute_minutes: Option<i64>,
    #[serde(default = "default_travel_willingness")]
    pub travel_willingness: TravelWillingness,
}

fn default_travel_willingness() -> TravelWillingness {
    TravelWillingness::None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub free_text: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct JobSalaryRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub required_skills: Vec<Skill>,
    #[serde(default)]
    pub preferred_skills: Vec<Skill>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub min_years_experience: i64,
    /// 0 means unbounded.
    #[serde(default)]
    pub max_years_experience: i64,
    #[serde(default)]
    pub required_education_level: EducationLevel,
    #[serde(default)]
    pub salary_range: JobSalaryRange,
    pub work_mode: WorkMode,
    pub contract_type: ContractType,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub free_text: String,
}

impl Default for EducationLevel {
    fn default() -> Self {
        EducationLevel::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOptions {
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub with_commute_time: bool,
    #[serde(default)]
    pub algorithm_hint: Option<String>,
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    #[serde(default = "default_cache_ttl", with = "duration_seconds")]
    pub cache_ttl: Duration,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

impl Default for MatchOptions {
    /// Hand-written rather than derived so this stays in lockstep with the
    /// serde field defaults above (`enable_fallback = true`, `cache_ttl =
    /// 1h`) instead of silently diverging to zero-valued derived defaults.
    fn default() -> Self {
        Self {
            max_results: None,
            min_score: None,
            with_commute_time: false,
            algorithm_hint: None,
            enable_fallback: default_true(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub candidate: CandidateProfile,
    pub job: JobPosting,
    pub options: MatchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchCategory {
    Excellent,
    Good,
    Average,
    Poor,
}

impl MatchCategory {
    /// Fixed thresholds from §4.5 — part of the external contract.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.80 {
            MatchCategory::Excellent
        } else if score >= 0.60 {
            MatchCategory::Good
        } else if score >= 0.40 {
            MatchCategory::Average
        } else {
            MatchCategory::Poor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub candidate_level: Option<SkillLevel>,
    pub required_level: Option<SkillLevel>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingRequirement {
    pub skill: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub feature: String,
    pub value: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub overall_score: f64,
    pub category: MatchCategory,
    pub category_scores: HashMap<String, f64>,
    pub matches: Vec<SkillMatch>,
    pub missing: Vec<MissingRequirement>,
    pub strengths: Vec<Factor>,
    pub gaps: Vec<Factor>,
    pub commute_minutes: Option<i64>,
    pub algorithm_used: String,
    #[serde(with = "duration_millis")]
    pub latency: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// The fixed set of keys `MatchResult.categoryScores` must use (§3).
pub const CATEGORY_KEYS: [&str; 5] = ["skills", "cultural", "textual", "preferences", "experience"];

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn category_thresholds_match_spec() {
        assert_eq!(MatchCategory::from_score(0.80), MatchCategory::Excellent);
        assert_eq!(MatchCategory::from_score(0.79), MatchCategory::Good);
        assert_eq!(MatchCategory::from_score(0.60), MatchCategory::Good);
        assert_eq!(MatchCategory::from_score(0.40), MatchCategory::Average);
        assert_eq!(MatchCategory::from_score(0.0), MatchCategory::Poor);
    }

    #[test]
    fn overlapping_experiences_are_not_double_counted() {
        let experiences = vec![
            Experience {
                title: "A".into(),
                company: "X".into(),
                start_date: date(2018, 1, 1),
                end_date: Some(date(2020, 1, 1)),
                description: String::new(),
            },
            Experience {
                title: "B".into(),
                company: "Y".into(),
                start_date: date(2019, 1, 1),
                end_date: Some(date(2021, 1, 1)),
                description: String::new(),
            },
        ];
        let years = total_years_of_experience(&experiences, date(2022, 1, 1));
        assert!((years - 3.0).abs() < 0.05);
    }

    #[test]
    fn empty_experiences_is_zero_years() {
        assert_eq!(total_years_of_experience(&[], date(2022, 1, 1)), 0.0);
    }
}
