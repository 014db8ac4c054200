pub mod aggregator;
pub mod config;
pub mod error;
pub mod explainer;
pub mod features;
pub mod matcher;
pub mod model;
pub mod selector;
pub mod taxonomy;
pub mod traits;

pub use config::ScoringConfig;
pub use error::MatchError;
pub use explainer::{Explainer, Explanation};
pub use matcher::{MLRanker, Matcher, RuleMatcher, SemanticMatcher};
pub use model::{CandidateProfile, JobPosting, MatchOptions, MatchRequest, MatchResult};
pub use selector::AlgorithmSelector;
pub use taxonomy::{SkillsTaxonomy, TaxonomyHandle};
pub use traits::{DocumentExtractor, EmbeddingsProvider, ExtractedProfile, ProfileStore, Ranker};
