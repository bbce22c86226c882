// Core algorithm exports
pub mod analytics;
pub mod distance;
pub mod error;
pub mod filters;
pub mod matcher;
pub mod reverse;
pub mod scoring;
pub mod skills;

pub use analytics::{PerformanceAnalyzer, PerformanceReport};
pub use distance::{distance_km, haversine_distance, validate_coordinate, GeoError};
pub use error::EngineError;
pub use filters::{calculate_preference_score, distance_decay, passes_distance_filter, PreferenceFit};
pub use matcher::Matcher;
pub use reverse::ReverseMatcher;
pub use scoring::{Evaluation, Exclusion, HardFilter, ScoreCalculator};
pub use skills::{MatchTier, RelatedSkills, SkillMatch, SkillMatcher};
