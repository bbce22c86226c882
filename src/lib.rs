//! Intern Match - candidate-to-internship recommendation service
//!
//! This library scores internships for a candidate on skill overlap, distance
//! and stated preferences, ranks them with short explanations, and serves the
//! results through a per-candidate cache. It also covers batch runs, reverse
//! matching (best candidates for one internship) and outcome analytics.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{haversine_distance, EngineError, Matcher, ReverseMatcher, ScoreCalculator, SkillMatcher};
pub use models::{Candidate, Internship, MatchResult, MatchingPolicy, Recommendations};
pub use services::{CandidateInput, InMemoryStore, RecommendationService, RecommendationStore};
