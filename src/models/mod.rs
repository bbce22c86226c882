// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Candidate, CandidatePreferences, DateRange, DistanceBands, DistancePreference, DurationRange,
    Education, Explanation, Factor, Internship, Location, MatchResult, MatchingPolicy,
    NoMatchReason, Outcome, RankedCandidate, RecommendationEvent, Recommendations, RecordFilter,
    ScoringWeights, Skill, SkillSource, SkillWeights, WorkType,
};
pub use requests::{
    BatchRecommendationsRequest, CachedRecommendationsQuery, CandidateProfile,
    GenerateRecommendationsRequest, PerformanceQuery, RecordOutcomeRequest, SimilarCandidatesQuery,
};
pub use responses::{ApiResponse, ErrorResponse, HealthResponse, RecordOutcomeResponse, ResponseMeta};
