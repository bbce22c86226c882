// Service exports
pub mod batch;
pub mod cache;
pub mod engine;
pub mod postgres;
pub mod seed;
pub mod store;

pub use batch::{BatchFailure, BatchOptions, BatchOrchestrator, BatchReport, BatchSuccess, BatchSummary};
pub use cache::{CacheEntry, CacheKey, CacheLookup, CacheStats, Clock, ManualClock, RecommendationCache, SystemClock};
pub use engine::{
    CacheOptions, CandidateInput, Generated, RecommendationService, Recommender, ServiceOptions,
    StoreRecommender,
};
pub use postgres::{PgOutcome, PoolOptions, PostgresStore};
pub use seed::SeedData;
pub use store::{InMemoryStore, RecommendationStore, StoreError};
