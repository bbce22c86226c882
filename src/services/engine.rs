use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::{validate_coordinate, EngineError, Matcher, PerformanceAnalyzer, PerformanceReport, ReverseMatcher};
use crate::models::{
    Candidate, DateRange, MatchingPolicy, RankedCandidate, RecommendationEvent, Recommendations,
};
use crate::services::batch::{BatchOptions, BatchOrchestrator, BatchReport};
use crate::services::cache::{CacheLookup, CacheStats, Clock, RecommendationCache, SystemClock};
use crate::services::store::RecommendationStore;

/// Produces recommendations for a stored candidate
///
/// Implemented by the uncached store-backed path and by the cache itself, so
/// the batch orchestrator can run against either.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(
        &self,
        candidate_id: &str,
        limit: usize,
    ) -> Result<Arc<Recommendations>, EngineError>;
}

/// Loads a candidate and the catalog, then ranks
pub struct StoreRecommender {
    store: Arc<dyn RecommendationStore>,
    matcher: Matcher,
}

impl StoreRecommender {
    pub fn new(store: Arc<dyn RecommendationStore>, matcher: Matcher) -> Self {
        Self { store, matcher }
    }
}

#[async_trait]
impl Recommender for StoreRecommender {
    async fn recommend(
        &self,
        candidate_id: &str,
        limit: usize,
    ) -> Result<Arc<Recommendations>, EngineError> {
        let candidate = self
            .store
            .load_candidate(candidate_id)
            .await?
            .ok_or_else(|| EngineError::CandidateNotFound(candidate_id.to_string()))?;
        let catalog = self.store.load_internship_catalog(None).await?;

        Ok(Arc::new(self.matcher.top_k(&candidate, &catalog, limit)))
    }
}

/// Who to recommend for
#[derive(Debug, Clone)]
pub enum CandidateInput {
    /// Stored candidate, served through the cache
    Id(String),
    /// Ad-hoc profile, computed directly and never cached
    Profile(Candidate),
}

/// Recommendations plus whether they came from the cache
#[derive(Debug, Clone)]
pub struct Generated {
    pub recommendations: Arc<Recommendations>,
    pub cached: bool,
}

impl From<CacheLookup> for Generated {
    fn from(lookup: CacheLookup) -> Self {
        Self {
            recommendations: Arc::clone(&lookup.entry.recommendations),
            cached: lookup.hit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub capacity: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub default_limit: usize,
    pub default_similar_limit: usize,
    pub cache: CacheOptions,
    pub batch: BatchOptions,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            default_limit: 5,
            default_similar_limit: 10,
            cache: CacheOptions::default(),
            batch: BatchOptions::default(),
        }
    }
}

/// Entry point used by the HTTP layer
pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
    matcher: Matcher,
    reverse: ReverseMatcher,
    analyzer: PerformanceAnalyzer,
    cache: Arc<RecommendationCache>,
    batch: BatchOrchestrator,
    options: ServiceOptions,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn RecommendationStore>,
        policy: MatchingPolicy,
        options: ServiceOptions,
    ) -> Self {
        Self::with_clock(store, policy, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn RecommendationStore>,
        policy: MatchingPolicy,
        options: ServiceOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let matcher = Matcher::new(policy.clone());
        let recommender = Arc::new(StoreRecommender::new(Arc::clone(&store), matcher.clone()));
        let cache = Arc::new(
            RecommendationCache::with_clock(recommender, clock, options.cache.ttl, options.cache.capacity)
                .with_max_limit(policy.max_limit),
        );
        let batch = BatchOrchestrator::new(cache.clone(), options.batch.clone());

        Self {
            store,
            reverse: ReverseMatcher::new(policy),
            matcher,
            analyzer: PerformanceAnalyzer::new(),
            cache,
            batch,
            options,
        }
    }

    pub fn policy(&self) -> &MatchingPolicy {
        self.matcher.policy()
    }

    pub async fn generate_recommendations(
        &self,
        input: CandidateInput,
        limit: Option<usize>,
        force_refresh: bool,
    ) -> Result<Generated, EngineError> {
        let limit = limit.unwrap_or(self.options.default_limit);

        match input {
            CandidateInput::Id(candidate_id) => {
                self.get_cached_recommendations(&candidate_id, Some(limit), force_refresh)
                    .await
            }
            CandidateInput::Profile(candidate) => {
                validate_candidate(&candidate)?;
                let catalog = self.store.load_internship_catalog(None).await?;
                let recommendations = self.matcher.top_k(&candidate, &catalog, limit);

                tracing::debug!(
                    "Ad-hoc recommendations for {}: {} matches",
                    candidate.id,
                    recommendations.matches.len()
                );

                Ok(Generated {
                    recommendations: Arc::new(recommendations),
                    cached: false,
                })
            }
        }
    }

    pub async fn get_cached_recommendations(
        &self,
        candidate_id: &str,
        limit: Option<usize>,
        refresh: bool,
    ) -> Result<Generated, EngineError> {
        let candidate_id = require_id(candidate_id, "candidateId")?;
        let limit = limit.unwrap_or(self.options.default_limit);

        let lookup = self.cache.get(candidate_id, limit, refresh).await?;
        Ok(lookup.into())
    }

    pub async fn get_similar_candidates(
        &self,
        internship_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RankedCandidate>, EngineError> {
        let internship_id = require_id(internship_id, "internshipId")?;
        let internship = self
            .store
            .load_internship(internship_id)
            .await?
            .ok_or_else(|| EngineError::InternshipNotFound(internship_id.to_string()))?;
        let pool = self.store.load_candidate_pool(None).await?;

        Ok(self.reverse.similar_candidates(
            &internship,
            &pool,
            limit.unwrap_or(self.options.default_similar_limit),
        ))
    }

    pub async fn batch_recommendations(
        &self,
        candidate_ids: &[String],
        limit: Option<usize>,
    ) -> Result<BatchReport, EngineError> {
        self.batch
            .batch(candidate_ids, limit.unwrap_or(self.options.default_limit))
            .await
    }

    pub async fn performance_report(&self, range: DateRange) -> Result<PerformanceReport, EngineError> {
        if range.is_inverted() {
            return Err(EngineError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }

        let events = self.store.query_recommendation_events(range).await?;
        Ok(self.analyzer.analyze(&events, range))
    }

    pub async fn record_outcome(&self, event: RecommendationEvent) -> Result<Uuid, EngineError> {
        require_id(&event.candidate_id, "candidateId")?;
        require_id(&event.internship_id, "internshipId")?;

        let id = event.id;
        self.store.record_recommendation_event(event).await?;
        Ok(id)
    }

    pub async fn invalidate_candidate(&self, candidate_id: &str) -> Result<usize, EngineError> {
        let candidate_id = require_id(candidate_id, "candidateId")?;
        Ok(self.cache.invalidate(candidate_id).await)
    }

    /// True when the backing store answers
    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                false
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn require_id<'a>(id: &'a str, field: &str) -> Result<&'a str, EngineError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(EngineError::Validation(format!("{} must not be empty", field)));
    }
    Ok(id)
}

fn validate_candidate(candidate: &Candidate) -> Result<(), EngineError> {
    validate_coordinate(candidate.location.lat, candidate.location.lon)
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    if let Some(skill) = candidate.skills.iter().find(|s| s.canonical.trim().is_empty()) {
        return Err(EngineError::Validation(format!(
            "skill '{}' has an empty canonical name",
            skill.name
        )));
    }
    if let Some(skill) = candidate
        .skills
        .iter()
        .find(|s| !(0.0..=1.0).contains(&s.confidence))
    {
        return Err(EngineError::Validation(format!(
            "confidence for '{}' must be within [0, 1]",
            skill.canonical
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidatePreferences, Education, Location, Skill};
    use crate::services::store::InMemoryStore;

    fn location(lat: f64, lon: f64) -> Location {
        Location {
            lat,
            lon,
            district: "Pune".to_string(),
            state: "Maharashtra".to_string(),
        }
    }

    fn candidate(id: &str, lat: f64, lon: f64) -> Candidate {
        Candidate::new(
            id,
            vec![Skill::new("python", 0.9)],
            location(lat, lon),
            Education::default(),
            CandidatePreferences::default(),
        )
    }

    fn service() -> RecommendationService {
        let store = Arc::new(InMemoryStore::with_data(vec![candidate("c1", 18.52, 73.85)], vec![]));
        RecommendationService::new(store, MatchingPolicy::default(), ServiceOptions::default())
    }

    #[tokio::test]
    async fn test_unknown_candidate_not_found() {
        let err = service()
            .generate_recommendations(CandidateInput::Id("ghost".to_string()), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CandidateNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_no_eligible() {
        let generated = service()
            .generate_recommendations(CandidateInput::Id("c1".to_string()), None, false)
            .await
            .unwrap();
        assert!(generated.recommendations.matches.is_empty());
        assert!(generated.recommendations.reason.is_some());
    }

    #[tokio::test]
    async fn test_profile_with_bad_coordinates_rejected() {
        let err = service()
            .generate_recommendations(CandidateInput::Profile(candidate("adhoc", 95.0, 73.0)), None, false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[tokio::test]
    async fn test_blank_ids_rejected() {
        let svc = service();
        assert!(matches!(
            svc.get_cached_recommendations("  ", None, false).await,
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            svc.get_similar_candidates("", None).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_internship_not_found() {
        let err = service().get_similar_candidates("nope", None).await.unwrap_err();
        assert!(matches!(err, EngineError::InternshipNotFound(_)));
    }
}
