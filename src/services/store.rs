use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Candidate, DateRange, Internship, RecommendationEvent, RecordFilter};

/// Errors raised by a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Persistence collaborator consumed by the engine
///
/// Lookups by id return `Ok(None)` for missing records so callers decide how
/// a miss is surfaced.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn load_candidate(&self, id: &str) -> Result<Option<Candidate>, StoreError>;
    async fn load_internship(&self, id: &str) -> Result<Option<Internship>, StoreError>;
    async fn load_internship_catalog(
        &self,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Internship>, StoreError>;
    async fn load_candidate_pool(
        &self,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Candidate>, StoreError>;
    async fn upsert_candidate(&self, candidate: Candidate) -> Result<(), StoreError>;
    async fn upsert_internship(&self, internship: Internship) -> Result<(), StoreError>;
    async fn record_recommendation_event(&self, event: RecommendationEvent) -> Result<(), StoreError>;
    async fn query_recommendation_events(
        &self,
        range: DateRange,
    ) -> Result<Vec<RecommendationEvent>, StoreError>;

    /// Backend liveness probe
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory store for tests, benchmarks and database-less runs
#[derive(Default)]
pub struct InMemoryStore {
    candidates: RwLock<HashMap<String, Candidate>>,
    internships: RwLock<HashMap<String, Internship>>,
    events: RwLock<Vec<RecommendationEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(candidates: Vec<Candidate>, internships: Vec<Internship>) -> Self {
        Self {
            candidates: RwLock::new(
                candidates
                    .into_iter()
                    .map(|c| (c.id.clone(), c.normalized()))
                    .collect(),
            ),
            internships: RwLock::new(internships.into_iter().map(|i| (i.id.clone(), i)).collect()),
            events: RwLock::new(Vec::new()),
        }
    }
}

fn matches_filter(filter: Option<&RecordFilter>, sector: Option<&str>, state: &str) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let sector_ok = match (&filter.sector, sector) {
        (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
        _ => true,
    };
    let state_ok = filter
        .state
        .as_ref()
        .map_or(true, |wanted| wanted.eq_ignore_ascii_case(state));
    sector_ok && state_ok
}

#[async_trait]
impl RecommendationStore for InMemoryStore {
    async fn load_candidate(&self, id: &str) -> Result<Option<Candidate>, StoreError> {
        Ok(self.candidates.read().await.get(id).cloned())
    }

    async fn load_internship(&self, id: &str) -> Result<Option<Internship>, StoreError> {
        Ok(self.internships.read().await.get(id).cloned())
    }

    async fn load_internship_catalog(
        &self,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Internship>, StoreError> {
        let mut catalog: Vec<Internship> = self
            .internships
            .read()
            .await
            .values()
            .filter(|i| matches_filter(filter, Some(&i.sector), &i.location.state))
            .cloned()
            .collect();
        catalog.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(catalog)
    }

    async fn load_candidate_pool(
        &self,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Candidate>, StoreError> {
        let mut pool: Vec<Candidate> = self
            .candidates
            .read()
            .await
            .values()
            .filter(|c| matches_filter(filter, None, &c.location.state))
            .cloned()
            .collect();
        pool.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pool)
    }

    async fn upsert_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        self.candidates
            .write()
            .await
            .insert(candidate.id.clone(), candidate.normalized());
        Ok(())
    }

    async fn upsert_internship(&self, internship: Internship) -> Result<(), StoreError> {
        self.internships.write().await.insert(internship.id.clone(), internship);
        Ok(())
    }

    async fn record_recommendation_event(&self, event: RecommendationEvent) -> Result<(), StoreError> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn query_recommendation_events(
        &self,
        range: DateRange,
    ) -> Result<Vec<RecommendationEvent>, StoreError> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|event| range.contains(event.occurred_at))
            .cloned()
            .collect())
    }
}
