use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{Candidate, DateRange, Internship, Outcome, RecommendationEvent, RecordFilter};
use crate::services::store::{RecommendationStore, StoreError};

/// Outcome column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recommendation_outcome", rename_all = "lowercase")]
pub enum PgOutcome {
    Applied,
    Accepted,
    Dropped,
}

impl From<Outcome> for PgOutcome {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Applied => PgOutcome::Applied,
            Outcome::Accepted => PgOutcome::Accepted,
            Outcome::Dropped => PgOutcome::Dropped,
        }
    }
}

impl From<PgOutcome> for Outcome {
    fn from(value: PgOutcome) -> Self {
        match value {
            PgOutcome::Applied => Outcome::Applied,
            PgOutcome::Accepted => Outcome::Accepted,
            PgOutcome::Dropped => Outcome::Dropped,
        }
    }
}

/// Pool settings for [`PostgresStore::connect`]
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// PostgreSQL-backed store
///
/// Candidates and internships are kept as JSONB documents next to the
/// columns used for filtering. Recommendation events are typed rows.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run embedded migrations
    pub async fn connect(database_url: &str, options: PoolOptions) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.acquire_timeout)
            .idle_timeout(options.idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(
            "Connected to PostgreSQL (max {} connections)",
            options.max_connections
        );

        Ok(Self { pool })
    }
}

/// Read the JSONB `doc` column without panicking on bad data
fn doc_column(row: &PgRow) -> Result<serde_json::Value, StoreError> {
    Ok(row.try_get::<Json<serde_json::Value>, _>("doc")?.0)
}

fn decode_candidate(doc: serde_json::Value) -> Result<Candidate, StoreError> {
    let candidate: Candidate = serde_json::from_value(doc)?;
    Ok(candidate.normalized())
}

fn decode_internship(doc: serde_json::Value) -> Result<Internship, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

fn filter_binds(filter: Option<&RecordFilter>) -> (Option<String>, Option<String>) {
    filter.map_or((None, None), |f| (f.sector.clone(), f.state.clone()))
}

#[async_trait]
impl RecommendationStore for PostgresStore {
    async fn load_candidate(&self, id: &str) -> Result<Option<Candidate>, StoreError> {
        let row = sqlx::query("SELECT doc FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| doc_column(&row).and_then(decode_candidate))
            .transpose()
    }

    async fn load_internship(&self, id: &str) -> Result<Option<Internship>, StoreError> {
        let row = sqlx::query("SELECT doc FROM internships WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| doc_column(&row).and_then(decode_internship))
            .transpose()
    }

    async fn load_internship_catalog(
        &self,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Internship>, StoreError> {
        let query = r#"
            SELECT doc
            FROM internships
            WHERE ($1::text IS NULL OR lower(sector) = lower($1))
              AND ($2::text IS NULL OR lower(state) = lower($2))
            ORDER BY id
        "#;
        let (sector, state) = filter_binds(filter);

        let rows = sqlx::query(query)
            .bind(sector)
            .bind(state)
            .fetch_all(&self.pool)
            .await?;

        let catalog = rows
            .iter()
            .map(|row| doc_column(row).and_then(decode_internship))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} internships", catalog.len());
        Ok(catalog)
    }

    async fn load_candidate_pool(
        &self,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Candidate>, StoreError> {
        let query = r#"
            SELECT doc
            FROM candidates
            WHERE ($1::text IS NULL OR lower(state) = lower($1))
            ORDER BY id
        "#;
        let (_, state) = filter_binds(filter);

        let rows = sqlx::query(query).bind(state).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| doc_column(row).and_then(decode_candidate))
            .collect()
    }

    async fn upsert_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO candidates (id, state, doc, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                state = EXCLUDED.state,
                doc = EXCLUDED.doc,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(&candidate.id)
            .bind(&candidate.location.state)
            .bind(Json(&candidate))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_internship(&self, internship: Internship) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO internships (id, sector, state, doc, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                sector = EXCLUDED.sector,
                state = EXCLUDED.state,
                doc = EXCLUDED.doc,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(&internship.id)
            .bind(&internship.sector)
            .bind(&internship.location.state)
            .bind(Json(&internship))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_recommendation_event(&self, event: RecommendationEvent) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO recommendation_events
                (id, candidate_id, internship_id, outcome, match_score,
                 skill_overlap, distance_km, missing_skills, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(event.id)
            .bind(&event.candidate_id)
            .bind(&event.internship_id)
            .bind(PgOutcome::from(event.outcome))
            .bind(i16::from(event.match_score))
            .bind(event.skill_overlap)
            .bind(event.distance_km)
            .bind(&event.missing_skills)
            .bind(event.occurred_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded {:?} event: {} -> {}",
            event.outcome,
            event.candidate_id,
            event.internship_id
        );

        Ok(())
    }

    async fn query_recommendation_events(
        &self,
        range: DateRange,
    ) -> Result<Vec<RecommendationEvent>, StoreError> {
        let query = r#"
            SELECT id, candidate_id, internship_id, outcome, match_score,
                   skill_overlap, distance_km, missing_skills, occurred_at
            FROM recommendation_events
            WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
              AND ($2::timestamptz IS NULL OR occurred_at <= $2)
            ORDER BY occurred_at
        "#;

        let rows = sqlx::query(query)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let score: i16 = row.try_get("match_score")?;
                let outcome: PgOutcome = row.try_get("outcome")?;
                Ok(RecommendationEvent {
                    id: row.try_get::<Uuid, _>("id")?,
                    candidate_id: row.try_get("candidate_id")?,
                    internship_id: row.try_get("internship_id")?,
                    outcome: outcome.into(),
                    match_score: u8::try_from(score)
                        .map_err(|_| StoreError::InvalidRecord(format!("match_score {}", score)))?,
                    skill_overlap: row.try_get("skill_overlap")?,
                    distance_km: row.try_get("distance_km")?,
                    missing_skills: row.try_get("missing_skills")?,
                    occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
                })
            })
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(Into::into)
    }
}
