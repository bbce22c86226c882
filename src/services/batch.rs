//! Bounded-concurrency batch recommendations.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::EngineError;
use crate::models::Recommendations;
use crate::services::engine::Recommender;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub max_size: usize,
    pub timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_size: 50,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSuccess {
    pub candidate_id: String,
    pub recommendations: Arc<Recommendations>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub candidate_id: String,
    pub reason: String,
    pub code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub requested: usize,
    pub unique: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Per-candidate results in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub successes: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
    pub summary: BatchSummary,
}

/// Runs recommendations for many candidates with isolated failures
pub struct BatchOrchestrator {
    recommender: Arc<dyn Recommender>,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(recommender: Arc<dyn Recommender>, options: BatchOptions) -> Self {
        Self { recommender, options }
    }

    /// Compute recommendations for every unique id
    ///
    /// Size checks happen before any work starts. Once running, a failing,
    /// timed-out or panicking item only produces a failure record for itself.
    pub async fn batch(&self, candidate_ids: &[String], limit: usize) -> Result<BatchReport, EngineError> {
        let unique = dedup_ids(candidate_ids);

        if unique.is_empty() {
            return Err(EngineError::BatchEmpty);
        }
        if unique.len() > self.options.max_size {
            return Err(EngineError::BatchTooLarge {
                size: unique.len(),
                max: self.options.max_size,
            });
        }

        let outcomes = self.run_all(&unique, limit).await;

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for (candidate_id, outcome) in unique.into_iter().zip(outcomes) {
            match outcome {
                Ok(recommendations) => successes.push(BatchSuccess {
                    candidate_id,
                    recommendations,
                }),
                Err(e) => {
                    tracing::debug!("Batch item {} failed: {}", candidate_id, e);
                    failures.push(BatchFailure {
                        candidate_id,
                        reason: e.to_string(),
                        code: e.code().to_string(),
                    });
                }
            }
        }

        let summary = BatchSummary {
            requested: candidate_ids.len(),
            unique: successes.len() + failures.len(),
            successful: successes.len(),
            failed: failures.len(),
        };

        tracing::info!(
            "Batch complete: {} requested, {} unique, {} ok, {} failed",
            summary.requested,
            summary.unique,
            summary.successful,
            summary.failed
        );

        Ok(BatchReport {
            successes,
            failures,
            summary,
        })
    }

    async fn run_all(
        &self,
        ids: &[String],
        limit: usize,
    ) -> Vec<Result<Arc<Recommendations>, EngineError>> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, candidate_id) in ids.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let recommender = Arc::clone(&self.recommender);
            let timeout = self.options.timeout;

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_one(recommender.as_ref(), &candidate_id, limit, timeout).await,
                    Err(_) => Err(EngineError::Aborted("batch semaphore closed".to_string())),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<Arc<Recommendations>, EngineError>>> =
            (0..ids.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(e) => tracing::error!("Batch task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(EngineError::Aborted("task panicked".to_string())))
            })
            .collect()
    }
}

async fn run_one(
    recommender: &dyn Recommender,
    candidate_id: &str,
    limit: usize,
    timeout: Option<Duration>,
) -> Result<Arc<Recommendations>, EngineError> {
    let Some(timeout) = timeout else {
        return recommender.recommend(candidate_id, limit).await;
    };

    match tokio::time::timeout(timeout, recommender.recommend(candidate_id, limit)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(EngineError::ComputationTimeout {
            candidate_id: candidate_id.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Trimmed, non-empty ids in first-seen order
fn dedup_ids(candidate_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidate_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
