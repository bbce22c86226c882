use thiserror::Error;

use crate::services::store::StoreError;

/// Errors surfaced by the recommendation engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Candidate not found: {0}")]
    CandidateNotFound(String),

    #[error("Internship not found: {0}")]
    InternshipNotFound(String),

    #[error("Batch contains no candidate ids")]
    BatchEmpty,

    #[error("Batch of {size} candidates exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Computation for candidate {candidate_id} timed out after {timeout_ms}ms")]
    ComputationTimeout { candidate_id: String, timeout_ms: u64 },

    #[error("Computation aborted: {0}")]
    Aborted(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Stable machine-readable code for failure records and responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::CandidateNotFound(_) => "candidate_not_found",
            EngineError::InternshipNotFound(_) => "internship_not_found",
            EngineError::BatchEmpty => "batch_empty",
            EngineError::BatchTooLarge { .. } => "batch_too_large",
            EngineError::ComputationTimeout { .. } => "computation_timeout",
            EngineError::Aborted(_) => "computation_aborted",
            EngineError::Store(_) => "store_error",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::CandidateNotFound(_) | EngineError::InternshipNotFound(_))
    }
}
