use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::domain::dedup_skills;
use crate::models::{Candidate, Internship};
use crate::services::store::{RecommendationStore, StoreError};

/// Startup dataset loaded from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub internships: Vec<Internship>,
}

impl SeedData {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Upsert everything into `store`, returning (candidates, internships)
    pub async fn apply(self, store: &dyn RecommendationStore) -> Result<(usize, usize), StoreError> {
        let counts = (self.candidates.len(), self.internships.len());

        for mut candidate in self.candidates {
            if candidate.id.trim().is_empty() {
                return Err(StoreError::InvalidRecord("candidate without id".to_string()));
            }
            candidate.skills = dedup_skills(candidate.skills);
            store.upsert_candidate(candidate).await?;
        }
        for internship in self.internships {
            if internship.id.trim().is_empty() {
                return Err(StoreError::InvalidRecord("internship without id".to_string()));
            }
            store.upsert_internship(internship).await?;
        }

        tracing::info!("Seeded {} candidates and {} internships", counts.0, counts.1);
        Ok(counts)
    }
}
