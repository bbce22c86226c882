use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::domain::{
    Candidate, CandidatePreferences, DateRange, DistancePreference, DurationRange, Education,
    Location, Outcome, RecommendationEvent, Skill, SkillSource, WorkType,
};

/// Request to generate recommendations for a stored or ad-hoc candidate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRecommendationsRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(default, alias = "candidate_id")]
    pub candidate_id: Option<String>,
    #[validate(nested)]
    #[serde(default, alias = "candidate_profile")]
    pub candidate_profile: Option<CandidateProfile>,
    #[validate(range(min = 1, max = 20))]
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default, alias = "force_refresh")]
    pub force_refresh: Option<bool>,
}

/// Ad-hoc candidate profile supplied inline with a request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub skills: Vec<SkillInput>,
    #[validate(nested)]
    pub location: LocationInput,
    #[serde(default)]
    pub education: Option<Education>,
    #[validate(nested)]
    #[serde(default)]
    pub preferences: Option<PreferencesInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SkillInput {
    #[validate(length(min = 1, max = 50))]
    #[serde(default)]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub canonical: String,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<SkillSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesInput {
    #[serde(default)]
    pub distance_pref: Option<DistancePreference>,
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub min_stipend: Option<f64>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub duration: Option<DurationRange>,
}

impl CandidateProfile {
    /// Normalize into the engine's candidate shape under a throwaway id
    pub fn into_candidate(self) -> Candidate {
        let skills = self
            .skills
            .into_iter()
            .map(|input| Skill {
                name: input.name.unwrap_or_else(|| input.canonical.clone()),
                canonical: input.canonical,
                confidence: input.confidence.unwrap_or(1.0),
                source: input.source.unwrap_or_default(),
            })
            .collect();

        let preferences = self
            .preferences
            .map(|prefs| CandidatePreferences {
                distance_pref: prefs.distance_pref.unwrap_or_default(),
                work_type: prefs.work_type.unwrap_or_default(),
                min_stipend: prefs.min_stipend.unwrap_or(0.0),
                sectors: prefs.sectors,
                duration: prefs.duration.unwrap_or_default(),
            })
            .unwrap_or_default();

        Candidate::new(
            format!("adhoc_{}", Uuid::new_v4()),
            skills,
            Location {
                lat: self.location.lat,
                lon: self.location.lon,
                district: self.location.district,
                state: self.location.state,
            },
            self.education.unwrap_or_default(),
            preferences,
        )
    }
}

/// Query string for cached recommendation lookups
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CachedRecommendationsQuery {
    #[validate(range(min = 1, max = 20))]
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub refresh: Option<bool>,
}

/// Query string for reverse matching
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimilarCandidatesQuery {
    #[validate(range(min = 1, max = 20))]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request for recommendations across many candidates
///
/// Size bounds are enforced by the orchestrator so callers get the
/// dedicated batch error kinds.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecommendationsRequest {
    #[serde(alias = "candidate_ids")]
    pub candidate_ids: Vec<String>,
    #[validate(range(min = 1, max = 20))]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query string for the performance report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl From<PerformanceQuery> for DateRange {
    fn from(query: PerformanceQuery) -> Self {
        DateRange { from: query.from, to: query.to }
    }
}

/// Request to record what a candidate did with a recommendation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcomeRequest {
    #[validate(length(min = 1, max = 64))]
    pub candidate_id: String,
    #[validate(length(min = 1, max = 64))]
    pub internship_id: String,
    pub outcome: Outcome,
    #[validate(range(max = 100))]
    pub match_score: u8,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub skill_overlap: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl RecordOutcomeRequest {
    pub fn into_event(self) -> RecommendationEvent {
        RecommendationEvent {
            id: Uuid::new_v4(),
            candidate_id: self.candidate_id,
            internship_id: self.internship_id,
            outcome: self.outcome,
            match_score: self.match_score,
            skill_overlap: self.skill_overlap,
            distance_km: self.distance_km,
            missing_skills: self.missing_skills,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_json() -> serde_json::Value {
        serde_json::json!({
            "name": "Asha",
            "skills": [
                {"name": "React", "canonical": "react", "confidence": 0.4},
                {"canonical": "react", "confidence": 0.9},
                {"canonical": "python"}
            ],
            "location": {"lat": 19.07, "lon": 72.87, "district": "Mumbai", "state": "MH"},
            "preferences": {"distancePref": "state", "minStipend": 5000.0}
        })
    }

    #[test]
    fn test_profile_normalizes_into_candidate() {
        let profile: CandidateProfile = serde_json::from_value(profile_json()).unwrap();
        assert!(profile.validate().is_ok());

        let candidate = profile.into_candidate();

        assert!(candidate.id.starts_with("adhoc_"));
        assert_eq!(candidate.skills.len(), 2);
        assert_eq!(candidate.skills[0].confidence, 0.9);
        assert_eq!(candidate.skills[1].confidence, 1.0);
        assert_eq!(candidate.preferences.distance_pref, DistancePreference::State);
        assert_eq!(candidate.preferences.work_type, WorkType::Either);
    }

    #[test]
    fn test_profile_rejects_bad_coordinates() {
        let mut json = profile_json();
        json["location"]["lat"] = serde_json::json!(123.0);
        let profile: CandidateProfile = serde_json::from_value(json).unwrap();

        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_profile_rejects_empty_canonical() {
        let mut json = profile_json();
        json["skills"][0]["canonical"] = serde_json::json!("");
        let profile: CandidateProfile = serde_json::from_value(json).unwrap();

        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_limit_out_of_range() {
        let req: GenerateRecommendationsRequest =
            serde_json::from_value(serde_json::json!({"candidateId": "c1", "limit": 21})).unwrap();
        assert!(req.validate().is_err());
    }
}
