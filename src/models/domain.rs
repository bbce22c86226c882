use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Where a skill tag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    #[default]
    User,
    Inferred,
    Verified,
}

/// A normalized skill tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    /// Normalized match key, never empty
    pub canonical: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub source: SkillSource,
}

fn default_confidence() -> f64 { 1.0 }

impl Skill {
    pub fn new(canonical: impl Into<String>, confidence: f64) -> Self {
        let canonical = canonical.into();
        Self {
            name: canonical.clone(),
            canonical,
            confidence,
            source: SkillSource::User,
        }
    }
}

/// Geographic location of a candidate or internship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub year: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistancePreference {
    #[default]
    Local,
    State,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Onsite,
    Remote,
    #[default]
    Either,
}

/// Preferred internship duration in months; open on either side when absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl DurationRange {
    pub fn contains(&self, months: u32) -> bool {
        self.min.map_or(true, |min| months >= min) && self.max.map_or(true, |max| months <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePreferences {
    #[serde(default)]
    pub distance_pref: DistancePreference,
    #[serde(default)]
    pub work_type: WorkType,
    #[serde(default)]
    pub min_stipend: f64,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub duration: DurationRange,
}

/// Candidate profile as seen by the engine
///
/// Stored and ad-hoc profiles both end up in this shape; skills are unique by
/// canonical key once built through [`Candidate::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    pub location: Location,
    #[serde(default)]
    pub education: Education,
    #[serde(default)]
    pub preferences: CandidatePreferences,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        skills: Vec<Skill>,
        location: Location,
        education: Education,
        preferences: CandidatePreferences,
    ) -> Self {
        Self {
            id: id.into(),
            skills: dedup_skills(skills),
            location,
            education,
            preferences,
        }
    }

    /// Re-establish unique skills on a profile that bypassed [`Candidate::new`],
    /// such as one decoded from storage
    pub fn normalized(mut self) -> Self {
        self.skills = dedup_skills(std::mem::take(&mut self.skills));
        self
    }
}

/// Collapse skills sharing a canonical key, keeping the most confident one
pub fn dedup_skills(skills: Vec<Skill>) -> Vec<Skill> {
    let mut by_canonical: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Skill> = Vec::with_capacity(skills.len());

    for skill in skills {
        match by_canonical.get(&skill.canonical) {
            Some(&index) => {
                if skill.confidence > unique[index].confidence {
                    unique[index] = skill;
                }
            }
            None => {
                by_canonical.insert(skill.canonical.clone(), unique.len());
                unique.push(skill);
            }
        }
    }

    unique
}

/// Internship listing, owned by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Internship {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<Skill>,
    pub location: Location,
    /// Monthly stipend
    #[serde(default)]
    pub stipend: f64,
    pub duration_months: u32,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub work_type: WorkType,
    #[serde(default)]
    pub capacity: u32,
}

/// Score factor named in an explanation line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Skill,
    Distance,
    Preference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub factor: Factor,
    /// Points contributed to the 0-100 match score
    pub contribution: f64,
    pub text: String,
}

/// Scored internship for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub internship_id: String,
    pub match_score: u8,
    pub explanation: Vec<Explanation>,
    pub distance_km: f64,
    pub skill_overlap: f64,
    pub missing_skills: Vec<String>,
}

/// Why a ranked list came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    NoEligibleInternships,
}

/// Ranked internships for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub candidate_id: String,
    pub matches: Vec<MatchResult>,
    pub total_considered: usize,
    pub reason: Option<NoMatchReason>,
}

/// Candidate ranked against one internship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub candidate_id: String,
    pub result: MatchResult,
}

/// What a candidate eventually did with a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Applied,
    Accepted,
    Dropped,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Applied, Outcome::Accepted, Outcome::Dropped];
}

/// Persisted outcome of a single recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEvent {
    pub id: Uuid,
    pub candidate_id: String,
    pub internship_id: String,
    pub outcome: Outcome,
    pub match_score: u8,
    pub skill_overlap: f64,
    pub distance_km: f64,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Inclusive time window; an absent bound is open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}

/// Optional narrowing applied when loading catalogs and candidate pools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub sector: Option<String>,
    pub state: Option<String>,
}

/// Relative weight of each score component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub skill: f64,
    pub distance: f64,
    pub preference: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill: 0.5,
            distance: 0.3,
            preference: 0.2,
        }
    }
}

/// Credit given per skill match tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillWeights {
    pub exact: f64,
    pub fuzzy: f64,
    pub related: f64,
}

impl Default for SkillWeights {
    fn default() -> Self {
        Self {
            exact: 1.0,
            fuzzy: 0.7,
            related: 0.5,
        }
    }
}

/// Distance decay bands in kilometres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBands {
    pub full_credit_km: f64,
    pub local_km: f64,
    pub state_km: f64,
    /// Cutoff for `any`, also the outer cutoff for every preference
    pub max_distance_km: f64,
    pub local_hard_filter_factor: f64,
}

impl DistanceBands {
    pub fn cutoff_km(&self, preference: DistancePreference) -> f64 {
        let cutoff = match preference {
            DistancePreference::Local => self.local_km,
            DistancePreference::State => self.state_km,
            DistancePreference::Any => self.max_distance_km,
        };
        cutoff.min(self.max_distance_km)
    }
}

impl Default for DistanceBands {
    fn default() -> Self {
        Self {
            full_credit_km: 10.0,
            local_km: 50.0,
            state_km: 200.0,
            max_distance_km: 500.0,
            local_hard_filter_factor: 2.0,
        }
    }
}

/// Immutable matching configuration handed to every scoring component
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingPolicy {
    pub weights: ScoringWeights,
    pub skill_weights: SkillWeights,
    pub distance: DistanceBands,
    pub fuzzy_threshold: f64,
    pub max_skills: usize,
    pub max_limit: usize,
    pub stipend_shortfall_tolerance: f64,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            skill_weights: SkillWeights::default(),
            distance: DistanceBands::default(),
            fuzzy_threshold: 0.88,
            max_skills: 50,
            max_limit: 20,
            stipend_shortfall_tolerance: 0.2,
        }
    }
}

impl MatchingPolicy {
    /// Clamp a requested result count into `[1, max_limit]`
    pub fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.max_limit.max(1))
    }
}
