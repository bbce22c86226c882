use crate::core::{
    distance::{distance_km, GeoError},
    filters::{calculate_preference_score, distance_decay, passes_distance_filter},
    skills::{MatchTier, SkillMatch, SkillMatcher},
};
use crate::models::{
    Candidate, DistancePreference, Explanation, Factor, Internship, MatchResult, MatchingPolicy,
};

/// Whether the local-distance hard filter applies to a scoring call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardFilter {
    Enforce,
    Ignore,
}

/// Why a pair never reaches a ranked list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exclusion {
    NoSkillOverlap,
    BeyondDistance { distance_km: f64, limit_km: f64 },
}

/// Result of scoring one candidate/internship pair
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Ranked(MatchResult),
    Excluded(Exclusion),
}

/// Combines skill, distance and preference fit into a 0-100 match score
///
/// Scoring formula:
/// score = round(100 * (
///     skill_score * 0.5 +          # Tiered skill overlap
///     distance_decay * 0.3 +       # Full credit near, zero at the preference cutoff
///     preference_fit * 0.2         # Work type, stipend, duration, sector
/// ))
///
/// The weights come from [`MatchingPolicy`] and can be tuned.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    policy: MatchingPolicy,
    skills: SkillMatcher,
}

impl ScoreCalculator {
    pub fn new(policy: MatchingPolicy) -> Self {
        let skills = SkillMatcher::new(policy.skill_weights, policy.fuzzy_threshold, policy.max_skills);
        Self { policy, skills }
    }

    pub fn with_skill_matcher(policy: MatchingPolicy, skills: SkillMatcher) -> Self {
        Self { policy, skills }
    }

    pub fn policy(&self) -> &MatchingPolicy {
        &self.policy
    }

    /// Score a pair with the hard distance filter enforced
    pub fn score(&self, candidate: &Candidate, internship: &Internship) -> Result<Evaluation, GeoError> {
        self.evaluate(candidate, internship, HardFilter::Enforce)
    }

    pub fn evaluate(
        &self,
        candidate: &Candidate,
        internship: &Internship,
        filter: HardFilter,
    ) -> Result<Evaluation, GeoError> {
        let weights = &self.policy.weights;
        let bands = &self.policy.distance;
        let preference = candidate.preferences.distance_pref;

        let distance = distance_km(&candidate.location, &internship.location)?;

        if filter == HardFilter::Enforce
            && !passes_distance_filter(distance, preference, bands)
        {
            return Ok(Evaluation::Excluded(Exclusion::BeyondDistance {
                distance_km: distance,
                limit_km: bands.cutoff_km(DistancePreference::Local) * bands.local_hard_filter_factor,
            }));
        }

        let skill_match = self.skills.skill_score(&candidate.skills, &internship.required_skills);
        let skill_component = skill_match.score * weights.skill;
        if skill_component <= 0.0 {
            return Ok(Evaluation::Excluded(Exclusion::NoSkillOverlap));
        }

        let distance_component = distance_decay(distance, preference, bands) * weights.distance;

        let fit = calculate_preference_score(
            &candidate.preferences,
            internship,
            self.policy.stipend_shortfall_tolerance,
        );
        let preference_component = fit.score() * weights.preference;

        let total = skill_component + distance_component + preference_component;
        let match_score = (total * 100.0).round().clamp(0.0, 100.0) as u8;

        let satisfied = fit.satisfied();
        let mut explanation = vec![
            Explanation {
                factor: Factor::Skill,
                contribution: skill_component * 100.0,
                text: describe_skills(&skill_match, internship.required_skills.len()),
            },
            Explanation {
                factor: Factor::Distance,
                contribution: distance_component * 100.0,
                text: format!("{:.1} km away ({} preference)", distance, preference_label(preference)),
            },
            Explanation {
                factor: Factor::Preference,
                contribution: preference_component * 100.0,
                text: if satisfied.is_empty() {
                    "Does not meet stated preferences".to_string()
                } else {
                    format!("Meets preferences: {}", satisfied.join(", "))
                },
            },
        ];
        // Stable sort keeps skill > distance > preference on ties
        explanation.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

        Ok(Evaluation::Ranked(MatchResult {
            internship_id: internship.id.clone(),
            match_score,
            explanation,
            distance_km: distance,
            skill_overlap: skill_match.overlap,
            missing_skills: skill_match.missing,
        }))
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new(MatchingPolicy::default())
    }
}

fn describe_skills(skill_match: &SkillMatch, required: usize) -> String {
    let mut text = format!(
        "Matches {} of {} required skills ({} exact, {} similar, {} related)",
        skill_match.hits.len(),
        required,
        skill_match.count_tier(MatchTier::Exact),
        skill_match.count_tier(MatchTier::Fuzzy),
        skill_match.count_tier(MatchTier::Related),
    );
    if !skill_match.missing.is_empty() {
        text.push_str(&format!("; missing {}", skill_match.missing.join(", ")));
    }
    text
}

fn preference_label(preference: DistancePreference) -> &'static str {
    match preference {
        DistancePreference::Local => "local",
        DistancePreference::State => "state",
        DistancePreference::Any => "any",
    }
}
