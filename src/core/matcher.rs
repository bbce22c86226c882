use std::cmp::Ordering;

use crate::core::scoring::{Evaluation, Exclusion, ScoreCalculator};
use crate::models::{Candidate, Internship, MatchResult, MatchingPolicy, NoMatchReason, Recommendations};

/// Ranks an internship catalog for a single candidate
///
/// # Pipeline Stages
/// 1. Coordinate validation and local-distance hard filter
/// 2. Skill overlap gate
/// 3. Scoring
/// 4. Deterministic ranking and Top-K truncation
#[derive(Debug, Clone)]
pub struct Matcher {
    calculator: ScoreCalculator,
}

impl Matcher {
    pub fn new(policy: MatchingPolicy) -> Self {
        Self {
            calculator: ScoreCalculator::new(policy),
        }
    }

    pub fn with_calculator(calculator: ScoreCalculator) -> Self {
        Self { calculator }
    }

    pub fn with_default_policy() -> Self {
        Self::new(MatchingPolicy::default())
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    pub fn policy(&self) -> &MatchingPolicy {
        self.calculator.policy()
    }

    /// Return the `k` best internships for a candidate
    ///
    /// `k` is clamped to `[1, max_limit]`. An empty result is not an error:
    /// it carries [`NoMatchReason::NoEligibleInternships`].
    pub fn top_k(&self, candidate: &Candidate, catalog: &[Internship], k: usize) -> Recommendations {
        let limit = self.policy().clamp_limit(k);

        let mut scored: Vec<MatchResult> = catalog
            .iter()
            .filter_map(|internship| match self.calculator.score(candidate, internship) {
                Ok(Evaluation::Ranked(result)) => Some(result),
                Ok(Evaluation::Excluded(Exclusion::BeyondDistance { distance_km, limit_km })) => {
                    tracing::trace!(
                        "Excluded internship {} for {}: {:.1} km exceeds {:.1} km",
                        internship.id,
                        candidate.id,
                        distance_km,
                        limit_km
                    );
                    None
                }
                Ok(Evaluation::Excluded(Exclusion::NoSkillOverlap)) => None,
                Err(e) => {
                    tracing::warn!(
                        "Skipping internship {} for candidate {}: {}",
                        internship.id,
                        candidate.id,
                        e
                    );
                    None
                }
            })
            .collect();

        scored.sort_by(compare_ranked);
        scored.truncate(limit);

        tracing::debug!(
            "Ranked {} of {} internships for candidate {}",
            scored.len(),
            catalog.len(),
            candidate.id
        );

        let reason = scored.is_empty().then_some(NoMatchReason::NoEligibleInternships);

        Recommendations {
            candidate_id: candidate.id.clone(),
            matches: scored,
            total_considered: catalog.len(),
            reason,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_policy()
    }
}

/// Score descending, then distance ascending, then internship id ascending
pub(crate) fn compare_ranked(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.match_score
        .cmp(&a.match_score)
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
        .then_with(|| a.internship_id.cmp(&b.internship_id))
}
