use crate::core::matcher::compare_ranked;
use crate::core::scoring::{Evaluation, HardFilter, ScoreCalculator};
use crate::models::{Candidate, Internship, MatchingPolicy, RankedCandidate};

/// Ranks a pool of candidates for one internship
///
/// Uses the same scoring as [`crate::core::Matcher`] with the roles swapped.
/// A candidate's own local-distance filter is not applied here; distance
/// still shapes the score.
#[derive(Debug, Clone)]
pub struct ReverseMatcher {
    calculator: ScoreCalculator,
}

impl ReverseMatcher {
    pub fn new(policy: MatchingPolicy) -> Self {
        Self {
            calculator: ScoreCalculator::new(policy),
        }
    }

    pub fn with_calculator(calculator: ScoreCalculator) -> Self {
        Self { calculator }
    }

    pub fn similar_candidates(
        &self,
        internship: &Internship,
        pool: &[Candidate],
        limit: usize,
    ) -> Vec<RankedCandidate> {
        if pool.is_empty() {
            return Vec::new();
        }

        let limit = self.calculator.policy().clamp_limit(limit);

        let mut ranked: Vec<RankedCandidate> = pool
            .iter()
            .filter_map(|candidate| {
                match self.calculator.evaluate(candidate, internship, HardFilter::Ignore) {
                    Ok(Evaluation::Ranked(result)) => Some(RankedCandidate {
                        candidate_id: candidate.id.clone(),
                        result,
                    }),
                    Ok(Evaluation::Excluded(_)) => None,
                    Err(e) => {
                        tracing::warn!(
                            "Skipping candidate {} for internship {}: {}",
                            candidate.id,
                            internship.id,
                            e
                        );
                        None
                    }
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            compare_ranked(&a.result, &b.result).then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        ranked.truncate(limit);
        ranked
    }
}

impl Default for ReverseMatcher {
    fn default() -> Self {
        Self::new(MatchingPolicy::default())
    }
}
