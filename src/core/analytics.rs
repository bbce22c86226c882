//! Aggregate metrics over recorded recommendation outcomes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{DateRange, Outcome, RecommendationEvent};

const TOP_MISSING_SKILLS: usize = 10;

/// Skill overlap bucket upper bounds; the last bucket is closed at 1.0
const OVERLAP_BUCKETS: [(&str, f64); 4] = [
    ("0.00-0.25", 0.25),
    ("0.25-0.50", 0.50),
    ("0.50-0.75", 0.75),
    ("0.75-1.00", f64::INFINITY),
];

/// Distance bucket upper bounds in kilometers
const DISTANCE_BUCKETS: [(&str, f64); 4] = [
    ("0-10km", 10.0),
    ("10-50km", 50.0),
    ("50-200km", 200.0),
    ("200km+", f64::INFINITY),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeStats {
    pub count: usize,
    pub average_match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

/// Recommendation performance over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub date_range: DateRange,
    pub total_events: usize,
    pub by_outcome: BTreeMap<Outcome, OutcomeStats>,
    pub skill_overlap_distribution: Vec<Bucket>,
    pub distance_distribution: Vec<Bucket>,
    pub top_missing_skills: Vec<SkillCount>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate the events that fall inside `range`
    ///
    /// Events outside the range are ignored, so callers may pass a superset.
    /// With nothing in range the report is zero-filled.
    pub fn analyze(&self, events: &[RecommendationEvent], range: DateRange) -> PerformanceReport {
        let in_range: Vec<&RecommendationEvent> =
            events.iter().filter(|event| range.contains(event.occurred_at)).collect();

        let mut score_sums: HashMap<Outcome, (usize, u64)> = HashMap::new();
        let mut overlap_counts = [0usize; OVERLAP_BUCKETS.len()];
        let mut distance_counts = [0usize; DISTANCE_BUCKETS.len()];
        let mut missing: HashMap<&str, usize> = HashMap::new();

        for event in &in_range {
            let entry = score_sums.entry(event.outcome).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += u64::from(event.match_score);

            overlap_counts[bucket_index(&OVERLAP_BUCKETS, event.skill_overlap)] += 1;
            distance_counts[bucket_index(&DISTANCE_BUCKETS, event.distance_km)] += 1;

            if event.outcome == Outcome::Dropped {
                for skill in &event.missing_skills {
                    *missing.entry(skill.as_str()).or_insert(0) += 1;
                }
            }
        }

        let by_outcome = Outcome::ALL
            .iter()
            .map(|outcome| {
                let stats = match score_sums.get(outcome) {
                    Some(&(count, total)) if count > 0 => OutcomeStats {
                        count,
                        average_match_score: total as f64 / count as f64,
                    },
                    _ => OutcomeStats::default(),
                };
                (*outcome, stats)
            })
            .collect();

        let mut top_missing_skills: Vec<SkillCount> = missing
            .into_iter()
            .map(|(skill, count)| SkillCount {
                skill: skill.to_string(),
                count,
            })
            .collect();
        top_missing_skills.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
        top_missing_skills.truncate(TOP_MISSING_SKILLS);

        PerformanceReport {
            date_range: range,
            total_events: in_range.len(),
            by_outcome,
            skill_overlap_distribution: to_buckets(&OVERLAP_BUCKETS, &overlap_counts),
            distance_distribution: to_buckets(&DISTANCE_BUCKETS, &distance_counts),
            top_missing_skills,
        }
    }
}

fn bucket_index(bounds: &[(&str, f64)], value: f64) -> usize {
    let value = if value.is_finite() { value.max(0.0) } else { f64::MAX };
    bounds
        .iter()
        .position(|(_, upper)| value < *upper)
        .unwrap_or(bounds.len() - 1)
}

fn to_buckets(bounds: &[(&str, f64)], counts: &[usize]) -> Vec<Bucket> {
    bounds
        .iter()
        .zip(counts)
        .map(|((label, _), count)| Bucket {
            label: (*label).to_string(),
            count: *count,
        })
        .collect()
}
