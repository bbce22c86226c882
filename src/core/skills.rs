//! Tiered skill overlap between a candidate and an internship.
//!
//! Every required skill is resolved against the candidate's skills at the best
//! tier available: exact canonical equality, fuzzy string similarity, then the
//! related-skills table. A fuzzy match needs Jaro-Winkler strictly above the
//! threshold and a normalized edit similarity of at least
//! [`MIN_EDIT_SIMILARITY`], so a shared prefix alone ("java" and "javascript")
//! never counts. The credit for the tier is scaled by the confidence of
//! the candidate skill that produced it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::{Skill, SkillWeights};

/// Lower bound on normalized Levenshtein similarity for the fuzzy tier
pub const MIN_EDIT_SIMILARITY: f64 = 0.6;

/// Groups of skills that count as related to one another
const RELATED_SKILL_GROUPS: &[&[&str]] = &[
    &["javascript", "typescript"],
    &["react", "redux", "nextjs", "react_native"],
    &["node", "express", "nestjs"],
    &["python", "django", "flask", "fastapi"],
    &["machine_learning", "deep_learning", "data_science", "pytorch", "tensorflow"],
    &["data_analysis", "excel", "power_bi", "tableau", "statistics"],
    &["sql", "postgresql", "mysql", "database_management"],
    &["java", "spring", "kotlin"],
    &["c", "cpp", "embedded_systems"],
    &["html", "css", "web_design"],
    &["ui_design", "ux_design", "figma", "graphic_design"],
    &["aws", "azure", "gcp", "cloud_computing"],
    &["docker", "kubernetes", "devops"],
    &["android", "kotlin", "mobile_development"],
    &["digital_marketing", "seo", "social_media", "content_writing"],
    &["accounting", "tally", "bookkeeping", "finance"],
    &["autocad", "solidworks", "mechanical_design"],
    &["communication", "customer_service", "sales"],
];

/// Precomputed symmetric related-skills lookup
#[derive(Debug, Clone, Default)]
pub struct RelatedSkills {
    related: HashMap<String, HashSet<String>>,
}

impl RelatedSkills {
    /// Build a table where every member of a group relates to every other member
    pub fn from_groups<G, S>(groups: G) -> Self
    where
        G: IntoIterator,
        G::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut related: HashMap<String, HashSet<String>> = HashMap::new();

        for group in groups {
            let members: Vec<String> = group.into_iter().map(Into::into).collect();
            for member in &members {
                let entry = related.entry(member.clone()).or_default();
                entry.extend(members.iter().filter(|other| *other != member).cloned());
            }
        }

        Self { related }
    }

    /// The table shipped with the engine
    pub fn builtin() -> Self {
        Self::from_groups(RELATED_SKILL_GROUPS.iter().map(|group| group.iter().copied()))
    }

    #[inline]
    pub fn are_related(&self, a: &str, b: &str) -> bool {
        self.related.get(a).is_some_and(|set| set.contains(b))
    }
}

/// Tier a required skill was matched at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Fuzzy,
    Related,
}

/// One required skill resolved against the candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillHit {
    pub required: String,
    pub matched_with: String,
    pub tier: MatchTier,
    /// Tier weight scaled by the candidate's confidence
    pub weight: f64,
}

/// Outcome of matching a candidate's skills against a requirement list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillMatch {
    /// Sum of hit weights divided by the number of required skills, in `[0, 1]`
    pub score: f64,
    /// Fraction of required skills matched at any tier
    pub overlap: f64,
    pub hits: Vec<SkillHit>,
    pub missing: Vec<String>,
}

impl SkillMatch {
    pub fn count_tier(&self, tier: MatchTier) -> usize {
        self.hits.iter().filter(|hit| hit.tier == tier).count()
    }
}

#[derive(Debug, Clone)]
pub struct SkillMatcher {
    weights: SkillWeights,
    fuzzy_threshold: f64,
    max_skills: usize,
    related: RelatedSkills,
}

impl SkillMatcher {
    pub fn new(weights: SkillWeights, fuzzy_threshold: f64, max_skills: usize) -> Self {
        Self::with_related(weights, fuzzy_threshold, max_skills, RelatedSkills::builtin())
    }

    pub fn with_related(
        weights: SkillWeights,
        fuzzy_threshold: f64,
        max_skills: usize,
        related: RelatedSkills,
    ) -> Self {
        Self {
            weights,
            fuzzy_threshold,
            max_skills,
            related,
        }
    }

    /// Score candidate skills against the required skills of an internship
    pub fn skill_score(&self, candidate_skills: &[Skill], required_skills: &[Skill]) -> SkillMatch {
        if required_skills.is_empty() {
            return SkillMatch::default();
        }

        let capped = self.cap_skills(candidate_skills);
        let mut hits = Vec::new();
        let mut missing = Vec::new();

        for required in required_skills {
            match self.best_hit(&capped, &required.canonical) {
                Some(hit) => hits.push(hit),
                None => missing.push(required.canonical.clone()),
            }
        }

        let required_count = required_skills.len() as f64;
        let total: f64 = hits.iter().map(|hit| hit.weight).sum();

        SkillMatch {
            score: (total / required_count).clamp(0.0, 1.0),
            overlap: hits.len() as f64 / required_count,
            hits,
            missing,
        }
    }

    /// Keep the most confident skills, bounding the matching cost
    fn cap_skills<'a>(&self, skills: &'a [Skill]) -> Vec<&'a Skill> {
        let mut sorted: Vec<&Skill> = skills.iter().collect();
        sorted.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.canonical.cmp(&b.canonical))
        });
        sorted.truncate(self.max_skills);
        sorted
    }

    fn best_hit(&self, candidate: &[&Skill], required: &str) -> Option<SkillHit> {
        let tiers = [
            (MatchTier::Exact, self.weights.exact),
            (MatchTier::Fuzzy, self.weights.fuzzy),
            (MatchTier::Related, self.weights.related),
        ];

        for (tier, weight) in tiers {
            let best = candidate
                .iter()
                .filter(|skill| self.matches_at(tier, &skill.canonical, required))
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

            if let Some(skill) = best {
                return Some(SkillHit {
                    required: required.to_string(),
                    matched_with: skill.canonical.clone(),
                    tier,
                    weight: weight * skill.confidence.clamp(0.0, 1.0),
                });
            }
        }

        None
    }

    #[inline]
    fn matches_at(&self, tier: MatchTier, candidate: &str, required: &str) -> bool {
        match tier {
            MatchTier::Exact => candidate == required,
            MatchTier::Fuzzy => {
                candidate != required
                    && jaro_winkler(candidate, required) > self.fuzzy_threshold
                    && normalized_levenshtein(candidate, required) >= MIN_EDIT_SIMILARITY
            }
            MatchTier::Related => self.related.are_related(candidate, required),
        }
    }
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new(SkillWeights::default(), 0.88, 50)
    }
}
