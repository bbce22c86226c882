use crate::models::{CandidatePreferences, DistanceBands, DistancePreference, Internship, WorkType};

/// Check whether a pair survives the hard distance filter
///
/// Only `local` candidates are filtered, and only when the internship is
/// further than `local_hard_filter_factor` times the local cutoff. Work type
/// plays no part here; remote fit is credited by the preference score.
#[inline]
pub fn passes_distance_filter(distance_km: f64, preference: DistancePreference, bands: &DistanceBands) -> bool {
    if preference != DistancePreference::Local {
        return true;
    }

    distance_km <= bands.cutoff_km(DistancePreference::Local) * bands.local_hard_filter_factor
}

/// Distance credit in `[0, 1]`
///
/// Full credit up to `full_credit_km`, then linear decay to zero at the
/// cutoff for the candidate's distance preference.
#[inline]
pub fn distance_decay(distance_km: f64, preference: DistancePreference, bands: &DistanceBands) -> f64 {
    let full = bands.full_credit_km;
    let cutoff = bands.cutoff_km(preference);

    if distance_km <= full {
        return 1.0;
    }
    if distance_km >= cutoff || cutoff <= full {
        return 0.0;
    }

    (1.0 - (distance_km - full) / (cutoff - full)).clamp(0.0, 1.0)
}

/// Per-criterion preference credit, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreferenceFit {
    pub work_type: f64,
    pub stipend: f64,
    pub duration: f64,
    pub sector: f64,
}

impl PreferenceFit {
    /// Mean of the four criteria
    pub fn score(&self) -> f64 {
        (self.work_type + self.stipend + self.duration + self.sector) / 4.0
    }

    /// Names of criteria that earned full credit
    pub fn satisfied(&self) -> Vec<&'static str> {
        [
            ("work type", self.work_type),
            ("stipend", self.stipend),
            ("duration", self.duration),
            ("sector", self.sector),
        ]
        .into_iter()
        .filter(|(_, credit)| *credit >= 1.0)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Score how well an internship fits the candidate's soft preferences
pub fn calculate_preference_score(
    preferences: &CandidatePreferences,
    internship: &Internship,
    stipend_shortfall_tolerance: f64,
) -> PreferenceFit {
    PreferenceFit {
        work_type: work_type_credit(preferences.work_type, internship.work_type),
        stipend: stipend_credit(preferences.min_stipend, internship.stipend, stipend_shortfall_tolerance),
        duration: if preferences.duration.contains(internship.duration_months) { 1.0 } else { 0.0 },
        sector: sector_credit(&preferences.sectors, &internship.sector),
    }
}

#[inline]
fn work_type_credit(wanted: WorkType, offered: WorkType) -> f64 {
    if wanted == offered || wanted == WorkType::Either || offered == WorkType::Either {
        1.0
    } else {
        0.0
    }
}

/// Full credit at or above the minimum, linear partial credit inside the
/// tolerated shortfall, nothing beyond it
#[inline]
fn stipend_credit(min_stipend: f64, stipend: f64, tolerance: f64) -> f64 {
    if min_stipend <= 0.0 || stipend >= min_stipend {
        return 1.0;
    }
    if tolerance <= 0.0 {
        return 0.0;
    }

    let shortfall = (min_stipend - stipend) / min_stipend;
    if shortfall > tolerance {
        0.0
    } else {
        1.0 - shortfall / tolerance
    }
}

#[inline]
fn sector_credit(sectors: &[String], sector: &str) -> f64 {
    if sectors.is_empty() {
        0.5
    } else if sectors.iter().any(|s| s.eq_ignore_ascii_case(sector)) {
        1.0
    } else {
        0.0
    }
}
