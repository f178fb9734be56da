use std::fmt;

use serde::{Deserialize, Serialize};

/// One establishment as delivered by the acquisition collaborators. Every
/// observation is optional; malformed values deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Establishment {
    pub establishment_id: String,
    #[serde(default)]
    pub name: String,
    pub category: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub direct_headcount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_review_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub recent_review_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub historical_review_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub oldest_review_date: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub latest_review_date: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub area_measurement: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub recent_postings: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub historical_peak_postings: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub popularity_index: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub registry_partner_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub facade_visible: Option<bool>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub signage_visible: Option<bool>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub lighting_visible: Option<bool>,
}

impl Establishment {
    pub fn new(establishment_id: &str, category: &str) -> Self {
        Self {
            establishment_id: establishment_id.to_string(),
            category: category.to_string(),
            ..Self::default()
        }
    }
}

/// Review counts for the recent and historical windows, both present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewWindows {
    pub recent_count: f64,
    pub historical_count: f64,
    pub recent_monthly_rate: f64,
}

impl ReviewWindows {
    pub fn total(&self) -> f64 {
        self.recent_count + self.historical_count
    }
}

/// Normalized features computed once per establishment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedFeatures {
    pub direct_headcount: Option<f64>,
    pub reviews_per_month: Option<f64>,
    pub review_windows: Option<ReviewWindows>,
    pub review_decay_ratio: Option<f64>,
    pub days_since_last_review: Option<i64>,
    pub area_measurement: Option<f64>,
    pub recent_postings: Option<f64>,
    pub historical_peak_postings: Option<f64>,
    pub hiring_intensity_ratio: Option<f64>,
    pub visitor_density_ratio: Option<f64>,
    pub registry_partner_count: Option<f64>,
    pub visual_cues: [Option<bool>; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence sources for the employee estimate, in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DirectCount,
    ReviewVelocity,
    AreaDensity,
    VisitorDensity,
    RegistryPartners,
    HiringActivity,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::DirectCount,
        SignalKind::ReviewVelocity,
        SignalKind::AreaDensity,
        SignalKind::VisitorDensity,
        SignalKind::RegistryPartners,
        SignalKind::HiringActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::DirectCount => "direct_count",
            SignalKind::ReviewVelocity => "review_velocity",
            SignalKind::AreaDensity => "area_density",
            SignalKind::VisitorDensity => "visitor_density",
            SignalKind::RegistryPartners => "registry_partners",
            SignalKind::HiringActivity => "hiring_activity",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factors feeding the survival probability, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalFactor {
    ReviewRecency,
    ReviewDecay,
    HiringActivity,
    VisualIndicators,
}

impl SurvivalFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurvivalFactor::ReviewRecency => "review_recency",
            SurvivalFactor::ReviewDecay => "review_decay",
            SurvivalFactor::HiringActivity => "hiring_activity",
            SurvivalFactor::VisualIndicators => "visual_indicators",
        }
    }
}

impl fmt::Display for SurvivalFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalEstimate {
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedEstimate {
    pub point_estimate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: ConfidenceLevel,
    /// `None` when no signal had an opinion and the baseline was used.
    pub dominant_signal: Option<SignalKind>,
    pub signals_used: Vec<SignalKind>,
}

impl CombinedEstimate {
    pub fn dominant_signal_name(&self) -> &'static str {
        self.dominant_signal.map_or("baseline", |kind| kind.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalScore {
    pub active_probability: f64,
    pub confidence_level: ConfidenceLevel,
    pub risk_factors: Vec<String>,
    pub protective_factors: Vec<String>,
    pub primary_indicator: Option<SurvivalFactor>,
    pub signals_used: Vec<SurvivalFactor>,
}

impl SurvivalScore {
    pub fn primary_indicator_name(&self) -> &'static str {
        self.primary_indicator.map_or("none", |factor| factor.as_str())
    }
}

/// Output of both estimation paths for one establishment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub establishment_id: String,
    pub name: String,
    pub category: String,
    pub employees: CombinedEstimate,
    pub survival: SurvivalScore,
    pub reviews_per_month: Option<f64>,
    pub days_since_last_review: Option<i64>,
    pub review_decay_ratio: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_levels_are_ordered() {
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
    }

    #[test]
    fn malformed_csv_fields_become_missing() {
        let data = "\
establishment_id,name,category,direct_headcount,recent_review_count,facade_visible
e-1,Corner Cafe,coffee,not-a-number,,true
";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let row: Establishment = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(row.direct_headcount, None);
        assert_eq!(row.recent_review_count, None);
        assert_eq!(row.facade_visible, Some(true));
        assert_eq!(row.latest_review_date, None);
    }

    #[test]
    fn baseline_is_reported_when_no_signal_dominates() {
        let estimate = CombinedEstimate {
            point_estimate: 12.0,
            ci_lower: 3.0,
            ci_upper: 50.0,
            confidence_level: ConfidenceLevel::Low,
            dominant_signal: None,
            signals_used: Vec::new(),
        };
        assert_eq!(estimate.dominant_signal_name(), "baseline");
    }
}
