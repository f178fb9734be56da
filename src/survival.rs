use crate::confidence::classify_factor_count;
use crate::ensemble::combine_present;
use crate::models::{DerivedFeatures, SurvivalFactor, SurvivalScore};

const NEUTRAL_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Risk(String),
    Protective(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorScore {
    pub factor: SurvivalFactor,
    pub score: f64,
    pub annotation: Option<Annotation>,
}

impl FactorScore {
    fn new(factor: SurvivalFactor, score: f64, annotation: Option<Annotation>) -> Self {
        Self {
            factor,
            score,
            annotation,
        }
    }
}

impl SurvivalFactor {
    pub fn weight(&self) -> f64 {
        match self {
            SurvivalFactor::ReviewRecency => 0.35,
            SurvivalFactor::ReviewDecay => 0.30,
            SurvivalFactor::HiringActivity => 0.20,
            SurvivalFactor::VisualIndicators => 0.15,
        }
    }

    pub fn score(&self, features: &DerivedFeatures) -> Option<FactorScore> {
        match self {
            SurvivalFactor::ReviewRecency => score_recency(features.days_since_last_review?),
            SurvivalFactor::ReviewDecay => score_decay(features.review_decay_ratio?),
            SurvivalFactor::HiringActivity => score_hiring(
                features.recent_postings?,
                features.historical_peak_postings,
            ),
            SurvivalFactor::VisualIndicators => score_visual(&features.visual_cues),
        }
    }
}

pub fn score_recency(days: i64) -> Option<FactorScore> {
    if days < 0 {
        return None;
    }
    let factor = SurvivalFactor::ReviewRecency;
    let scored = match days {
        d if d <= 30 => FactorScore::new(
            factor,
            1.0,
            Some(Annotation::Protective(format!("Recent review ({d} days ago)"))),
        ),
        d if d <= 90 => FactorScore::new(
            factor,
            0.75,
            Some(Annotation::Protective(format!("Moderate recency ({d} days)"))),
        ),
        d if d <= 180 => FactorScore::new(
            factor,
            0.4,
            Some(Annotation::Risk(format!(
                "Declining activity ({d} days since review)"
            ))),
        ),
        d => FactorScore::new(
            factor,
            0.1,
            Some(Annotation::Risk(format!(
                "No recent activity ({d} days without review)"
            ))),
        ),
    };
    Some(scored)
}

pub fn score_decay(ratio: f64) -> Option<FactorScore> {
    if !ratio.is_finite() {
        return None;
    }
    let factor = SurvivalFactor::ReviewDecay;
    let scored = if ratio > 1.2 {
        FactorScore::new(
            factor,
            0.9,
            Some(Annotation::Protective(format!("Growing reviews (decay={ratio:.2})"))),
        )
    } else if ratio > 0.8 {
        FactorScore::new(
            factor,
            0.8,
            Some(Annotation::Protective("Stable review activity".to_string())),
        )
    } else if ratio > 0.5 {
        FactorScore::new(
            factor,
            0.5,
            Some(Annotation::Risk(format!("Declining reviews (decay={ratio:.2})"))),
        )
    } else {
        FactorScore::new(
            factor,
            0.2,
            Some(Annotation::Risk(format!("Sharp review decline (decay={ratio:.2})"))),
        )
    };
    Some(scored)
}

// No posting history at all stays neutral.
pub fn score_hiring(recent: f64, peak: Option<f64>) -> Option<FactorScore> {
    let factor = SurvivalFactor::HiringActivity;
    let peak = peak.unwrap_or(0.0);
    let ratio = recent / peak.max(1.0);
    let has_activity = recent >= 1.0 && ratio >= 0.2;

    let scored = if has_activity && ratio > 0.6 {
        FactorScore::new(
            factor,
            0.85,
            Some(Annotation::Protective("Active hiring".to_string())),
        )
    } else if has_activity {
        FactorScore::new(
            factor,
            0.65,
            Some(Annotation::Protective("Recent job postings".to_string())),
        )
    } else if peak > 0.0 {
        FactorScore::new(
            factor,
            0.35,
            Some(Annotation::Risk("Reduced hiring activity".to_string())),
        )
    } else {
        FactorScore::new(factor, 0.5, None)
    };
    Some(scored)
}

/// Majority vote across facade, signage and lighting cues that were observed.
pub fn score_visual(cues: &[Option<bool>; 3]) -> Option<FactorScore> {
    let observed: Vec<bool> = cues.iter().flatten().copied().collect();
    if observed.is_empty() {
        return None;
    }
    let factor = SurvivalFactor::VisualIndicators;
    let positive = observed.iter().filter(|cue| **cue).count();
    let scored = if positive >= 2 {
        FactorScore::new(
            factor,
            0.8,
            Some(Annotation::Protective("Visible operational indicators".to_string())),
        )
    } else {
        FactorScore::new(
            factor,
            0.2,
            Some(Annotation::Risk("No visible operational indicators".to_string())),
        )
    };
    Some(scored)
}

pub fn score_survival(features: &DerivedFeatures) -> SurvivalScore {
    let factors = [
        SurvivalFactor::ReviewRecency,
        SurvivalFactor::ReviewDecay,
        SurvivalFactor::HiringActivity,
        SurvivalFactor::VisualIndicators,
    ];
    let scored: Vec<FactorScore> = factors
        .iter()
        .filter_map(|factor| factor.score(features))
        .collect();

    let mut risk_factors = Vec::new();
    let mut protective_factors = Vec::new();
    for annotation in scored.iter().filter_map(|s| s.annotation.clone()) {
        match annotation {
            Annotation::Risk(note) => risk_factors.push(note),
            Annotation::Protective(note) => protective_factors.push(note),
        }
    }

    let inputs: Vec<(SurvivalFactor, f64, f64)> = scored
        .iter()
        .map(|s| (s.factor, s.score, s.factor.weight()))
        .collect();
    let signals_used: Vec<SurvivalFactor> = scored.iter().map(|s| s.factor).collect();

    let (active_probability, primary_indicator) = match combine_present(&inputs) {
        Some(combination) => (
            combination.value.clamp(0.0, 1.0),
            combination.strongest_by(|index| scored[index].score),
        ),
        None => {
            protective_factors.push("Insufficient data - neutral assessment".to_string());
            (NEUTRAL_PROBABILITY, None)
        }
    };

    SurvivalScore {
        active_probability,
        confidence_level: classify_factor_count(signals_used.len()),
        risk_factors,
        protective_factors,
        primary_indicator,
        signals_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConfidenceLevel;

    #[test]
    fn recency_follows_expected_tiers() {
        assert_eq!(score_recency(10).unwrap().score, 1.0);
        assert_eq!(score_recency(30).unwrap().score, 1.0);
        assert_eq!(score_recency(60).unwrap().score, 0.75);
        assert_eq!(score_recency(150).unwrap().score, 0.4);
        assert_eq!(score_recency(181).unwrap().score, 0.1);
    }

    #[test]
    fn future_review_date_is_not_scored_as_recent() {
        assert!(score_recency(-1675).is_none());

        let mut establishment = crate::models::Establishment::new("e-1", "coffee");
        establishment.latest_review_date = Some("2030-01-01".to_string());
        let baseline = crate::baseline::BaselineTable::default();
        let as_of = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let features = crate::features::derive_features(
            &establishment,
            baseline.get("coffee").unwrap(),
            &crate::config::Thresholds::default(),
            as_of,
        );
        let score = score_survival(&features);
        assert_eq!(score.active_probability, 0.5);
        assert!(score.signals_used.is_empty());
        assert!(score.protective_factors.iter().all(|note| !note.contains("days ago")));
    }

    #[test]
    fn decay_follows_expected_tiers() {
        assert_eq!(score_decay(1.5).unwrap().score, 0.9);
        assert_eq!(score_decay(1.0).unwrap().score, 0.8);
        assert_eq!(score_decay(0.6).unwrap().score, 0.5);
        assert_eq!(score_decay(0.1).unwrap().score, 0.2);
    }

    #[test]
    fn hiring_without_history_is_neutral() {
        let scored = score_hiring(0.0, None).unwrap();
        assert_eq!(scored.score, 0.5);
        assert_eq!(scored.annotation, None);
        assert_eq!(score_hiring(0.0, Some(6.0)).unwrap().score, 0.35);
        assert_eq!(score_hiring(5.0, Some(6.0)).unwrap().score, 0.85);
        assert_eq!(score_hiring(2.0, Some(6.0)).unwrap().score, 0.65);
    }

    #[test]
    fn visual_vote_needs_two_positive_cues() {
        assert_eq!(score_visual(&[Some(true), Some(true), None]).unwrap().score, 0.8);
        assert_eq!(score_visual(&[Some(true), Some(false), None]).unwrap().score, 0.2);
        assert_eq!(score_visual(&[Some(true), None, None]).unwrap().score, 0.2);
        assert!(score_visual(&[None, None, None]).is_none());
    }

    #[test]
    fn stale_reviews_alone_give_low_probability() {
        let features = DerivedFeatures {
            days_since_last_review: Some(400),
            ..DerivedFeatures::default()
        };
        let score = score_survival(&features);
        assert!((score.active_probability - 0.1).abs() < 1e-12);
        assert_eq!(score.confidence_level, ConfidenceLevel::Low);
        assert!(score
            .risk_factors
            .iter()
            .any(|note| note.starts_with("No recent activity")));
        assert_eq!(score.primary_indicator, Some(SurvivalFactor::ReviewRecency));
    }

    #[test]
    fn no_factors_yield_neutral_default() {
        let score = score_survival(&DerivedFeatures::default());
        assert_eq!(score.active_probability, 0.5);
        assert_eq!(score.confidence_level, ConfidenceLevel::Low);
        assert_eq!(score.primary_indicator_name(), "none");
        assert!(score.signals_used.is_empty());
        assert_eq!(score.protective_factors.len(), 1);
    }

    #[test]
    fn present_factors_are_renormalized() {
        let features = DerivedFeatures {
            days_since_last_review: Some(10),
            review_decay_ratio: Some(0.3),
            visual_cues: [Some(true), Some(true), Some(true)],
            ..DerivedFeatures::default()
        };
        let score = score_survival(&features);
        let expected = (1.0 * 0.35 + 0.2 * 0.30 + 0.8 * 0.15) / 0.80;
        assert!((score.active_probability - expected).abs() < 1e-9);
        assert_eq!(score.confidence_level, ConfidenceLevel::High);
        assert_eq!(score.risk_factors.len(), 1);
        assert_eq!(score.protective_factors.len(), 2);
        assert_eq!(score.primary_indicator, Some(SurvivalFactor::ReviewRecency));
    }

    #[test]
    fn primary_indicator_weighs_score_by_weight() {
        let features = DerivedFeatures {
            days_since_last_review: Some(400),
            review_decay_ratio: Some(1.0),
            ..DerivedFeatures::default()
        };
        let score = score_survival(&features);
        assert_eq!(score.primary_indicator, Some(SurvivalFactor::ReviewDecay));
        assert_eq!(score.confidence_level, ConfidenceLevel::Medium);
    }
}
