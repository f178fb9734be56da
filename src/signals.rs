use crate::baseline::CategoryBaseline;
use crate::config::Thresholds;
use crate::models::{DerivedFeatures, SignalEstimate, SignalKind};

// Customers per hour at peak handled by one employee.
const CUSTOMERS_PER_EMPLOYEE: f64 = 12.5;
const STAFF_PER_REGISTRY_PARTNER: f64 = 2.0;
const MIN_VELOCITY_MARGIN: f64 = 0.15;

impl SignalKind {
    pub fn weight(&self) -> f64 {
        match self {
            SignalKind::DirectCount => 0.50,
            SignalKind::ReviewVelocity => 0.30,
            SignalKind::AreaDensity => 0.15,
            SignalKind::VisitorDensity => 0.10,
            SignalKind::RegistryPartners => 0.10,
            SignalKind::HiringActivity => 0.05,
        }
    }

    pub fn estimate(
        &self,
        features: &DerivedFeatures,
        baseline: &CategoryBaseline,
        thresholds: &Thresholds,
    ) -> Option<SignalEstimate> {
        match self {
            SignalKind::DirectCount => from_direct_count(features.direct_headcount?, baseline),
            SignalKind::ReviewVelocity => {
                let windows = features.review_windows?;
                if windows.recent_count < thresholds.min_window_reviews
                    || windows.historical_count < thresholds.min_window_reviews
                {
                    return None;
                }
                from_review_velocity(windows.recent_monthly_rate, windows.total(), baseline)
            }
            SignalKind::AreaDensity => from_area(features.area_measurement?, baseline),
            SignalKind::VisitorDensity => {
                from_visitor_density(features.visitor_density_ratio?, baseline)
            }
            SignalKind::RegistryPartners => {
                from_registry_partners(features.registry_partner_count?, baseline)
            }
            SignalKind::HiringActivity => {
                let recent = features.recent_postings?;
                let peak = features.historical_peak_postings.unwrap_or(0.0);
                if recent < 1.0 && peak < 2.0 {
                    return None;
                }
                from_hiring_intensity(features.hiring_intensity_ratio?, baseline)
            }
        }
    }
}

pub fn estimate_all(
    features: &DerivedFeatures,
    baseline: &CategoryBaseline,
    thresholds: &Thresholds,
) -> Vec<(SignalKind, SignalEstimate)> {
    SignalKind::ALL
        .iter()
        .filter_map(|kind| {
            kind.estimate(features, baseline, thresholds)
                .map(|estimate| (*kind, estimate))
        })
        .collect()
}

pub fn from_direct_count(headcount: f64, baseline: &CategoryBaseline) -> Option<SignalEstimate> {
    positive(headcount)?;
    let mut estimate = banded(headcount, 0.10, baseline);
    // At least one person, unless the reported headcount itself is lower.
    estimate.lower = estimate.lower.max(1.0).min(estimate.point);
    Some(estimate)
}

pub fn from_review_velocity(
    reviews_per_month: f64,
    total_reviews: f64,
    baseline: &CategoryBaseline,
) -> Option<SignalEstimate> {
    positive(reviews_per_month)?;
    let intensity = reviews_per_month / baseline.typical_review_velocity;
    let margin = (2.0 / (total_reviews + 1.0).ln()).max(MIN_VELOCITY_MARGIN);
    Some(banded(baseline.typical_count * intensity, margin, baseline))
}

pub fn from_area(area: f64, baseline: &CategoryBaseline) -> Option<SignalEstimate> {
    positive(area)?;
    Some(banded(area * baseline.area_density_coefficient, 0.25, baseline))
}

pub fn from_visitor_density(
    customers_per_hour: f64,
    baseline: &CategoryBaseline,
) -> Option<SignalEstimate> {
    positive(customers_per_hour)?;
    Some(banded(customers_per_hour / CUSTOMERS_PER_EMPLOYEE, 0.35, baseline))
}

pub fn from_registry_partners(partners: f64, baseline: &CategoryBaseline) -> Option<SignalEstimate> {
    positive(partners)?;
    Some(banded(partners * STAFF_PER_REGISTRY_PARTNER, 0.40, baseline))
}

pub fn from_hiring_intensity(ratio: f64, baseline: &CategoryBaseline) -> Option<SignalEstimate> {
    if !ratio.is_finite() || ratio < 0.0 {
        return None;
    }
    let multiplier = hiring_multiplier(ratio);
    Some(banded(baseline.typical_count * multiplier, 0.30, baseline))
}

pub fn hiring_multiplier(ratio: f64) -> f64 {
    if ratio > 0.7 {
        1.2
    } else if ratio > 0.2 {
        1.0
    } else {
        0.9
    }
}

fn banded(raw_point: f64, half_width: f64, baseline: &CategoryBaseline) -> SignalEstimate {
    let point = baseline.clamp(raw_point);
    SignalEstimate {
        point,
        lower: baseline.clamp(point * (1.0 - half_width)),
        upper: baseline.clamp(point * (1.0 + half_width)),
    }
}

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}
