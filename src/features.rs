use chrono::{DateTime, NaiveDate};

use crate::baseline::CategoryBaseline;
use crate::config::Thresholds;
use crate::models::{DerivedFeatures, Establishment, ReviewWindows};

const DAYS_PER_MONTH: f64 = 30.0;
const POPULARITY_INDEX_MAX: f64 = 100.0;

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Turns a raw observation bundle into normalized features. Missing or
/// malformed inputs yield `None` for the features that depend on them.
pub fn derive_features(
    establishment: &Establishment,
    baseline: &CategoryBaseline,
    thresholds: &Thresholds,
    as_of: NaiveDate,
) -> DerivedFeatures {
    let recent_reviews = non_negative(establishment.recent_review_count);
    let historical_reviews = non_negative(establishment.historical_review_count);
    let total_reviews = non_negative(establishment.total_review_count).or_else(|| {
        recent_reviews
            .zip(historical_reviews)
            .map(|(recent, historical)| recent + historical)
    });
    let oldest = establishment.oldest_review_date.as_deref().and_then(parse_date);
    let latest = establishment.latest_review_date.as_deref().and_then(parse_date);

    let recent_postings = non_negative(establishment.recent_postings);
    let historical_peak_postings = non_negative(establishment.historical_peak_postings);

    DerivedFeatures {
        direct_headcount: non_negative(establishment.direct_headcount),
        reviews_per_month: reviews_per_month(total_reviews, oldest, latest),
        review_windows: recent_reviews.zip(historical_reviews).map(
            |(recent_count, historical_count)| ReviewWindows {
                recent_count,
                historical_count,
                recent_monthly_rate: recent_count / thresholds.recent_window_months,
            },
        ),
        review_decay_ratio: review_decay_ratio(
            recent_reviews,
            historical_reviews,
            baseline,
            thresholds,
        ),
        days_since_last_review: days_since(latest, as_of),
        area_measurement: non_negative(establishment.area_measurement),
        recent_postings,
        historical_peak_postings,
        hiring_intensity_ratio: hiring_intensity_ratio(recent_postings, historical_peak_postings),
        visitor_density_ratio: visitor_density_ratio(
            non_negative(establishment.popularity_index),
            baseline,
        ),
        registry_partner_count: non_negative(establishment.registry_partner_count),
        visual_cues: [
            establishment.facade_visible,
            establishment.signage_visible,
            establishment.lighting_visible,
        ],
    }
}

/// Parses the date layouts the review collaborators are known to emit.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

pub fn reviews_per_month(
    total_reviews: Option<f64>,
    oldest: Option<NaiveDate>,
    latest: Option<NaiveDate>,
) -> Option<f64> {
    let total = total_reviews.filter(|count| *count > 0.0)?;
    let (oldest, latest) = oldest.zip(latest)?;
    if latest <= oldest {
        return None;
    }
    let months = ((latest - oldest).num_days() as f64 / DAYS_PER_MONTH).max(1.0);
    Some(total / months)
}

/// Reviews dated after `as_of` are treated as unparseable.
pub fn days_since(latest: Option<NaiveDate>, as_of: NaiveDate) -> Option<i64> {
    latest
        .map(|date| (as_of - date).num_days())
        .filter(|days| *days >= 0)
}

pub fn review_decay_ratio(
    recent_reviews: Option<f64>,
    historical_reviews: Option<f64>,
    baseline: &CategoryBaseline,
    thresholds: &Thresholds,
) -> Option<f64> {
    let recent = recent_reviews?;
    let historical = historical_reviews.filter(|count| *count >= thresholds.min_historical_reviews)?;

    let recent_rate = recent / thresholds.recent_window_months;
    let mut historical_rate = historical / thresholds.historical_window_months;
    // TODO: a long run of zero reviews reads as neutral here; revisit once the
    // intended meaning of an empty historical window is settled.
    if historical_rate < thresholds.decay_epsilon {
        historical_rate = baseline.typical_review_velocity;
    }
    Some(recent_rate / historical_rate)
}

pub fn hiring_intensity_ratio(
    recent_postings: Option<f64>,
    historical_peak_postings: Option<f64>,
) -> Option<f64> {
    let recent = recent_postings?;
    let peak = historical_peak_postings.unwrap_or(0.0).max(1.0);
    Some(recent / peak)
}

/// Converts a 0-100 popularity index into customers per hour; larger values
/// are already absolute customer counts.
pub fn visitor_density_ratio(popularity: Option<f64>, baseline: &CategoryBaseline) -> Option<f64> {
    let value = popularity?;
    if value > POPULARITY_INDEX_MAX {
        Some(value)
    } else {
        Some(value / POPULARITY_INDEX_MAX * baseline.peak_traffic_ceiling)
    }
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineTable;

    fn coffee() -> CategoryBaseline {
        BaselineTable::default().get("coffee").unwrap().clone()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn parses_supported_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 4);
        assert_eq!(parse_date("2025-03-04"), expected);
        assert_eq!(parse_date("2025/03/04"), expected);
        assert_eq!(parse_date("03/04/2025"), expected);
        assert_eq!(parse_date("March 04, 2025"), expected);
        assert_eq!(parse_date("Mar 4, 2025"), expected);
        assert_eq!(parse_date("2025-03-04T10:15:00Z"), expected);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("  "), None);
    }

    #[test]
    fn reviews_per_month_requires_ordered_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1);
        let end = NaiveDate::from_ymd_opt(2024, 7, 17);
        let rate = reviews_per_month(Some(120.0), start, end).unwrap();
        assert!((rate - 120.0 / 6.6).abs() < 1e-9);
        assert_eq!(reviews_per_month(Some(120.0), end, start), None);
        assert_eq!(reviews_per_month(Some(0.0), start, end), None);
        assert_eq!(reviews_per_month(None, start, end), None);
    }

    #[test]
    fn short_spans_count_as_one_month() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1);
        let end = NaiveDate::from_ymd_opt(2024, 1, 10);
        assert_eq!(reviews_per_month(Some(9.0), start, end), Some(9.0));
    }

    #[test]
    fn decay_ratio_compares_monthly_rates() {
        let ratio =
            review_decay_ratio(Some(40.0), Some(20.0), &coffee(), &Thresholds::default()).unwrap();
        assert!((ratio - 4.0).abs() < 1e-9);
    }

    #[test]
    fn decay_ratio_needs_historical_sample() {
        let thresholds = Thresholds::default();
        assert_eq!(review_decay_ratio(Some(5.0), Some(1.0), &coffee(), &thresholds), None);
        assert_eq!(review_decay_ratio(None, Some(10.0), &coffee(), &thresholds), None);
        assert_eq!(review_decay_ratio(Some(0.0), Some(12.0), &coffee(), &thresholds), Some(0.0));
    }

    #[test]
    fn decay_ratio_guards_near_zero_history() {
        let thresholds = Thresholds {
            historical_window_months: 60.0,
            ..Thresholds::default()
        };
        // 2 reviews over 60 months is below epsilon, so the category velocity stands in.
        let ratio = review_decay_ratio(Some(30.0), Some(2.0), &coffee(), &thresholds).unwrap();
        assert!((ratio - 10.0 / 20.0).abs() < 1e-9);
    }

    #[test]
    fn hiring_ratio_floors_peak_at_one() {
        assert_eq!(hiring_intensity_ratio(Some(3.0), Some(0.0)), Some(3.0));
        assert_eq!(hiring_intensity_ratio(Some(3.0), None), Some(3.0));
        assert_eq!(hiring_intensity_ratio(Some(2.0), Some(8.0)), Some(0.25));
        assert_eq!(hiring_intensity_ratio(None, Some(8.0)), None);
    }

    #[test]
    fn popularity_index_scales_to_ceiling() {
        let baseline = coffee();
        assert_eq!(visitor_density_ratio(Some(50.0), &baseline), Some(60.0));
        assert_eq!(visitor_density_ratio(Some(140.0), &baseline), Some(140.0));
        assert_eq!(visitor_density_ratio(None, &baseline), None);
    }

    #[test]
    fn malformed_inputs_propagate_as_missing() {
        let mut establishment = Establishment::new("e-1", "coffee");
        establishment.recent_review_count = Some(-4.0);
        establishment.historical_review_count = Some(10.0);
        establishment.latest_review_date = Some("not a date".to_string());
        establishment.area_measurement = Some(f64::NAN);

        let features = derive_features(&establishment, &coffee(), &Thresholds::default(), as_of());
        assert_eq!(features.review_windows, None);
        assert_eq!(features.review_decay_ratio, None);
        assert_eq!(features.days_since_last_review, None);
        assert_eq!(features.area_measurement, None);
    }

    #[test]
    fn future_review_date_counts_as_missing() {
        let mut establishment = Establishment::new("e-3", "coffee");
        establishment.latest_review_date = Some("2030-01-01".to_string());
        let features = derive_features(&establishment, &coffee(), &Thresholds::default(), as_of());
        assert_eq!(features.days_since_last_review, None);

        assert_eq!(days_since(Some(as_of()), as_of()), Some(0));
        assert_eq!(days_since(NaiveDate::from_ymd_opt(2025, 6, 2), as_of()), None);
    }

    #[test]
    fn date_span_rate_is_carried_on_features() {
        let mut establishment = Establishment::new("e-4", "coffee");
        establishment.total_review_count = Some(5000.0);
        establishment.oldest_review_date = Some("2025-01-01".to_string());
        establishment.latest_review_date = Some("2025-05-31".to_string());
        let features = derive_features(&establishment, &coffee(), &Thresholds::default(), as_of());
        assert_eq!(features.reviews_per_month, Some(1000.0));
    }

    #[test]
    fn derives_recency_and_windows() {
        let mut establishment = Establishment::new("e-2", "coffee");
        establishment.recent_review_count = Some(12.0);
        establishment.historical_review_count = Some(18.0);
        establishment.latest_review_date = Some("2025-05-02".to_string());

        let features = derive_features(&establishment, &coffee(), &Thresholds::default(), as_of());
        assert_eq!(features.days_since_last_review, Some(30));
        let windows = features.review_windows.unwrap();
        assert_eq!(windows.recent_monthly_rate, 4.0);
        assert_eq!(windows.total(), 30.0);
    }
}
