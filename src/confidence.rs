use crate::models::{ConfidenceLevel, SignalKind};

/// Rule table for the employee estimate, evaluated top to bottom.
pub fn classify_signals(signals: &[SignalKind]) -> ConfidenceLevel {
    let has_direct = signals.contains(&SignalKind::DirectCount);
    let has_reviews = signals.contains(&SignalKind::ReviewVelocity);

    match signals.len() {
        _ if has_direct => ConfidenceLevel::High,
        n if n >= 3 => ConfidenceLevel::High,
        2 if has_reviews => ConfidenceLevel::Medium,
        n if n >= 1 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::Low,
    }
}

/// Survival confidence depends only on how many factors were present.
pub fn classify_factor_count(factors: usize) -> ConfidenceLevel {
    match factors {
        0 | 1 => ConfidenceLevel::Low,
        2 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_count_alone_is_high() {
        assert_eq!(classify_signals(&[SignalKind::DirectCount]), ConfidenceLevel::High);
    }

    #[test]
    fn signal_rules_follow_expected_tiers() {
        assert_eq!(classify_signals(&[]), ConfidenceLevel::Low);
        assert_eq!(classify_signals(&[SignalKind::AreaDensity]), ConfidenceLevel::Medium);
        assert_eq!(
            classify_signals(&[SignalKind::ReviewVelocity, SignalKind::HiringActivity]),
            ConfidenceLevel::Medium
        );
        assert_eq!(
            classify_signals(&[
                SignalKind::AreaDensity,
                SignalKind::VisitorDensity,
                SignalKind::HiringActivity
            ]),
            ConfidenceLevel::High
        );
    }

    #[test]
    fn adding_a_signal_never_lowers_confidence() {
        for first in SignalKind::ALL {
            for second in SignalKind::ALL.into_iter().filter(|kind| *kind != first) {
                let single = classify_signals(&[first]);
                let pair = classify_signals(&[first, second]);
                assert!(pair >= single, "{first} + {second}");
            }
        }
    }

    #[test]
    fn factor_counts_follow_expected_tiers() {
        assert_eq!(classify_factor_count(0), ConfidenceLevel::Low);
        assert_eq!(classify_factor_count(1), ConfidenceLevel::Low);
        assert_eq!(classify_factor_count(2), ConfidenceLevel::Medium);
        assert_eq!(classify_factor_count(4), ConfidenceLevel::High);
    }
}
