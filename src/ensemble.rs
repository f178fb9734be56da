use crate::baseline::CategoryBaseline;
use crate::confidence::classify_signals;
use crate::models::{CombinedEstimate, ConfidenceLevel, SignalEstimate, SignalKind};

/// Weighted average over the factors that are actually present, with the
/// fixed weights renormalized to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCombination<K> {
    pub value: f64,
    pub weights: Vec<(K, f64)>,
}

impl<K: Copy> WeightedCombination<K> {
    /// Key with the largest `weight * contribution`; ties keep the earliest key.
    pub fn strongest_by<F>(&self, contribution: F) -> Option<K>
    where
        F: Fn(usize) -> f64,
    {
        let mut best: Option<(K, f64)> = None;
        for (index, (key, weight)) in self.weights.iter().enumerate() {
            let influence = weight * contribution(index);
            match best {
                Some((_, current)) if influence <= current => {}
                _ => best = Some((*key, influence)),
            }
        }
        best.map(|(key, _)| key)
    }
}

/// Combines `(key, value, fixed_weight)` triples. Returns `None` when nothing
/// is present or the present weights sum to zero.
pub fn combine_present<K: Copy>(inputs: &[(K, f64, f64)]) -> Option<WeightedCombination<K>> {
    let total: f64 = inputs.iter().map(|(_, _, weight)| weight).sum();
    if inputs.is_empty() || total <= 0.0 {
        return None;
    }

    let weights: Vec<(K, f64)> = inputs
        .iter()
        .map(|(key, _, weight)| (*key, weight / total))
        .collect();
    let value: f64 = inputs
        .iter()
        .zip(weights.iter())
        .map(|((_, value, _), (_, weight))| value * weight)
        .sum();

    Some(WeightedCombination { value, weights })
}

/// Merges per-signal estimates into one. The band is the union of every
/// contributing band, so adding a loose signal can widen it.
pub fn combine_estimates(
    estimates: &[(SignalKind, SignalEstimate)],
    baseline: &CategoryBaseline,
) -> CombinedEstimate {
    let inputs: Vec<(SignalKind, f64, f64)> = estimates
        .iter()
        .map(|(kind, estimate)| (*kind, estimate.point, kind.weight()))
        .collect();

    let Some(combination) = combine_present(&inputs) else {
        return CombinedEstimate {
            point_estimate: baseline.typical_count,
            ci_lower: baseline.min_count,
            ci_upper: baseline.max_count,
            confidence_level: ConfidenceLevel::Low,
            dominant_signal: None,
            signals_used: Vec::new(),
        };
    };

    let ci_lower = estimates
        .iter()
        .map(|(_, estimate)| estimate.lower)
        .fold(f64::INFINITY, f64::min);
    let ci_upper = estimates
        .iter()
        .map(|(_, estimate)| estimate.upper)
        .fold(f64::NEG_INFINITY, f64::max);
    let signals_used: Vec<SignalKind> = estimates.iter().map(|(kind, _)| *kind).collect();

    CombinedEstimate {
        // Float summation can land a hair outside the union band.
        point_estimate: combination.value.clamp(ci_lower, ci_upper),
        ci_lower,
        ci_upper,
        confidence_level: classify_signals(&signals_used),
        dominant_signal: combination.strongest_by(|_| 1.0),
        signals_used,
    }
}
