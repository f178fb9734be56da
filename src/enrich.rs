use chrono::NaiveDate;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::baseline::CategoryBaseline;
use crate::config::EstimationConfig;
use crate::ensemble::combine_estimates;
use crate::error::{EnrichmentError, Result};
use crate::features::derive_features;
use crate::models::{CombinedEstimate, DerivedFeatures, EnrichedRecord, Establishment, SurvivalScore};
use crate::signals::estimate_all;
use crate::survival::score_survival;

/// Establishments that could not be enriched, with the reason.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<EnrichedRecord>,
    pub rejected: Vec<(String, EnrichmentError)>,
}

fn features_for<'a>(
    establishment: &Establishment,
    config: &'a EstimationConfig,
    as_of: NaiveDate,
) -> Result<(DerivedFeatures, &'a CategoryBaseline)> {
    let baseline = config.baselines.get(&establishment.category)?;
    let features = derive_features(establishment, baseline, &config.thresholds, as_of);
    Ok((features, baseline))
}

pub fn estimate_employees(
    establishment: &Establishment,
    config: &EstimationConfig,
    as_of: NaiveDate,
) -> Result<CombinedEstimate> {
    let (features, baseline) = features_for(establishment, config, as_of)?;
    let estimates = estimate_all(&features, baseline, &config.thresholds);
    Ok(combine_estimates(&estimates, baseline))
}

pub fn assess_survival(
    establishment: &Establishment,
    config: &EstimationConfig,
    as_of: NaiveDate,
) -> Result<SurvivalScore> {
    let (features, _) = features_for(establishment, config, as_of)?;
    Ok(score_survival(&features))
}

/// Runs both estimation paths for one establishment. Only an unknown
/// category is an error; everything else degrades into lower confidence.
pub fn enrich_record(
    establishment: &Establishment,
    config: &EstimationConfig,
    as_of: NaiveDate,
) -> Result<EnrichedRecord> {
    let (features, baseline) = features_for(establishment, config, as_of)?;

    let estimates = estimate_all(&features, baseline, &config.thresholds);
    let employees = combine_estimates(&estimates, baseline);
    let survival = score_survival(&features);

    if employees.signals_used.is_empty() && survival.signals_used.is_empty() {
        debug!(
            "{}: no usable signals, falling back to baseline",
            establishment.establishment_id
        );
    }

    Ok(EnrichedRecord {
        establishment_id: establishment.establishment_id.clone(),
        name: establishment.name.clone(),
        category: establishment.category.clone(),
        employees,
        survival,
        reviews_per_month: features.reviews_per_month,
        days_since_last_review: features.days_since_last_review,
        review_decay_ratio: features.review_decay_ratio,
    })
}

/// Enriches establishments in parallel. Output keeps input order; records
/// with an unknown category are set aside instead of failing the batch.
pub fn enrich_batch(
    establishments: &[Establishment],
    config: &EstimationConfig,
    as_of: NaiveDate,
) -> BatchOutcome {
    let results: Vec<Result<EnrichedRecord>> = establishments
        .par_iter()
        .map(|establishment| enrich_record(establishment, config, as_of))
        .collect();

    let mut outcome = BatchOutcome::default();
    for (establishment, result) in establishments.iter().zip(results) {
        match result {
            Ok(record) => outcome.records.push(record),
            Err(err) => {
                warn!("Skipping {}: {err}", establishment.establishment_id);
                outcome
                    .rejected
                    .push((establishment.establishment_id.clone(), err));
            }
        }
    }

    info!(
        "Enriched {} establishments as of {} ({} rejected)",
        outcome.records.len(),
        as_of,
        outcome.rejected.len()
    );
    outcome
}
