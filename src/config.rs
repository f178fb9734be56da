use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::baseline::BaselineTable;
use crate::error::{EnrichmentError, Result};

/// Minimum-sample thresholds and window lengths used by signal derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Reviews required in each window before review velocity is trusted.
    pub min_window_reviews: f64,
    /// Reviews required in the historical window before a decay ratio is computed.
    pub min_historical_reviews: f64,
    pub recent_window_months: f64,
    pub historical_window_months: f64,
    /// Historical monthly rates below this are replaced by the category velocity.
    pub decay_epsilon: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_window_reviews: 3.0,
            min_historical_reviews: 2.0,
            recent_window_months: 3.0,
            historical_window_months: 6.0,
            decay_epsilon: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    pub thresholds: Thresholds,
    pub baselines: BaselineTable,
}

impl EstimationConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if t.recent_window_months <= 0.0 || t.historical_window_months <= 0.0 {
            return Err(EnrichmentError::InvalidConfig(
                "review windows must span a positive number of months".to_string(),
            ));
        }
        if t.min_window_reviews < 0.0 || t.min_historical_reviews < 0.0 || t.decay_epsilon < 0.0 {
            return Err(EnrichmentError::InvalidConfig(
                "thresholds must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: EstimationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EstimationConfig::default());
        assert_eq!(config.thresholds.recent_window_months, 3.0);
    }

    #[test]
    fn partial_thresholds_keep_remaining_defaults() {
        let config: EstimationConfig =
            serde_json::from_str(r#"{"thresholds": {"decay_epsilon": 0.5}}"#).unwrap();
        assert_eq!(config.thresholds.decay_epsilon, 0.5);
        assert_eq!(config.thresholds.min_window_reviews, 3.0);
        assert!(config.baselines.get("park").is_ok());
    }

    #[test]
    fn zero_month_window_is_invalid() {
        let config: EstimationConfig =
            serde_json::from_str(r#"{"thresholds": {"recent_window_months": 0}}"#).unwrap();
        assert!(config.validate().is_err());
    }
}
