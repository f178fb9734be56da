use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EnrichmentError, Result};

/// Reference constants for one business category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBaseline {
    pub typical_count: f64,
    pub min_count: f64,
    pub max_count: f64,
    /// Reviews per month for a typical establishment.
    pub typical_review_velocity: f64,
    /// Employees per square meter of floor area.
    pub area_density_coefficient: f64,
    /// Customers per hour at a popularity index of 100.
    pub peak_traffic_ceiling: f64,
}

impl CategoryBaseline {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_count, self.max_count)
    }

    fn validate(&self, category: &str) -> Result<()> {
        let ordered = self.min_count > 0.0
            && self.min_count <= self.typical_count
            && self.typical_count <= self.max_count;
        if !ordered {
            return Err(EnrichmentError::InvalidConfig(format!(
                "{category}: expected 0 < min_count <= typical_count <= max_count"
            )));
        }
        let rates = [
            self.typical_review_velocity,
            self.area_density_coefficient,
            self.peak_traffic_ceiling,
        ];
        if rates.iter().any(|rate| !rate.is_finite() || *rate <= 0.0) {
            return Err(EnrichmentError::InvalidConfig(format!(
                "{category}: review velocity, area coefficient and traffic ceiling must be positive"
            )));
        }
        Ok(())
    }
}

/// Immutable category -> baseline lookup shared by every estimation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, CategoryBaseline>", into = "BTreeMap<String, CategoryBaseline>")]
pub struct BaselineTable {
    entries: BTreeMap<String, CategoryBaseline>,
}

impl BaselineTable {
    pub fn new(entries: BTreeMap<String, CategoryBaseline>) -> Result<Self> {
        let mut normalized = BTreeMap::new();
        for (category, baseline) in entries {
            let key = normalize_category(&category);
            baseline.validate(&key)?;
            normalized.insert(key, baseline);
        }
        if normalized.is_empty() {
            return Err(EnrichmentError::InvalidConfig(
                "baseline table has no categories".to_string(),
            ));
        }
        Ok(Self {
            entries: normalized,
        })
    }

    /// Looks up a category, rejecting anything not configured.
    pub fn get(&self, category: &str) -> Result<&CategoryBaseline> {
        self.entries
            .get(&normalize_category(category))
            .ok_or_else(|| EnrichmentError::UnknownCategory(category.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryBaseline)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BaselineTable {
    fn default() -> Self {
        let rows = [
            ("coffee", 12.0, 3.0, 50.0, 20.0, 1.0 / 18.0, 120.0),
            ("gym", 15.0, 3.0, 80.0, 8.0, 1.0 / 35.0, 80.0),
            ("grocery", 25.0, 5.0, 150.0, 12.0, 1.0 / 25.0, 200.0),
            ("civic", 8.0, 2.0, 40.0, 3.0, 1.0 / 40.0, 60.0),
            ("religion", 6.0, 1.0, 30.0, 2.0, 1.0 / 60.0, 150.0),
            ("library", 10.0, 2.0, 60.0, 4.0, 1.0 / 45.0, 70.0),
            ("park", 4.0, 1.0, 20.0, 2.0, 1.0 / 500.0, 100.0),
        ];
        let entries = rows
            .into_iter()
            .map(|(category, typical, min, max, velocity, density, ceiling)| {
                (
                    category.to_string(),
                    CategoryBaseline {
                        typical_count: typical,
                        min_count: min,
                        max_count: max,
                        typical_review_velocity: velocity,
                        area_density_coefficient: density,
                        peak_traffic_ceiling: ceiling,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl TryFrom<BTreeMap<String, CategoryBaseline>> for BaselineTable {
    type Error = EnrichmentError;

    fn try_from(entries: BTreeMap<String, CategoryBaseline>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<BaselineTable> for BTreeMap<String, CategoryBaseline> {
    fn from(table: BaselineTable) -> Self {
        table.entries
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_coffee_matches_reference_values() {
        let table = BaselineTable::default();
        let coffee = table.get("coffee").unwrap();
        assert_eq!(coffee.typical_count, 12.0);
        assert_eq!(coffee.min_count, 3.0);
        assert_eq!(coffee.max_count, 50.0);
        assert_eq!(coffee.typical_review_velocity, 20.0);
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let table = BaselineTable::default();
        assert!(table.get("  Gym ").is_ok());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let table = BaselineTable::default();
        let err = table.get("car_wash").unwrap_err();
        assert!(matches!(err, EnrichmentError::UnknownCategory(ref c) if c == "car_wash"));
    }

    #[test]
    fn inverted_bounds_fail_validation() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "bakery".to_string(),
            CategoryBaseline {
                typical_count: 5.0,
                min_count: 10.0,
                max_count: 20.0,
                typical_review_velocity: 4.0,
                area_density_coefficient: 0.05,
                peak_traffic_ceiling: 40.0,
            },
        );
        assert!(matches!(
            BaselineTable::new(entries),
            Err(EnrichmentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn table_deserializes_from_json_map() {
        let json = r#"{
            "Bakery": {
                "typical_count": 6, "min_count": 2, "max_count": 25,
                "typical_review_velocity": 5, "area_density_coefficient": 0.04,
                "peak_traffic_ceiling": 60
            }
        }"#;
        let table: BaselineTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.get("bakery").unwrap().max_count, 25.0);
        assert!(table.get("coffee").is_err());
    }
}
