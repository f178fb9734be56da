use std::io::{Read, Write};

use anyhow::Context;
use serde::Serialize;

use crate::models::{EnrichedRecord, Establishment};

/// Flat output row using the column names downstream consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub establishment_id: String,
    pub name: String,
    pub category: String,
    pub employee_estimate: f64,
    pub employee_estimate_min: f64,
    pub employee_estimate_max: f64,
    pub employee_estimate_confidence: String,
    pub employee_estimate_dominant_signal: String,
    pub employee_estimate_signals_used: String,
    pub is_active_probability: f64,
    pub is_active_confidence: String,
    pub reviews_per_month: Option<f64>,
    pub days_since_last_review: Option<i64>,
    pub review_decay_ratio: Option<f64>,
    pub survival_primary_indicator: String,
    pub survival_risk_factors: String,
    pub survival_protective_factors: String,
    pub survival_signals_used: String,
}

impl From<&EnrichedRecord> for ExportRow {
    fn from(record: &EnrichedRecord) -> Self {
        let employees = &record.employees;
        let survival = &record.survival;
        Self {
            establishment_id: record.establishment_id.clone(),
            name: record.name.clone(),
            category: record.category.clone(),
            employee_estimate: round1(employees.point_estimate),
            employee_estimate_min: round1(employees.ci_lower),
            employee_estimate_max: round1(employees.ci_upper),
            employee_estimate_confidence: employees.confidence_level.to_string(),
            employee_estimate_dominant_signal: employees.dominant_signal_name().to_string(),
            employee_estimate_signals_used: join(employees.signals_used.iter()),
            is_active_probability: round3(survival.active_probability),
            is_active_confidence: survival.confidence_level.to_string(),
            reviews_per_month: record.reviews_per_month.map(round1),
            days_since_last_review: record.days_since_last_review,
            review_decay_ratio: record.review_decay_ratio.map(round2),
            survival_primary_indicator: survival.primary_indicator_name().to_string(),
            survival_risk_factors: survival.risk_factors.join("; "),
            survival_protective_factors: survival.protective_factors.join("; "),
            survival_signals_used: join(survival.signals_used.iter()),
        }
    }
}

pub fn read_establishments<R: Read>(reader: R) -> anyhow::Result<Vec<Establishment>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut establishments = Vec::new();
    for (index, row) in reader.deserialize::<Establishment>().enumerate() {
        let establishment = row.with_context(|| format!("invalid establishment row {}", index + 1))?;
        establishments.push(establishment);
    }
    Ok(establishments)
}

pub fn write_csv<W: Write>(writer: W, records: &[EnrichedRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(ExportRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(writer: W, records: &[EnrichedRecord]) -> anyhow::Result<()> {
    let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
    serde_json::to_writer_pretty(writer, &rows)?;
    Ok(())
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join("; ")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
