use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ConfidenceLevel, EnrichedRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct MixEntry {
    pub label: String,
    pub count: usize,
}

/// Counts records per label, most frequent first, ties alphabetical.
pub fn summarize_by<F>(records: &[EnrichedRecord], label: F) -> Vec<MixEntry>
where
    F: Fn(&EnrichedRecord) -> String,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(label(record)).or_insert(0) += 1;
    }

    let mut mix: Vec<MixEntry> = counts
        .into_iter()
        .map(|(label, count)| MixEntry { label, count })
        .collect();
    mix.sort_by(|a, b| b.count.cmp(&a.count));
    mix
}

/// Establishments ordered by ascending active probability.
pub fn highest_risk(records: &[EnrichedRecord]) -> Vec<&EnrichedRecord> {
    let mut ranked: Vec<&EnrichedRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        a.survival
            .active_probability
            .partial_cmp(&b.survival.active_probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

pub fn build_report(as_of: NaiveDate, records: &[EnrichedRecord], rejected: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Establishment Enrichment Report");
    let _ = writeln!(
        output,
        "Generated as of {} for {} establishments ({} rejected)",
        as_of,
        records.len(),
        rejected
    );
    let _ = writeln!(output);

    write_mix(
        &mut output,
        "Employee Estimate Confidence",
        &summarize_by(records, |r| r.employees.confidence_level.to_string()),
    );
    write_mix(
        &mut output,
        "Dominant Signals",
        &summarize_by(records, |r| r.employees.dominant_signal_name().to_string()),
    );
    write_mix(
        &mut output,
        "Survival Confidence",
        &summarize_by(records, |r| r.survival.confidence_level.to_string()),
    );

    let _ = writeln!(output, "## Highest Closure Risk");
    let at_risk = highest_risk(records);
    if at_risk.is_empty() {
        let _ = writeln!(output, "No establishments in this batch.");
    } else {
        for record in at_risk.iter().take(10) {
            let risks = if record.survival.risk_factors.is_empty() {
                "no risk factors".to_string()
            } else {
                record.survival.risk_factors.join("; ")
            };
            let _ = writeln!(
                output,
                "- {} ({}, {}) active probability {:.2}: {}",
                display_name(record),
                record.establishment_id,
                record.category,
                record.survival.active_probability,
                risks
            );
        }
    }

    let starved: Vec<&EnrichedRecord> = records
        .iter()
        .filter(|r| {
            r.employees.confidence_level == ConfidenceLevel::Low
                && r.survival.signals_used.is_empty()
        })
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Records Without Usable Signals");
    if starved.is_empty() {
        let _ = writeln!(output, "Every establishment had at least one usable signal.");
    } else {
        for record in starved {
            let _ = writeln!(
                output,
                "- {} ({}, {})",
                display_name(record),
                record.establishment_id,
                record.category
            );
        }
    }

    output
}

fn write_mix(output: &mut String, title: &str, mix: &[MixEntry]) {
    let _ = writeln!(output, "## {title}");
    if mix.is_empty() {
        let _ = writeln!(output, "No establishments in this batch.");
    } else {
        for entry in mix {
            let _ = writeln!(output, "- {}: {}", entry.label, entry.count);
        }
    }
    let _ = writeln!(output);
}

fn display_name(record: &EnrichedRecord) -> &str {
    if record.name.is_empty() {
        "unnamed"
    } else {
        &record.name
    }
}
