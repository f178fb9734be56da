use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{EnrichedRecord, Establishment};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let mut lakeside = Establishment::new("seed-coffee-001", "coffee");
    lakeside.name = "Lakeside Roasters".to_string();
    lakeside.recent_review_count = Some(42.0);
    lakeside.historical_review_count = Some(61.0);
    lakeside.oldest_review_date = Some("2021-03-14".to_string());
    lakeside.latest_review_date = Some("2026-01-28".to_string());
    lakeside.total_review_count = Some(388.0);
    lakeside.area_measurement = Some(210.0);
    lakeside.popularity_index = Some(64.0);
    lakeside.facade_visible = Some(true);
    lakeside.signage_visible = Some(true);

    let mut ironworks = Establishment::new("seed-gym-001", "gym");
    ironworks.name = "Iron Works Fitness".to_string();
    ironworks.direct_headcount = Some(22.0);
    ironworks.recent_postings = Some(3.0);
    ironworks.historical_peak_postings = Some(4.0);
    ironworks.latest_review_date = Some("2026-01-05".to_string());

    let mut northside = Establishment::new("seed-grocery-001", "grocery");
    northside.name = "Northside Market".to_string();
    northside.recent_review_count = Some(2.0);
    northside.historical_review_count = Some(19.0);
    northside.latest_review_date = Some("2025-06-30".to_string());
    northside.recent_postings = Some(0.0);
    northside.historical_peak_postings = Some(5.0);
    northside.facade_visible = Some(true);
    northside.signage_visible = Some(false);
    northside.lighting_visible = Some(false);

    let mut inserted = 0usize;
    for establishment in [lakeside, ironworks, northside] {
        inserted += upsert_establishment(pool, &establishment).await? as usize;
    }
    Ok(inserted)
}

pub async fn upsert_establishment(
    pool: &PgPool,
    establishment: &Establishment,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO establishment_enrichment.establishments
        (establishment_id, name, category, direct_headcount, total_review_count,
         recent_review_count, historical_review_count, oldest_review_date,
         latest_review_date, area_measurement, recent_postings, historical_peak_postings,
         popularity_index, registry_partner_count, facade_visible, signage_visible,
         lighting_visible)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        ON CONFLICT (establishment_id) DO UPDATE
        SET name = EXCLUDED.name,
            category = EXCLUDED.category,
            direct_headcount = EXCLUDED.direct_headcount,
            total_review_count = EXCLUDED.total_review_count,
            recent_review_count = EXCLUDED.recent_review_count,
            historical_review_count = EXCLUDED.historical_review_count,
            oldest_review_date = EXCLUDED.oldest_review_date,
            latest_review_date = EXCLUDED.latest_review_date,
            area_measurement = EXCLUDED.area_measurement,
            recent_postings = EXCLUDED.recent_postings,
            historical_peak_postings = EXCLUDED.historical_peak_postings,
            popularity_index = EXCLUDED.popularity_index,
            registry_partner_count = EXCLUDED.registry_partner_count,
            facade_visible = EXCLUDED.facade_visible,
            signage_visible = EXCLUDED.signage_visible,
            lighting_visible = EXCLUDED.lighting_visible,
            updated_at = now()
        "#,
    )
    .bind(&establishment.establishment_id)
    .bind(&establishment.name)
    .bind(&establishment.category)
    .bind(establishment.direct_headcount)
    .bind(establishment.total_review_count)
    .bind(establishment.recent_review_count)
    .bind(establishment.historical_review_count)
    .bind(&establishment.oldest_review_date)
    .bind(&establishment.latest_review_date)
    .bind(establishment.area_measurement)
    .bind(establishment.recent_postings)
    .bind(establishment.historical_peak_postings)
    .bind(establishment.popularity_index)
    .bind(establishment.registry_partner_count)
    .bind(establishment.facade_visible)
    .bind(establishment.signage_visible)
    .bind(establishment.lighting_visible)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_establishments(
    pool: &PgPool,
    category: Option<&str>,
) -> anyhow::Result<Vec<Establishment>> {
    let mut query = String::from(
        "SELECT establishment_id, name, category, direct_headcount, total_review_count, \
         recent_review_count, historical_review_count, oldest_review_date, latest_review_date, \
         area_measurement, recent_postings, historical_peak_postings, popularity_index, \
         registry_partner_count, facade_visible, signage_visible, lighting_visible \
         FROM establishment_enrichment.establishments",
    );

    if category.is_some() {
        query.push_str(" WHERE lower(category) = lower($1)");
    }
    query.push_str(" ORDER BY establishment_id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = category {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(establishment_from_row).collect())
}

fn establishment_from_row(row: &PgRow) -> Establishment {
    Establishment {
        establishment_id: row.get("establishment_id"),
        name: row.get("name"),
        category: row.get("category"),
        direct_headcount: row.get("direct_headcount"),
        total_review_count: row.get("total_review_count"),
        recent_review_count: row.get("recent_review_count"),
        historical_review_count: row.get("historical_review_count"),
        oldest_review_date: row.get("oldest_review_date"),
        latest_review_date: row.get("latest_review_date"),
        area_measurement: row.get("area_measurement"),
        recent_postings: row.get("recent_postings"),
        historical_peak_postings: row.get("historical_peak_postings"),
        popularity_index: row.get("popularity_index"),
        registry_partner_count: row.get("registry_partner_count"),
        facade_visible: row.get("facade_visible"),
        signage_visible: row.get("signage_visible"),
        lighting_visible: row.get("lighting_visible"),
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)?;
    let establishments = crate::tabular::read_establishments(file)?;
    let mut imported = 0usize;

    for establishment in &establishments {
        if upsert_establishment(pool, establishment).await? > 0 {
            imported += 1;
        }
    }

    Ok(imported)
}

/// Stores one enrichment run and returns its id.
pub async fn store_results(
    pool: &PgPool,
    as_of: NaiveDate,
    records: &[EnrichedRecord],
) -> anyhow::Result<Uuid> {
    let run_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    for record in records {
        let employees = &record.employees;
        let survival = &record.survival;
        let signals_used: Vec<String> = employees
            .signals_used
            .iter()
            .map(|kind| kind.to_string())
            .collect();
        let factors_used: Vec<String> = survival
            .signals_used
            .iter()
            .map(|factor| factor.to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO establishment_enrichment.results
            (id, run_id, establishment_id, as_of, employee_estimate, employee_estimate_min,
             employee_estimate_max, employee_estimate_confidence,
             employee_estimate_dominant_signal, employee_estimate_signals_used,
             is_active_probability, is_active_confidence, reviews_per_month,
             days_since_last_review, review_decay_ratio, survival_primary_indicator,
             survival_risk_factors, survival_protective_factors, survival_signals_used)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(run_id)
        .bind(&record.establishment_id)
        .bind(as_of)
        .bind(employees.point_estimate)
        .bind(employees.ci_lower)
        .bind(employees.ci_upper)
        .bind(employees.confidence_level.as_str())
        .bind(employees.dominant_signal_name())
        .bind(&signals_used)
        .bind(survival.active_probability)
        .bind(survival.confidence_level.as_str())
        .bind(record.reviews_per_month)
        .bind(record.days_since_last_review)
        .bind(record.review_decay_ratio)
        .bind(survival.primary_indicator_name())
        .bind(&survival.risk_factors)
        .bind(&survival.protective_factors)
        .bind(&factors_used)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(run_id)
}
