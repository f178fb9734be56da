use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use establishment_enrichment::config::EstimationConfig;
use establishment_enrichment::models::Establishment;
use establishment_enrichment::{db, enrich, report, tabular};

#[derive(Parser)]
#[command(name = "establishment-enrichment")]
#[command(about = "Estimate headcount and survival probability for business establishments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample establishments
    Seed,
    /// Import establishments from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Estimate employees and survival for a batch of establishments
    Enrich {
        /// Read establishments from this CSV instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reference date for review recency (defaults to today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "enriched.csv")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Persist results to Postgres
        #[arg(long)]
        store: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the category baselines in effect
    Baselines {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Seeded {inserted} establishments.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} establishments from {}.", csv.display());
        }
        Commands::Enrich {
            csv,
            category,
            config,
            as_of,
            out,
            format,
            store,
        } => {
            let config = load_config(config.as_deref())?;
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let pool = if csv.is_none() || store {
                Some(connect().await?)
            } else {
                None
            };
            let establishments =
                load_establishments(csv.as_deref(), pool.as_ref(), category.as_deref()).await?;

            let outcome = enrich::enrich_batch(&establishments, &config, as_of);
            if outcome.records.is_empty() {
                println!("No establishments could be enriched.");
                return Ok(());
            }

            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            match format {
                OutputFormat::Csv => tabular::write_csv(file, &outcome.records)?,
                OutputFormat::Json => tabular::write_json(file, &outcome.records)?,
            }
            println!(
                "Wrote {} enriched establishments to {} ({} rejected).",
                outcome.records.len(),
                out.display(),
                outcome.rejected.len()
            );

            if let (true, Some(pool)) = (store, pool.as_ref()) {
                let run_id = db::store_results(pool, as_of, &outcome.records).await?;
                println!("Stored results under run {run_id}.");
            }
        }
        Commands::Report {
            csv,
            category,
            config,
            as_of,
            out,
        } => {
            let config = load_config(config.as_deref())?;
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let pool = match csv {
                Some(_) => None,
                None => Some(connect().await?),
            };
            let establishments =
                load_establishments(csv.as_deref(), pool.as_ref(), category.as_deref()).await?;

            let outcome = enrich::enrich_batch(&establishments, &config, as_of);
            let report = report::build_report(as_of, &outcome.records, outcome.rejected.len());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Baselines { config } => {
            let config = load_config(config.as_deref())?;
            println!("Category baselines ({}):", config.baselines.len());
            for (category, baseline) in config.baselines.iter() {
                println!(
                    "- {category}: typical {:.0} (range {:.0}-{:.0}), {:.1} reviews/month, \
                     {:.4} employees/m2, {:.0} customers/hour at peak",
                    baseline.typical_count,
                    baseline.min_count,
                    baseline.max_count,
                    baseline.typical_review_velocity,
                    baseline.area_density_coefficient,
                    baseline.peak_traffic_ceiling
                );
            }
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EstimationConfig> {
    match path {
        Some(path) => {
            let config = EstimationConfig::from_path(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            info!(
                "Loaded {} category baselines from {}",
                config.baselines.len(),
                path.display()
            );
            Ok(config)
        }
        None => Ok(EstimationConfig::default()),
    }
}

async fn load_establishments(
    csv: Option<&Path>,
    pool: Option<&PgPool>,
    category: Option<&str>,
) -> anyhow::Result<Vec<Establishment>> {
    let establishments = match (csv, pool) {
        (Some(path), _) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let mut rows = tabular::read_establishments(file)?;
            if let Some(category) = category {
                rows.retain(|row| row.category.trim().eq_ignore_ascii_case(category.trim()));
            }
            rows
        }
        (None, Some(pool)) => db::fetch_establishments(pool, category).await?,
        (None, None) => anyhow::bail!("either --csv or DATABASE_URL is required"),
    };
    info!("Loaded {} establishments", establishments.len());
    Ok(establishments)
}
