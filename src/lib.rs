pub mod baseline;
pub mod confidence;
pub mod config;
pub mod db;
pub mod enrich;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod models;
pub mod report;
pub mod signals;
pub mod survival;
pub mod tabular;

pub use error::{EnrichmentError, Result};
