pub mod cli;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod logging;
pub mod models;
pub mod store;
pub mod table;

pub use errors::{AppError, AppResult, ValidationError};
pub use models::{EntryForm, Field, Record, SeriesPoint};
pub use store::MetricStore;

pub fn run() -> anyhow::Result<()> {
    cli::run()
}
