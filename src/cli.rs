use crate::config::{self, AppConfig};
use crate::dashboard;
use crate::errors::AppError;
use crate::logging;
use crate::models::{EntryForm, Record, SeriesPoint, DATE_FORMAT, DEFAULT_METRIC};
use crate::store::MetricStore;
use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "health-metrics", version, about = "Log health metrics to a CSV file and chart them")]
pub struct Cli {
    /// YAML config file (defaults to ./health_metrics.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backing CSV file, overrides the config
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add an entry and show the metric's series
    Add {
        #[arg(long, default_value = DEFAULT_METRIC)]
        metric: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show all entries, most recent first
    List,
    /// Show the tracked metric names
    Metrics,
    /// Show one metric's values in date order
    Series { metric: String },
    /// Write the data as CSV to a file or stdout
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace all data with an uploaded CSV file
    Import { path: PathBuf },
    /// Delete all data
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Run the browser dashboard
    Serve {
        #[arg(long)]
        listen: Option<String>,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::resolve(cli.config.as_deref()).context("failed to load config")?;
    if let Some(path) = &cli.data_file {
        config.data_file = path.clone();
    }
    if let Some(listen) = serve_override(&cli.command) {
        config.server.listen = listen.to_string();
    }
    config.validate()?;

    if let Err(error) = logging::init(&config.log) {
        eprintln!("logging disabled: {}", error);
    }

    let store = open_store(&config.data_file)?;
    let stdout = std::io::stdout();
    execute(cli.command, store, &config, &mut stdout.lock())
}

fn serve_override(command: &Command) -> Option<&str> {
    match command {
        Command::Serve { listen } => listen.as_deref(),
        _ => None,
    }
}

fn open_store(path: &Path) -> anyhow::Result<MetricStore> {
    MetricStore::open(path).map_err(|error| {
        if error.is_corrupt_file() {
            anyhow!("data file {} is corrupt: {}", path.display(), error)
        } else {
            anyhow!("failed to open data file {}: {}", path.display(), error)
        }
    })
}

pub fn execute<W: Write>(command: Command, store: MetricStore, config: &AppConfig, out: &mut W) -> anyhow::Result<()> {
    match command {
        Command::Add { metric, value, date } => {
            let form = EntryForm::new(metric, value, date);
            let (date, metric, value) = form.parse().map_err(AppError::from).map_err(explain)?;
            let record = store.append(date, &metric, value).map_err(explain)?;
            writeln!(out, "Entry added: {}", format_record(&record))?;
            write_series(out, &metric, &store.series_for(&metric)?)?;
        }
        Command::List => {
            for record in store.recent_first()? {
                writeln!(out, "{}", format_record(&record))?;
            }
        }
        Command::Metrics => {
            for metric in store.distinct_metrics()? {
                writeln!(out, "{}", metric)?;
            }
        }
        Command::Series { metric } => {
            let series = store.series_for(&metric)?;
            if series.is_empty() {
                bail!("no entries for metric '{}'", metric);
            }
            write_series(out, &metric, &series)?;
        }
        Command::Export { output } => {
            let csv = store.export_csv()?;
            match output {
                Some(path) => {
                    fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;
                    writeln!(out, "Exported to {}", path.display())?;
                }
                None => out.write_all(csv.as_bytes())?,
            }
        }
        Command::Import { path } => {
            let file = fs::File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
            let count = store.import_csv(std::io::BufReader::new(file)).map_err(explain)?;
            writeln!(out, "Imported {} entries from {}", count, path.display())?;
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete all data without --yes");
            }
            store.clear()?;
            writeln!(out, "All data cleared")?;
        }
        Command::Serve { .. } => {
            let listen = config.listen_addr()?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start runtime")?;
            runtime.block_on(dashboard::serve(Arc::new(store), listen))?;
        }
    }
    Ok(())
}

/// Spells out each rejected row instead of only the count.
fn explain(error: AppError) -> anyhow::Error {
    let details = error
        .validation_errors()
        .iter()
        .map(|detail| format!("  {}", detail))
        .collect::<Vec<_>>();
    if details.len() > 1 || matches!(error, AppError::Rejected(_)) {
        return anyhow!("{}\n{}", error, details.join("\n"));
    }
    anyhow::Error::new(error)
}

fn format_record(record: &Record) -> String {
    format!("{}  {}  {}", record.date.format(DATE_FORMAT), record.metric, record.value)
}

fn write_series<W: Write>(out: &mut W, metric: &str, series: &[SeriesPoint]) -> std::io::Result<()> {
    writeln!(out, "{} over time:", metric)?;
    for point in series {
        writeln!(out, "  {}  {}", point.date.format(DATE_FORMAT), point.value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_in(root: &tempfile::TempDir, args: &[&str]) -> (anyhow::Result<()>, String) {
        let config = AppConfig {
            data_file: root.path().join("health_metrics.csv"),
            ..AppConfig::default()
        };
        let cli = Cli::try_parse_from(std::iter::once("health-metrics").chain(args.iter().copied()))
            .expect("arguments parse");
        let store = MetricStore::open(&config.data_file).expect("store opens");
        let mut out = Vec::new();
        let result = execute(cli.command, store, &config, &mut out);
        (result, String::from_utf8(out).expect("utf8 output"))
    }

    #[test]
    fn add_prints_entry_and_sorted_series() {
        let root = tempfile::tempdir().expect("temp root");
        run_in(&root, &["add", "--value", "179.8", "--date", "2024-01-02"]).0.expect("first add");
        let (result, output) = run_in(&root, &["add", "--value", "180.5", "--date", "2024-01-01"]);
        result.expect("second add");

        assert!(output.starts_with("Entry added: 2024-01-01  Weight  180.5\n"));
        assert!(output.contains("Weight over time:\n  2024-01-01  180.5\n  2024-01-02  179.8\n"));
    }

    #[test]
    fn add_reports_the_bad_field() {
        let root = tempfile::tempdir().expect("temp root");
        let (result, _) = run_in(&root, &["add", "--metric", "Steps", "--value", "many"]);
        let message = result.expect_err("non-numeric value").to_string();
        assert!(message.contains("Value"));
        assert!(!root.path().join("health_metrics.csv").exists());
    }

    #[test]
    fn negative_values_are_accepted() {
        let root = tempfile::tempdir().expect("temp root");
        let (result, _) = run_in(&root, &["add", "--metric", "Weight Change", "--value", "-1.5"]);
        result.expect("negative value");
    }

    #[test]
    fn import_lists_each_rejected_row() {
        let root = tempfile::tempdir().expect("temp root");
        let upload = root.path().join("upload.csv");
        fs::write(&upload, "Date,Metric,Value\n2024-01-01,,1\n2024-01-02,Weight,x\n").expect("write upload");

        let (result, _) = run_in(&root, &["import", upload.to_str().expect("utf8 path")]);
        let message = result.expect_err("rejected upload").to_string();
        assert!(message.contains("row 1: Metric"));
        assert!(message.contains("row 2: Value"));
    }

    #[test]
    fn export_to_stdout_and_clear_requires_confirmation() {
        let root = tempfile::tempdir().expect("temp root");
        run_in(&root, &["add", "--value", "180.5", "--date", "2024-01-01"]).0.expect("add");

        let (result, output) = run_in(&root, &["export"]);
        result.expect("export");
        assert_eq!(output, "Date,Metric,Value\n2024-01-01,Weight,180.5\n");

        assert!(run_in(&root, &["clear"]).0.is_err());
        run_in(&root, &["clear", "--yes"]).0.expect("clear");
        let (_, listing) = run_in(&root, &["list"]);
        assert!(listing.is_empty());
    }
}
