use crate::errors::{AppError, AppResult, ValidationError};
use crate::models::{Record, SeriesPoint};
use crate::table;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

/// Ordered record collection mirrored one-to-one by a CSV file.
///
/// Every mutation rewrites the whole file and only then replaces the in-memory
/// snapshot, so the snapshot always matches the last successful save or load.
#[derive(Debug)]
pub struct MetricStore {
    records: Mutex<Vec<Record>>,
    path: PathBuf,
}

impl MetricStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let store = Self {
            records: Mutex::new(Vec::new()),
            path: path.to_path_buf(),
        };
        let records = store.load()?;
        tracing::info!(path = %store.path.display(), records = records.len(), "metric store opened");
        *store.lock()? = records;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the backing file. A missing file is an empty store.
    pub fn load(&self) -> AppResult<Vec<Record>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no data file yet");
                return Ok(Vec::new());
            }
            Err(error) => return Err(AppError::Io(error.to_string())),
        };

        let rows = table::read_rows(std::io::BufReader::new(file))?;
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| {
                row.and_then(|record| record.validate().map(|()| record))
                    .map_err(|error| AppError::Parse(format!("{}: {}", self.path.display(), error.at_row(index + 1))))
            })
            .collect()
    }

    /// Overwrites the backing file with `records` via a same-directory temp file and rename.
    pub fn save(&self, records: &[Record]) -> AppResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        table::write_rows(&mut temp, records)?;
        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "data file written");
        Ok(())
    }

    /// Re-reads the backing file. On failure the current snapshot is kept.
    pub fn reload(&self) -> AppResult<usize> {
        let mut guard = self.lock()?;
        let records = self.load().inspect_err(|error| {
            tracing::warn!(path = %self.path.display(), error = %error, "reload failed; keeping last snapshot");
        })?;
        let count = records.len();
        *guard = records;
        tracing::info!(path = %self.path.display(), records = count, "metric store reloaded");
        Ok(count)
    }

    pub fn append(&self, date: NaiveDate, metric: &str, value: f64) -> AppResult<Record> {
        let record = Record::new(date, metric, value).normalized();
        if let Err(error) = record.validate() {
            tracing::warn!(error = %error, "entry rejected");
            return Err(error.into());
        }

        let mut guard = self.lock()?;
        let mut next = guard.clone();
        next.push(record.clone());
        self.save(&next)?;
        *guard = next;

        tracing::info!(
            metric = %record.metric,
            date = %record.date,
            value = record.value,
            records = guard.len(),
            "entry added"
        );
        Ok(record)
    }

    /// Replaces every record, or nothing when any record is invalid.
    pub fn replace_all(&self, records: Vec<Record>) -> AppResult<usize> {
        let mut guard = self.lock()?;

        let errors = validate_batch(&records);
        if !errors.is_empty() {
            tracing::warn!(rejected = errors.len(), total = records.len(), "bulk replace rejected");
            return Err(AppError::Rejected(errors));
        }

        let records = records.into_iter().map(Record::normalized).collect::<Vec<_>>();
        self.save(&records)?;
        let count = records.len();
        *guard = records;

        tracing::info!(path = %self.path.display(), records = count, "store contents replaced");
        Ok(count)
    }

    pub fn clear(&self) -> AppResult<()> {
        self.replace_all(Vec::new()).map(|_| ())
    }

    /// Replaces the store with an uploaded table.
    ///
    /// A table missing a required column is refused before anything is written.
    /// Unparseable cells and invalid records are reported together, one per row.
    pub fn import_csv<R: Read>(&self, reader: R) -> AppResult<usize> {
        let rows = table::read_rows(reader)?;

        let mut records = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            match row.and_then(|record| record.validate().map(|()| record)) {
                Ok(record) => records.push(record),
                Err(error) => errors.push(error.at_row(index + 1)),
            }
        }
        if !errors.is_empty() {
            tracing::warn!(rejected = errors.len(), "upload rejected");
            return Err(AppError::Rejected(errors));
        }

        self.replace_all(records)
    }

    pub fn export_csv(&self) -> AppResult<String> {
        let guard = self.lock()?;
        table::to_csv_string(&guard)
    }

    pub fn records(&self) -> AppResult<Vec<Record>> {
        Ok(self.lock()?.clone())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// All records, newest date first; equal dates keep insertion order.
    pub fn recent_first(&self) -> AppResult<Vec<Record>> {
        let mut records = self.records()?;
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    pub fn distinct_metrics(&self) -> AppResult<BTreeSet<String>> {
        let guard = self.lock()?;
        Ok(guard.iter().map(|record| record.metric.clone()).collect())
    }

    pub fn series_for(&self, metric: &str) -> AppResult<Vec<SeriesPoint>> {
        let guard = self.lock()?;
        let mut series = guard
            .iter()
            .filter(|record| record.metric == metric)
            .map(SeriesPoint::from)
            .collect::<Vec<_>>();
        series.sort_by_key(|point| point.date);
        Ok(series)
    }

    pub fn all_series(&self) -> AppResult<BTreeMap<String, Vec<SeriesPoint>>> {
        let guard = self.lock()?;
        let mut grouped: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
        for record in guard.iter() {
            grouped
                .entry(record.metric.clone())
                .or_default()
                .push(SeriesPoint::from(record));
        }
        for series in grouped.values_mut() {
            series.sort_by_key(|point| point.date);
        }
        Ok(grouped)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Vec<Record>>> {
        self.records
            .lock()
            .map_err(|_| AppError::Internal("metric store mutex poisoned".to_string()))
    }
}

fn validate_batch(records: &[Record]) -> Vec<ValidationError> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| record.validate().err().map(|error| error.at_row(index + 1)))
        .collect()
}
