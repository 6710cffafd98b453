use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polars::frame::DataFrame;
use polars::io::{SerReader, SerWriter};
use polars::prelude::{CsvReadOptions, CsvWriter, NamedFrom, Series};

use crate::recon::{ReconciledRow, RunCounts, StoredRow};

/// Fixed output schema for the master and queue sinks.
pub const MASTER_HEADER: [&str; 19] = [
    "county",
    "parcel_id",
    "owner_name",
    "owner_type",
    "mailing_address",
    "property_address",
    "acres",
    "vacant_flag",
    "zoning_label",
    "residential_zone_match",
    "last_sale_date",
    "years_owned",
    "source_url",
    "pulled_at_utc",
    "last_seen_at_utc",
    "record_status",
    "data_hash",
    "va_status",
    "notes",
];

/// One appended summary row per run.
#[derive(Debug, Clone)]
pub struct RunLogEntry {
    pub run_at_utc: DateTime<Utc>,
    pub total_pulled: usize,
    pub total_filtered: usize,
    pub counts: RunCounts,
}

/// Persistence surface for the reconciled output.
///
/// One run reads the snapshot once at start and replaces the master and
/// queue sinks whole at the end; the run log is append-only. Runs are
/// assumed non-overlapping, so no locking is provided here.
pub trait LeadStore {
    /// Prior snapshot rows, or an empty set when nothing was persisted yet.
    fn load_snapshot(&self) -> Result<Vec<StoredRow>>;
    /// Clear and rewrite the master sink with all reconciled rows.
    fn replace_master(&mut self, rows: &[ReconciledRow]) -> Result<()>;
    /// Clear and rewrite the queue sink (`new`/`updated` rows only).
    fn replace_queue(&mut self, rows: &[ReconciledRow]) -> Result<()>;
    /// Append one per-run summary row.
    fn append_run_log(&mut self, entry: &RunLogEntry) -> Result<()>;
}

/// Stringified output row in `MASTER_HEADER` order. Geometry never appears
/// here; it is a core-internal field.
pub fn row_values(row: &ReconciledRow) -> Vec<String> {
    let r = &row.record;
    vec![
        r.county.clone(),
        r.parcel_id.clone(),
        r.owner_name.clone(),
        r.owner_type.clone(),
        r.mailing_address.clone(),
        r.property_address.clone(),
        r.acres.to_string(),
        r.vacant_flag.clone(),
        r.zoning_label.clone(),
        if r.residential_zone_match { "yes" } else { "no" }.to_string(),
        r.last_sale_date.clone(),
        r.years_owned.to_string(),
        r.source_url.clone(),
        r.pulled_at_utc.to_rfc3339(),
        row.last_seen_at_utc.to_rfc3339(),
        row.status.as_str().to_string(),
        r.data_hash.clone(),
        row.va_status.clone(),
        row.notes.clone(),
    ]
}

/// Directory-backed CSV store: `master.csv`, `va_queue.csv`, `run_log.csv`.
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn master_path(&self) -> PathBuf { self.dir.join("master.csv") }
    fn queue_path(&self) -> PathBuf { self.dir.join("va_queue.csv") }
    fn run_log_path(&self) -> PathBuf { self.dir.join("run_log.csv") }

    fn write_rows(&self, path: &PathBuf, rows: &[ReconciledRow]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create store dir {}", self.dir.display()))?;
        let mut df = rows_to_dataframe(rows)?;
        let file = File::create(path)
            .with_context(|| format!("create CSV file {}", path.display()))?;
        CsvWriter::new(file)
            .finish(&mut df)
            .with_context(|| format!("write CSV to {}", path.display()))?;
        Ok(())
    }
}

impl LeadStore for CsvStore {
    fn load_snapshot(&self) -> Result<Vec<StoredRow>> {
        let path = self.master_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)
            .with_context(|| format!("open snapshot CSV {}", path.display()))?;
        // Read every column as a string; numeric inference would mangle
        // parcel ids with leading zeros.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .with_context(|| format!("read snapshot CSV {}", path.display()))?;

        let county = string_column(&df, "county");
        let parcel_id = string_column(&df, "parcel_id");
        let data_hash = string_column(&df, "data_hash");
        let va_status = string_column(&df, "va_status");
        let notes = string_column(&df, "notes");

        Ok((0..df.height())
            .map(|i| StoredRow {
                county: county[i].clone(),
                parcel_id: parcel_id[i].clone(),
                data_hash: data_hash[i].clone(),
                va_status: va_status[i].clone(),
                notes: notes[i].clone(),
            })
            .collect())
    }

    fn replace_master(&mut self, rows: &[ReconciledRow]) -> Result<()> {
        self.write_rows(&self.master_path(), rows)
    }

    fn replace_queue(&mut self, rows: &[ReconciledRow]) -> Result<()> {
        self.write_rows(&self.queue_path(), rows)
    }

    fn append_run_log(&mut self, entry: &RunLogEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create store dir {}", self.dir.display()))?;
        let path = self.run_log_path();
        let fresh = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open run log {}", path.display()))?;
        if fresh {
            writeln!(
                file,
                "run_at_utc,total_pulled,total_filtered,new_count,updated_count,unchanged_count"
            )?;
        }
        // Timestamps and counters contain no CSV metacharacters.
        writeln!(
            file,
            "{},{},{},{},{},{}",
            entry.run_at_utc.to_rfc3339(),
            entry.total_pulled,
            entry.total_filtered,
            entry.counts.new,
            entry.counts.updated,
            entry.counts.unchanged,
        )?;
        Ok(())
    }
}

/// In-memory store for tests and dry wiring.
#[derive(Default)]
pub struct MemStore {
    pub snapshot: Vec<StoredRow>,
    pub master: Vec<Vec<String>>,
    pub queue: Vec<Vec<String>>,
    pub run_log: Vec<RunLogEntry>,
}

impl LeadStore for MemStore {
    fn load_snapshot(&self) -> Result<Vec<StoredRow>> {
        Ok(self.snapshot.clone())
    }

    fn replace_master(&mut self, rows: &[ReconciledRow]) -> Result<()> {
        self.master = rows.iter().map(row_values).collect();
        self.snapshot = rows.iter().map(StoredRow::from).collect();
        Ok(())
    }

    fn replace_queue(&mut self, rows: &[ReconciledRow]) -> Result<()> {
        self.queue = rows.iter().map(row_values).collect();
        Ok(())
    }

    fn append_run_log(&mut self, entry: &RunLogEntry) -> Result<()> {
        self.run_log.push(entry.clone());
        Ok(())
    }
}

fn rows_to_dataframe(rows: &[ReconciledRow]) -> Result<DataFrame> {
    let cells: Vec<Vec<String>> = rows.iter().map(row_values).collect();
    let columns = MASTER_HEADER
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<String> = cells.iter().map(|row| row[i].clone()).collect();
            Series::new((*name).into(), values).into()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn string_column(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .ok()
        .and_then(|column| column.str().ok())
        .map(|chunked| {
            chunked
                .into_iter()
                .map(|value| value.unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_else(|| vec![String::new(); df.height()])
}
