//! Record Loader Module
//! Validates benchmark-result CSV files and turns them into typed records
//! using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::processor::EngineError;

/// Required CSV columns. Names are case-sensitive and must match exactly.
pub const COL_ALLOCATOR: &str = "Allocator";
pub const COL_BENCHMARK: &str = "Benchmark";
pub const COL_OPS_PER_SEC: &str = "Ops_per_sec";
pub const COL_TIME_US: &str = "Time_us";

const REQUIRED_COLUMNS: [&str; 4] = [COL_ALLOCATOR, COL_BENCHMARK, COL_OPS_PER_SEC, COL_TIME_US];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("{}: missing required columns: {}", .path.display(), .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },
    #[error("{}: row {row}: malformed {column} value", .path.display())]
    MalformedValue {
        path: PathBuf,
        row: usize,
        column: String,
    },
    #[error("{}: failed to read CSV: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// One benchmark measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub allocator: String,
    pub benchmark: String,
    pub ops_per_sec: f64,
    pub time_us: f64,
}

/// An ordered, validated batch of records from a single input file.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct RecordSet {
    path: PathBuf,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(path: PathBuf, records: Vec<Record>) -> Self {
        Self { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load and validate one CSV source.
///
/// The whole load fails on a missing column or a malformed cell; there is no
/// partial salvage, row filtering, or deduplication.
pub fn load(path: &Path) -> Result<RecordSet, LoadError> {
    if !path.exists() {
        return Err(LoadError::SourceNotFound(path.to_path_buf()));
    }

    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10000))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !columns.iter().any(|have| have == *required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    let allocator_col = df.column(COL_ALLOCATOR).map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    let benchmark_col = df.column(COL_BENCHMARK).map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    let ops_ca = numeric_column(&df, COL_OPS_PER_SEC, path)?;
    let time_ca = numeric_column(&df, COL_TIME_US, path)?;

    let malformed = |row: usize, column: &str| LoadError::MalformedValue {
        path: path.to_path_buf(),
        row: row + 1,
        column: column.to_string(),
    };

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let allocator = ident_cell(allocator_col, i).ok_or_else(|| malformed(i, COL_ALLOCATOR))?;
        let benchmark = ident_cell(benchmark_col, i).ok_or_else(|| malformed(i, COL_BENCHMARK))?;
        let ops_per_sec = ops_ca
            .get(i)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| malformed(i, COL_OPS_PER_SEC))?;
        let time_us = time_ca
            .get(i)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| malformed(i, COL_TIME_US))?;

        records.push(Record {
            allocator,
            benchmark,
            ops_per_sec,
            time_us,
        });
    }

    Ok(RecordSet::new(path.to_path_buf(), records))
}

/// Cast a column to f64. A non-numeric cell casts to null and is caught by
/// the per-row check in `load`.
fn numeric_column(df: &DataFrame, name: &str, path: &Path) -> Result<Float64Chunked, LoadError> {
    let casted = df
        .column(name)
        .and_then(|col| col.cast(&DataType::Float64))
        .map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
    let ca = casted.f64().map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ca.clone())
}

/// Read a non-empty string cell; `None` for null or empty values.
fn ident_cell(col: &Column, idx: usize) -> Option<String> {
    let val = col.get(idx).ok()?;
    if val.is_null() {
        return None;
    }
    let s = val.to_string().trim_matches('"').to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// A source that failed to load during a multi-source run.
#[derive(Debug)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub error: LoadError,
}

/// Result of a multi-source load: the sets that loaded plus the sources that
/// were skipped.
#[derive(Debug)]
pub struct LoadOutcome {
    pub sets: Vec<RecordSet>,
    pub failures: Vec<SourceFailure>,
}

/// Load several sources for comparison mode.
///
/// A source that fails to load is skipped with a warning rather than failing
/// the run; only when every source fails does the call error out.
pub fn load_sources(paths: &[PathBuf]) -> Result<LoadOutcome, EngineError> {
    let mut sets = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        match load(path) {
            Ok(set) => sets.push(set),
            Err(error) => {
                log::warn!("skipping {}: {}", path.display(), error);
                failures.push(SourceFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    if sets.is_empty() {
        return Err(EngineError::NoValidSources);
    }
    Ok(LoadOutcome { sets, failures })
}
