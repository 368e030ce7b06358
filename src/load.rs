//! Source table loading.
//!
//! A catalog source is either a directory holding one `<TABLE>.json` file per
//! table (a JSON array of objects) or a SQLite database holding tables of the
//! same names. The five tables load in parallel. A table that cannot be read
//! is reported and replaced by an empty one; loading itself never fails.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{RawRecord, SourceLoadFailure, SourceTable, SourceTables};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    JsonDir(PathBuf),
    Sqlite(PathBuf),
}

impl CatalogSource {
    /// Directories are JSON sources; anything else is opened as SQLite.
    pub fn detect(path: &Path) -> Self {
        if path.is_dir() {
            CatalogSource::JsonDir(path.to_path_buf())
        } else {
            CatalogSource::Sqlite(path.to_path_buf())
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CatalogSource::JsonDir(p) | CatalogSource::Sqlite(p) => p,
        }
    }

    fn load_table(&self, table: SourceTable) -> Result<Vec<RawRecord>> {
        match self {
            CatalogSource::JsonDir(dir) => read_json_table(dir, table),
            CatalogSource::Sqlite(db) => read_sqlite_table(db, table),
        }
    }
}

fn read_json_table(dir: &Path, table: SourceTable) -> Result<Vec<RawRecord>> {
    let path = dir.join(format!("{}.json", table.table_name()));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<RawRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} as an array of objects", path.display()))?;
    Ok(rows)
}

fn read_sqlite_table(db: &Path, table: SourceTable) -> Result<Vec<RawRecord>> {
    let conn = Connection::open_with_flags(db, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open source database {}", db.display()))?;

    let sql = format!("SELECT * FROM \"{}\"", table.table_name());
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to query table {}", table.table_name()))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = RawRecord::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), sql_value(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

/// SQLite cell to JSON. Blobs carry nothing the catalog uses.
fn sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Load every source table in parallel. Failed tables come back empty,
/// with one diagnostic each.
pub fn load_tables(source: &CatalogSource) -> (SourceTables, Vec<SourceLoadFailure>) {
    let results: Vec<(SourceTable, Result<Vec<RawRecord>>)> = SourceTable::ALL
        .par_iter()
        .map(|&table| (table, source.load_table(table)))
        .collect();

    let mut tables = SourceTables::default();
    let mut failures = Vec::new();
    for (table, result) in results {
        match result {
            Ok(rows) => {
                info!(table = table.table_name(), rows = rows.len(), "table loaded");
                *tables.table_mut(table) = rows;
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(table = table.table_name(), %reason, "table failed to load");
                failures.push(SourceLoadFailure { table, reason });
            }
        }
    }
    (tables, failures)
}

/// Resolve and load a source path. Only a missing path is an error.
pub fn load_source(path: &Path) -> Result<(CatalogSource, SourceTables, Vec<SourceLoadFailure>)> {
    if !path.exists() {
        bail!("Catalog source '{}' does not exist", path.display());
    }
    let source = CatalogSource::detect(path);
    let (tables, failures) = load_tables(&source);
    Ok((source, tables, failures))
}
