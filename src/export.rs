//! Drill-down subsets to delimited text.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::models::CanonicalRecord;

pub const CSV_HEADER: [&str; 7] = [
    "TYPE",
    "TITREFRANCAIS",
    "TITREANGLAIS",
    "ANNEE",
    "DISQUEFRANCAIS",
    "DISQUEANGLAIS",
    "GENRES",
];

fn csv_fields(record: &CanonicalRecord) -> [String; 7] {
    [
        record.kind.as_str().to_string(),
        record.title_fr.clone(),
        record.title_en.clone(),
        record.year.map(|y| y.to_string()).unwrap_or_default(),
        record.disc_fr.clone().unwrap_or_default(),
        record.disc_en.clone().unwrap_or_default(),
        record.genres.join("|"),
    ]
}

fn write_rows<'a, W, I>(writer: &mut csv::Writer<W>, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record(csv_fields(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Render records as CSV text, header first. Fields holding a quote, a comma
/// or a line break are quoted.
pub fn to_csv<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut writer = csv::Writer::from_writer(vec![]);
    write_rows(&mut writer, records)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV buffer: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_csv<'a, I>(path: &Path, records: I) -> Result<()>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(&mut writer, records).with_context(|| format!("Failed to write {}", path.display()))
}
