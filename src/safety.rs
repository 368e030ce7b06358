//! Safety checks run before any output file is written.
//!
//! Reports and exports must never overwrite the catalog they were computed
//! from: neither the SQLite source itself nor one of the table files of a
//! JSON source directory.

use anyhow::{bail, Result};
use std::path::Path;

use crate::models::SourceTable;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output extension must be `expected_extension` (case-insensitive, no dot)
/// - Output cannot be the same as any of the provided source paths
/// - Output cannot be a table file inside a source directory
pub fn validate_output_path(
    output: &Path,
    expected_extension: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(expected_extension) {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            expected_extension
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }

        let in_source_dir = output.parent().map_or(false, |p| p == *source);
        if !in_source_dir {
            continue;
        }
        let output_name = output.file_stem().and_then(|n| n.to_str()).unwrap_or("");
        for table in SourceTable::ALL {
            if output_name.eq_ignore_ascii_case(table.table_name()) {
                bail!(
                    "Safety check failed: output '{}' would overwrite source table '{}'",
                    output.display(),
                    table.table_name()
                );
            }
        }
    }

    Ok(())
}
