//! Core data models for the catalog statistics engine.
//!
//! This module contains the record types, the category dictionary, the
//! source table bundle, and the output collections shared by every stage.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::aggregate::{
    DiscRow, GenreCountRow, GenreTotalRow, LanguageBuckets, SeriesRank, YearCount,
};
use crate::cooccurrence::CooccurrencePayload;

// ============================================================================
// Type Aliases
// ============================================================================

/// One raw row from a source table: field name to string/number/null.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Index mapping a key to its position in an ordered `Vec`.
pub type PositionIndex = FxHashMap<String, usize>;

/// Value used in place of a missing disc identifier when bucketing.
pub const NO_DISC: &str = "—";

// ============================================================================
// Source Tables
// ============================================================================

/// The five tables the catalog is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceTable {
    Films,
    SeriesOne,
    SeriesTwo,
    Summaries,
    Categories,
}

impl SourceTable {
    pub const ALL: [SourceTable; 5] = [
        SourceTable::Summaries,
        SourceTable::SeriesOne,
        SourceTable::SeriesTwo,
        SourceTable::Films,
        SourceTable::Categories,
    ];

    /// Table name as exported by the catalog database (also the JSON file stem).
    pub fn table_name(self) -> &'static str {
        match self {
            SourceTable::Films => "TOUSLESFILMS",
            SourceTable::SeriesOne => "SERIE1",
            SourceTable::SeriesTwo => "SERIE2",
            SourceTable::Summaries => "RESUMES",
            SourceTable::Categories => "CATEGORIES",
        }
    }
}

/// Raw rows for every source table. A table that failed to load is empty.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub films: Vec<RawRecord>,
    pub series_one: Vec<RawRecord>,
    pub series_two: Vec<RawRecord>,
    pub summaries: Vec<RawRecord>,
    pub categories: Vec<RawRecord>,
}

impl SourceTables {
    pub fn table_mut(&mut self, table: SourceTable) -> &mut Vec<RawRecord> {
        match table {
            SourceTable::Films => &mut self.films,
            SourceTable::SeriesOne => &mut self.series_one,
            SourceTable::SeriesTwo => &mut self.series_two,
            SourceTable::Summaries => &mut self.summaries,
            SourceTable::Categories => &mut self.categories,
        }
    }
}

/// Tables serialize under their source name (`RESUMES`), not the variant name.
fn serialize_table_name<S: serde::Serializer>(table: &SourceTable, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(table.table_name())
}

/// Diagnostic for a table that could not be loaded. The table is degraded
/// to an empty collection and the pipeline continues.
#[derive(Debug, Clone, Serialize)]
pub struct SourceLoadFailure {
    #[serde(serialize_with = "serialize_table_name")]
    pub table: SourceTable,
    pub reason: String,
}

// ============================================================================
// Category Dictionary
// ============================================================================

/// One genre category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Canonical code (trimmed, upper-cased)
    pub code: String,
    /// Field names probed on film rows (trimmed, source casing). Rows whose
    /// codes differ only in case share one category and keep every spelling.
    pub fields: Vec<String>,
    pub label: String,
    pub description: String,
}

/// Ordered code -> category mapping, built once from the categories table.
#[derive(Debug, Clone, Default)]
pub struct CategoryDictionary {
    entries: Vec<Category>,
    index: PositionIndex,
}

impl CategoryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a category. A repeated code keeps its first position,
    /// takes the new label and description, and adds any new field spelling.
    pub fn insert(&mut self, category: Category) {
        match self.index.get(&category.code) {
            Some(&pos) => {
                let existing = &mut self.entries[pos];
                existing.label = category.label;
                existing.description = category.description;
                for field in category.fields {
                    if !existing.fields.contains(&field) {
                        existing.fields.push(field);
                    }
                }
            }
            None => {
                self.index.insert(category.code.clone(), self.entries.len());
                self.entries.push(category);
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&Category> {
        self.index.get(code).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Label for a code, falling back to the code itself.
    pub fn label_of<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).map_or(code, |c| c.label.as_str())
    }

    /// Categories in dictionary order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Canonical Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    Film,
    Episode,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Film => "FILM",
            RecordKind::Episode => "EPISODE",
        }
    }
}

/// Extra fields only carried by episode tables. Kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeMeta {
    pub dubbed: Option<serde_json::Value>,
    pub last_episode_watched: Option<serde_json::Value>,
    pub season_year: Option<serde_json::Value>,
    pub last_season: Option<serde_json::Value>,
}

/// A normalized film or episode entry. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub source: SourceTable,
    pub kind: RecordKind,
    pub title_fr: String,
    pub title_en: String,
    pub year: Option<i32>,
    /// Cover image; a non-empty cover marks a series header row
    pub cover: Option<String>,
    pub disc_fr: Option<String>,
    pub disc_en: Option<String>,
    pub audio_fr: Option<String>,
    pub audio_en: Option<String>,
    pub summary: Option<String>,
    /// Upper-cased series marker from the films table ("X" = part of a series)
    pub series_marker: Option<String>,
    pub id: Option<serde_json::Value>,
    /// Genre codes in dictionary order (films only)
    pub genres: Vec<String>,
    pub episode: Option<EpisodeMeta>,
}

impl CanonicalRecord {
    pub fn is_film(&self) -> bool {
        self.kind == RecordKind::Film
    }

    pub fn is_episode(&self) -> bool {
        self.kind == RecordKind::Episode
    }

    /// Film row explicitly flagged as belonging to a series.
    pub fn is_series_film(&self) -> bool {
        self.is_film() && self.series_marker.as_deref() == Some("X")
    }

    /// Episode rows and series-flagged film rows count towards series, not films.
    pub fn is_series_contributor(&self) -> bool {
        self.is_episode() || self.is_series_film()
    }

    pub fn is_series_header(&self) -> bool {
        self.cover.is_some()
    }

    pub fn has_french_audio(&self) -> bool {
        self.audio_fr.is_some()
    }

    pub fn has_english_audio(&self) -> bool {
        self.audio_en.is_some()
    }

    pub fn has_summary(&self) -> bool {
        self.summary.is_some()
    }

    /// French title, or the English one when the French title is empty.
    pub fn display_title(&self) -> &str {
        if self.title_fr.is_empty() {
            &self.title_en
        } else {
            &self.title_fr
        }
    }

    pub fn has_genre(&self, code: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(code))
    }

    pub fn disc_fr_or_placeholder(&self) -> &str {
        self.disc_fr.as_deref().unwrap_or(NO_DISC)
    }

    pub fn disc_en_or_placeholder(&self) -> &str {
        self.disc_en.as_deref().unwrap_or(NO_DISC)
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Headline figures for a record collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total: usize,
    pub unique_titles: usize,
    pub pct_summary: f64,
    /// Share of records with a French or an English audio track
    pub pct_audio_any: f64,
    /// Mean presence of the French and English tracks
    pub pct_audio_tracks: f64,
    pub series_count: usize,
}

/// Every aggregate computed for one record collection. Rebuilt, never
/// mutated, when the filter or the genre exclusions change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateBundle {
    pub by_year: Vec<YearCount>,
    pub discs: Vec<DiscRow>,
    pub languages: LanguageBuckets,
    pub top_series: Vec<SeriesRank>,
    pub genre_totals: Vec<GenreTotalRow>,
    pub genre_counts: Vec<GenreCountRow>,
    pub cooccurrence: CooccurrencePayload,
}

/// Bundle plus KPIs, as handed to presentation collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport<'a> {
    pub kpis: &'a Kpis,
    pub aggregates: &'a AggregateBundle,
    pub load_failures: &'a [SourceLoadFailure],
}

impl AnalysisReport<'_> {
    /// Write the report to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
