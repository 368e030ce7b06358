//! Normalization of raw catalog rows into canonical records.
//!
//! Per-field issues never escalate: unparsable years become `None`, empty
//! strings become absent values, and malformed titles are kept as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::models::{
    CanonicalRecord, Category, CategoryDictionary, EpisodeMeta, RawRecord, RecordKind,
    SourceTable,
};

// ============================================================================
// FIELD NAMES
// ============================================================================

pub const FIELD_TITLE_FR: &str = "TITREFRANCAIS";
pub const FIELD_TITLE_EN: &str = "TITREANGLAIS";
pub const FIELD_YEAR: &str = "ANNEE";
pub const FIELD_COVER: &str = "POCHETTE";
pub const FIELD_DISC_FR: &str = "DISQUEFRANCAIS";
pub const FIELD_DISC_EN: &str = "DISQUEANGLAIS";
pub const FIELD_AUDIO_FR: &str = "AUDIOFRANCAIS";
pub const FIELD_AUDIO_EN: &str = "AUDIOANGLAIS";
pub const FIELD_SUMMARY: &str = "RESUME";
pub const FIELD_SERIES: &str = "SERIE";
pub const FIELD_ID: &str = "ID";

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Integer prefix of a year value: "2001", "+2001", "2001.0", "2001abc".
static YEAR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+").unwrap());

/// Episode suffix: a hyphen, 1-3 digits, then anything. The lazy prefix makes
/// the first such hyphen win, so "Show - 01 - Part 2" yields "Show".
///
/// Known limitation: a title with "- <digits>" inside its free text
/// ("Blade Runner - 2049 Edition") is split there too.
static EPISODE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*?)\s*-\s*\d{1,3}.*$").unwrap());

// ============================================================================
// SCALAR COERCION
// ============================================================================

/// Render a raw scalar as trimmed text. Null and absent fields give "".
pub fn norm_str(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

pub fn has_value(value: Option<&Value>) -> bool {
    !norm_str(value).is_empty()
}

/// Trimmed text, or `None` when empty.
pub fn norm_optional(value: Option<&Value>) -> Option<String> {
    let s = norm_str(value);
    (!s.is_empty()).then_some(s)
}

/// Upper-cased disc identifier, or `None` when empty.
pub fn norm_disc(value: Option<&Value>) -> Option<String> {
    norm_optional(value).map(|s| s.to_uppercase())
}

/// Parse a year with integer-prefix semantics. Never fails: anything
/// without a leading integer (or out of range) is `None`.
pub fn norm_year(value: Option<&Value>) -> Option<i32> {
    let s = norm_str(value);
    YEAR_PREFIX
        .find(&s)
        .and_then(|m| m.as_str().trim_start_matches('+').parse::<i32>().ok())
}

// ============================================================================
// COMPOSITE KEY
// ============================================================================

/// Linking key: French title, English title, year, French disc, English disc.
/// Every component is trimmed and upper-cased, so the key ignores casing and
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn new(
        title_fr: &str,
        title_en: &str,
        year: Option<i32>,
        disc_fr: Option<&str>,
        disc_en: Option<&str>,
    ) -> Self {
        let year = year.map(|y| y.to_string()).unwrap_or_default();
        let parts = [
            title_fr.trim().to_uppercase(),
            title_en.trim().to_uppercase(),
            year,
            disc_fr.unwrap_or("").trim().to_uppercase(),
            disc_en.unwrap_or("").trim().to_uppercase(),
        ];
        CompositeKey(parts.join(" | "))
    }

    pub fn of_record(record: &CanonicalRecord) -> Self {
        Self::new(
            &record.title_fr,
            &record.title_en,
            record.year,
            record.disc_fr.as_deref(),
            record.disc_en.as_deref(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SERIES TITLES
// ============================================================================

/// Strip a trailing episode suffix ("- NN...") from a title.
/// A title without the suffix is its own base. Idempotent.
pub fn base_series_title(title: &str) -> String {
    let t = title.trim();
    match EPISODE_SUFFIX.captures(t) {
        Some(caps) => caps
            .get(1)
            .map_or(String::new(), |m| m.as_str().trim().to_string()),
        None => t.to_string(),
    }
}

/// Base title of a record: French title first, English when French is empty.
pub fn record_base_title(record: &CanonicalRecord) -> String {
    base_series_title(record.display_title())
}

// ============================================================================
// CATEGORIES AND GENRE SCHEMA
// ============================================================================

/// Build the category dictionary from the categories table.
pub fn build_category_dictionary(rows: &[RawRecord]) -> CategoryDictionary {
    let mut dict = CategoryDictionary::new();
    for row in rows {
        let field = norm_str(row.get("code"));
        if field.is_empty() {
            continue;
        }
        let code = field.to_uppercase();
        let label = norm_optional(row.get("labelFR")).unwrap_or_else(|| code.clone());
        let description = norm_str(row.get("descriptionFR"));
        dict.insert(Category {
            code,
            fields: vec![field],
            label,
            description,
        });
    }
    dict
}

/// Ordered (field names, canonical code) entries resolved once against the
/// dictionary. Film rows are tested against this list at normalization time.
#[derive(Debug, Clone, Default)]
pub struct GenreSchema {
    columns: Vec<(Vec<String>, String)>,
}

impl GenreSchema {
    pub fn from_dictionary(dict: &CategoryDictionary) -> Self {
        Self {
            columns: dict
                .iter()
                .map(|c| (c.fields.clone(), c.code.clone()))
                .collect(),
        }
    }

    /// Codes with a non-empty value under any of their field spellings,
    /// in dictionary order.
    pub fn genres_of(&self, row: &RawRecord) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(fields, _)| fields.iter().any(|f| has_value(row.get(f.as_str()))))
            .map(|(_, code)| code.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// RECORD NORMALIZATION
// ============================================================================

fn normalize_common(row: &RawRecord, source: SourceTable, kind: RecordKind) -> CanonicalRecord {
    CanonicalRecord {
        source,
        kind,
        title_fr: norm_str(row.get(FIELD_TITLE_FR)),
        title_en: norm_str(row.get(FIELD_TITLE_EN)),
        year: norm_year(row.get(FIELD_YEAR)),
        cover: norm_optional(row.get(FIELD_COVER)),
        disc_fr: norm_disc(row.get(FIELD_DISC_FR)),
        disc_en: norm_disc(row.get(FIELD_DISC_EN)),
        audio_fr: norm_optional(row.get(FIELD_AUDIO_FR)),
        audio_en: norm_optional(row.get(FIELD_AUDIO_EN)),
        summary: norm_optional(row.get(FIELD_SUMMARY)),
        series_marker: norm_optional(row.get(FIELD_SERIES)).map(|s| s.to_uppercase()),
        id: row.get(FIELD_ID).filter(|v| !v.is_null()).cloned(),
        genres: Vec::new(),
        episode: None,
    }
}

/// Normalize a films-table row, resolving its genre codes.
pub fn normalize_film(row: &RawRecord, schema: &GenreSchema) -> CanonicalRecord {
    CanonicalRecord {
        genres: schema.genres_of(row),
        ..normalize_common(row, SourceTable::Films, RecordKind::Film)
    }
}

/// Normalize an episode-table row, keeping its episode metadata verbatim.
pub fn normalize_episode(row: &RawRecord, source: SourceTable) -> CanonicalRecord {
    let raw = |field: &str| row.get(field).filter(|v| !v.is_null()).cloned();
    CanonicalRecord {
        episode: Some(EpisodeMeta {
            dubbed: raw("ENDOUBLE"),
            last_episode_watched: raw("DERNIEREPISODEVISIONNE"),
            season_year: raw("ANNEESAISON"),
            last_season: raw("DERNIERESAISON"),
        }),
        ..normalize_common(row, source, RecordKind::Episode)
    }
}

/// A summaries-table row reduced to what linking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub key: CompositeKey,
    pub text: Option<String>,
}

pub fn normalize_summary(row: &RawRecord) -> SummaryEntry {
    let common = normalize_common(row, SourceTable::Summaries, RecordKind::Film);
    SummaryEntry {
        key: CompositeKey::of_record(&common),
        text: common.summary,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture rows must be objects"),
        }
    }

    #[test]
    fn test_norm_str_coerces_scalars() {
        assert_eq!(norm_str(Some(&json!("  Alien  "))), "Alien");
        assert_eq!(norm_str(Some(&json!(1979))), "1979");
        assert_eq!(norm_str(Some(&Value::Null)), "");
        assert_eq!(norm_str(None), "");
        assert_eq!(norm_optional(Some(&json!("   "))), None);
    }

    #[test]
    fn test_norm_year() {
        assert_eq!(norm_year(Some(&json!("2001"))), Some(2001));
        assert_eq!(norm_year(Some(&json!(" 1999 "))), Some(1999));
        assert_eq!(norm_year(Some(&json!(2001.0))), Some(2001));
        assert_eq!(norm_year(Some(&json!("2001abc"))), Some(2001));
        assert_eq!(norm_year(Some(&json!("+1984"))), Some(1984));
        assert_eq!(norm_year(Some(&json!("unknown"))), None);
        assert_eq!(norm_year(Some(&json!(""))), None);
        assert_eq!(norm_year(Some(&json!("99999999999"))), None);
        assert_eq!(norm_year(None), None);
    }

    #[test]
    fn test_norm_disc_uppercases() {
        assert_eq!(norm_disc(Some(&json!(" d12 "))), Some("D12".to_string()));
        assert_eq!(norm_disc(Some(&json!(""))), None);
    }

    #[test]
    fn test_composite_key_ignores_case_and_whitespace() {
        let a = CompositeKey::new("  Alien ", "alien", Some(1979), Some("d1"), None);
        let b = CompositeKey::new("ALIEN", " Alien  ", Some(1979), Some(" D1 "), None);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ALIEN | ALIEN | 1979 | D1 | ");

        let other_year = CompositeKey::new("Alien", "Alien", Some(1986), Some("D1"), None);
        assert_ne!(a, other_year);
    }

    #[test]
    fn test_base_series_title() {
        assert_eq!(base_series_title("Friends - 01"), "Friends");
        assert_eq!(base_series_title("Friends - 12 The One With The Thumb"), "Friends");
        assert_eq!(base_series_title("Friends -3"), "Friends");
        assert_eq!(base_series_title("  Friends  "), "Friends");
        assert_eq!(base_series_title("Friends"), "Friends");
        assert_eq!(base_series_title(""), "");
        // 4+ digits still match on the first three
        assert_eq!(base_series_title("Show - 1234"), "Show");
    }

    #[test]
    fn test_base_series_title_known_limitation() {
        // Free text containing "- <digits>" is split too
        assert_eq!(base_series_title("Blade Runner - 2049 Edition"), "Blade Runner");
        assert_eq!(base_series_title("Show - 01 - Part 2"), "Show");
    }

    #[test]
    fn test_base_series_title_is_idempotent() {
        for title in [
            "Friends - 01",
            "A -- 5",
            "- 5",
            "Show - 01 - Part 2",
            "No suffix here",
            "Trailing -",
            "",
        ] {
            let once = base_series_title(title);
            assert_eq!(base_series_title(&once), once, "title: {:?}", title);
        }
    }

    #[test]
    fn test_category_dictionary_and_schema() {
        let rows = vec![
            row(json!({"code": " Hor ", "labelFR": "Horreur", "descriptionFR": "Peur"})),
            row(json!({"code": "SCFI"})),
            row(json!({"code": "", "labelFR": "ignored"})),
        ];
        let dict = build_category_dictionary(&rows);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.label_of("HOR"), "Horreur");
        assert_eq!(dict.label_of("SCFI"), "SCFI");
        assert_eq!(dict.get("HOR").map(|c| c.fields.clone()), Some(vec!["Hor".to_string()]));

        let schema = GenreSchema::from_dictionary(&dict);
        let film = row(json!({"TITREFRANCAIS": "Alien", "Hor": "x", "SCFI": "x", "DRAME": "x"}));
        assert_eq!(schema.genres_of(&film), vec!["HOR", "SCFI"]);

        let plain = row(json!({"TITREFRANCAIS": "Amélie", "Hor": "", "SCFI": null}));
        assert!(schema.genres_of(&plain).is_empty());
    }

    #[test]
    fn test_codes_differing_in_case_probe_every_spelling() {
        let rows = vec![
            row(json!({"code": "Hor", "labelFR": "Horreur"})),
            row(json!({"code": "HOR", "labelFR": "Épouvante"})),
        ];
        let dict = build_category_dictionary(&rows);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.label_of("HOR"), "Épouvante");
        assert_eq!(dict.get("HOR").map(|c| c.fields.len()), Some(2));

        let schema = GenreSchema::from_dictionary(&dict);
        assert_eq!(schema.genres_of(&row(json!({"HOR": "X"}))), vec!["HOR"]);
        assert_eq!(schema.genres_of(&row(json!({"Hor": "X"}))), vec!["HOR"]);
        assert_eq!(schema.genres_of(&row(json!({"Hor": "X", "HOR": "X"}))), vec!["HOR"]);
    }

    #[test]
    fn test_normalize_film() {
        let dict = build_category_dictionary(&[row(json!({"code": "HOR"}))]);
        let schema = GenreSchema::from_dictionary(&dict);
        let film = normalize_film(
            &row(json!({
                "TITREFRANCAIS": " Alien ",
                "TITREANGLAIS": "Alien",
                "ANNEE": "1979",
                "DISQUEFRANCAIS": "d1",
                "AUDIOFRANCAIS": "X",
                "AUDIOANGLAIS": "",
                "SERIE": "x",
                "HOR": "1",
                "ID": 42
            })),
            &schema,
        );
        assert_eq!(film.kind, RecordKind::Film);
        assert_eq!(film.title_fr, "Alien");
        assert_eq!(film.year, Some(1979));
        assert_eq!(film.disc_fr.as_deref(), Some("D1"));
        assert!(film.has_french_audio());
        assert!(!film.has_english_audio());
        assert!(film.is_series_film());
        assert_eq!(film.genres, vec!["HOR"]);
        assert_eq!(film.id, Some(json!(42)));
        assert!(film.episode.is_none());
    }

    #[test]
    fn test_normalize_episode_keeps_missing_titles() {
        let ep = normalize_episode(
            &row(json!({"ANNEE": "n/a", "POCHETTE": "cover.jpg", "ANNEESAISON": 2004})),
            SourceTable::SeriesTwo,
        );
        assert_eq!(ep.kind, RecordKind::Episode);
        assert_eq!(ep.title_fr, "");
        assert_eq!(ep.year, None);
        assert!(ep.is_series_header());
        assert_eq!(record_base_title(&ep), "");
        assert_eq!(
            ep.episode.and_then(|m| m.season_year),
            Some(json!(2004))
        );
    }

    #[test]
    fn test_normalize_summary() {
        let entry = normalize_summary(&row(json!({
            "TITREFRANCAIS": "alien", "TITREANGLAIS": "ALIEN", "ANNEE": 1979, "RESUME": " Dans l'espace... "
        })));
        assert_eq!(entry.key, CompositeKey::new("Alien", "Alien", Some(1979), None, None));
        assert_eq!(entry.text.as_deref(), Some("Dans l'espace..."));
    }
}
