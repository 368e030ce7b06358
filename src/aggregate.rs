//! Summary statistics over a record collection.
//!
//! Every function here is pure and works on any collection: the full
//! catalog or a filtered subset (`&[CanonicalRecord]` or `&[&CanonicalRecord]`).
//! The classification helpers (`LanguageBucket`, `DiscClass`, `GenreSplit`,
//! `GenreCountBucket`) are shared with the drill-down selector so that a
//! bucket and its drill-down always agree.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::{CanonicalRecord, CategoryDictionary, Kpis};
use crate::normalize::record_base_title;
use crate::series::SeriesIndex;

/// Default number of series in the top-series ranking.
pub const DEFAULT_TOP_SERIES: usize = 10;

/// Iterate a collection of owned or borrowed records.
pub fn iter_records<R: Borrow<CanonicalRecord>>(
    records: &[R],
) -> impl Iterator<Item = &CanonicalRecord> + '_ {
    records.iter().map(<R as Borrow<CanonicalRecord>>::borrow)
}

// ============================================================================
// Classification
// ============================================================================

/// Audio-track coverage of a record. Every record falls in exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LanguageBucket {
    Both,
    FrenchOnly,
    EnglishOnly,
    None,
}

impl LanguageBucket {
    pub fn of(record: &CanonicalRecord) -> Self {
        match (record.has_french_audio(), record.has_english_audio()) {
            (true, true) => LanguageBucket::Both,
            (true, false) => LanguageBucket::FrenchOnly,
            (false, true) => LanguageBucket::EnglishOnly,
            (false, false) => LanguageBucket::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LanguageBucket::Both => "both",
            LanguageBucket::FrenchOnly => "french-only",
            LanguageBucket::EnglishOnly => "english-only",
            LanguageBucket::None => "none",
        }
    }
}

/// Which disc field a disc bucket refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackSide {
    French,
    English,
}

impl TrackSide {
    pub fn disc_of(self, record: &CanonicalRecord) -> &str {
        match self {
            TrackSide::French => record.disc_fr_or_placeholder(),
            TrackSide::English => record.disc_en_or_placeholder(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrackSide::French => "fr",
            TrackSide::English => "en",
        }
    }
}

/// Plain films are counted per row; series contributors per distinct base title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiscClass {
    Films,
    Series,
}

impl DiscClass {
    pub fn of(record: &CanonicalRecord) -> Self {
        if record.is_series_contributor() {
            DiscClass::Series
        } else {
            DiscClass::Films
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiscClass::Films => "films",
            DiscClass::Series => "series",
        }
    }
}

/// Film/series split used by the genre statistics (film records only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GenreSplit {
    All,
    Films,
    Series,
}

impl GenreSplit {
    /// Whether a film record belongs to this side of the split.
    pub fn matches(self, record: &CanonicalRecord) -> bool {
        match self {
            GenreSplit::All => true,
            GenreSplit::Films => !record.is_series_film(),
            GenreSplit::Series => record.is_series_film(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenreSplit::All => "all",
            GenreSplit::Films => "films",
            GenreSplit::Series => "series",
        }
    }
}

/// Histogram bucket for the number of genres attached to a film.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GenreCountBucket {
    Exactly(u8),
    NineOrMore,
}

impl GenreCountBucket {
    pub const ALL: [GenreCountBucket; 10] = [
        GenreCountBucket::Exactly(0),
        GenreCountBucket::Exactly(1),
        GenreCountBucket::Exactly(2),
        GenreCountBucket::Exactly(3),
        GenreCountBucket::Exactly(4),
        GenreCountBucket::Exactly(5),
        GenreCountBucket::Exactly(6),
        GenreCountBucket::Exactly(7),
        GenreCountBucket::Exactly(8),
        GenreCountBucket::NineOrMore,
    ];

    pub fn of(record: &CanonicalRecord) -> Self {
        match record.genres.len() {
            n if n >= 9 => GenreCountBucket::NineOrMore,
            n => GenreCountBucket::Exactly(n as u8),
        }
    }

    fn position(self) -> usize {
        match self {
            GenreCountBucket::Exactly(n) => n as usize,
            GenreCountBucket::NineOrMore => 9,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "9+" => Some(GenreCountBucket::NineOrMore),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|n| *n <= 8)
                .map(GenreCountBucket::Exactly),
        }
    }
}

impl fmt::Display for GenreCountBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenreCountBucket::Exactly(n) => write!(f, "{}", n),
            GenreCountBucket::NineOrMore => f.write_str("9+"),
        }
    }
}

// ============================================================================
// Output Rows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscRow {
    pub disc: String,
    pub fr_films: usize,
    pub fr_series: usize,
    pub en_films: usize,
    pub en_series: usize,
}

impl DiscRow {
    pub fn count(&self, side: TrackSide, class: DiscClass) -> usize {
        match (side, class) {
            (TrackSide::French, DiscClass::Films) => self.fr_films,
            (TrackSide::French, DiscClass::Series) => self.fr_series,
            (TrackSide::English, DiscClass::Films) => self.en_films,
            (TrackSide::English, DiscClass::Series) => self.en_series,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LanguageBuckets {
    pub both: usize,
    pub french_only: usize,
    pub english_only: usize,
    pub none: usize,
}

impl LanguageBuckets {
    pub fn count(&self, bucket: LanguageBucket) -> usize {
        match bucket {
            LanguageBucket::Both => self.both,
            LanguageBucket::FrenchOnly => self.french_only,
            LanguageBucket::EnglishOnly => self.english_only,
            LanguageBucket::None => self.none,
        }
    }

    pub fn total(&self) -> usize {
        self.both + self.french_only + self.english_only + self.none
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRank {
    pub title: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreTotalRow {
    pub code: String,
    pub label: String,
    pub description: String,
    pub total: usize,
    pub films: usize,
    pub series: usize,
}

impl GenreTotalRow {
    pub fn count(&self, split: GenreSplit) -> usize {
        match split {
            GenreSplit::All => self.total,
            GenreSplit::Films => self.films,
            GenreSplit::Series => self.series,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCountRow {
    pub bucket: String,
    pub total: usize,
    pub films: usize,
    pub series: usize,
}

impl GenreCountRow {
    pub fn count(&self, split: GenreSplit) -> usize {
        match split {
            GenreSplit::All => self.total,
            GenreSplit::Films => self.films,
            GenreSplit::Series => self.series,
        }
    }
}

// ============================================================================
// Aggregations
// ============================================================================

/// Records per year, ascending. Records without a year are left out.
pub fn by_year<R: Borrow<CanonicalRecord>>(records: &[R]) -> Vec<YearCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in iter_records(records).filter_map(|r| r.year) {
        *counts.entry(year).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}

/// Per-disc counts of plain films (rows) and series (distinct base titles),
/// for both disc fields. Rows are sorted by disc identifier.
pub fn discs<R: Borrow<CanonicalRecord>>(records: &[R]) -> Vec<DiscRow> {
    let mut fr_films: FxHashMap<&str, usize> = FxHashMap::default();
    let mut en_films: FxHashMap<&str, usize> = FxHashMap::default();
    let mut fr_series: FxHashMap<&str, FxHashSet<String>> = FxHashMap::default();
    let mut en_series: FxHashMap<&str, FxHashSet<String>> = FxHashMap::default();

    for record in iter_records(records) {
        let disc_fr = record.disc_fr_or_placeholder();
        let disc_en = record.disc_en_or_placeholder();
        match DiscClass::of(record) {
            DiscClass::Series => {
                let base = record_base_title(record);
                fr_series.entry(disc_fr).or_default().insert(base.clone());
                en_series.entry(disc_en).or_default().insert(base);
            }
            DiscClass::Films => {
                *fr_films.entry(disc_fr).or_default() += 1;
                *en_films.entry(disc_en).or_default() += 1;
            }
        }
    }

    let keys: BTreeSet<&str> = fr_films
        .keys()
        .chain(en_films.keys())
        .chain(fr_series.keys())
        .chain(en_series.keys())
        .copied()
        .collect();

    keys.into_iter()
        .map(|disc| DiscRow {
            disc: disc.to_string(),
            fr_films: fr_films.get(disc).copied().unwrap_or(0),
            fr_series: fr_series.get(disc).map_or(0, |s| s.len()),
            en_films: en_films.get(disc).copied().unwrap_or(0),
            en_series: en_series.get(disc).map_or(0, |s| s.len()),
        })
        .collect()
}

/// Audio-track coverage counts.
pub fn language_buckets<R: Borrow<CanonicalRecord>>(records: &[R]) -> LanguageBuckets {
    let mut buckets = LanguageBuckets::default();
    for record in iter_records(records) {
        match LanguageBucket::of(record) {
            LanguageBucket::Both => buckets.both += 1,
            LanguageBucket::FrenchOnly => buckets.french_only += 1,
            LanguageBucket::EnglishOnly => buckets.english_only += 1,
            LanguageBucket::None => buckets.none += 1,
        }
    }
    buckets
}

/// Series headers ranked by episode count, descending; ties keep first-seen order.
/// Series without a header are not ranked.
pub fn top_series(series: &SeriesIndex, n: usize) -> Vec<SeriesRank> {
    let mut ranks: Vec<SeriesRank> = series
        .headers()
        .map(|group| SeriesRank {
            title: group.base_title.clone(),
            count: group.episode_count(),
        })
        .collect();
    ranks.sort_by(|a, b| b.count.cmp(&a.count));
    ranks.truncate(n);
    ranks
}

/// Per-genre totals over film records, split by the series flag.
/// Sorted by total descending, then label, then code.
pub fn genre_totals<R: Borrow<CanonicalRecord>>(
    records: &[R],
    categories: &CategoryDictionary,
) -> Vec<GenreTotalRow> {
    let mut counts: FxHashMap<&str, (usize, usize, usize)> = FxHashMap::default();
    for record in iter_records(records).filter(|r| r.is_film()) {
        let is_series = record.is_series_film();
        for code in &record.genres {
            let entry = counts.entry(code.as_str()).or_default();
            entry.0 += 1;
            if is_series {
                entry.2 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }

    let mut rows: Vec<GenreTotalRow> = counts
        .into_iter()
        .map(|(code, (total, films, series))| {
            let (label, description) = match categories.get(code) {
                Some(c) => (c.label.clone(), c.description.clone()),
                None => (code.to_string(), String::new()),
            };
            GenreTotalRow {
                code: code.to_string(),
                label,
                description,
                total,
                films,
                series,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.code.cmp(&b.code))
    });
    rows
}

/// Histogram of the number of genres per film record: buckets 0..=8 and 9+.
pub fn genre_count_histogram<R: Borrow<CanonicalRecord>>(records: &[R]) -> Vec<GenreCountRow> {
    let mut rows: Vec<GenreCountRow> = GenreCountBucket::ALL
        .iter()
        .map(|bucket| GenreCountRow {
            bucket: bucket.to_string(),
            total: 0,
            films: 0,
            series: 0,
        })
        .collect();

    for record in iter_records(records).filter(|r| r.is_film()) {
        let row = &mut rows[GenreCountBucket::of(record).position()];
        row.total += 1;
        if record.is_series_film() {
            row.series += 1;
        } else {
            row.films += 1;
        }
    }
    rows
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}

/// Headline figures. `series_count` comes from the catalog's series index.
pub fn kpis<R: Borrow<CanonicalRecord>>(records: &[R], series_count: usize) -> Kpis {
    let total = records.len();
    let mut titles: FxHashSet<String> = FxHashSet::default();
    let (mut with_summary, mut with_any, mut with_fr, mut with_en) = (0, 0, 0, 0);

    for record in iter_records(records) {
        let title = record.display_title();
        if !title.is_empty() {
            titles.insert(title.to_uppercase());
        }
        with_summary += usize::from(record.has_summary());
        with_fr += usize::from(record.has_french_audio());
        with_en += usize::from(record.has_english_audio());
        with_any += usize::from(record.has_french_audio() || record.has_english_audio());
    }

    Kpis {
        total,
        unique_titles: titles.len(),
        pct_summary: percent(with_summary, total),
        pct_audio_any: percent(with_any, total),
        pct_audio_tracks: percent(with_fr + with_en, 2 * total),
        series_count,
    }
}
