//! Recovers the exact records behind an aggregate bucket.
//!
//! Classification goes through the same helpers as [`crate::aggregate`] and
//! [`crate::cooccurrence`], so the subset length matches the reported count:
//!
//! - disc buckets on the series side count distinct base titles, so the
//!   subset holds the first record seen for each base title;
//! - series buckets return the non-header episodes of that base title
//!   (top-series counts come from the unfiltered catalog).

use anyhow::{anyhow, bail, Context, Result};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::{
    iter_records, DiscClass, GenreCountBucket, GenreSplit, LanguageBucket, TrackSide,
};
use crate::models::CanonicalRecord;
use crate::normalize::record_base_title;

/// Identity of a bucket emitted by an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Bucket {
    Year(i32),
    Disc {
        disc: String,
        side: TrackSide,
        class: DiscClass,
    },
    Language(LanguageBucket),
    Series(String),
    Genre {
        code: String,
        split: GenreSplit,
    },
    GenreCount {
        bucket: GenreCountBucket,
        split: GenreSplit,
    },
    GenrePair {
        a: String,
        b: String,
    },
}

impl Bucket {
    /// Whether a record is classified into this bucket.
    /// Disc/series distinctness is handled by [`select`].
    fn admits(&self, record: &CanonicalRecord) -> bool {
        match self {
            Bucket::Year(year) => record.year == Some(*year),
            Bucket::Disc { disc, side, class } => {
                DiscClass::of(record) == *class && side.disc_of(record) == disc
            }
            Bucket::Language(bucket) => LanguageBucket::of(record) == *bucket,
            Bucket::Series(base) => {
                record.is_episode()
                    && !record.is_series_header()
                    && record_base_title(record) == *base
            }
            Bucket::Genre { code, split } => {
                record.is_film() && split.matches(record) && record.has_genre(code)
            }
            Bucket::GenreCount { bucket, split } => {
                record.is_film() && split.matches(record) && GenreCountBucket::of(record) == *bucket
            }
            Bucket::GenrePair { a, b } => record.is_film() && record.has_genre(a) && record.has_genre(b),
        }
    }
}

/// Records behind a bucket, in encounter order.
#[derive(Debug, Clone)]
pub struct DrillDown<'a> {
    pub bucket: Bucket,
    pub records: Vec<&'a CanonicalRecord>,
}

impl DrillDown<'_> {
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn title(&self) -> String {
        format!("{} — {}", self.bucket, self.count())
    }
}

/// Select the records that contributed to `bucket`. Never mutates anything.
pub fn select<'a, R: Borrow<CanonicalRecord>>(records: &'a [R], bucket: &Bucket) -> DrillDown<'a> {
    select_from(iter_records(records), bucket)
}

/// Same as [`select`], over any iterator of borrowed records.
pub fn select_from<'a, I>(records: I, bucket: &Bucket) -> DrillDown<'a>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut seen_series: FxHashSet<String> = FxHashSet::default();
    let distinct_series = matches!(bucket, Bucket::Disc { class: DiscClass::Series, .. });

    let records = records
        .into_iter()
        .filter(|r| bucket.admits(r))
        .filter(|r| !distinct_series || seen_series.insert(record_base_title(r)))
        .collect();

    DrillDown {
        bucket: bucket.clone(),
        records,
    }
}

// ============================================================================
// Parsing and display
// ============================================================================

fn parse_split(s: Option<&str>) -> Result<GenreSplit> {
    match s.map(str::trim).unwrap_or("all") {
        "all" | "" => Ok(GenreSplit::All),
        "films" | "film" => Ok(GenreSplit::Films),
        "series" | "serie" => Ok(GenreSplit::Series),
        other => bail!("unknown split '{}' (expected all, films or series)", other),
    }
}

fn parse_code(s: &str) -> Result<String> {
    let code = s.trim().to_uppercase();
    if code.is_empty() {
        bail!("empty genre code");
    }
    Ok(code)
}

/// Compact text form: `year=2001`, `disc=D12:fr:films`, `lang=both`,
/// `series=Friends`, `genre=HOR:series`, `genre-count=9+:all`, `pair=HOR,SCFI`.
impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, value) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("bucket '{}' must look like kind=value", s))?;

        match kind.trim() {
            "year" => {
                let year = value
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid year '{}'", value))?;
                Ok(Bucket::Year(year))
            }
            "disc" => {
                let mut parts = value.split(':');
                let disc = parts.next().unwrap_or("").trim().to_uppercase();
                let side = match parts.next().map(str::trim) {
                    Some("fr") => TrackSide::French,
                    Some("en") => TrackSide::English,
                    other => bail!("disc side must be fr or en, got {:?}", other),
                };
                let class = match parts.next().map(str::trim).unwrap_or("films") {
                    "films" | "film" => DiscClass::Films,
                    "series" | "serie" => DiscClass::Series,
                    other => bail!("disc class must be films or series, got '{}'", other),
                };
                if disc.is_empty() {
                    bail!("empty disc identifier");
                }
                Ok(Bucket::Disc { disc, side, class })
            }
            "lang" => {
                let bucket = match value.trim() {
                    "both" => LanguageBucket::Both,
                    "french-only" | "fr" => LanguageBucket::FrenchOnly,
                    "english-only" | "en" => LanguageBucket::EnglishOnly,
                    "none" => LanguageBucket::None,
                    other => bail!("unknown language bucket '{}'", other),
                };
                Ok(Bucket::Language(bucket))
            }
            "series" => Ok(Bucket::Series(value.trim().to_string())),
            "genre" => {
                let (code, split) = match value.split_once(':') {
                    Some((code, split)) => (code, Some(split)),
                    None => (value, None),
                };
                Ok(Bucket::Genre {
                    code: parse_code(code)?,
                    split: parse_split(split)?,
                })
            }
            "genre-count" => {
                let (bucket, split) = match value.split_once(':') {
                    Some((bucket, split)) => (bucket, Some(split)),
                    None => (value, None),
                };
                let bucket = GenreCountBucket::parse(bucket)
                    .ok_or_else(|| anyhow!("genre-count bucket must be 0..8 or 9+, got '{}'", bucket))?;
                Ok(Bucket::GenreCount {
                    bucket,
                    split: parse_split(split)?,
                })
            }
            "pair" => {
                let (a, b) = value
                    .split_once(',')
                    .ok_or_else(|| anyhow!("pair must look like A,B"))?;
                Ok(Bucket::GenrePair {
                    a: parse_code(a)?,
                    b: parse_code(b)?,
                })
            }
            other => bail!("unknown bucket kind '{}'", other),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Year(year) => write!(f, "Titles for year {}", year),
            Bucket::Disc { disc, side, class } => {
                write!(f, "Titles on disc {} ({} {})", disc, side.as_str(), class.as_str())
            }
            Bucket::Language(bucket) => write!(f, "Titles by language: {}", bucket.as_str()),
            Bucket::Series(base) => write!(f, "Series: {}", base),
            Bucket::Genre { code, split } => write!(f, "Genre: {} ({})", code, split.as_str()),
            Bucket::GenreCount { bucket, split } => {
                write!(f, "Genre count: {} ({})", bucket, split.as_str())
            }
            Bucket::GenrePair { a, b } => write!(f, "Co-occurrence: {} ∩ {}", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use crate::cooccurrence::genre_cooccurrence;
    use crate::fixtures;
    use crate::series::build_series;
    use std::collections::BTreeSet;

    #[test]
    fn test_parse_buckets() {
        assert_eq!("year=2001".parse::<Bucket>().unwrap(), Bucket::Year(2001));
        assert_eq!(
            "disc=d12:en:series".parse::<Bucket>().unwrap(),
            Bucket::Disc {
                disc: "D12".to_string(),
                side: TrackSide::English,
                class: DiscClass::Series
            }
        );
        assert_eq!(
            "genre=hor".parse::<Bucket>().unwrap(),
            Bucket::Genre { code: "HOR".to_string(), split: GenreSplit::All }
        );
        assert_eq!(
            "genre-count=9+:films".parse::<Bucket>().unwrap(),
            Bucket::GenreCount { bucket: GenreCountBucket::NineOrMore, split: GenreSplit::Films }
        );
        assert_eq!(
            "pair=HOR, scfi".parse::<Bucket>().unwrap(),
            Bucket::GenrePair { a: "HOR".to_string(), b: "SCFI".to_string() }
        );
        assert!("year".parse::<Bucket>().is_err());
        assert!("year=abc".parse::<Bucket>().is_err());
        assert!("disc=D1:xx".parse::<Bucket>().is_err());
        assert!("colour=red".parse::<Bucket>().is_err());
    }

    #[test]
    fn test_title_includes_count() {
        let records = vec![fixtures::film("A", Some(2001), &[])];
        let drill = select(&records, &Bucket::Year(2001));
        assert_eq!(drill.title(), "Titles for year 2001 — 1");
    }

    #[test]
    fn test_round_trip_against_every_aggregate() {
        let records = fixtures::sample_catalog();
        let categories = fixtures::categories(&[("HOR", "Horreur"), ("SCFI", "SF"), ("DRAME", "Drame")]);

        for row in aggregate::by_year(&records) {
            assert_eq!(select(&records, &Bucket::Year(row.year)).count(), row.count);
        }

        for row in aggregate::discs(&records) {
            for side in [TrackSide::French, TrackSide::English] {
                for class in [DiscClass::Films, DiscClass::Series] {
                    let bucket = Bucket::Disc { disc: row.disc.clone(), side, class };
                    assert_eq!(select(&records, &bucket).count(), row.count(side, class), "{}", bucket);
                }
            }
        }

        let buckets = aggregate::language_buckets(&records);
        for lang in [
            LanguageBucket::Both,
            LanguageBucket::FrenchOnly,
            LanguageBucket::EnglishOnly,
            LanguageBucket::None,
        ] {
            assert_eq!(select(&records, &Bucket::Language(lang)).count(), buckets.count(lang));
        }

        let episodes: Vec<&CanonicalRecord> = records.iter().filter(|r| r.is_episode()).collect();
        let series = build_series(episodes.iter().copied());
        for rank in aggregate::top_series(&series, 10) {
            let drill = select(&records, &Bucket::Series(rank.title.clone()));
            assert_eq!(drill.count(), rank.count);
        }

        for row in aggregate::genre_totals(&records, &categories) {
            for split in [GenreSplit::All, GenreSplit::Films, GenreSplit::Series] {
                let bucket = Bucket::Genre { code: row.code.clone(), split };
                assert_eq!(select(&records, &bucket).count(), row.count(split));
            }
        }

        for (row, bucket) in aggregate::genre_count_histogram(&records)
            .iter()
            .zip(GenreCountBucket::ALL)
        {
            for split in [GenreSplit::All, GenreSplit::Films, GenreSplit::Series] {
                let drill = select(&records, &Bucket::GenreCount { bucket, split });
                assert_eq!(drill.count(), row.count(split));
            }
        }

        let payload = genre_cooccurrence(&records, &categories, 20, &BTreeSet::new());
        for cell in &payload.cells {
            let bucket = Bucket::GenrePair {
                a: payload.labels[cell.i].code.clone(),
                b: payload.labels[cell.j].code.clone(),
            };
            assert_eq!(select(&records, &bucket).count(), cell.count);
        }
    }

    #[test]
    fn test_select_keeps_encounter_order_on_borrowed_subset() {
        let records = fixtures::sample_catalog();
        let subset: Vec<&CanonicalRecord> = records.iter().filter(|r| r.is_film()).collect();
        let drill = select(&subset, &Bucket::Genre { code: "HOR".to_string(), split: GenreSplit::All });
        let positions: Vec<usize> = drill
            .records
            .iter()
            .map(|r| records.iter().position(|x| std::ptr::eq(x, *r)).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(!positions.is_empty());
    }
}
