//! Catalog assembly: normalization, summary linking and series grouping,
//! run once per load.

use serde::Serialize;
use tracing::info;

use crate::models::{CanonicalRecord, CategoryDictionary, SourceTable, SourceTables};
use crate::normalize::{
    build_category_dictionary, normalize_episode, normalize_film, normalize_summary, GenreSchema,
};
use crate::link::link_summaries;
use crate::series::{build_series, SeriesIndex};

/// Row counts gathered while building the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub films: usize,
    pub episodes: usize,
    pub summaries: usize,
    pub linked_summaries: usize,
    pub categories: usize,
    pub films_with_genres: usize,
    pub series_headers: usize,
}

/// The normalized catalog. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: CategoryDictionary,
    records: Vec<CanonicalRecord>,
    series: SeriesIndex,
    counts: CatalogCounts,
}

impl Catalog {
    pub fn build(tables: &SourceTables) -> Self {
        let categories = build_category_dictionary(&tables.categories);
        let schema = GenreSchema::from_dictionary(&categories);

        let films: Vec<CanonicalRecord> = tables
            .films
            .iter()
            .map(|row| normalize_film(row, &schema))
            .collect();
        let summaries: Vec<_> = tables.summaries.iter().map(normalize_summary).collect();
        let (films, linked_summaries) = link_summaries(films, &summaries);

        let episodes: Vec<CanonicalRecord> = tables
            .series_one
            .iter()
            .map(|row| normalize_episode(row, SourceTable::SeriesOne))
            .chain(
                tables
                    .series_two
                    .iter()
                    .map(|row| normalize_episode(row, SourceTable::SeriesTwo)),
            )
            .collect();
        let series = build_series(&episodes);

        let counts = CatalogCounts {
            films: films.len(),
            episodes: episodes.len(),
            summaries: summaries.len(),
            linked_summaries,
            categories: categories.len(),
            films_with_genres: films.iter().filter(|f| !f.genres.is_empty()).count(),
            series_headers: series.header_count(),
        };

        let mut records = films;
        records.extend(episodes);

        info!(
            films = counts.films,
            episodes = counts.episodes,
            summaries = counts.summaries,
            linked = counts.linked_summaries,
            categories = counts.categories,
            series = counts.series_headers,
            "catalog built"
        );

        Self {
            categories,
            records,
            series,
            counts,
        }
    }

    pub fn categories(&self) -> &CategoryDictionary {
        &self.categories
    }

    /// Films first, then episodes of both series tables, in source order.
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn series(&self) -> &SeriesIndex {
        &self.series
    }

    pub fn counts(&self) -> CatalogCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_tables;
    use crate::models::RecordKind;

    #[test]
    fn test_build_catalog() {
        let catalog = Catalog::build(&sample_tables());
        let counts = catalog.counts();
        assert_eq!(counts.films, 2);
        assert_eq!(counts.episodes, 3);
        assert_eq!(counts.linked_summaries, 1);
        assert_eq!(counts.films_with_genres, 2);
        assert_eq!(counts.series_headers, 1);
        assert_eq!(catalog.len(), 5);

        let kinds: Vec<RecordKind> = catalog.records().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Film,
                RecordKind::Film,
                RecordKind::Episode,
                RecordKind::Episode,
                RecordKind::Episode
            ]
        );
        assert_eq!(catalog.records()[0].summary.as_deref(), Some("Un cargo spatial..."));
        assert_eq!(
            catalog.series().get("Friends").map(|g| g.episode_count()),
            Some(2)
        );
    }

    #[test]
    fn test_genres_are_known_codes() {
        let catalog = Catalog::build(&sample_tables());
        for record in catalog.records().iter().filter(|r| r.is_film()) {
            for code in &record.genres {
                assert!(catalog.categories().contains(code));
            }
        }
    }

    #[test]
    fn test_empty_tables_build_empty_catalog() {
        let catalog = Catalog::build(&SourceTables::default());
        assert!(catalog.is_empty());
        assert!(catalog.series().is_empty());
    }
}
