//! Analysis sessions: a catalog plus the active filter and genre exclusions,
//! with every aggregate already computed for that state.
//!
//! A session is never mutated. Changing the filter or the exclusions yields a
//! new session that shares the catalog and the unfiltered baseline.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregate::{self, DEFAULT_TOP_SERIES};
use crate::catalog::Catalog;
use crate::cooccurrence::{
    genre_cooccurrence, normalize_exclusions, pair_report, PairReport, DEFAULT_TOP_GENRES,
};
use crate::drilldown::{self, Bucket, DrillDown};
use crate::filter::FilterCriteria;
use crate::models::{AggregateBundle, AnalysisReport, CanonicalRecord, Kpis, SourceLoadFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisOptions {
    pub top_genres: usize,
    pub top_series: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_genres: DEFAULT_TOP_GENRES,
            top_series: DEFAULT_TOP_SERIES,
        }
    }
}

/// Compute every aggregate for `records`. Top series always come from the
/// catalog's series index.
pub fn aggregate_bundle(
    records: &[&CanonicalRecord],
    catalog: &Catalog,
    options: AnalysisOptions,
    excluded: &BTreeSet<String>,
) -> AggregateBundle {
    AggregateBundle {
        by_year: aggregate::by_year(records),
        discs: aggregate::discs(records),
        languages: aggregate::language_buckets(records),
        top_series: aggregate::top_series(catalog.series(), options.top_series),
        genre_totals: aggregate::genre_totals(records, catalog.categories()),
        genre_counts: aggregate::genre_count_histogram(records),
        cooccurrence: genre_cooccurrence(records, catalog.categories(), options.top_genres, excluded),
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisSession {
    catalog: Arc<Catalog>,
    options: AnalysisOptions,
    criteria: FilterCriteria,
    excluded: BTreeSet<String>,
    baseline: Arc<AggregateBundle>,
    selection: Vec<usize>,
    bundle: Arc<AggregateBundle>,
    kpis: Kpis,
}

impl AnalysisSession {
    /// Unfiltered session over the whole catalog.
    pub fn open(catalog: Arc<Catalog>, options: AnalysisOptions) -> Self {
        let records: Vec<&CanonicalRecord> = catalog.records().iter().collect();
        let baseline = Arc::new(aggregate_bundle(&records, &catalog, options, &BTreeSet::new()));
        let kpis = aggregate::kpis(&records, catalog.series().header_count());
        let selection = (0..records.len()).collect();

        info!(
            records = kpis.total,
            genres = baseline.cooccurrence.size(),
            series = baseline.top_series.len(),
            "baseline aggregates computed"
        );

        Self {
            catalog: Arc::clone(&catalog),
            options,
            criteria: FilterCriteria::default(),
            excluded: BTreeSet::new(),
            bundle: Arc::clone(&baseline),
            baseline,
            selection,
            kpis,
        }
    }

    /// New session with `criteria` replacing the current filter.
    pub fn with_filter(&self, criteria: FilterCriteria) -> Self {
        self.recompute(criteria, self.excluded.clone())
    }

    /// New session with `codes` replacing the current genre exclusions.
    pub fn with_exclusions<I, S>(&self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.recompute(self.criteria.clone(), normalize_exclusions(codes))
    }

    /// Back to the unfiltered baseline.
    pub fn reset(&self) -> Self {
        self.recompute(FilterCriteria::default(), BTreeSet::new())
    }

    fn recompute(&self, criteria: FilterCriteria, excluded: BTreeSet<String>) -> Self {
        let all = self.catalog.records();
        let selection = if criteria.is_active() {
            criteria.select(all)
        } else {
            (0..all.len()).collect()
        };
        let records: Vec<&CanonicalRecord> = selection.iter().map(|&i| &all[i]).collect();

        let bundle = match (criteria.is_active(), excluded.is_empty()) {
            (false, true) => Arc::clone(&self.baseline),
            (false, false) => Arc::new(AggregateBundle {
                cooccurrence: genre_cooccurrence(
                    &records,
                    self.catalog.categories(),
                    self.options.top_genres,
                    &excluded,
                ),
                ..(*self.baseline).clone()
            }),
            (true, _) => Arc::new(aggregate_bundle(
                &records,
                &self.catalog,
                self.options,
                &excluded,
            )),
        };
        let kpis = aggregate::kpis(&records, self.catalog.series().header_count());

        debug!(
            selected = records.len(),
            excluded = excluded.len(),
            filtered = criteria.is_active(),
            "session recomputed"
        );

        Self {
            catalog: Arc::clone(&self.catalog),
            options: self.options,
            criteria,
            excluded,
            baseline: Arc::clone(&self.baseline),
            selection,
            bundle,
            kpis,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn baseline(&self) -> &AggregateBundle {
        &self.baseline
    }

    pub fn bundle(&self) -> &AggregateBundle {
        &self.bundle
    }

    pub fn kpis(&self) -> &Kpis {
        &self.kpis
    }

    /// Whether this session's bundle is the shared unfiltered baseline.
    pub fn is_baseline(&self) -> bool {
        Arc::ptr_eq(&self.bundle, &self.baseline)
    }

    /// Records selected by the filter, in dataset order.
    pub fn records(&self) -> impl Iterator<Item = &CanonicalRecord> + '_ {
        let all = self.catalog.records();
        self.selection.iter().map(move |&i| &all[i])
    }

    pub fn len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    /// Records behind `bucket` within the current selection.
    pub fn drill_down(&self, bucket: &Bucket) -> DrillDown<'_> {
        drilldown::select_from(self.records(), bucket)
    }

    /// Pair statistics over the current selection.
    pub fn pair_report(&self, code_a: &str, code_b: &str) -> PairReport {
        let records: Vec<&CanonicalRecord> = self.records().collect();
        pair_report(&records, self.catalog.categories(), code_a, code_b)
    }

    pub fn report<'a>(&'a self, load_failures: &'a [SourceLoadFailure]) -> AnalysisReport<'a> {
        AnalysisReport {
            kpis: &self.kpis,
            aggregates: &self.bundle,
            load_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn session() -> AnalysisSession {
        let catalog = Catalog::build(&fixtures::sample_tables());
        AnalysisSession::open(Arc::new(catalog), AnalysisOptions::default())
    }

    #[test]
    fn test_open_uses_whole_catalog() {
        let session = session();
        assert_eq!(session.len(), session.catalog().len());
        assert!(session.is_baseline());
        assert_eq!(session.kpis().total, session.catalog().len());
        assert_eq!(session.kpis().series_count, 1);
        assert_eq!(session.bundle().top_series.len(), 1);
    }

    #[test]
    fn test_filter_recomputes_and_keeps_top_series() {
        let base = session();
        let filtered = base.with_filter(FilterCriteria::new().with_text("alien"));
        assert!(!filtered.is_baseline());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.kpis().total, 1);
        assert_eq!(filtered.bundle().top_series, base.bundle().top_series);
        assert_eq!(filtered.bundle().cooccurrence.total_films, 1);

        // original session untouched
        assert!(base.is_baseline());
        assert_eq!(base.len(), base.catalog().len());
    }

    #[test]
    fn test_exclusions_only_touch_cooccurrence() {
        let base = session();
        let excluded = base.with_exclusions(["scfi", " "]);
        assert_eq!(excluded.excluded().iter().collect::<Vec<_>>(), vec!["SCFI"]);
        assert_eq!(excluded.bundle().by_year, base.bundle().by_year);
        assert_eq!(excluded.bundle().genre_totals, base.bundle().genre_totals);
        assert!(excluded.bundle().cooccurrence.index_of("SCFI").is_none());
        assert!(excluded.bundle().cooccurrence.index_of("HOR").is_some());
    }

    #[test]
    fn test_filter_and_exclusions_compose() {
        let session = session()
            .with_exclusions(["HOR"])
            .with_filter(FilterCriteria::new().with_years(Some(1970), None));
        assert_eq!(session.excluded().len(), 1);
        assert!(session.criteria().is_active());
        assert!(session.bundle().cooccurrence.index_of("HOR").is_none());
    }

    #[test]
    fn test_reset_returns_to_baseline() {
        let session = session()
            .with_filter(FilterCriteria::new().with_languages(true, false))
            .with_exclusions(["HOR"])
            .reset();
        assert!(session.is_baseline());
        assert!(session.excluded().is_empty());
        assert!(!session.criteria().is_active());
        assert_eq!(session.len(), session.catalog().len());
    }

    #[test]
    fn test_drill_down_within_selection() {
        let base = session();
        let bucket = Bucket::Genre {
            code: "HOR".to_string(),
            split: aggregate::GenreSplit::All,
        };
        assert_eq!(base.drill_down(&bucket).count(), 2);

        let filtered = base.with_filter(FilterCriteria::new().with_years(None, Some(1970)));
        let drill = filtered.drill_down(&bucket);
        let titles: Vec<&str> = drill.records.iter().map(|r| r.title_fr.as_str()).collect();
        assert_eq!(titles, vec!["Psychose"]);
    }

    #[test]
    fn test_pair_report_over_selection() {
        let base = session();
        let report = base.pair_report("hor", "scfi");
        assert_eq!(report.total_films, 2);
        assert_eq!(report.both, 1);
        assert_eq!(report.label_a, "Horreur");
    }

    #[test]
    fn test_report_serializes() {
        let session = session();
        let report = session.report(&[]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kpis"]["total"], 5);
        assert!(json["aggregates"]["cooccurrence"]["labels"].is_array());
    }
}
