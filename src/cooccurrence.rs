//! Genre co-occurrence over the most frequent genres.
//!
//! The top-N universe is chosen by frequency among film records, with ties
//! broken alphabetically by code. Each film contributes its distinct
//! intersection with the universe: every unordered pair (self-pairs included)
//! increments the symmetric count matrix once.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use tracing::debug;

use crate::aggregate::iter_records;
use crate::models::{CanonicalRecord, CategoryDictionary};

/// Default size of the top-N genre universe.
pub const DEFAULT_TOP_GENRES: usize = 20;

/// Maximum number of sample titles in a pair report.
pub const PAIR_SAMPLE_SIZE: usize = 12;

// ============================================================================
// Association Measures
// ============================================================================

/// Jaccard, Lift and PMI for a pair of genres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AssociationMeasures {
    pub jaccard: f64,
    pub lift: f64,
    pub pmi: f64,
}

impl AssociationMeasures {
    /// `c_ab`: films carrying both, `c_a`/`c_b`: marginal counts, `n`: total films.
    pub fn from_counts(c_ab: usize, c_a: usize, c_b: usize, n: usize) -> Self {
        let union = (c_a + c_b).saturating_sub(c_ab);
        let jaccard = if union > 0 {
            c_ab as f64 / union as f64
        } else {
            0.0
        };
        let lift = if c_a > 0 && c_b > 0 && n > 0 {
            (c_ab as f64 * n as f64) / (c_a as f64 * c_b as f64)
        } else {
            0.0
        };
        let pmi = if lift > 0.0 { lift.log2() } else { 0.0 };
        Self { jaccard, lift, pmi }
    }
}

// ============================================================================
// Payload
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreLabel {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CooccurrenceCell {
    pub i: usize,
    pub j: usize,
    pub count: usize,
    pub a_count: usize,
    pub b_count: usize,
    pub jaccard: f64,
    pub lift: f64,
    pub pmi: f64,
}

/// Labels in selection order, the flattened N x N cells (row-major, diagonal
/// included), per-genre marginal counts, and the total number of films.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CooccurrencePayload {
    pub labels: Vec<GenreLabel>,
    pub cells: Vec<CooccurrenceCell>,
    pub counts: Vec<usize>,
    pub total_films: usize,
    pub non_zero_cells: usize,
}

impl CooccurrencePayload {
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn cell(&self, i: usize, j: usize) -> Option<&CooccurrenceCell> {
        let n = self.size();
        (i < n && j < n).then(|| &self.cells[i * n + j])
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.code == code)
    }

    /// Cell for a pair of codes, when both are in the universe.
    pub fn cell_for(&self, a: &str, b: &str) -> Option<&CooccurrenceCell> {
        self.cell(self.index_of(a)?, self.index_of(b)?)
    }
}

// ============================================================================
// Computation
// ============================================================================

/// Upper-case and deduplicate genre codes to exclude.
pub fn normalize_exclusions<I, S>(codes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| c.as_ref().trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// The `top_n` most frequent non-excluded genres with their frequencies,
/// most frequent first; equal frequencies sort by code.
pub fn select_top_genres<R: Borrow<CanonicalRecord>>(
    records: &[R],
    top_n: usize,
    excluded: &BTreeSet<String>,
) -> Vec<(String, usize)> {
    let mut freq: FxHashMap<&str, usize> = FxHashMap::default();
    for record in iter_records(records).filter(|r| r.is_film()) {
        for code in record.genres.iter().filter(|c| !excluded.contains(*c)) {
            *freq.entry(code.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = freq
        .into_iter()
        .map(|(code, n)| (code.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

/// Build the co-occurrence payload for the top-N genre universe.
/// No surviving genre yields an empty payload.
pub fn genre_cooccurrence<R: Borrow<CanonicalRecord>>(
    records: &[R],
    categories: &CategoryDictionary,
    top_n: usize,
    excluded: &BTreeSet<String>,
) -> CooccurrencePayload {
    let top = select_top_genres(records, top_n, excluded);
    let index: FxHashMap<&str, usize> = top
        .iter()
        .enumerate()
        .map(|(i, (code, _))| (code.as_str(), i))
        .collect();
    let size = top.len();

    let mut matrix = vec![vec![0usize; size]; size];
    let mut counts = vec![0usize; size];
    let mut total_films = 0;

    for record in iter_records(records).filter(|r| r.is_film()) {
        total_films += 1;

        let mut selected: Vec<usize> = record
            .genres
            .iter()
            .filter_map(|c| index.get(c.as_str()).copied())
            .collect();
        selected.sort_unstable();
        selected.dedup();

        for &k in &selected {
            counts[k] += 1;
        }
        for (pos, &a) in selected.iter().enumerate() {
            for &b in &selected[pos..] {
                matrix[a][b] += 1;
                if a != b {
                    matrix[b][a] += 1;
                }
            }
        }
    }

    let labels: Vec<GenreLabel> = top
        .iter()
        .map(|(code, _)| GenreLabel {
            code: code.clone(),
            label: categories.label_of(code).to_string(),
        })
        .collect();

    let mut cells = Vec::with_capacity(size * size);
    for (i, row) in matrix.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let m = AssociationMeasures::from_counts(count, counts[i], counts[j], total_films);
            cells.push(CooccurrenceCell {
                i,
                j,
                count,
                a_count: counts[i],
                b_count: counts[j],
                jaccard: m.jaccard,
                lift: m.lift,
                pmi: m.pmi,
            });
        }
    }
    let non_zero_cells = cells.iter().filter(|c| c.count > 0).count();

    debug!(
        size,
        total_films,
        non_zero_cells,
        excluded = ?excluded,
        "genre co-occurrence computed"
    );

    CooccurrencePayload {
        labels,
        cells,
        counts,
        total_films,
        non_zero_cells,
    }
}

// ============================================================================
// Pair Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairSample {
    pub title_fr: String,
    pub title_en: String,
    pub year: Option<i32>,
}

/// Intersection statistics for two genres over every film of a collection,
/// independent of the top-N universe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub code_a: String,
    pub label_a: String,
    pub code_b: String,
    pub label_b: String,
    pub total_films: usize,
    pub a_count: usize,
    pub b_count: usize,
    pub both: usize,
    pub union: usize,
    #[serde(flatten)]
    pub measures: AssociationMeasures,
    pub sample: Vec<PairSample>,
}

pub fn pair_report<R: Borrow<CanonicalRecord>>(
    records: &[R],
    categories: &CategoryDictionary,
    code_a: &str,
    code_b: &str,
) -> PairReport {
    let code_a = code_a.trim().to_uppercase();
    let code_b = code_b.trim().to_uppercase();
    let (mut total_films, mut a_count, mut b_count, mut both) = (0, 0, 0, 0);
    let mut sample = Vec::new();

    for record in iter_records(records).filter(|r| r.is_film()) {
        total_films += 1;
        let in_a = record.has_genre(&code_a);
        let in_b = record.has_genre(&code_b);
        a_count += usize::from(in_a);
        b_count += usize::from(in_b);
        if in_a && in_b {
            both += 1;
            if sample.len() < PAIR_SAMPLE_SIZE {
                sample.push(PairSample {
                    title_fr: record.title_fr.clone(),
                    title_en: record.title_en.clone(),
                    year: record.year,
                });
            }
        }
    }

    PairReport {
        label_a: categories.label_of(&code_a).to_string(),
        label_b: categories.label_of(&code_b).to_string(),
        code_a,
        code_b,
        total_films,
        a_count,
        b_count,
        both,
        union: (a_count + b_count).saturating_sub(both),
        measures: AssociationMeasures::from_counts(both, a_count, b_count, total_films),
        sample,
    }
}
