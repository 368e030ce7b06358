//! Record filter predicate.

use serde::Serialize;

use crate::models::CanonicalRecord;

/// Active filter. Unset predicates are vacuously true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Case-insensitive substring of "<french title> <english title>"
    pub text: Option<String>,
    pub require_french: bool,
    pub require_english: bool,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_years(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.year_min = min;
        self.year_max = max;
        self
    }

    /// Set the free-text predicate. Blank text clears it.
    pub fn with_text(mut self, text: &str) -> Self {
        let text = text.trim();
        self.text = (!text.is_empty()).then(|| text.to_uppercase());
        self
    }

    pub fn with_languages(mut self, require_french: bool, require_english: bool) -> Self {
        self.require_french = require_french;
        self.require_english = require_english;
        self
    }

    pub fn is_active(&self) -> bool {
        self.year_min.is_some()
            || self.year_max.is_some()
            || self.text.is_some()
            || self.require_french
            || self.require_english
    }

    /// Records without a year are never excluded by the year bounds.
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        if let (Some(min), Some(year)) = (self.year_min, record.year) {
            if year < min {
                return false;
            }
        }
        if let (Some(max), Some(year)) = (self.year_max, record.year) {
            if year > max {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let candidate = format!("{} {}", record.title_fr, record.title_en).to_uppercase();
            if !candidate.contains(&text.to_uppercase()) {
                return false;
            }
        }
        if self.require_french && !record.has_french_audio() {
            return false;
        }
        if self.require_english && !record.has_english_audio() {
            return false;
        }
        true
    }

    /// Positions of matching records, in encounter order.
    pub fn select(&self, records: &[CanonicalRecord]) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.matches(r))
            .map(|(i, _)| i)
            .collect()
    }

    /// Matching records, in encounter order.
    pub fn apply<'a>(&self, records: &'a [CanonicalRecord]) -> Vec<&'a CanonicalRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}
