//! Collapses episode rows into named series.
//!
//! A row is a series header when its cover image is filled. Every other row
//! is an episode, attached to the header sharing its base title (see
//! [`base_series_title`](crate::normalize::base_series_title)).

use serde::Serialize;

use crate::models::{CanonicalRecord, PositionIndex};
use crate::normalize::record_base_title;

/// One series: its header (if any) and its episodes in encounter order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesGroup {
    pub base_title: String,
    pub header: Option<CanonicalRecord>,
    pub episodes: Vec<CanonicalRecord>,
}

impl SeriesGroup {
    fn new(base_title: String) -> Self {
        Self {
            base_title,
            header: None,
            episodes: Vec::new(),
        }
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }
}

/// Series groups keyed by base title, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SeriesIndex {
    groups: Vec<SeriesGroup>,
    index: PositionIndex,
}

impl SeriesIndex {
    fn group_mut(&mut self, base_title: String) -> &mut SeriesGroup {
        let pos = match self.index.get(&base_title) {
            Some(&pos) => pos,
            None => {
                let pos = self.groups.len();
                self.index.insert(base_title.clone(), pos);
                self.groups.push(SeriesGroup::new(base_title));
                pos
            }
        };
        &mut self.groups[pos]
    }

    pub fn get(&self, base_title: &str) -> Option<&SeriesGroup> {
        self.index.get(base_title).map(|&pos| &self.groups[pos])
    }

    pub fn groups(&self) -> &[SeriesGroup] {
        &self.groups
    }

    /// Groups that have a header row, in first-seen order.
    pub fn headers(&self) -> impl Iterator<Item = &SeriesGroup> {
        self.groups.iter().filter(|g| g.has_header())
    }

    pub fn header_count(&self) -> usize {
        self.headers().count()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Partition episode rows into headers and episode lists.
///
/// Headers are collected in a first pass so that the result does not depend
/// on whether a header appears before or after its episodes, or in which
/// episode table. A duplicated header replaces the earlier one.
pub fn build_series<'a, I>(rows: I) -> SeriesIndex
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
    I::IntoIter: Clone,
{
    let rows = rows.into_iter();
    let mut series = SeriesIndex::default();

    for row in rows.clone().filter(|r| r.is_series_header()) {
        series.group_mut(record_base_title(row)).header = Some(row.clone());
    }
    for row in rows.filter(|r| !r.is_series_header()) {
        series.group_mut(record_base_title(row)).episodes.push(row.clone());
    }

    series
}
