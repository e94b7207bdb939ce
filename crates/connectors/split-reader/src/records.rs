//! The batch returned by one fetch.

use std::collections::{BTreeSet, VecDeque};

/// Records produced by one fetch, tagged with the split they came from, plus
/// the ids of splits that will not produce anything else.
#[derive(Debug, Clone)]
pub struct RecordsBySplits<R> {
    records: VecDeque<(String, R)>,
    finished_splits: BTreeSet<String>,
    current_split: Option<String>,
}

impl<R> RecordsBySplits<R> {
    pub fn builder() -> RecordsBySplitsBuilder<R> {
        RecordsBySplitsBuilder::default()
    }

    /// An empty batch.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Remaining `(split_id, record)` pairs in the order they were read.
    pub fn records(&self) -> impl Iterator<Item = (&str, &R)> {
        self.records.iter().map(|(split_id, record)| (split_id.as_str(), record))
    }

    pub fn records_for<'a>(&'a self, split_id: &'a str) -> impl Iterator<Item = &'a R> + 'a {
        self.records.iter().filter(move |(id, _)| id == split_id).map(|(_, record)| record)
    }

    /// Ids of splits that have records, in first-appearance order.
    pub fn split_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for (split_id, _) in &self.records {
            if !ids.contains(&split_id.as_str()) {
                ids.push(split_id);
            }
        }
        ids
    }

    pub fn finished_splits(&self) -> &BTreeSet<String> {
        &self.finished_splits
    }

    pub fn is_finished(&self, split_id: &str) -> bool {
        self.finished_splits.contains(split_id)
    }

    /// Number of remaining records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No records and no finished markers.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.finished_splits.is_empty()
    }

    pub fn into_records(self) -> Vec<(String, R)> {
        self.records.into_iter().collect()
    }

    /// Moves to the next split that still has records and returns its id.
    /// Unconsumed records of the previous split are skipped.
    pub fn next_split(&mut self) -> Option<String> {
        if let Some(current) = self.current_split.take() {
            while self.records.front().is_some_and(|(split_id, _)| *split_id == current) {
                self.records.pop_front();
            }
        }
        let next = self.records.front().map(|(split_id, _)| split_id.clone());
        self.current_split = next.clone();
        next
    }

    /// Takes the next record of the split selected by [`Self::next_split`].
    pub fn next_record_from_split(&mut self) -> Option<R> {
        let current = self.current_split.as_ref()?;
        if self.records.front().is_some_and(|(split_id, _)| split_id == current) {
            self.records.pop_front().map(|(_, record)| record)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct RecordsBySplitsBuilder<R> {
    records: Vec<(String, R)>,
    finished_splits: BTreeSet<String>,
}

impl<R> Default for RecordsBySplitsBuilder<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            finished_splits: BTreeSet::new(),
        }
    }
}

impl<R> RecordsBySplitsBuilder<R> {
    pub fn add(&mut self, split_id: &str, record: R) {
        self.records.push((split_id.to_string(), record));
    }

    pub fn add_all(&mut self, split_id: &str, records: impl IntoIterator<Item = R>) {
        for record in records {
            self.add(split_id, record);
        }
    }

    pub fn add_finished_split(&mut self, split_id: impl Into<String>) {
        self.finished_splits.insert(split_id.into());
    }

    pub fn add_finished_splits(&mut self, split_ids: impl IntoIterator<Item = String>) {
        self.finished_splits.extend(split_ids);
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn build(self) -> RecordsBySplits<R> {
        RecordsBySplits {
            records: self.records.into(),
            finished_splits: self.finished_splits,
            current_split: None,
        }
    }
}
