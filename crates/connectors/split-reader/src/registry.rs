//! Ordered split storage plus the paused and removed-but-unflushed sets.
//!
//! Iteration order is insertion order so repeated runs over the same inputs
//! produce identical batches. Each split gets a sequence number when it is
//! first added; splits are stored by sequence and found through an id index,
//! so lookups and removals do not scan. The fetch loop walks a snapshot of
//! the ids and removes exhausted splits by key, so nothing is mutated under a
//! live iterator.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::change::SplitsChange;
use crate::error::{Result, SplitReaderError};
use crate::split::SourceSplit;

#[derive(Debug)]
pub struct SplitRegistry<S> {
    splits: BTreeMap<u64, S>,
    index: HashMap<String, u64>,
    next_seq: u64,
    paused: HashSet<String>,
    removed_unflushed: BTreeSet<String>,
}

impl<S: SourceSplit> Default for SplitRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SourceSplit> SplitRegistry<S> {
    pub fn new() -> Self {
        Self {
            splits: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            paused: HashSet::new(),
            removed_unflushed: BTreeSet::new(),
        }
    }

    /// Applies an addition or removal. Returns the splits that left the
    /// registry because of a removal, in the order they were removed.
    ///
    /// A removed id also leaves the paused set, so a split re-added under the
    /// same id starts unpaused.
    pub fn apply_change(&mut self, change: SplitsChange<S>) -> Result<Vec<S>> {
        match change {
            SplitsChange::Addition(splits) => {
                for split in splits {
                    self.insert(split);
                }
                Ok(Vec::new())
            }
            SplitsChange::Removal(split_ids) => {
                let mut removed = Vec::with_capacity(split_ids.len());
                for split_id in split_ids {
                    if let Some(split) = self.remove(&split_id) {
                        removed.push(split);
                    } else {
                        debug!(split_id = %split_id, "removal of unknown split");
                    }
                    self.paused.remove(&split_id);
                    self.removed_unflushed.insert(split_id);
                }
                Ok(removed)
            }
            SplitsChange::Unrecognized { kind } => {
                Err(SplitReaderError::UnrecognizedChangeKind(kind))
            }
        }
    }

    /// Registers a split. An existing split with the same id is replaced at
    /// its current position and returned.
    pub fn insert(&mut self, split: S) -> Option<S> {
        if let Some(seq) = self.index.get(split.split_id()) {
            return self.splits.insert(*seq, split);
        }
        debug!(split_id = %split.split_id(), "split added");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(split.split_id().to_string(), seq);
        self.splits.insert(seq, split);
        None
    }

    /// Drops a split without recording a finished marker for it.
    pub fn remove(&mut self, split_id: &str) -> Option<S> {
        let seq = self.index.remove(split_id)?;
        self.splits.remove(&seq)
    }

    /// Moves `to_pause` into the paused set and `to_resume` out of it.
    ///
    /// Pausing an already paused id, or resuming one that is not paused
    /// (after `to_pause` has been applied), is rejected before anything is
    /// changed.
    pub fn pause_or_resume(&mut self, to_pause: &[&str], to_resume: &[&str]) -> Result<()> {
        if let Some(split_id) = to_pause.iter().find(|id| self.paused.contains(**id)) {
            return Err(SplitReaderError::ContractViolation(format!(
                "split {} is already paused",
                split_id
            )));
        }
        if let Some(split_id) = to_resume
            .iter()
            .find(|id| !self.paused.contains(**id) && !to_pause.contains(*id))
        {
            return Err(SplitReaderError::ContractViolation(format!(
                "split {} is not paused",
                split_id
            )));
        }

        self.paused.extend(to_pause.iter().map(|id| id.to_string()));
        for split_id in to_resume {
            self.paused.remove(*split_id);
        }
        debug!(paused = ?to_pause, resumed = ?to_resume, "paused splits updated");
        Ok(())
    }

    pub fn is_paused(&self, split_id: &str) -> bool {
        self.paused.contains(split_id)
    }

    /// Current ids in iteration order.
    pub fn split_ids(&self) -> Vec<String> {
        self.splits
            .values()
            .map(|split| split.split_id().to_string())
            .collect()
    }

    pub fn get_mut(&mut self, split_id: &str) -> Option<&mut S> {
        let seq = self.index.get(split_id)?;
        self.splits.get_mut(seq)
    }

    pub fn contains(&self, split_id: &str) -> bool {
        self.index.contains_key(split_id)
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Hands out every removed id whose finished marker is still owed.
    pub fn take_removed(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.removed_unflushed)
    }

    pub fn has_unflushed_removals(&self) -> bool {
        !self.removed_unflushed.is_empty()
    }
}
