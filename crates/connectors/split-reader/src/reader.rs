//! The fetch loop.

use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::change::SplitsChange;
use crate::config::SplitReaderConfig;
use crate::error::{Result, SplitReaderError};
use crate::records::{RecordsBySplits, RecordsBySplitsBuilder};
use crate::registry::SplitRegistry;
use crate::split::{Interrupted, ReadInterrupt, SourceSplit};
use crate::wakeup::{SplitReaderWaker, WakeupGate};

/// Pulls bounded batches of records out of a dynamic set of splits.
///
/// One thread drives `fetch`, `handle_splits_changes` and
/// `pause_or_resume_splits`. Any other thread may abort a fetch through
/// [`SplitReader::waker`]; that is the only state shared across threads.
#[derive(Debug)]
pub struct SplitReader<S: SourceSplit> {
    config: SplitReaderConfig,
    registry: SplitRegistry<S>,
    gate: Arc<WakeupGate>,
}

impl<S: SourceSplit> SplitReader<S> {
    pub fn new(config: SplitReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: SplitRegistry::new(),
            gate: Arc::new(WakeupGate::new()),
        })
    }

    pub fn config(&self) -> &SplitReaderConfig {
        &self.config
    }

    /// Reads up to `records_per_split_per_fetch` records from every live,
    /// unpaused split.
    ///
    /// A wakeup never turns into an error: the records read before it are
    /// returned as a normal batch. Ids removed since the last batch are
    /// always attached as finished markers.
    pub fn fetch(&mut self) -> Result<RecordsBySplits<S::Record>> {
        let mut builder = RecordsBySplits::builder();
        let gate = Arc::clone(&self.gate);

        match gate.begin_read() {
            None => trace!("fetch woken up before reading"),
            Some(_guard) => {
                if let Err(split_id) = self.read_splits(&mut builder, gate.interrupt()) {
                    if !self.config.blocking_fetch {
                        error!(split_id = %split_id, "non-blocking read was interrupted");
                        return Err(SplitReaderError::UnexpectedInterruption { split_id });
                    }
                    debug!(
                        split_id = %split_id,
                        records = builder.num_records(),
                        "fetch woken up while reading"
                    );
                }
            }
        }

        self.flush_removed_splits(&mut builder);
        Ok(builder.build())
    }

    /// Adds or removes splits. Returns the splits handed back by a removal.
    pub fn handle_splits_changes(&mut self, change: SplitsChange<S>) -> Result<Vec<S>> {
        debug!(kind = change.kind(), splits = change.len(), "handling splits change");
        self.registry.apply_change(change)
    }

    pub fn pause_or_resume_splits(&mut self, to_pause: &[&str], to_resume: &[&str]) -> Result<()> {
        self.registry.pause_or_resume(to_pause, to_resume)
    }

    /// Aborts the fetch in progress, or the next one if none is running.
    pub fn wake_up(&self) {
        self.gate.wake_up();
    }

    pub fn waker(&self) -> SplitReaderWaker {
        SplitReaderWaker::new(Arc::clone(&self.gate))
    }

    pub fn num_splits(&self) -> usize {
        self.registry.len()
    }

    pub fn contains_split(&self, split_id: &str) -> bool {
        self.registry.contains(split_id)
    }

    pub fn is_paused(&self, split_id: &str) -> bool {
        self.registry.is_paused(split_id)
    }

    /// Releases the reader. Nothing is held beyond memory today.
    pub fn close(self) -> Result<()> {
        debug!(splits = self.registry.len(), "closing split reader");
        Ok(())
    }

    /// Returns the id of the split whose read was interrupted, if any.
    fn read_splits(
        &mut self,
        builder: &mut RecordsBySplitsBuilder<S::Record>,
        interrupt: &ReadInterrupt,
    ) -> std::result::Result<(), String> {
        let SplitReaderConfig {
            records_per_split_per_fetch,
            separated_finished_record,
            blocking_fetch,
        } = self.config;

        for split_id in self.registry.split_ids() {
            if self.registry.is_paused(&split_id) {
                continue;
            }
            let Some(split) = self.registry.get_mut(&split_id) else {
                continue;
            };

            let mut has_records = false;
            let mut reads = 0;
            while reads < records_per_split_per_fetch && !split.is_finished() {
                reads += 1;
                match split.next_record(blocking_fetch, interrupt) {
                    Ok(Some(record)) => {
                        builder.add(&split_id, record);
                        has_records = true;
                    }
                    Ok(None) => {}
                    Err(Interrupted) => return Err(split_id),
                }
            }

            if !split.is_finished() {
                continue;
            }
            if !separated_finished_record {
                self.finish_split(builder, &split_id);
            } else {
                // The marker must not share a batch with the split's last records.
                if !has_records {
                    self.finish_split(builder, &split_id);
                } else {
                    trace!(split_id = %split_id, "deferring finished marker");
                }
                break;
            }
        }
        Ok(())
    }

    fn finish_split(&mut self, builder: &mut RecordsBySplitsBuilder<S::Record>, split_id: &str) {
        debug!(split_id = %split_id, "split finished");
        builder.add_finished_split(split_id);
        self.registry.remove(split_id);
    }

    fn flush_removed_splits(&mut self, builder: &mut RecordsBySplitsBuilder<S::Record>) {
        if self.registry.has_unflushed_removals() {
            builder.add_finished_splits(self.registry.take_removed());
        }
    }
}

/// Fluent construction of a [`SplitReader`].
#[derive(Debug, Clone, Default)]
pub struct SplitReaderBuilder {
    config: SplitReaderConfig,
}

impl SplitReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SplitReaderConfig) -> Self {
        Self { config }
    }

    pub fn records_per_split_per_fetch(mut self, records: usize) -> Self {
        self.config.records_per_split_per_fetch = records;
        self
    }

    pub fn separated_finished_record(mut self, separated: bool) -> Self {
        self.config.separated_finished_record = separated;
        self
    }

    pub fn blocking_fetch(mut self, blocking: bool) -> Self {
        self.config.blocking_fetch = blocking;
        self
    }

    pub fn build<S: SourceSplit>(self) -> Result<SplitReader<S>> {
        SplitReader::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySplit;

    fn reader(records_per_fetch: usize, separated: bool) -> SplitReader<MemorySplit<i32>> {
        SplitReaderBuilder::new()
            .records_per_split_per_fetch(records_per_fetch)
            .separated_finished_record(separated)
            .build()
            .unwrap()
    }

    fn add(reader: &mut SplitReader<MemorySplit<i32>>, splits: Vec<MemorySplit<i32>>) {
        reader
            .handle_splits_changes(SplitsChange::Addition(splits))
            .unwrap();
    }

    fn values(batch: &RecordsBySplits<i32>, split_id: &str) -> Vec<i32> {
        batch.records_for(split_id).copied().collect()
    }

    #[test]
    fn test_combined_policy_marks_finished_with_last_records() {
        let mut reader = reader(2, false);
        add(
            &mut reader,
            vec![
                MemorySplit::bounded("a", vec![1, 2, 3]),
                MemorySplit::bounded("b", vec![10]),
            ],
        );

        let first = reader.fetch().unwrap();
        assert_eq!(values(&first, "a"), vec![1, 2]);
        assert_eq!(values(&first, "b"), vec![10]);
        assert!(first.is_finished("b"));
        assert!(!first.is_finished("a"));

        let second = reader.fetch().unwrap();
        assert_eq!(values(&second, "a"), vec![3]);
        assert!(second.is_finished("a"));
        assert_eq!(reader.num_splits(), 0);

        assert!(reader.fetch().unwrap().is_empty());
    }

    #[test]
    fn test_separated_policy_defers_finished_marker() {
        let mut reader = reader(2, true);
        add(
            &mut reader,
            vec![
                MemorySplit::bounded("a", vec![1, 2]),
                MemorySplit::bounded("b", vec![10]),
            ],
        );

        let first = reader.fetch().unwrap();
        assert_eq!(values(&first, "a"), vec![1, 2]);
        assert!(first.finished_splits().is_empty());
        assert_eq!(
            values(&first, "b"),
            Vec::<i32>::new(),
            "iteration stops after exhausted split"
        );

        let second = reader.fetch().unwrap();
        assert_eq!(second.len(), 0);
        assert!(second.is_finished("a"));
        assert!(!reader.contains_split("a"));

        let third = reader.fetch().unwrap();
        assert_eq!(values(&third, "b"), vec![10]);
        assert!(third.finished_splits().is_empty());

        let fourth = reader.fetch().unwrap();
        assert!(fourth.is_finished("b"));
        assert_eq!(reader.num_splits(), 0);
    }

    #[test]
    fn test_paused_split_is_skipped_until_resumed() {
        let mut reader = reader(2, false);
        add(
            &mut reader,
            vec![
                MemorySplit::bounded("a", vec![1]),
                MemorySplit::bounded("b", vec![2]),
            ],
        );
        reader.pause_or_resume_splits(&["a"], &[]).unwrap();
        assert!(reader.is_paused("a"));

        let batch = reader.fetch().unwrap();
        assert_eq!(values(&batch, "a"), Vec::<i32>::new());
        assert_eq!(values(&batch, "b"), vec![2]);
        assert!(reader.fetch().unwrap().is_empty());

        reader.pause_or_resume_splits(&[], &["a"]).unwrap();
        let batch = reader.fetch().unwrap();
        assert_eq!(values(&batch, "a"), vec![1]);
        assert!(batch.is_finished("a"));
    }

    #[test]
    fn test_removed_split_reported_once() {
        let mut reader = reader(1, false);
        let (split, _feeder) = MemorySplit::new("live", None);
        add(&mut reader, vec![split]);

        let removed = reader
            .handle_splits_changes(SplitsChange::Removal(vec!["live".into()]))
            .unwrap();
        assert_eq!(removed.len(), 1);

        let batch = reader.fetch().unwrap();
        assert!(batch.is_finished("live"));
        assert!(!reader.fetch().unwrap().is_finished("live"));
    }

    #[test]
    fn test_re_added_split_is_not_paused() {
        let mut reader = reader(2, false);
        let (split, _feeder) = MemorySplit::new("a", None);
        add(&mut reader, vec![split]);
        reader.pause_or_resume_splits(&["a"], &[]).unwrap();
        reader
            .handle_splits_changes(SplitsChange::Removal(vec!["a".into()]))
            .unwrap();
        assert!(reader.fetch().unwrap().is_finished("a"));

        add(&mut reader, vec![MemorySplit::bounded("a", vec![7, 8])]);
        assert!(!reader.is_paused("a"));
        let batch = reader.fetch().unwrap();
        assert_eq!(values(&batch, "a"), vec![7, 8]);
        assert!(batch.is_finished("a"));
    }

    #[test]
    fn test_pending_wakeup_still_flushes_removals() {
        let mut reader = reader(2, false);
        add(
            &mut reader,
            vec![
                MemorySplit::bounded("a", vec![1]),
                MemorySplit::bounded("b", vec![2]),
            ],
        );
        reader
            .handle_splits_changes(SplitsChange::Removal(vec!["b".into()]))
            .unwrap();

        reader.wake_up();
        let batch = reader.fetch().unwrap();
        assert_eq!(batch.len(), 0);
        assert!(batch.is_finished("b"));

        let batch = reader.fetch().unwrap();
        assert_eq!(values(&batch, "a"), vec![1]);
    }

    #[test]
    fn test_unrecognized_change_fails() {
        let mut reader = reader(2, false);
        let result = reader.handle_splits_changes(SplitsChange::Unrecognized {
            kind: "reassign".into(),
        });
        assert_eq!(
            result.err(),
            Some(SplitReaderError::UnrecognizedChangeKind("reassign".into()))
        );
    }

    #[test]
    fn test_builder_rejects_zero_records_per_fetch() {
        let result = SplitReaderBuilder::new()
            .records_per_split_per_fetch(0)
            .build::<MemorySplit<i32>>();
        assert!(matches!(result, Err(SplitReaderError::InvalidConfig(_))));
    }

    #[test]
    fn test_close() {
        let mut reader = reader(2, false);
        add(&mut reader, vec![MemorySplit::bounded("a", vec![1])]);
        assert!(reader.close().is_ok());
    }
}
