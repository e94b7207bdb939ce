//! An in-memory split fed from any thread.
//!
//! Used by tests and by the `igloo` driver. Records are queued through a
//! [`RecordFeeder`]; the split is finished once it has handed out `end`
//! records, or once every feeder is gone and the queue is empty.

use crossbeam_channel::{select, unbounded, Receiver, Sender, TryRecvError};

use crate::split::{Interrupted, ReadInterrupt, SourceSplit};

#[derive(Debug)]
pub struct MemorySplit<R> {
    split_id: String,
    records: Receiver<R>,
    position: u64,
    end: Option<u64>,
    disconnected: bool,
}

/// Appends records to a [`MemorySplit`].
#[derive(Debug)]
pub struct RecordFeeder<R> {
    tx: Sender<R>,
}

impl<R> Clone for RecordFeeder<R> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<R> RecordFeeder<R> {
    /// Returns `false` if the split has already been dropped.
    pub fn add_record(&self, record: R) -> bool {
        self.tx.send(record).is_ok()
    }
}

impl<R> MemorySplit<R> {
    /// Creates an empty split. With `end` set, the split finishes after that
    /// many records have been read; otherwise it runs until all feeders drop.
    pub fn new(split_id: impl Into<String>, end: Option<u64>) -> (Self, RecordFeeder<R>) {
        let (tx, rx) = unbounded();
        let split = Self {
            split_id: split_id.into(),
            records: rx,
            position: 0,
            end,
            disconnected: false,
        };
        (split, RecordFeeder { tx })
    }

    /// A split holding exactly `records`.
    pub fn bounded(split_id: impl Into<String>, records: impl IntoIterator<Item = R>) -> Self {
        let records: Vec<R> = records.into_iter().collect();
        let (split, feeder) = Self::new(split_id, Some(records.len() as u64));
        for record in records {
            feeder.add_record(record);
        }
        split
    }

    /// Number of records handed out so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn accept(&mut self, received: Option<R>) -> Option<R> {
        match received {
            Some(record) => {
                self.position += 1;
                Some(record)
            }
            None => {
                self.disconnected = true;
                None
            }
        }
    }
}

impl<R: Send> SourceSplit for MemorySplit<R> {
    type Record = R;

    fn split_id(&self) -> &str {
        &self.split_id
    }

    fn is_finished(&self) -> bool {
        match self.end {
            Some(end) if self.position >= end => true,
            _ => self.disconnected,
        }
    }

    fn next_record(
        &mut self,
        blocking: bool,
        interrupt: &ReadInterrupt,
    ) -> Result<Option<R>, Interrupted> {
        if self.is_finished() {
            return Ok(None);
        }

        if !blocking {
            return Ok(match self.records.try_recv() {
                Ok(record) => self.accept(Some(record)),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => self.accept(None),
            });
        }

        // A pending interrupt wins over a queued record.
        interrupt.check()?;
        let received = select! {
            recv(self.records) -> msg => msg.ok(),
            recv(interrupt.signal()) -> _ => return Err(Interrupted),
        };
        Ok(self.accept(received))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_bounded_split_finishes_after_last_record() {
        let interrupt = ReadInterrupt::new();
        let mut split = MemorySplit::bounded("s", vec![1, 2]);
        assert!(!split.is_finished());
        assert_eq!(split.next_record(false, &interrupt), Ok(Some(1)));
        assert_eq!(split.next_record(false, &interrupt), Ok(Some(2)));
        assert!(split.is_finished());
        assert_eq!(split.position(), 2);
        assert_eq!(split.next_record(false, &interrupt), Ok(None));
    }

    #[test]
    fn test_empty_bounded_split_is_finished() {
        let split = MemorySplit::<i32>::bounded("empty", Vec::new());
        assert!(split.is_finished());
    }

    #[test]
    fn test_non_blocking_read_returns_none_when_empty() {
        let interrupt = ReadInterrupt::new();
        let (mut split, feeder) = MemorySplit::new("s", None);
        assert_eq!(split.next_record(false, &interrupt), Ok(None));
        assert!(!split.is_finished());

        assert!(feeder.add_record(7));
        assert_eq!(split.next_record(false, &interrupt), Ok(Some(7)));
    }

    #[test]
    fn test_unbounded_split_finishes_when_feeders_drop() {
        let interrupt = ReadInterrupt::new();
        let (mut split, feeder) = MemorySplit::new("s", None);
        feeder.add_record(1);
        drop(feeder);

        assert_eq!(split.next_record(false, &interrupt), Ok(Some(1)));
        assert!(!split.is_finished());
        assert_eq!(split.next_record(false, &interrupt), Ok(None));
        assert!(split.is_finished());
    }

    #[test]
    fn test_blocking_read_waits_for_record() {
        let interrupt = ReadInterrupt::new();
        let (mut split, feeder) = MemorySplit::new("s", None);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            feeder.add_record(42);
        });
        assert_eq!(split.next_record(true, &interrupt), Ok(Some(42)));
        producer.join().unwrap();
    }

    #[test]
    fn test_blocking_read_is_interrupted() {
        let interrupt = ReadInterrupt::new();
        let (mut split, _feeder) = MemorySplit::<i32>::new("s", None);
        let remote = interrupt.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.interrupt();
        });
        assert_eq!(split.next_record(true, &interrupt), Err(Interrupted));
        waker.join().unwrap();
        assert_eq!(split.position(), 0);
    }

    #[test]
    fn test_pending_interrupt_wins_over_queued_record() {
        let interrupt = ReadInterrupt::new();
        let (mut split, feeder) = MemorySplit::new("s", None);
        feeder.add_record(1);
        interrupt.interrupt();
        assert_eq!(split.next_record(true, &interrupt), Err(Interrupted));

        interrupt.clear();
        assert_eq!(split.next_record(true, &interrupt), Ok(Some(1)));
    }

    #[test]
    fn test_feeder_reports_dropped_split() {
        let (split, feeder) = MemorySplit::new("s", None);
        drop(split);
        assert!(!feeder.add_record(1));
    }
}
