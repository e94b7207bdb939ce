//! The split abstraction and the token used to interrupt a blocked read.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Returned by a read that was cut short by [`ReadInterrupt::interrupt`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("read interrupted")]
pub struct Interrupted;

/// A unit of input owned by a split reader.
///
/// Implementations decide how a record is produced. The reader only asks for
/// one record at a time and checks `is_finished` between reads.
pub trait SourceSplit: Send {
    type Record;

    fn split_id(&self) -> &str;

    /// No further records will ever be produced.
    fn is_finished(&self) -> bool;

    /// Produces the next record, or `None` if nothing is available right now.
    ///
    /// With `blocking` set, an implementation may park the calling thread
    /// until a record arrives. Any such wait must also select on
    /// [`ReadInterrupt::signal`] and give up with [`Interrupted`] once the
    /// token fires.
    fn next_record(
        &mut self,
        blocking: bool,
        interrupt: &ReadInterrupt,
    ) -> Result<Option<Self::Record>, Interrupted>;
}

struct InterruptInner {
    flag: AtomicBool,
    tx: Sender<()>,
    rx: Receiver<()>,
}

/// Cancellation token handed to every [`SourceSplit::next_record`] call.
///
/// The flag is the source of truth; the channel only exists to wake up a
/// thread parked in `select!`. Only the reader's wakeup gate raises or clears
/// the token, always under its lock.
#[derive(Clone)]
pub struct ReadInterrupt {
    inner: Arc<InterruptInner>,
}

impl Default for ReadInterrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadInterrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadInterrupt")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

impl ReadInterrupt {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            inner: Arc::new(InterruptInner {
                flag: AtomicBool::new(false),
                tx,
                rx,
            }),
        }
    }

    pub fn interrupt(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        // A full channel already holds a pending wakeup.
        let _ = self.inner.tx.try_send(());
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Cooperative check for splits that poll instead of parking.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Receives a message whenever the token is raised.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.rx
    }

    /// Drops any residual interrupt so it cannot leak into a later read.
    /// Returns whether the token was raised.
    pub(crate) fn clear(&self) -> bool {
        let was_interrupted = self.inner.flag.swap(false, Ordering::SeqCst);
        while self.inner.rx.try_recv().is_ok() {}
        was_interrupted
    }
}
