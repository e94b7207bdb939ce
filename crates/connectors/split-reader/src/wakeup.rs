//! Race-free wakeup between the fetching thread and one outside caller.
//!
//! ```text
//!   wake_up()                      fetch()
//!   ─────────                      ───────
//!   lock                           lock
//!   woken = true                   woken?  ── yes ─▶ woken = false, skip reads
//!   reading? ─▶ interrupt.raise    reading = true
//!   unlock                         unlock
//!                                  ... reads, may park on interrupt ...
//!                                  lock
//!                                  woken = false, interrupt.clear
//!                                  reading = false
//!                                  unlock
//! ```
//!
//! Deciding to read and marking the reader as reading happen under the same
//! lock, so a wakeup either lands before (and the fetch skips its reads) or
//! after (and the interrupt reaches the read). It is never lost in between.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

use crate::split::ReadInterrupt;

#[derive(Debug, Default)]
struct GateState {
    woken: bool,
    reading: bool,
}

#[derive(Debug, Default)]
pub(crate) struct WakeupGate {
    state: Mutex<GateState>,
    interrupt: ReadInterrupt,
}

impl WakeupGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn wake_up(&self) {
        let mut state = self.lock();
        state.woken = true;
        if state.reading {
            trace!("interrupting in-flight read");
            self.interrupt.interrupt();
        }
    }

    /// Starts the read phase of a fetch, or returns `None` if a wakeup is
    /// pending. The pending wakeup is consumed either way.
    pub(crate) fn begin_read(&self) -> Option<ReadGuard<'_>> {
        let mut state = self.lock();
        if state.woken {
            state.woken = false;
            return None;
        }
        state.reading = true;
        Some(ReadGuard { gate: self })
    }

    pub(crate) fn interrupt(&self) -> &ReadInterrupt {
        &self.interrupt
    }

    fn end_read(&self) {
        let mut state = self.lock();
        state.woken = false;
        self.interrupt.clear();
        state.reading = false;
    }

    // The guarded state is two flags; a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn is_woken(&self) -> bool {
        self.lock().woken
    }
}

/// Ends the read phase when dropped, on every exit path of a fetch.
pub(crate) struct ReadGuard<'a> {
    gate: &'a WakeupGate,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.gate.end_read();
    }
}

/// Cloneable handle for waking a [`SplitReader`](crate::SplitReader) from
/// another thread.
#[derive(Debug, Clone)]
pub struct SplitReaderWaker {
    gate: Arc<WakeupGate>,
}

impl SplitReaderWaker {
    pub(crate) fn new(gate: Arc<WakeupGate>) -> Self {
        Self { gate }
    }

    /// Aborts the fetch in progress, or the next one if none is running.
    pub fn wake_up(&self) {
        self.gate.wake_up();
    }
}
