//! Split reader crate
//!
//! An interruptible reader over a dynamic set of input splits. A source
//! connector hands it splits, pauses and resumes them, and repeatedly calls
//! [`SplitReader::fetch`] for bounded batches of records. Another thread can
//! abort a fetch at any moment through a [`SplitReaderWaker`] without losing
//! the records already read.
//!
//! # Example
//! ```rust
//! use igloo_connector_split_reader::{MemorySplit, SplitReaderBuilder, SplitsChange};
//!
//! let mut reader = SplitReaderBuilder::new()
//!     .records_per_split_per_fetch(2)
//!     .build()
//!     .unwrap();
//! let splits = vec![MemorySplit::bounded("a", vec![1, 2, 3])];
//! reader
//!     .handle_splits_changes(SplitsChange::Addition(splits))
//!     .unwrap();
//!
//! let batch = reader.fetch().unwrap();
//! assert_eq!(batch.records_for("a").copied().collect::<Vec<i32>>(), vec![1, 2]);
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod memory;
pub mod reader;
pub mod records;
pub mod registry;
pub mod split;
mod wakeup;

pub use change::SplitsChange;
pub use config::SplitReaderConfig;
pub use error::{Result, SplitReaderError};
pub use memory::{MemorySplit, RecordFeeder};
pub use reader::{SplitReader, SplitReaderBuilder};
pub use records::{RecordsBySplits, RecordsBySplitsBuilder};
pub use registry::SplitRegistry;
pub use split::{Interrupted, ReadInterrupt, SourceSplit};
pub use wakeup::SplitReaderWaker;
