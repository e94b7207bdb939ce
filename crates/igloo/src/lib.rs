//! Igloo main crate
//!
//! Drives a split reader over generated in-memory splits until every split
//! reports finished or a shutdown is requested.

pub mod config;

use anyhow::Context;
use igloo_connector_split_reader::{
    MemorySplit, SourceSplit, SplitReader, SplitReaderBuilder, SplitReaderError, SplitsChange,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainSummary {
    pub fetches: usize,
    pub records: usize,
    pub finished_splits: BTreeSet<String>,
    pub interrupted: bool,
}

/// `num_splits` bounded splits named `split-<n>`, each holding
/// `records_per_split` sequential values.
pub fn generate_splits(num_splits: usize, records_per_split: usize) -> Vec<MemorySplit<u64>> {
    (0..num_splits)
        .map(|n| MemorySplit::bounded(format!("split-{}", n), 0..records_per_split as u64))
        .collect()
}

/// Fetches until the reader owns no splits or `stop` is raised.
pub fn drain<S: SourceSplit>(
    reader: &mut SplitReader<S>,
    stop: &AtomicBool,
) -> igloo_connector_split_reader::Result<DrainSummary> {
    let mut summary = DrainSummary::default();
    while reader.num_splits() > 0 {
        if stop.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }
        let batch = reader.fetch()?;
        summary.fetches += 1;
        summary.records += batch.len();
        debug!(
            fetch = summary.fetches,
            records = batch.len(),
            finished = ?batch.finished_splits(),
            "fetched batch"
        );
        summary.finished_splits.extend(batch.finished_splits().iter().cloned());
    }
    Ok(summary)
}

/// Builds a reader from `settings` and drains it with [`drain_until_shutdown`].
pub async fn run<F>(settings: &Settings, shutdown: F) -> anyhow::Result<DrainSummary>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut reader = SplitReaderBuilder::from_config(settings.reader)
        .build()
        .context("Failed to build split reader")?;
    reader
        .handle_splits_changes(SplitsChange::Addition(generate_splits(
            settings.num_splits,
            settings.records_per_split,
        )))
        .context("Failed to assign splits")?;
    info!(
        splits = reader.num_splits(),
        blocking = settings.reader.blocking_fetch,
        separated = settings.reader.separated_finished_record,
        "split reader started"
    );

    drain_until_shutdown(reader, shutdown).await
}

/// Drains `reader` on a blocking thread and closes it. When `shutdown`
/// resolves the reader is woken up and draining stops after the current
/// fetch. The shutdown watcher is gone by the time this returns, whether
/// draining succeeded or not.
pub async fn drain_until_shutdown<S, F>(
    mut reader: SplitReader<S>,
    shutdown: F,
) -> anyhow::Result<DrainSummary>
where
    S: SourceSplit + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_shutdown = Arc::clone(&stop);
    let waker = reader.waker();
    let watcher = tokio::spawn(async move {
        shutdown.await;
        info!("shutdown requested, waking split reader");
        stop_on_shutdown.store(true, Ordering::SeqCst);
        waker.wake_up();
    });

    let result = tokio::task::spawn_blocking(move || {
        let summary = drain(&mut reader, &stop)?;
        reader.close()?;
        Ok::<_, SplitReaderError>(summary)
    })
    .await;

    watcher.abort();
    // Cancellation is the expected outcome here.
    let _ = watcher.await;

    let summary = result.context("Split reader task failed")??;
    Ok(summary)
}
