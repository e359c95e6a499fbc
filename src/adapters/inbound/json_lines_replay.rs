//! JSON Lines Replay
//!
//! A minimal host: reads aggregated samples (one JSON object per line),
//! hands each to the registered listeners and drives a reporter's
//! lifecycle around them.

use crate::domain::entities::DataPoint;
use crate::domain::ports::{AggregatorListener, Reporter, ResultsProvider};
use crate::error::UploadError;
use crate::infrastructure::ShutdownController;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Samples handed to listeners
    pub dispatched: u64,
    /// Lines that did not parse as a sample
    pub skipped: u64,
}

/// Results provider fed from a JSON-lines stream.
#[derive(Default)]
pub struct JsonLinesReplay {
    listeners: Vec<Arc<dyn AggregatorListener>>,
    stats: ReplayStats,
}

impl JsonLinesReplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn dispatch(&mut self, point: DataPoint) {
        for listener in &self.listeners {
            listener.aggregated_second(point.clone());
        }
        self.stats.dispatched += 1;
    }

    /// Parse one line and dispatch it. Blank lines are ignored; malformed
    /// ones are logged and counted.
    pub fn dispatch_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match serde_json::from_str::<DataPoint>(line) {
            Ok(point) => self.dispatch(point),
            Err(e) => {
                self.stats.skipped += 1;
                tracing::warn!("skipping malformed sample: {}", e);
            }
        }
    }

    /// Replay `reader` through `reporter`.
    ///
    /// Calls `startup`, then `check` every `tick` while lines arrive, and
    /// `post_process` once input ends, the reporter asks to stop, or
    /// `shutdown` fires.
    pub async fn run<R, P>(
        &mut self,
        reader: R,
        reporter: &mut P,
        tick: Duration,
        shutdown: &ShutdownController,
    ) -> Result<ReplayStats, UploadError>
    where
        R: AsyncBufRead + Unpin,
        P: Reporter + ?Sized,
    {
        let mut lines = reader.lines();
        let mut interval = tokio::time::interval(tick);
        let mut shutdown_rx = shutdown.subscribe();

        reporter.startup().await?;

        // A signal that fired before we subscribed is only visible on the flag
        while !shutdown.is_shutdown() {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => self.dispatch_line(&line),
                    None => {
                        tracing::info!("end of sample stream");
                        break;
                    }
                },
                _ = interval.tick() => {
                    if reporter.check().await? {
                        tracing::info!("reporter requested test stop");
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("replay interrupted");
                    break;
                }
            }
        }

        reporter.post_process().await?;

        tracing::info!(
            "replay finished: dispatched={} skipped={}",
            self.stats.dispatched,
            self.stats.skipped
        );
        Ok(self.stats)
    }
}

impl ResultsProvider for JsonLinesReplay {
    fn add_listener(&mut self, listener: Arc<dyn AggregatorListener>) {
        self.listeners.push(listener);
    }
}
