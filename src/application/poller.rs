//! Poller - the collection loop
//!
//! Each cycle collects a snapshot, parses it, queues the records and
//! flushes the backlog, then sleeps. Collection, parse and capacity
//! failures end the loop; delivery failures are logged and retried on the
//! next cycle since the backlog keeps undelivered points.

use crate::application::point_buffer::PointBuffer;
use crate::domain::errors::PipelineError;
use crate::domain::ports::{MetricsParser, SnapshotSource};
use crate::infrastructure::shutdown::ShutdownController;
use std::sync::Arc;
use std::time::Duration;

pub struct Poller {
    source: Arc<dyn SnapshotSource>,
    parser: Arc<dyn MetricsParser>,
    buffer: Arc<PointBuffer>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        parser: Arc<dyn MetricsParser>,
        buffer: Arc<PointBuffer>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            parser,
            buffer,
            interval,
        }
    }

    pub fn buffer(&self) -> &Arc<PointBuffer> {
        &self.buffer
    }

    /// Run cycles until shutdown or a fatal error.
    ///
    /// Never returns `Ok`: a requested shutdown surfaces as
    /// [`PipelineError::Cancelled`]. Shutdown is observed while waiting for
    /// the collector and while sleeping between cycles.
    pub async fn run(&self, shutdown: &ShutdownController) -> Result<(), PipelineError> {
        let mut cycle: u64 = 0;

        loop {
            if shutdown.is_shutdown() {
                return Err(PipelineError::Cancelled);
            }
            cycle += 1;

            let raw = tokio::select! {
                res = self.source.fetch() => res?,
                _ = shutdown.cancelled() => return Err(PipelineError::Cancelled),
            };

            let added = self.ingest(&raw).await?;
            tracing::debug!(
                "cycle {} done: {} records, {} points pending",
                cycle,
                added,
                self.buffer.len().await
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => return Err(PipelineError::Cancelled),
            }
        }
    }

    /// Parse a snapshot, queue its records and flush. Returns the number of records.
    async fn ingest(&self, raw: &[u8]) -> Result<usize, PipelineError> {
        let records = self.parser.parse(raw)?;
        let count = records.len();

        self.buffer.add(records).await?;

        if let Err(e) = self.buffer.flush().await {
            tracing::error!("error flushing metrics: {}", e);
        }

        Ok(count)
    }
}
