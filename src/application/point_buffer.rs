//! Point Buffer - bounded backlog of undelivered points
//!
//! Records are host-tagged and queued by [`PointBuffer::add`], then shipped
//! in chunks by [`PointBuffer::flush`]. A flush either delivers the whole
//! backlog and clears it, or fails and leaves it untouched for the next try.

use crate::domain::entities::{MetricRecord, Point};
use crate::domain::errors::{BufferError, DeliveryError};
use crate::domain::ports::LineWriter;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maximum number of lines per write request.
pub const MAX_LINES_PER_REQUEST: usize = 500;

/// Default backlog capacity.
pub const DEFAULT_MAX_POINTS: usize = 1000;

/// Hostname used when the local one cannot be resolved.
pub const UNKNOWN_HOST: &str = "unknown";

/// Resolve the local machine name for the `host` tag.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// In-memory backlog shared by the polling loop and the flusher.
///
/// A single async mutex guards the backlog and is held across the whole
/// flush, so additions never observe or interleave with a half-sent batch.
pub struct PointBuffer {
    writer: Arc<dyn LineWriter>,
    hostname: String,
    max_points: usize,
    points: Mutex<Vec<Point>>,
}

impl PointBuffer {
    pub fn new(writer: Arc<dyn LineWriter>, hostname: impl Into<String>, max_points: usize) -> Self {
        Self {
            writer,
            hostname: hostname.into(),
            max_points,
            points: Mutex::new(Vec::new()),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Number of points waiting for delivery.
    pub async fn len(&self) -> usize {
        self.points.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.lock().await.is_empty()
    }

    /// Queue a batch of records.
    ///
    /// All-or-nothing: if the batch would push the backlog past its
    /// capacity, nothing is appended and `CapacityExceeded` is returned.
    pub async fn add(&self, records: Vec<MetricRecord>) -> Result<(), BufferError> {
        let mut points = self.points.lock().await;

        if points.len() + records.len() > self.max_points {
            return Err(BufferError::CapacityExceeded {
                pending: points.len(),
                incoming: records.len(),
                max: self.max_points,
            });
        }

        points.extend(
            records
                .into_iter()
                .map(|record| Point::from_record(record, &self.hostname)),
        );
        Ok(())
    }

    /// Deliver the whole backlog, in insertion order.
    ///
    /// The backlog is cleared only after every chunk was accepted. On the
    /// first failed chunk the error is returned and all points stay queued,
    /// so chunks that already went out will be sent again next time.
    pub async fn flush(&self) -> Result<(), DeliveryError> {
        let mut points = self.points.lock().await;
        if points.is_empty() {
            return Ok(());
        }

        let chunks = render_chunks(&points);
        let requests = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            if let Err(e) = self.writer.send(chunk).await {
                tracing::debug!(
                    "flush aborted at chunk {}/{}, keeping {} points",
                    i + 1,
                    requests,
                    points.len()
                );
                return Err(e);
            }
        }

        tracing::debug!("flushed {} points in {} request(s)", points.len(), requests);
        points.clear();
        Ok(())
    }
}

/// Render points as newline-terminated lines, at most
/// [`MAX_LINES_PER_REQUEST`] per chunk.
fn render_chunks(points: &[Point]) -> Vec<Bytes> {
    points
        .chunks(MAX_LINES_PER_REQUEST)
        .map(|chunk| {
            let mut body = String::with_capacity(chunk.len() * 128);
            for point in chunk {
                point.write_line(&mut body);
            }
            Bytes::from(body)
        })
        .collect()
}
