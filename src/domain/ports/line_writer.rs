//! Line Writer Port
//!
//! Defines the interface for delivering serialized line protocol batches.

use crate::domain::errors::DeliveryError;
use async_trait::async_trait;
use bytes::Bytes;

/// Destination for line protocol batches.
///
/// This is an outbound port that abstracts the time-series database.
/// The point buffer calls it once per chunk of at most 500 lines.
#[async_trait]
pub trait LineWriter: Send + Sync {
    /// Deliver newline-terminated lines as a single request.
    async fn send(&self, lines: Bytes) -> Result<(), DeliveryError>;
}
