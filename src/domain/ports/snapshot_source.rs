//! Snapshot Source Port
//!
//! Defines the interface for obtaining raw session snapshots.

use crate::domain::errors::CollectError;
use async_trait::async_trait;

/// Producer of raw session snapshots.
///
/// This is an outbound port that abstracts the external collector.
/// Implementations may run a command, read a socket, or replay fixtures.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Capture one snapshot of the current sessions.
    async fn fetch(&self) -> Result<Vec<u8>, CollectError>;
}
