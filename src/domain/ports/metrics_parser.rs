//! Metrics Parser Port
//!
//! Defines the interface for turning raw snapshots into metric records.

use crate::domain::entities::MetricRecord;
use crate::domain::errors::ParseError;

/// Parser for one snapshot format.
pub trait MetricsParser: Send + Sync {
    /// Parse a snapshot into zero or more records.
    ///
    /// Returns an error, and no records, if any entry is malformed.
    fn parse(&self, raw: &[u8]) -> Result<Vec<MetricRecord>, ParseError>;
}
