//! ocserv-telemetry Library
//!
//! Polls OpenConnect VPN session state and ships it to InfluxDB.
//! This module exposes the pipeline components for use in integration tests
//! and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::outbound::{CommandSource, DryRunSink, InfluxSettings, InfluxWriter, OcctlParser};
pub use application::{PointBuffer, Poller};
pub use config::{load_config, Config, ConfigError};
pub use domain::entities::{MetricRecord, Point};
pub use domain::errors::{BufferError, CollectError, DeliveryError, ParseError, PipelineError};
pub use domain::ports::{LineWriter, MetricsParser, SnapshotSource};
pub use infrastructure::{supervise, ShutdownController, SupervisorError};
