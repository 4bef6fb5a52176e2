//! Domain Layer
//!
//! Telemetry entities, error taxonomy and outbound ports. No I/O lives here.

pub mod entities;
pub mod errors;
pub mod ports;
