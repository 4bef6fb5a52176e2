//! Application Layer
//!
//! The collection pipeline: point backlog and polling loop.

pub mod point_buffer;
pub mod poller;

pub use point_buffer::{local_hostname, PointBuffer, DEFAULT_MAX_POINTS, MAX_LINES_PER_REQUEST};
pub use poller::Poller;
