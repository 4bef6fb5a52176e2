//! Infrastructure Layer
//!
//! Process lifecycle: shutdown signalling and task supervision.

pub mod shutdown;
pub mod supervisor;

pub use shutdown::{wait_for_signal, ShutdownController};
pub use supervisor::{supervise, SupervisorError};
