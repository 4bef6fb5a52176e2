//! Lifecycle Supervisor
//!
//! Runs the signal-wait task and the pipeline side by side. Whichever
//! finishes first shuts the controller down, which stops the other one;
//! both are then awaited and their outcomes folded into one result.

use crate::domain::errors::PipelineError;
use crate::infrastructure::shutdown::{wait_for_signal, ShutdownController};
use std::future::Future;
use thiserror::Error;
use tokio::task::JoinError;

/// Why the process is stopping abnormally.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("signal handler failed: {0}")]
    Signal(#[source] std::io::Error),
    #[error("{task} task failed: {source}")]
    Join {
        task: &'static str,
        #[source]
        source: JoinError,
    },
}

/// Supervise `pipeline` until it fails or a shutdown signal arrives.
///
/// The pipeline future must return once `controller` is shut down.
/// Returns `Ok(())` when the only reason for stopping was a signal or a
/// cancellation; otherwise the pipeline's (or the signal task's) error.
pub async fn supervise<F>(pipeline: F, controller: ShutdownController) -> Result<(), SupervisorError>
where
    F: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    let mut signals = tokio::spawn(wait_for_signal(controller.clone()));
    let mut poller = tokio::spawn(pipeline);

    let (signal_result, poll_result) = tokio::select! {
        res = &mut signals => {
            tracing::debug!("signal task finished, stopping poller");
            controller.shutdown();
            (res, poller.await)
        }
        res = &mut poller => {
            tracing::debug!("poller finished, releasing signal task");
            controller.shutdown();
            (signals.await, res)
        }
    };

    match poll_result {
        Ok(Err(e)) if !e.is_cancellation() => return Err(e.into()),
        Ok(_) => {}
        Err(source) => {
            return Err(SupervisorError::Join {
                task: "poller",
                source,
            })
        }
    }

    match signal_result {
        Ok(Ok(received)) => {
            if let Some(signal) = received {
                tracing::debug!("stopped by {}", signal);
            }
            Ok(())
        }
        Ok(Err(e)) => Err(SupervisorError::Signal(e)),
        Err(source) => Err(SupervisorError::Join {
            task: "signal",
            source,
        }),
    }
}
