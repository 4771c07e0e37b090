use crate::error::ReliefError;
use elevation::{EngineEvent, EventBus};

/// Runs a long-running tool computation bracketed by job lifecycle
/// events, so UI listeners can show start/finish feedback.
///
/// Cancellation is reported as its own event, not as a failure.
pub fn with_job_events<T>(
    bus: &EventBus,
    name: &str,
    job: impl FnOnce() -> Result<T, ReliefError>,
) -> Result<T, ReliefError> {
    bus.emit(&EngineEvent::JobStarted {
        name: name.to_owned(),
    });
    match job() {
        Ok(value) => {
            bus.emit(&EngineEvent::JobSucceeded {
                name: name.to_owned(),
            });
            Ok(value)
        }
        Err(ReliefError::Cancelled) => {
            bus.emit(&EngineEvent::JobCancelled {
                name: name.to_owned(),
            });
            Err(ReliefError::Cancelled)
        }
        Err(err) => {
            bus.emit(&EngineEvent::JobFailed {
                name: name.to_owned(),
                message: err.to_string(),
            });
            Err(err)
        }
    }
}
