use thiserror::Error;

/// Monitor and collaborator errors.
///
/// The lifecycle variants carry different blast radii:
/// - `Registration` is fatal to the run; no session exists, so connection
///   teardown is not applicable.
/// - `Connection` is fatal to monitoring; the session stays registered and
///   must still be unregistered by the caller.
/// - `Send` is non-fatal; a failed acknowledgment is surfaced as a warning
///   and monitoring continues.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("session registration failed: {0}")]
    Registration(String),
    #[error("forward open rejected: {0}")]
    Connection(String),
    #[error("explicit send failed: {0}")]
    Send(String),
    #[error("invalid session state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MonitorError {
    /// True for errors that terminate the current run.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MonitorError::Send(_))
    }
}
