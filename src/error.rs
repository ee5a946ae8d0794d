//! Error types and result aliases.
//!
//! Two layers of errors exist:
//! - [`DriverError`]: raised by Widget Driver implementations (timeouts and
//!   generic driver faults)
//! - [`FlowError`]: the tagged outcome of a booking flow attempt, carrying
//!   both the failure kind and the step it originated from, so the retry
//!   loop can decide without inspecting error internals

use crate::flow::FlowStep;
use thiserror::Error;

/// Result alias for flow-level operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Result alias for Widget Driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors raised by a Widget Driver implementation
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// A wait or navigation exceeded its deadline
    #[error("driver timeout: {0}")]
    Timeout(String),

    /// Any other driver-level failure (lost page, protocol error, ...)
    #[error("driver fault: {0}")]
    Fault(String),
}

/// The kind of a flow failure, independent of the step it occurred in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowErrorKind {
    /// The request does not map to a known widget option. Not retryable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The booking page responded with a non-success HTTP status
    #[error("navigation failed with status {0}")]
    NavigationFailed(u16),

    /// The booking page did not finish loading in time
    #[error("navigation timed out")]
    NavigationTimeout,

    /// A patient-type or appointment-type control never became interactable
    #[error("timed out during {0}")]
    SelectionTimeout(String),

    /// The requested date could not be located in the calendar widget
    #[error("date preference could not be applied: {0}")]
    DatePreference(String),

    /// Generic driver-layer failure surfaced through a flow step
    #[error("driver fault: {0}")]
    DriverFault(String),
}

impl FlowErrorKind {
    /// Whether another attempt with a fresh session could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FlowErrorKind::InvalidInput(_))
    }
}

/// A flow failure tagged with the step that produced it
#[derive(Debug, Clone, Error)]
#[error("{kind} (step: {step})")]
pub struct FlowError {
    pub kind: FlowErrorKind,
    pub step: FlowStep,
}

impl FlowError {
    pub fn new(step: FlowStep, kind: FlowErrorKind) -> Self {
        Self { kind, step }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
