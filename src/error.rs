use thiserror::Error;

/// Failures surfaced to the host by the simulation core.
///
/// None of these are retried internally. A failed `step` leaves the
/// population exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A query or step was issued before `initialize()`.
    #[error("simulation core has not been initialized")]
    NotInitialized,
    /// Caller supplied a value the core cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The population was found in a state it must never reach.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

pub type SimResult<T> = Result<T, SimError>;
