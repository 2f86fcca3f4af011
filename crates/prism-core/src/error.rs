use thiserror::Error;

/// Recoverable failures surfaced by the coordinator's registration and lifecycle calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("participant name must not be empty")]
    EmptyParticipantName,

    #[error("a participant named `{0}` is already registered")]
    DuplicateParticipant(String),

    #[error("coordinator has been destroyed")]
    Destroyed,
}

/// Error a participant callback reports instead of throwing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParticipantError {
    #[error("participant failed: {0}")]
    Failed(String),
}

/// Why a producer poll produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    #[error("producer unavailable")]
    Unavailable,

    #[error("producer failed: {0}")]
    Failed(String),
}
