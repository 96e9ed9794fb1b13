use thiserror::Error;

/// A fault while talking to the relational store. Driver detail is only
/// reachable as the source, never in the message.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database query failed")]
    Query(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
#[error("polarity scoring failed: {0}")]
pub struct ScoringError(pub String);

#[derive(Debug, Error)]
#[error("sentiment classification failed: {0}")]
pub struct ClassificationError(#[from] pub ScoringError);

/// Raised by the progress aggregator when either underlying fetch fails.
///
/// The message never says which fetch produced it.
#[derive(Debug, Error)]
#[error("failed to compute progress: {source}")]
pub struct ProgressComputationError {
    #[from]
    pub source: StorageError,
}
