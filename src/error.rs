use thiserror::Error;

/// Failure kinds that callers may want to tell apart. They travel inside
/// `anyhow::Error` and stay reachable through `downcast_ref`.
///
/// Spin and band indices in `DivideByZero` count from 1, matching the
/// numbering printed in PROCAR.
#[derive(Debug, Error)]
pub enum BandcharError {
    #[error("malformed input: {0}")]
    Parse(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("total projected weight is zero at spin {ispin}, band {iband}")]
    DivideByZero { ispin: usize, iband: usize },
}
