/// Reason an expansion stopped without completing.
#[derive(Debug, thiserror::Error)]
pub enum ExpansionError {
    /// The caller's cancellation flag was raised.
    #[error("Expansion cancelled")]
    Cancelled,

    /// A time could not be represented as an instant.
    #[error("Time out of range: {0}")]
    OutOfRange(String),
}
