/// All errors that can be returned by a `MutationPort` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The remote system has no item with this identifier.
    #[error("item not found: {id}")]
    NotFound { id: String },

    /// The remote system refused the write because it collides with an
    /// existing item (e.g. a second condition on the same metric).
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The remote system rejected the payload (validation failure, bad
    /// threshold, unknown metric or rule).
    #[error("rejected: {message}")]
    Rejected { message: String },

    /// A transport or backend-specific failure (HTTP status, timeout, decoding).
    #[error("backend error: {0}")]
    Backend(String),
}
