//! Error types for the client.

/// Client error type.
///
/// Chunk and per-candidate read failures during discovery never surface here;
/// they are logged and skipped where they happen. An `Error` means a whole
/// operation failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// RPC communication error.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// ABI encode/decode error (malformed response data).
    #[error("codec error: {0}")]
    Codec(String),

    /// Transaction submission error.
    #[error("transaction error: {0}")]
    Tx(String),
}
