//! Error types for the memory engine.
//!
//! One variant per failure kind the public operations can surface. Store and
//! gateway failures are wrapped, not swallowed — the only downgrade is the
//! embedding-after-write path, where the caller logs and continues.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or empty required field, out-of-range bound, unknown enum.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The id does not exist within the current (tenant, workspace).
    #[error("not found: {0}")]
    NotFound(String),

    /// Connectivity, constraint, or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema statement failed during startup migration. Fatal.
    #[error("migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    /// An embedding or completion provider call failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// A query vector could not be produced; search cannot proceed.
    #[error("embedding failed: {0}")]
    Embed(String),

    /// Malformed JSONL record or dimension mismatch during transfer.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Cooperative cancellation. Distinct so callers can tell it from failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        let e = Error::invalid("text is required");
        assert_eq!(e.to_string(), "invalid argument: text is required");

        let e = Error::not_found("memory 42");
        assert_eq!(e.to_string(), "not found: memory 42");

        let e = Error::Cancelled;
        assert_eq!(e.to_string(), "operation cancelled");
    }
}
