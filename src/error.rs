use thiserror::Error;

/// Failures while decoding a statement file. None of these are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Not a statement file: no OFX envelope found")]
    NotAStatementFile,

    #[error("Malformed amount {raw:?} in transaction {external_id:?}")]
    MalformedAmount { external_id: String, raw: String },

    #[error("Malformed posted date {raw:?}")]
    MalformedDate { raw: String },

    #[error("Statement contains no transactions")]
    EmptyStatement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitErrorKind {
    Invalid,
    Storage,
}

/// Failures of the commit pipeline. A failed commit never leaves rows behind.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Unknown account: {0}")]
    UnknownAccount(i64),

    #[error("Unknown category: {0}")]
    UnknownCategory(i64),

    #[error("Transaction {0} is a duplicate and cannot be committed")]
    DuplicateSelected(String),

    #[error("Transaction {0} has a non-positive amount")]
    NonPositiveAmount(String),

    #[error("Batch total overflows at transaction {0}")]
    AmountOverflow(String),

    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(i64),

    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CommitError {
    pub fn kind(&self) -> CommitErrorKind {
        match self {
            Self::Storage(_) => CommitErrorKind::Storage,
            _ => CommitErrorKind::Invalid,
        }
    }

    /// Only storage failures are safe to resubmit unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == CommitErrorKind::Storage
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("Unsupported file type: {0} (expected .ofx or .qfx)")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (limit {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Database not found at {0}. Run `ledger-import init` first.")]
    NotInitialized(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_error_kinds() {
        assert_eq!(CommitError::UnknownAccount(7).kind(), CommitErrorKind::Invalid);
        assert_eq!(
            CommitError::DuplicateSelected("A1".into()).kind(),
            CommitErrorKind::Invalid
        );
        assert!(!CommitError::NonPositiveAmount("A1".into()).is_retryable());
        assert!(CommitError::Storage(rusqlite::Error::InvalidQuery).is_retryable());
        assert!(!CommitError::AmountOverflow("A1".into()).is_retryable());
        assert_eq!(CommitError::BalanceOverflow(3).kind(), CommitErrorKind::Invalid);
    }

    #[test]
    fn test_parse_error_messages() {
        let err = ParseError::MalformedAmount {
            external_id: "X9".into(),
            raw: "12,3a".into(),
        };
        assert!(err.to_string().contains("12,3a"));
        assert_eq!(
            ImportError::from(ParseError::EmptyStatement).to_string(),
            "Statement contains no transactions"
        );
    }
}
