use thiserror::Error;

/// Every failure the vault can report. None of them is fatal: callers get
/// control back with enough context to show a message to the user.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no snippet found with id: {0}")]
    NotFound(String),

    #[error("invalid snippet data: {0}")]
    Validation(String),

    #[error("could not read stored snippets: {0}")]
    PersistenceRead(String),

    #[error("could not save snippets: {0}")]
    PersistenceWrite(String),

    #[error("import document is not a JSON array of snippets: {0}")]
    ImportParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Whether the in-memory collection is still authoritative after this error
    pub fn is_recoverable_warning(&self) -> bool {
        matches!(self, VaultError::PersistenceWrite(_))
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
