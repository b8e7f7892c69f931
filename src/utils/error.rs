use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("{message}")]
    ValidationError { message: String },

    #[error("A book with this ISBN already exists.")]
    DuplicateIsbnError { isbn: String },

    #[error("Invalid patron ID. Must be exactly 6 digits.")]
    InvalidPatronId { value: String },

    #[error("Invalid book id.")]
    InvalidBookId { value: String },

    #[error("Book not found.")]
    BookNotFound { book_id: i64 },

    #[error("This book is currently not available.")]
    BookUnavailable { book_id: i64 },

    #[error("You have reached the maximum borrowing limit of {limit} books.")]
    BorrowLimitExceeded { limit: u32 },

    #[error("You already have an active borrow of this book.")]
    AlreadyBorrowed { book_id: i64 },

    #[error("No active borrow for this patron and book.")]
    NoActiveLoan { book_id: i64 },

    #[error("Database error occurred while {operation}.")]
    PersistenceError { operation: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigError { field: String, message: String },
}

/// Error taxonomy shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DuplicateIsbn,
    BookNotFound,
    BookUnavailable,
    BorrowLimitExceeded,
    AlreadyBorrowed,
    InvalidPatronId,
    InvalidBookId,
    NoActiveLoan,
    Persistence,
}

impl LibraryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn persistence(operation: impl Into<String>) -> Self {
        Self::PersistenceError {
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError { .. } | Self::ConfigError { .. } => ErrorKind::Validation,
            Self::DuplicateIsbnError { .. } => ErrorKind::DuplicateIsbn,
            Self::InvalidPatronId { .. } => ErrorKind::InvalidPatronId,
            Self::InvalidBookId { .. } => ErrorKind::InvalidBookId,
            Self::BookNotFound { .. } => ErrorKind::BookNotFound,
            Self::BookUnavailable { .. } => ErrorKind::BookUnavailable,
            Self::BorrowLimitExceeded { .. } => ErrorKind::BorrowLimitExceeded,
            Self::AlreadyBorrowed { .. } => ErrorKind::AlreadyBorrowed,
            Self::NoActiveLoan { .. } => ErrorKind::NoActiveLoan,
            Self::PersistenceError { .. } | Self::DatabaseError(_) | Self::IoError(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Business-rule rejections are the caller's to fix; persistence failures are not.
    pub fn is_persistence(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }

    /// 給終端使用者看的訊息，隱藏底層資料庫細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error occurred.".to_string(),
            Self::IoError(_) => "A file could not be read or written.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

/// The `(success, message)` shape handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Outcome {
    pub fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(message) => Self {
                success: true,
                message,
                kind: None,
            },
            Err(e) => Self {
                success: false,
                message: e.user_friendly_message(),
                kind: Some(e.kind()),
            },
        }
    }

    pub fn into_tuple(self) -> (bool, String) {
        (self.success, self.message)
    }
}
