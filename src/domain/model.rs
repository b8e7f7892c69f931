use crate::utils::error::{LibraryError, Result};
use crate::utils::validation;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type BookId = i64;

/// A library-card number: exactly six ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatronId(String);

impl PatronId {
    pub fn parse(value: &str) -> Result<Self> {
        validation::validate_patron_id(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatronId {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PatronId> for String {
    fn from(id: PatronId) -> Self {
        id.0
    }
}

/// Book identifiers arrive either already typed or as caller-supplied text.
pub trait IntoBookId {
    fn into_book_id(self) -> Result<BookId>;
}

impl IntoBookId for BookId {
    fn into_book_id(self) -> Result<BookId> {
        Ok(self)
    }
}

impl IntoBookId for &str {
    fn into_book_id(self) -> Result<BookId> {
        validation::validate_book_id(self)
    }
}

impl IntoBookId for String {
    fn into_book_id(self) -> Result<BookId> {
        validation::validate_book_id(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: u32,
    pub available_copies: u32,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// A validated catalog entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: i64,
    pub patron_id: PatronId,
    pub book_id: BookId,
    pub borrow_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub return_date: Option<NaiveDateTime>,
}

impl BorrowRecord {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub patron_id: PatronId,
    pub book_id: BookId,
    pub borrow_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    OnTime,
    Late,
    NoActiveLoan,
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OnTime => "on_time",
            Self::Late => "late",
            Self::NoActiveLoan => "no_active_loan",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateFee {
    pub fee_amount: f64,
    pub days_overdue: i64,
    pub status: FeeStatus,
}

impl LateFee {
    pub fn no_active_loan() -> Self {
        Self {
            fee_amount: 0.0,
            days_overdue: 0,
            status: FeeStatus::NoActiveLoan,
        }
    }

    pub fn on_time() -> Self {
        Self {
            fee_amount: 0.0,
            days_overdue: 0,
            status: FeeStatus::OnTime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Author,
    Isbn,
}

impl FromStr for SearchField {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "isbn" => Ok(Self::Isbn),
            other => Err(LibraryError::validation(format!(
                "Unknown search field '{}'. Use title, author or isbn.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSummary {
    pub record_id: i64,
    pub book_id: BookId,
    pub title: String,
    pub borrow_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub late_fee: LateFee,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoanCounts {
    pub active: usize,
    pub returned: usize,
    pub total: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatronReport {
    pub patron_id: PatronId,
    pub current_loans: Vec<LoanSummary>,
    pub total_late_fees: f64,
    pub counts: LoanCounts,
    pub history: Vec<BorrowRecord>,
}
