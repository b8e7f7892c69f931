use crate::domain::model::{Book, BookId, BorrowRecord, NewBook, NewLoan, PatronId};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Source of "now" for every date the service records or compares against.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Persistence port for books and borrow records.
///
/// `checkout` and `check_in` are the only multi-step writes. Implementations
/// must run each one as a single all-or-nothing unit and re-check its
/// preconditions inside that unit, so concurrent callers can never push
/// availability out of `0..=total_copies` or open two active loans for the
/// same patron and book.
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn get_book_by_id(&self, id: BookId) -> Result<Option<Book>>;

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    async fn get_all_books(&self) -> Result<Vec<Book>>;

    /// Inserts with `available_copies == total_copies`. A taken ISBN yields
    /// `DuplicateIsbnError`.
    async fn insert_book(&self, book: &NewBook) -> Result<Book>;

    /// Number of unreturned records for the patron.
    async fn get_patron_borrow_count(&self, patron_id: &PatronId) -> Result<u32>;

    /// Most recently created unreturned record for the pair, if any.
    async fn get_active_borrow_record(
        &self,
        patron_id: &PatronId,
        book_id: BookId,
    ) -> Result<Option<BorrowRecord>>;

    /// Every record for the patron, newest first.
    async fn get_patron_borrow_records(&self, patron_id: &PatronId) -> Result<Vec<BorrowRecord>>;

    /// Creates the borrow record and decrements availability together.
    ///
    /// Fails with `BookNotFound`, `BookUnavailable`, `BorrowLimitExceeded` or
    /// `AlreadyBorrowed` when the re-check fails, leaving nothing written.
    async fn checkout(&self, loan: &NewLoan, max_active_loans: u32) -> Result<BorrowRecord>;

    /// Stamps the newest active record for the pair and increments
    /// availability together. Fails with `NoActiveLoan` when there is none.
    async fn check_in(
        &self,
        patron_id: &PatronId,
        book_id: BookId,
        returned_at: NaiveDateTime,
    ) -> Result<BorrowRecord>;
}
