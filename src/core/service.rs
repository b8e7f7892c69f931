use crate::core::{fees, LOAN_PERIOD_DAYS, MAX_ACTIVE_LOANS};
use crate::domain::model::{
    Book, BookId, FeeStatus, IntoBookId, LateFee, LoanCounts, LoanSummary, NewBook, NewLoan,
    PatronId, PatronReport, SearchField,
};
use crate::domain::ports::{Clock, LibraryRepository};
use crate::utils::error::{LibraryError, Result};
use crate::utils::validation;
use chrono::Duration;
use std::collections::HashMap;

/// Catalog admission and the borrow / return / late-fee lifecycle.
///
/// Every operation is one self-contained unit of work against the
/// repository. Mutations return the confirmation text shown to the patron;
/// rejections come back as [`LibraryError`] whose `Display` is the reason.
pub struct LibraryService<R: LibraryRepository, C: Clock> {
    repository: R,
    clock: C,
}

impl<R: LibraryRepository, C: Clock> LibraryService<R, C> {
    pub fn new(repository: R, clock: C) -> Self {
        Self { repository, clock }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn add_book(
        &self,
        title: &str,
        author: &str,
        isbn: &str,
        total_copies: i64,
    ) -> Result<String> {
        let book = NewBook {
            title: validation::validate_title(title)?,
            author: validation::validate_author(author)?,
            isbn: validation::validate_isbn(isbn)?,
            total_copies: validation::validate_total_copies(total_copies)?,
        };

        if self.repository.get_book_by_isbn(&book.isbn).await?.is_some() {
            tracing::warn!(isbn = %book.isbn, "Rejected duplicate ISBN");
            return Err(LibraryError::DuplicateIsbnError { isbn: book.isbn });
        }

        let stored = self.repository.insert_book(&book).await?;
        tracing::info!(
            book_id = stored.id,
            isbn = %stored.isbn,
            copies = stored.total_copies,
            "📚 Added book to catalog"
        );

        Ok(format!(
            "Book \"{}\" has been successfully added to the catalog.",
            stored.title
        ))
    }

    pub async fn borrow(&self, patron_id: &str, book_id: BookId) -> Result<String> {
        let patron = PatronId::parse(patron_id)?;

        let book = self
            .repository
            .get_book_by_id(book_id)
            .await?
            .ok_or(LibraryError::BookNotFound { book_id })?;

        if !book.is_available() {
            tracing::warn!(%patron, book_id, "Borrow rejected: no copies available");
            return Err(LibraryError::BookUnavailable { book_id });
        }

        let active = self.repository.get_patron_borrow_count(&patron).await?;
        if active >= MAX_ACTIVE_LOANS {
            tracing::warn!(%patron, active, "Borrow rejected: limit reached");
            return Err(LibraryError::BorrowLimitExceeded {
                limit: MAX_ACTIVE_LOANS,
            });
        }

        if self
            .repository
            .get_active_borrow_record(&patron, book_id)
            .await?
            .is_some()
        {
            return Err(LibraryError::AlreadyBorrowed { book_id });
        }

        let borrow_date = self.clock.now();
        let loan = NewLoan {
            patron_id: patron.clone(),
            book_id,
            borrow_date,
            due_date: borrow_date + Duration::days(LOAN_PERIOD_DAYS),
        };

        // 檢查與寫入在同一個交易中重做一次
        let record = self
            .repository
            .checkout(&loan, MAX_ACTIVE_LOANS)
            .await
            .inspect_err(|e| log_failure("borrow", &patron, book_id, e))?;

        tracing::info!(%patron, book_id, record_id = record.id, "📖 Book borrowed");

        Ok(format!(
            "Successfully borrowed \"{}\". Due date: {}.",
            book.title,
            record.due_date.format("%Y-%m-%d")
        ))
    }

    pub async fn return_book(&self, patron_id: &str, book_id: impl IntoBookId) -> Result<String> {
        let patron = PatronId::parse(patron_id)?;
        let book_id = book_id.into_book_id()?;

        let book = self
            .repository
            .get_book_by_id(book_id)
            .await?
            .ok_or(LibraryError::BookNotFound { book_id })?;

        let record = self
            .repository
            .check_in(&patron, book_id, self.clock.now())
            .await
            .inspect_err(|e| log_failure("return", &patron, book_id, e))?;

        tracing::info!(%patron, book_id, record_id = record.id, "📗 Book returned");

        Ok(format!("Returned \"{}\".", book.title))
    }

    /// Fee owed on the patron's active loan of the book as of today.
    ///
    /// Never fails: a malformed id, a missing loan and an unreadable store all
    /// report `no_active_loan` with a zero fee.
    pub async fn calculate_late_fee(&self, patron_id: &str, book_id: impl IntoBookId) -> LateFee {
        let (Ok(patron), Ok(book_id)) = (PatronId::parse(patron_id), book_id.into_book_id())
        else {
            return LateFee::no_active_loan();
        };

        match self
            .repository
            .get_active_borrow_record(&patron, book_id)
            .await
        {
            Ok(Some(record)) => fees::assess(record.due_date, self.clock.now()),
            Ok(None) => LateFee::no_active_loan(),
            Err(e) => {
                tracing::warn!(%patron, book_id, "Late fee lookup failed: {}", e);
                LateFee::no_active_loan()
            }
        }
    }

    /// Title and author match case-insensitive substrings; ISBN must match exactly.
    pub async fn search(&self, term: &str, field: SearchField) -> Result<Vec<Book>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let needle = term.to_lowercase();
        let books = self.repository.get_all_books().await?;
        let matches: Vec<Book> = books
            .into_iter()
            .filter(|book| match field {
                SearchField::Title => book.title.to_lowercase().contains(&needle),
                SearchField::Author => book.author.to_lowercase().contains(&needle),
                SearchField::Isbn => book.isbn == term,
            })
            .collect();

        tracing::debug!(term, ?field, hits = matches.len(), "Catalog search");
        Ok(matches)
    }

    pub async fn list_books(&self) -> Result<Vec<Book>> {
        self.repository.get_all_books().await
    }

    pub async fn status_report(&self, patron_id: &str) -> Result<PatronReport> {
        let patron = PatronId::parse(patron_id)?;
        let history = self.repository.get_patron_borrow_records(&patron).await?;
        let now = self.clock.now();

        let mut titles: HashMap<BookId, String> = HashMap::new();
        let mut current_loans = Vec::new();
        for record in history.iter().filter(|r| r.is_active()) {
            if !titles.contains_key(&record.book_id) {
                let title = self
                    .repository
                    .get_book_by_id(record.book_id)
                    .await?
                    .map(|book| book.title)
                    .unwrap_or_default();
                titles.insert(record.book_id, title);
            }

            current_loans.push(LoanSummary {
                record_id: record.id,
                book_id: record.book_id,
                title: titles.get(&record.book_id).cloned().unwrap_or_default(),
                borrow_date: record.borrow_date,
                due_date: record.due_date,
                late_fee: fees::assess(record.due_date, now),
            });
        }

        let total_late_fees =
            fees::round_cents(current_loans.iter().map(|l| l.late_fee.fee_amount).sum());
        let counts = LoanCounts {
            active: current_loans.len(),
            returned: history.len() - current_loans.len(),
            total: history.len(),
            overdue: current_loans
                .iter()
                .filter(|l| l.late_fee.status == FeeStatus::Late)
                .count(),
        };

        Ok(PatronReport {
            patron_id: patron,
            current_loans,
            total_late_fees,
            counts,
            history,
        })
    }
}

fn log_failure(operation: &str, patron: &PatronId, book_id: BookId, error: &LibraryError) {
    if error.is_persistence() {
        tracing::error!(%patron, book_id, "❌ {} failed: {}", operation, error);
    } else {
        tracing::warn!(%patron, book_id, "{} rejected: {}", operation, error);
    }
}
