use crate::domain::model::{Book, BookId, BorrowRecord, NewBook, NewLoan, PatronId};
use crate::domain::ports::LibraryRepository;
use crate::utils::error::{LibraryError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    books: Vec<Book>,
    records: Vec<BorrowRecord>,
    next_book_id: i64,
    next_record_id: i64,
}

impl MemoryState {
    fn active_count(&self, patron_id: &PatronId) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_active() && &r.patron_id == patron_id)
            .count()
    }

    // 以 id 最大者為準（最近建立）
    fn newest_active_index(&self, patron_id: &PatronId, book_id: BookId) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active() && &r.patron_id == patron_id && r.book_id == book_id)
            .max_by_key(|(_, r)| r.id)
            .map(|(index, _)| index)
    }
}

/// Process-local repository. A single lock guards all state, so every
/// operation, `checkout` and `check_in` included, is atomic.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with `PersistenceError`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, operation: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LibraryError::persistence(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl LibraryRepository for InMemoryRepository {
    async fn get_book_by_id(&self, id: BookId) -> Result<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.iter().find(|b| b.id == id).cloned())
    }

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.iter().find(|b| b.isbn == isbn).cloned())
    }

    async fn get_all_books(&self) -> Result<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.clone())
    }

    async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let mut state = self.state.lock().await;
        self.check_writable("adding the book")?;

        if state.books.iter().any(|b| b.isbn == book.isbn) {
            return Err(LibraryError::DuplicateIsbnError {
                isbn: book.isbn.clone(),
            });
        }

        state.next_book_id += 1;
        let stored = Book {
            id: state.next_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            total_copies: book.total_copies,
            available_copies: book.total_copies,
        };
        state.books.push(stored.clone());
        Ok(stored)
    }

    async fn get_patron_borrow_count(&self, patron_id: &PatronId) -> Result<u32> {
        let state = self.state.lock().await;
        let count = state.active_count(patron_id);
        u32::try_from(count).map_err(|_| LibraryError::persistence("counting active loans"))
    }

    async fn get_active_borrow_record(
        &self,
        patron_id: &PatronId,
        book_id: BookId,
    ) -> Result<Option<BorrowRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .newest_active_index(patron_id, book_id)
            .and_then(|index| state.records.get(index))
            .cloned())
    }

    async fn get_patron_borrow_records(&self, patron_id: &PatronId) -> Result<Vec<BorrowRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<BorrowRecord> = state
            .records
            .iter()
            .filter(|r| &r.patron_id == patron_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    async fn checkout(&self, loan: &NewLoan, max_active_loans: u32) -> Result<BorrowRecord> {
        let mut state = self.state.lock().await;

        let book_index = state
            .books
            .iter()
            .position(|b| b.id == loan.book_id)
            .ok_or(LibraryError::BookNotFound {
                book_id: loan.book_id,
            })?;
        if !state.books[book_index].is_available() {
            return Err(LibraryError::BookUnavailable {
                book_id: loan.book_id,
            });
        }
        if state.active_count(&loan.patron_id) >= max_active_loans as usize {
            return Err(LibraryError::BorrowLimitExceeded {
                limit: max_active_loans,
            });
        }
        if state
            .newest_active_index(&loan.patron_id, loan.book_id)
            .is_some()
        {
            return Err(LibraryError::AlreadyBorrowed {
                book_id: loan.book_id,
            });
        }

        self.check_writable("creating borrow record")?;

        state.next_record_id += 1;
        let record = BorrowRecord {
            id: state.next_record_id,
            patron_id: loan.patron_id.clone(),
            book_id: loan.book_id,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: None,
        };
        state.records.push(record.clone());
        state.books[book_index].available_copies -= 1;
        Ok(record)
    }

    async fn check_in(
        &self,
        patron_id: &PatronId,
        book_id: BookId,
        returned_at: NaiveDateTime,
    ) -> Result<BorrowRecord> {
        let mut state = self.state.lock().await;

        let record_index = state
            .newest_active_index(patron_id, book_id)
            .ok_or(LibraryError::NoActiveLoan { book_id })?;
        let book_index = state
            .books
            .iter()
            .position(|b| b.id == book_id)
            .ok_or(LibraryError::BookNotFound { book_id })?;

        self.check_writable("updating availability")?;

        let book = &mut state.books[book_index];
        if book.available_copies >= book.total_copies {
            return Err(LibraryError::persistence("updating availability"));
        }
        book.available_copies += 1;

        let record = &mut state.records[record_index];
        record.return_date = Some(returned_at);
        Ok(record.clone())
    }
}
