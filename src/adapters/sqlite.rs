use crate::config::DatabaseConfig;
use crate::domain::model::{Book, BookId, BorrowRecord, NewBook, NewLoan, PatronId};
use crate::domain::ports::LibraryRepository;
use crate::utils::error::{LibraryError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: [&str; 4] = [
    r#"
CREATE TABLE IF NOT EXISTS books (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	title TEXT NOT NULL,
	author TEXT NOT NULL,
	isbn TEXT NOT NULL UNIQUE,
	total_copies INTEGER NOT NULL CHECK(total_copies > 0),
	available_copies INTEGER NOT NULL,
	CHECK(available_copies >= 0 AND available_copies <= total_copies)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS borrow_records (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	patron_id TEXT NOT NULL,
	book_id INTEGER NOT NULL,
	borrow_date TEXT NOT NULL,
	due_date TEXT NOT NULL,
	return_date TEXT DEFAULT NULL,
	FOREIGN KEY(book_id) REFERENCES books(id)
)"#,
    r#"
CREATE UNIQUE INDEX IF NOT EXISTS one_active_loan
	ON borrow_records(patron_id, book_id) WHERE return_date IS NULL"#,
    r#"
CREATE INDEX IF NOT EXISTS borrow_records_by_patron
	ON borrow_records(patron_id, return_date)"#,
];

const BOOK_COLUMNS: &str = "id, title, author, isbn, total_copies, available_copies";
const RECORD_COLUMNS: &str = "id, patron_id, book_id, borrow_date, due_date, return_date";

#[derive(Debug, FromRow)]
struct BookRow {
    id: i64,
    title: String,
    author: String,
    isbn: String,
    total_copies: i64,
    available_copies: i64,
}

impl TryFrom<BookRow> for Book {
    type Error = LibraryError;

    fn try_from(row: BookRow) -> Result<Self> {
        let copies = |value: i64| {
            u32::try_from(value).map_err(|_| LibraryError::persistence("reading book copies"))
        };
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            total_copies: copies(row.total_copies)?,
            available_copies: copies(row.available_copies)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: i64,
    patron_id: String,
    book_id: i64,
    borrow_date: NaiveDateTime,
    due_date: NaiveDateTime,
    return_date: Option<NaiveDateTime>,
}

impl TryFrom<RecordRow> for BorrowRecord {
    type Error = LibraryError;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok(BorrowRecord {
            id: row.id,
            patron_id: PatronId::parse(&row.patron_id)
                .map_err(|_| LibraryError::persistence("reading borrow record"))?,
            book_id: row.book_id,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
        })
    }
}

/// Logs the driver error and reports the failed operation.
fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> LibraryError {
    move |e| {
        tracing::error!("SQLite error while {}: {}", operation, e);
        LibraryError::persistence(operation)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// SQLite-backed repository. Multi-step writes run inside one transaction.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&config.url)?.create_if_missing(config.create_if_missing);

        // 記憶體資料庫每條連線各自獨立，只能保留單一連線且永不回收
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };
        let pool = pool_options
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        let repository = Self { pool };
        repository.migrate().await?;
        tracing::debug!(url = %config.url, "SQLite repository ready");
        Ok(repository)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::in_memory()).await
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn begin(&self, operation: &'static str) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(db_error(operation))
    }
}

#[async_trait]
impl LibraryRepository for SqliteRepository {
    async fn get_book_by_id(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE id = ?",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("reading the book"))?;
        row.map(Book::try_from).transpose()
    }

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE isbn = ?",
            BOOK_COLUMNS
        ))
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("reading the book"))?;
        row.map(Book::try_from).transpose()
    }

    async fn get_all_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books ORDER BY id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing books"))?;
        rows.into_iter().map(Book::try_from).collect()
    }

    async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let result = sqlx::query(
            "INSERT INTO books (title, author, isbn, total_copies, available_copies) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(i64::from(book.total_copies))
        .bind(i64::from(book.total_copies))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Book {
                id: done.last_insert_rowid(),
                title: book.title.clone(),
                author: book.author.clone(),
                isbn: book.isbn.clone(),
                total_copies: book.total_copies,
                available_copies: book.total_copies,
            }),
            Err(e) if is_unique_violation(&e) => Err(LibraryError::DuplicateIsbnError {
                isbn: book.isbn.clone(),
            }),
            Err(e) => Err(db_error("adding the book")(e)),
        }
    }

    async fn get_patron_borrow_count(&self, patron_id: &PatronId) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE patron_id = ? AND return_date IS NULL",
        )
        .bind(patron_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("counting active loans"))?;
        u32::try_from(count).map_err(|_| LibraryError::persistence("counting active loans"))
    }

    async fn get_active_borrow_record(
        &self,
        patron_id: &PatronId,
        book_id: BookId,
    ) -> Result<Option<BorrowRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {} FROM borrow_records \
             WHERE patron_id = ? AND book_id = ? AND return_date IS NULL \
             ORDER BY id DESC LIMIT 1",
            RECORD_COLUMNS
        ))
        .bind(patron_id.as_str())
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("reading the active loan"))?;
        row.map(BorrowRecord::try_from).transpose()
    }

    async fn get_patron_borrow_records(&self, patron_id: &PatronId) -> Result<Vec<BorrowRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {} FROM borrow_records WHERE patron_id = ? ORDER BY id DESC",
            RECORD_COLUMNS
        ))
        .bind(patron_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("reading borrow history"))?;
        rows.into_iter().map(BorrowRecord::try_from).collect()
    }

    async fn checkout(&self, loan: &NewLoan, max_active_loans: u32) -> Result<BorrowRecord> {
        let mut tx = self.begin("creating borrow record").await?;

        // The guarded decrement takes the write lock first, so the reads
        // below see a stable view until commit.
        let reserved = sqlx::query(
            "UPDATE books SET available_copies = available_copies - 1 \
             WHERE id = ? AND available_copies > 0",
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("updating book availability"))?;

        if reserved.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE id = ?")
                .bind(loan.book_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("reading the book"))?;
            return Err(match exists {
                Some(_) => LibraryError::BookUnavailable {
                    book_id: loan.book_id,
                },
                None => LibraryError::BookNotFound {
                    book_id: loan.book_id,
                },
            });
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE patron_id = ? AND return_date IS NULL",
        )
        .bind(loan.patron_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("counting active loans"))?;
        if active >= i64::from(max_active_loans) {
            return Err(LibraryError::BorrowLimitExceeded {
                limit: max_active_loans,
            });
        }

        let inserted = sqlx::query(
            "INSERT INTO borrow_records (patron_id, book_id, borrow_date, due_date) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(loan.patron_id.as_str())
        .bind(loan.book_id)
        .bind(loan.borrow_date)
        .bind(loan.due_date)
        .execute(&mut *tx)
        .await;

        let record_id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(LibraryError::AlreadyBorrowed {
                    book_id: loan.book_id,
                })
            }
            Err(e) => return Err(db_error("creating borrow record")(e)),
        };

        tx.commit()
            .await
            .map_err(db_error("creating borrow record"))?;

        Ok(BorrowRecord {
            id: record_id,
            patron_id: loan.patron_id.clone(),
            book_id: loan.book_id,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: None,
        })
    }

    async fn check_in(
        &self,
        patron_id: &PatronId,
        book_id: BookId,
        returned_at: NaiveDateTime,
    ) -> Result<BorrowRecord> {
        let mut tx = self.begin("updating borrow record").await?;

        let record_id: Option<i64> = sqlx::query_scalar(
            "UPDATE borrow_records SET return_date = ? WHERE id = ( \
                SELECT id FROM borrow_records \
                WHERE patron_id = ? AND book_id = ? AND return_date IS NULL \
                ORDER BY id DESC LIMIT 1) \
             RETURNING id",
        )
        .bind(returned_at)
        .bind(patron_id.as_str())
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("updating borrow record"))?;

        let Some(record_id) = record_id else {
            return Err(LibraryError::NoActiveLoan { book_id });
        };

        let restored = sqlx::query(
            "UPDATE books SET available_copies = available_copies + 1 \
             WHERE id = ? AND available_copies < total_copies",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("updating availability"))?;

        if restored.rows_affected() == 0 {
            return Err(LibraryError::persistence("updating availability"));
        }

        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {} FROM borrow_records WHERE id = ?",
            RECORD_COLUMNS
        ))
        .bind(record_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("updating borrow record"))?;

        tx.commit().await.map_err(db_error("updating borrow record"))?;

        BorrowRecord::try_from(row)
    }
}
