use chrono::{NaiveDate, NaiveDateTime};
use shelfkeeper::domain::ports::LibraryRepository;
use shelfkeeper::{ErrorKind, FixedClock, InMemoryRepository, LibraryService, Outcome};

fn opening_day() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn new_service() -> LibraryService<InMemoryRepository, FixedClock> {
    LibraryService::new(InMemoryRepository::new(), FixedClock::new(opening_day()))
}

#[tokio::test]
async fn test_add_valid_book() {
    let service = new_service();

    let message = service
        .add_book("Clean Code", "Robert Martin", "1234567890123", 3)
        .await
        .unwrap();
    assert!(message.to_lowercase().contains("successfully added"));
    assert!(message.contains("Clean Code"));

    let book = service
        .repository()
        .get_book_by_isbn("1234567890123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.total_copies, 3);
    assert_eq!(book.available_copies, 3);
}

#[tokio::test]
async fn test_add_book_trims_input() {
    let service = new_service();

    service
        .add_book("  Refactoring  ", " Martin Fowler ", " 9780201485677 ", 2)
        .await
        .unwrap();

    let book = service
        .repository()
        .get_book_by_isbn("9780201485677")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.title, "Refactoring");
    assert_eq!(book.author, "Martin Fowler");
}

#[tokio::test]
async fn test_add_book_validation_failures() {
    let service = new_service();
    let long_title = "A".repeat(201);
    let long_author = "B".repeat(101);

    let cases = [
        ("", "Robert Martin", "1234567890123", 3, "title is required"),
        ("   ", "Robert Martin", "1234567890123", 3, "title is required"),
        (long_title.as_str(), "Robert Martin", "1234567890123", 3, "title must be less than"),
        ("Clean Code", "", "1234567890123", 3, "author is required"),
        ("Clean Code", long_author.as_str(), "1234567890123", 3, "author must be less than"),
        ("Refactoring", "Martin Fowler", "1234567890", 2, "isbn must be exactly 13 digits"),
        ("Refactoring", "Martin Fowler", "12345678901ab", 2, "isbn must be exactly 13 digits"),
        ("Test Book", "Author", "1111111111111", -1, "positive integer"),
        ("Test Book", "Author", "1111111111111", 0, "positive integer"),
    ];

    for (title, author, isbn, copies, expected) in cases {
        let err = service
            .add_book(title, author, isbn, copies)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(
            err.to_string().to_lowercase().contains(expected),
            "expected '{}' in '{}'",
            expected,
            err
        );
    }

    assert!(service.list_books().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_title_and_author_at_length_limit_are_accepted() {
    let service = new_service();

    let result = service
        .add_book(&"T".repeat(200), &"A".repeat(100), "2222222222222", 1)
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_duplicate_isbn_rejected() {
    let service = new_service();
    service
        .add_book("1984", "George Orwell", "9999999999999", 1)
        .await
        .unwrap();

    let err = service
        .add_book("Animal Farm", "Someone Else", "9999999999999", 7)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateIsbn);
    assert!(err.to_string().contains("already exists"));
    assert_eq!(service.list_books().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_book_write_failure_is_persistence_error() {
    let service = new_service();
    service.repository().fail_writes(true);

    let (success, message) = Outcome::from_result(
        service
            .add_book("Dune", "Frank Herbert", "9780441172719", 2)
            .await,
    )
    .into_tuple();

    assert!(!success);
    assert_eq!(message, "Database error occurred while adding the book.");

    service.repository().fail_writes(false);
    assert!(service.list_books().await.unwrap().is_empty());
}
