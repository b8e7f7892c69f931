use chrono::{Duration, NaiveDate, NaiveDateTime};
use shelfkeeper::domain::ports::LibraryRepository;
use shelfkeeper::{
    ErrorKind, FeeStatus, FixedClock, InMemoryRepository, LibraryService, SearchField,
};

type Service = LibraryService<InMemoryRepository, FixedClock>;

fn opening_day() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

async fn catalog() -> Service {
    let service = LibraryService::new(InMemoryRepository::new(), FixedClock::new(opening_day()));
    service
        .add_book("Clean Code", "Robert Martin", "9780132350884", 1)
        .await
        .unwrap();
    service
        .add_book("Clean Architecture", "Robert Martin", "9780134494166", 1)
        .await
        .unwrap();
    service
        .add_book("The Pragmatic Programmer", "Andrew Hunt", "9780201616224", 1)
        .await
        .unwrap();
    service
}

async fn book_id(service: &Service, isbn: &str) -> i64 {
    service
        .repository()
        .get_book_by_isbn(isbn)
        .await
        .unwrap()
        .unwrap()
        .id
}

#[tokio::test]
async fn test_search_by_title_partial_case_insensitive() {
    let service = catalog().await;

    let books = service.search("clean", SearchField::Title).await.unwrap();
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Clean Code", "Clean Architecture"]);

    let books = service.search("PRAGMATIC", SearchField::Title).await.unwrap();
    assert_eq!(books.len(), 1);
}

#[tokio::test]
async fn test_search_by_author_partial_case_insensitive() {
    let service = catalog().await;

    let books = service.search("martin", SearchField::Author).await.unwrap();
    assert_eq!(books.len(), 2);
    assert!(books.iter().all(|b| b.author.to_lowercase().contains("martin")));
}

#[tokio::test]
async fn test_search_by_isbn_exact() {
    let service = catalog().await;

    let books = service
        .search("9780201616224", SearchField::Isbn)
        .await
        .unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].isbn, "9780201616224");

    let partial = service.search("978020", SearchField::Isbn).await.unwrap();
    assert!(partial.is_empty());
}

#[tokio::test]
async fn test_search_without_matches_is_empty() {
    let service = catalog().await;

    assert!(service
        .search("haskell", SearchField::Title)
        .await
        .unwrap()
        .is_empty());
    assert!(service.search("   ", SearchField::Author).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_patron_status_report() {
    let service = catalog().await;
    let patron = "999999";
    let clean_code = book_id(&service, "9780132350884").await;
    let clean_arch = book_id(&service, "9780134494166").await;
    let pragmatic = book_id(&service, "9780201616224").await;

    // One loan already closed out.
    service.borrow(patron, pragmatic).await.unwrap();
    service.return_book(patron, pragmatic).await.unwrap();

    service.borrow(patron, clean_code).await.unwrap();
    service.clock().advance(Duration::days(11));
    service.borrow(patron, clean_arch).await.unwrap();
    service.clock().advance(Duration::days(14));

    let report = service.status_report(patron).await.unwrap();

    assert_eq!(report.patron_id.as_str(), patron);
    assert_eq!(report.counts.active, 2);
    assert_eq!(report.counts.returned, 1);
    assert_eq!(report.counts.total, 3);
    assert_eq!(report.counts.overdue, 1);
    assert_eq!(report.history.len(), 3);

    // Newest loan first.
    assert_eq!(report.current_loans[0].title, "Clean Architecture");
    assert_eq!(report.current_loans[0].late_fee.status, FeeStatus::OnTime);

    let overdue = &report.current_loans[1];
    assert_eq!(overdue.book_id, clean_code);
    assert_eq!(overdue.due_date, opening_day() + Duration::days(14));
    assert_eq!(overdue.late_fee.days_overdue, 11);
    assert_eq!(overdue.late_fee.fee_amount, 7.5);

    assert_eq!(report.total_late_fees, 7.5);

    let json = serde_json::to_value(&report).unwrap();
    for key in ["patron_id", "current_loans", "total_late_fees", "counts"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn test_status_report_for_new_patron_is_empty() {
    let service = catalog().await;

    let report = service.status_report("123123").await.unwrap();
    assert!(report.current_loans.is_empty());
    assert!(report.history.is_empty());
    assert_eq!(report.total_late_fees, 0.0);
    assert_eq!(report.counts.total, 0);
}

#[tokio::test]
async fn test_status_report_rejects_bad_patron_id() {
    let service = catalog().await;

    let err = service.status_report("abc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPatronId);
}

#[tokio::test]
async fn test_list_books_in_insertion_order() {
    let service = catalog().await;

    let books = service.list_books().await.unwrap();
    let isbns: Vec<&str> = books.iter().map(|b| b.isbn.as_str()).collect();
    assert_eq!(isbns, vec!["9780132350884", "9780134494166", "9780201616224"]);
}
