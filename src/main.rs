use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use shelfkeeper::domain::ports::{Clock, LibraryRepository};
use shelfkeeper::utils::{logger, validation, validation::Validate};
use shelfkeeper::{
    Book, CliConfig, Command, LateFee, LibraryConfig, LibraryService, Outcome, PatronReport,
    SearchField, SqliteRepository, SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = LibraryConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config file '{}'", cli.config))?;
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }

    // 初始化日誌
    let level = config.logging.level.as_deref();
    if config.json_logs() {
        logger::init_json_logger(cli.verbose, level);
    } else {
        logger::init_cli_logger(cli.verbose, level);
    }

    tracing::debug!("Starting shelfkeeper for {}", config.library.name);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let repository = SqliteRepository::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open database '{}'", config.database.url))?;
    let service = LibraryService::new(repository, SystemClock);

    let succeeded = run(&service, cli.command, cli.json).await?;
    service.repository().close().await;

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

async fn run<R: LibraryRepository, C: Clock>(
    service: &LibraryService<R, C>,
    command: Command,
    json: bool,
) -> anyhow::Result<bool> {
    let succeeded = match command {
        Command::AddBook {
            title,
            author,
            isbn,
            copies,
        } => report(
            Outcome::from_result(service.add_book(&title, &author, &isbn, copies).await),
            json,
        )?,
        Command::Borrow { patron_id, book_id } => {
            let result = match validation::validate_book_id(&book_id) {
                Ok(id) => service.borrow(&patron_id, id).await,
                Err(e) => Err(e),
            };
            report(Outcome::from_result(result), json)?
        }
        Command::Return { patron_id, book_id } => report(
            Outcome::from_result(service.return_book(&patron_id, book_id.as_str()).await),
            json,
        )?,
        Command::LateFee { patron_id, book_id } => {
            let fee = service.calculate_late_fee(&patron_id, book_id.as_str()).await;
            if json {
                print_json(&fee)?;
            } else {
                print_fee(&fee);
            }
            true
        }
        Command::Search { term, field } => {
            let books = match field.parse::<SearchField>() {
                Ok(field) => service.search(&term, field).await,
                Err(e) => Err(e),
            };
            match books {
                Ok(books) => {
                    print_books(&books, json)?;
                    true
                }
                Err(e) => report(Outcome::from_result(Err(e)), json)?,
            }
        }
        Command::Report { patron_id } => match service.status_report(&patron_id).await {
            Ok(status) if json => {
                print_json(&status)?;
                true
            }
            Ok(status) => {
                print_report(&status);
                true
            }
            Err(e) => report(Outcome::from_result(Err(e)), json)?,
        },
        Command::List => {
            let books = service.list_books().await?;
            print_books(&books, json)?;
            true
        }
    };
    Ok(succeeded)
}

fn report(outcome: Outcome, json: bool) -> anyhow::Result<bool> {
    if json {
        print_json(&outcome)?;
    } else if outcome.success {
        println!("✅ {}", outcome.message);
    } else {
        eprintln!("❌ {}", outcome.message);
    }
    Ok(outcome.success)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_fee(fee: &LateFee) {
    println!(
        "Status: {}  Days overdue: {}  Fee: ${:.2}",
        fee.status, fee.days_overdue, fee.fee_amount
    );
}

fn print_books(books: &[Book], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&books);
    }
    if books.is_empty() {
        println!("No books found.");
        return Ok(());
    }
    println!("{:>5}  {:<13}  {:>9}  {}", "ID", "ISBN", "Available", "Title / Author");
    for book in books {
        println!(
            "{:>5}  {:<13}  {:>4}/{:<4}  {} / {}",
            book.id, book.isbn, book.available_copies, book.total_copies, book.title, book.author
        );
    }
    Ok(())
}

fn print_report(report: &PatronReport) {
    println!("📋 Patron {}", report.patron_id);
    println!(
        "   Active: {}  Overdue: {}  Returned: {}  Total: {}",
        report.counts.active, report.counts.overdue, report.counts.returned, report.counts.total
    );
    for loan in &report.current_loans {
        println!(
            "   #{} \"{}\" due {} ({}, ${:.2})",
            loan.book_id,
            loan.title,
            loan.due_date.format("%Y-%m-%d"),
            loan.late_fee.status,
            loan.late_fee.fee_amount
        );
    }
    println!("   Total late fees: ${:.2}", report.total_late_fees);
}
