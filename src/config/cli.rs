use crate::config::toml_config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "shelfkeeper")]
#[command(about = "Library catalog, lending and late-fee desk")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override the database URL from the config file
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Print query results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Add a book to the catalog
    AddBook {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: String,
        #[arg(long, allow_negative_numbers = true)]
        copies: i64,
    },
    /// Borrow a book for a patron
    Borrow { patron_id: String, book_id: String },
    /// Return a borrowed book
    Return { patron_id: String, book_id: String },
    /// Show the late fee owed on an active loan
    LateFee { patron_id: String, book_id: String },
    /// Search the catalog
    Search {
        term: String,
        #[arg(long, default_value = "title")]
        field: String,
    },
    /// Show a patron's loans, fees and history
    Report { patron_id: String },
    /// List every book in the catalog
    List,
}
