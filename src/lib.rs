pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::{DatabaseConfig, LibraryConfig};

pub use adapters::{FixedClock, InMemoryRepository, SqliteRepository, SystemClock};
pub use core::service::LibraryService;
pub use domain::model::{Book, BorrowRecord, FeeStatus, LateFee, PatronId, PatronReport, SearchField};
pub use utils::error::{ErrorKind, LibraryError, Outcome, Result};
