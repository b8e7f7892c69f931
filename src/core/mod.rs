pub mod fees;
pub mod service;

pub use crate::domain::model::{Book, BorrowRecord, LateFee, PatronId, PatronReport};
pub use crate::domain::ports::{Clock, LibraryRepository};
pub use crate::utils::error::Result;

/// Loans run for two weeks from the moment of borrowing.
pub const LOAN_PERIOD_DAYS: i64 = 14;
pub const MAX_ACTIVE_LOANS: u32 = 5;

pub const FIRST_TIER_DAYS: i64 = 7;
pub const FIRST_TIER_DAILY_FEE: f64 = 0.50;
pub const SECOND_TIER_DAILY_FEE: f64 = 1.00;
pub const LATE_FEE_CAP: f64 = 15.00;
