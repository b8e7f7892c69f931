// Adapters layer: concrete implementations of the domain ports (storage, time).

pub mod clock;
pub mod memory;
pub mod sqlite;

pub use clock::{FixedClock, SystemClock};
pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;
