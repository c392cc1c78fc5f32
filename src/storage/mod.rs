pub mod document;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use document::DocumentStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::Storage;

/// Outcome of `db setup`: plan count, backfilled levels and known indexes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub plans: usize,
    pub backfilled: usize,
    pub indexes: Vec<String>,
}
