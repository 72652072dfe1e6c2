//! Storage backends for citewalk
//!
//! The discovery engine and the maintenance passes talk to storage through
//! the `PaperStore` trait. The primary implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{MetadataUpdate, OpenStore, PaperQuery, PaperStore, StorageError, StorageResult};
