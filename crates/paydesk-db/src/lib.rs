pub mod kv_store;
pub mod sqlite_store;

pub use kv_store::{KeyValueStore, MemoryKeyValueStore};
pub use sqlite_store::SqliteKeyValueStore;
