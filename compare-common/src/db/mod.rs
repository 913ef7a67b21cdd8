//! Database schema, key-value meta store, sessions and accounts

pub mod init;
pub mod meta;
pub mod sessions;
pub mod users;

pub use init::*;
pub use meta::{purge_compare_data, MemoryMetaStore, MetaStore, PurgeReport, SqliteMetaStore};
pub use sessions::SessionRecord;
pub use users::UserRecord;
