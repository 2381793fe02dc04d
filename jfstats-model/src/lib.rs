//! Core data model definitions shared across jfstats crates.
#![allow(missing_docs)]

pub mod catalog;
pub mod error;
pub mod import;
pub mod server;
pub mod session;

pub use catalog::{ActivityRecord, ItemRecord, LibraryRecord, UserRecord};
pub use error::{ModelError, Result as ModelResult};
pub use import::{ImportSummary, SourceFormat};
pub use server::{NewServer, ServerRecord, ServerSyncState, SyncProgress, SyncStatus};
pub use session::{
    PlayMethod, Session, StreamDescriptor, TICKS_PER_SECOND, UNKNOWN_USER,
};
