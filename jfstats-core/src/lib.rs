//! # jfstats core
//!
//! Business logic of the jfstats back end: pulling users, libraries, items,
//! activity and live playback from Jellyfin, importing exported playback
//! history, and keeping the per-server sync status honest.
//!
//! ## Architecture
//!
//! - [`providers`]: Jellyfin HTTP client and the connector seam used by sync
//! - [`mapping`]: one canonical [`jfstats_model::Session`] from every source shape
//! - [`import`]: streaming JSON/TSV import with per-record error accounting
//! - [`reconcile`]: soft foreign keys for imported sessions
//! - [`sync`]: sync-status state machine, stuck-sync sweeper, sync worker and job server
//! - [`export`]: streamed JSON export of a server's history
//! - [`database`]: repository ports with Postgres and in-memory adapters
//! - [`api`]: route table and DTOs shared with the HTTP server
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use jfstats_core::application::AppUnitOfWork;
//! use jfstats_core::database::InMemoryStore;
//! use jfstats_core::import::ImportPipeline;
//! use jfstats_model::SourceFormat;
//!
//! # async fn run() -> jfstats_core::error::Result<()> {
//! let uow = AppUnitOfWork::in_memory(Arc::new(InMemoryStore::new()));
//! let pipeline = ImportPipeline::new(uow);
//! let file = tokio::fs::File::open("jellystats-backup.json").await?;
//! let summary = pipeline.import_json(SourceFormat::Jellystats, 1, file).await?;
//! println!("imported {} of {}", summary.imported, summary.total);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod api;
pub mod application;
pub mod database;
pub mod error;
pub mod export;
pub mod import;
pub mod mapping;
pub mod providers;
pub mod reconcile;
pub mod sync;

pub use error::{Result, StatsError};
