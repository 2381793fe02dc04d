//! # jfstats server
//!
//! axum front end of the jfstats sync/import subsystem. It exposes:
//!
//! - **Server setup**: register a Jellyfin server after verifying its API key
//! - **Sync status**: poll, trigger and reset the per-server sync state machine
//! - **Import**: stream Jellystats, legacy and Playback Reporting exports into the session table
//! - **Export**: stream every stored session of a server as one JSON document
//!
//! The background job server (full syncs, live-session polling, recent
//! activity, stuck-sync sweeps) is started by the binary alongside the router.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
