mod client;
mod types;

pub use client::{JellyfinClient, JellyfinClientConfig};
pub use types::{
    ActivityLogEntry, JellyfinItem, JellyfinUser, QueryResult, SystemInfo, UserPolicy,
    VirtualFolder,
};
