//! Configuration loading for jfstats.
//!
//! Values are resolved per key in the order: environment variable, the
//! matching key in `jfstats.toml`, built-in default. A `.env` file is read
//! first and behaves like the process environment.
#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, ImportConfig, JellyfinConfig, ServerConfig,
    SyncConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
