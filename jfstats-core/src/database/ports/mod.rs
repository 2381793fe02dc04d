//! Repository ports. The Postgres adapters live in `database::postgres`, the
//! in-memory ones in `database::memory`.

pub mod catalog;
pub mod references;
pub mod servers;
pub mod sessions;

pub use catalog::CatalogRepository;
pub use references::{ReferenceLookup, ReferenceTable};
pub use servers::ServerRepository;
pub use sessions::SessionRepository;
