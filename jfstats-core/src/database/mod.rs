pub mod memory;
pub mod ports;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresDatabase;
