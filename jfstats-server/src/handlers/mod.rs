pub mod export;
pub mod health;
pub mod import;
pub mod servers;
pub mod sync;
