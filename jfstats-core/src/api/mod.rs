//! Transport surface: route constants and request/response DTOs.

pub mod routes;
pub mod types;
