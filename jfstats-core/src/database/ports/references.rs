use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Tables a session may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceTable {
    Users,
    Items,
}

impl ReferenceTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceTable::Users => "users",
            ReferenceTable::Items => "items",
        }
    }
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Whether `id` exists in `table` for the given server.
    async fn exists(&self, table: ReferenceTable, server_id: i32, id: &str) -> Result<bool>;
}
