use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::database::InMemoryStore;
use crate::database::PostgresDatabase;
use crate::database::ports::{
    CatalogRepository, ReferenceLookup, ServerRepository, SessionRepository,
};

/// Repository ports used by the import pipeline, the sync workers and the
/// HTTP handlers.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub servers: Arc<dyn ServerRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub references: Arc<dyn ReferenceLookup>,
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork")
            .field("servers", &type_name_of_val(self.servers.as_ref()))
            .field("sessions", &type_name_of_val(self.sessions.as_ref()))
            .field("catalog", &type_name_of_val(self.catalog.as_ref()))
            .field("references", &type_name_of_val(self.references.as_ref()))
            .finish()
    }
}

impl AppUnitOfWork {
    pub fn from_postgres(postgres: &PostgresDatabase) -> Self {
        Self {
            servers: Arc::new(postgres.servers().clone()),
            sessions: Arc::new(postgres.sessions().clone()),
            catalog: Arc::new(postgres.catalog().clone()),
            references: Arc::new(postgres.references().clone()),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            servers: store.clone(),
            sessions: store.clone(),
            catalog: store.clone(),
            references: store,
        }
    }
}
