//! Best-effort foreign key reconciliation for imported sessions.
//!
//! References that cannot be confirmed are nulled out instead of failing the
//! record; the attempted ids are kept in `raw_data.missingReferences`.

use std::any::type_name_of_val;
use std::fmt;

use jfstats_model::Session;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::database::ports::{ReferenceLookup, ReferenceTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReference {
    pub table: ReferenceTable,
    pub id: String,
    pub reason: String,
}

pub struct ReferenceResolver<'a> {
    lookup: &'a dyn ReferenceLookup,
    missing: Vec<MissingReference>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(lookup: &'a dyn ReferenceLookup) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    /// Returns the id when the referenced row exists on `server_id`. Absent
    /// ids short-circuit without a lookup; lookup failures are treated like a
    /// missing row.
    pub async fn resolve(
        &mut self,
        table: ReferenceTable,
        server_id: i32,
        id: Option<&str>,
    ) -> Option<String> {
        let id = id?;
        let reason = match self.lookup.exists(table, server_id, id).await {
            Ok(true) => return Some(id.to_string()),
            Ok(false) => "not found".to_string(),
            Err(err) => {
                warn!(%table, server_id, id, error = %err, "reference lookup failed");
                format!("lookup failed: {err}")
            }
        };
        debug!(%table, id, "dropping unresolved reference");
        self.missing.push(MissingReference {
            table,
            id: id.to_string(),
            reason,
        });
        None
    }

    pub fn missing(&self) -> &[MissingReference] {
        &self.missing
    }

    /// Resolves `user_id` and `item_id` in place and records what was dropped.
    pub async fn apply(mut self, session: &mut Session) -> Vec<MissingReference> {
        session.user_id = self
            .resolve(ReferenceTable::Users, session.server_id, session.user_id.as_deref())
            .await;
        session.item_id = self
            .resolve(ReferenceTable::Items, session.server_id, session.item_id.as_deref())
            .await;

        if !self.missing.is_empty() {
            let entries = serde_json::to_value(&self.missing).unwrap_or(Value::Array(Vec::new()));
            match &mut session.raw_data {
                Value::Object(map) => {
                    map.insert("missingReferences".to_string(), entries);
                }
                other => {
                    let original = std::mem::take(other);
                    let mut map = Map::new();
                    map.insert("original".to_string(), original);
                    map.insert("missingReferences".to_string(), entries);
                    *other = Value::Object(map);
                }
            }
        }
        self.missing
    }
}

impl fmt::Debug for ReferenceResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("lookup", &type_name_of_val(self.lookup))
            .field("missing", &self.missing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ports::references::MockReferenceLookup;
    use crate::error::StatsError;
    use mockall::predicate::eq;
    use serde_json::json;

    fn session() -> Session {
        let mut session = Session::new("s1", 1);
        session.user_id = Some("u1".into());
        session.item_id = Some("gone".into());
        session.raw_data = json!({ "Id": "s1" });
        session
    }

    #[tokio::test]
    async fn absent_ids_skip_the_lookup() {
        let mut lookup = MockReferenceLookup::new();
        lookup.expect_exists().never();

        let mut resolver = ReferenceResolver::new(&lookup);
        assert_eq!(resolver.resolve(ReferenceTable::Users, 1, None).await, None);
        assert!(resolver.missing().is_empty());
    }

    #[tokio::test]
    async fn missing_items_are_nulled_and_recorded() {
        let mut lookup = MockReferenceLookup::new();
        lookup
            .expect_exists()
            .with(eq(ReferenceTable::Users), eq(1), eq("u1"))
            .returning(|_, _, _| Ok(true));
        lookup
            .expect_exists()
            .with(eq(ReferenceTable::Items), eq(1), eq("gone"))
            .returning(|_, _, _| Ok(false));

        let mut session = session();
        let missing = ReferenceResolver::new(&lookup).apply(&mut session).await;

        assert_eq!(session.user_id.as_deref(), Some("u1"));
        assert_eq!(session.item_id, None);
        assert_eq!(missing.len(), 1);
        assert_eq!(
            session.raw_data["missingReferences"],
            json!([{ "table": "items", "id": "gone", "reason": "not found" }])
        );
        assert_eq!(session.raw_data["Id"], "s1");
    }

    #[tokio::test]
    async fn lookup_errors_degrade_like_missing_rows() {
        let mut lookup = MockReferenceLookup::new();
        lookup
            .expect_exists()
            .returning(|_, _, _| Err(StatsError::Internal("connection reset".into())));

        let mut session = session();
        let missing = ReferenceResolver::new(&lookup).apply(&mut session).await;

        assert_eq!(session.user_id, None);
        assert_eq!(session.item_id, None);
        assert_eq!(missing.len(), 2);
        assert!(missing[0].reason.contains("connection reset"));
    }
}
