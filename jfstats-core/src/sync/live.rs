//! Turns `/Sessions` snapshots into finished playback rows.
//!
//! A playback stays in memory while Jellyfin keeps reporting it and is handed
//! back once when it disappears from the snapshot. Playbacks the caller could
//! not store are requeued and handed back again on the next snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use jfstats_model::{Session, SourceFormat};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::mapping::fields::{Field, FieldReader};
use crate::mapping::{live_session_id, map_record};

type PlaybackKey = (i32, String, String);

#[derive(Debug, Clone)]
struct InFlight {
    session: Session,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct LiveSessionTracker {
    in_flight: Mutex<HashMap<PlaybackKey, InFlight>>,
    unsaved: Mutex<Vec<Session>>,
}

impl LiveSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn in_flight(&self, server_id: i32) -> usize {
        self.in_flight
            .lock()
            .await
            .keys()
            .filter(|(server, _, _)| *server == server_id)
            .count()
    }

    /// Finished playbacks waiting for another store attempt.
    pub async fn unsaved(&self, server_id: i32) -> usize {
        self.unsaved
            .lock()
            .await
            .iter()
            .filter(|session| session.server_id == server_id)
            .count()
    }

    /// Hands finished playbacks back for the next [`observe`](Self::observe)
    /// of their server.
    pub async fn requeue(&self, sessions: Vec<Session>) {
        if sessions.is_empty() {
            return;
        }
        self.unsaved.lock().await.extend(sessions);
    }

    /// Feeds one snapshot of `/Sessions` for a server and returns the
    /// playbacks that ended since the previous snapshot, preceded by any
    /// requeued ones of that server.
    pub async fn observe(
        &self,
        server_id: i32,
        records: &[Value],
        now: DateTime<Utc>,
    ) -> Vec<Session> {
        let mut in_flight = self.in_flight.lock().await;
        let mut seen = HashSet::new();

        for record in records {
            let session = match map_record(SourceFormat::LiveSession, record, server_id) {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(err) => {
                    debug!(server_id, error = %err, "ignoring malformed live session");
                    continue;
                }
            };
            let reader = FieldReader::new(record, SourceFormat::LiveSession);
            let key = (
                server_id,
                reader.str(Field::Id).unwrap_or_default(),
                session.item_id.clone().unwrap_or_default(),
            );
            seen.insert(key.clone());

            in_flight
                .entry(key)
                .and_modify(|entry| {
                    entry.session = session.clone();
                    entry.last_seen = now;
                })
                .or_insert(InFlight {
                    session,
                    first_seen: now,
                    last_seen: now,
                });
        }

        let ended: Vec<PlaybackKey> = in_flight
            .keys()
            .filter(|key| key.0 == server_id && !seen.contains(*key))
            .cloned()
            .collect();

        let mut finished: Vec<Session> = {
            let mut unsaved = self.unsaved.lock().await;
            let (retry, other) = std::mem::take(&mut *unsaved)
                .into_iter()
                .partition(|session| session.server_id == server_id);
            *unsaved = other;
            retry
        };
        finished.extend(
            ended
                .into_iter()
                .filter_map(|key| in_flight.remove(&key).map(|entry| finish(&key, entry))),
        );
        finished
    }
}

fn finish(key: &PlaybackKey, entry: InFlight) -> Session {
    let (server_id, session_id, item_id) = key;
    let InFlight {
        mut session,
        first_seen,
        last_seen,
    } = entry;

    session.id = live_session_id(*server_id, session_id, item_id, Some(first_seen));
    session.start_time = Some(first_seen);
    session.end_time = Some(last_seen);
    session.last_activity_date = Some(last_seen);
    session.is_active = false;
    let watched = last_seen.signed_duration_since(first_seen).num_seconds();
    if watched > 0 {
        session.play_duration = watched;
    }
    session
}
