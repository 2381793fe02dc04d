//! Streams a server's session history as a single JSON document.

use std::fmt;
use std::sync::Arc;

use async_stream::try_stream;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use jfstats_model::ServerRecord;
use serde::Serialize;

use crate::database::ports::SessionRepository;
use crate::error::Result;

pub const EXPORT_FORMAT: &str = "jfstats";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub exported_at: DateTime<Utc>,
    pub server_name: String,
    pub server_id: i32,
    pub version: String,
    pub format: String,
}

impl ExportInfo {
    pub fn new(server: &ServerRecord, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            server_name: server.name.clone(),
            server_id: server.id,
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: EXPORT_FORMAT.to_string(),
        }
    }
}

pub struct ExportWriter {
    sessions: Arc<dyn SessionRepository>,
}

impl fmt::Debug for ExportWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportWriter")
            .field("sessions", &std::any::type_name_of_val(self.sessions.as_ref()))
            .finish()
    }
}

impl ExportWriter {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// `{"exportInfo":{..},"sessions":[..]}`, one chunk per session. Errors
    /// after the first chunk end the stream early; the body is then truncated.
    pub fn stream(&self, info: ExportInfo) -> BoxStream<'static, Result<Bytes>> {
        let sessions = Arc::clone(&self.sessions);
        try_stream! {
            let mut head = b"{\"exportInfo\":".to_vec();
            serde_json::to_writer(&mut head, &info)?;
            head.extend_from_slice(b",\"sessions\":[");
            yield Bytes::from(head);

            let mut rows = sessions.stream_sessions(info.server_id);
            let mut first = true;
            while let Some(session) = rows.next().await {
                let session = session?;
                let mut chunk = Vec::with_capacity(1024);
                if !std::mem::take(&mut first) {
                    chunk.push(b',');
                }
                serde_json::to_writer(&mut chunk, &session)?;
                yield Bytes::from(chunk);
            }

            yield Bytes::from_static(b"]}");
        }
        .boxed()
    }
}

/// `jfstats-export-<slug>-<YYYY-MM-DD>.json`
pub fn export_filename(server_name: &str, date: NaiveDate) -> String {
    format!(
        "jfstats-export-{}-{}.json",
        slugify(server_name),
        date.format("%Y-%m-%d")
    )
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "server".to_string()
    } else {
        slug.to_string()
    }
}
