use std::io::BufReader;

use jfstats_model::{ImportSummary, SourceFormat};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::io::SyncIoBridge;
use tracing::{debug, info, instrument, warn};

use crate::application::AppUnitOfWork;
use crate::error::{Result, StatsError};
use crate::mapping::map_record;
use crate::mapping::playback_reporting::{is_tsv_header, tsv_line_to_record};
use crate::reconcile::ReferenceResolver;

use super::json::stream_records;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
/// Longest TSV row kept in memory; longer rows are skipped.
pub const DEFAULT_MAX_TSV_LINE_BYTES: usize = 64 * 1024;

/// Streams an uploaded export through the mapper, FK reconciliation and the
/// session repository, one record at a time.
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    uow: AppUnitOfWork,
    channel_capacity: usize,
    max_line_bytes: usize,
}

impl ImportPipeline {
    pub fn new(uow: AppUnitOfWork) -> Self {
        Self {
            uow,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_line_bytes: DEFAULT_MAX_TSV_LINE_BYTES,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max.max(1);
        self
    }

    /// Imports `reader` as JSON, or as Playback Reporting TSV when `tsv` is set.
    pub async fn import<R>(
        &self,
        format: SourceFormat,
        server_id: i32,
        reader: R,
        tsv: bool,
    ) -> Result<ImportSummary>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        if tsv && format == SourceFormat::PlaybackReporting {
            self.import_tsv(server_id, reader).await
        } else {
            self.import_json(format, server_id, reader).await
        }
    }

    /// The document is parsed on a blocking thread and records are handed
    /// over through a bounded channel, so a slow database slows the parser
    /// down instead of buffering the upload.
    #[instrument(skip(self, reader))]
    pub async fn import_json<R>(
        &self,
        format: SourceFormat,
        server_id: i32,
        reader: R,
    ) -> Result<ImportSummary>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Value>(self.channel_capacity);
        let bridge = SyncIoBridge::new(reader);
        let parser =
            tokio::task::spawn_blocking(move || stream_records(BufReader::new(bridge), format, tx));

        let mut summary = ImportSummary::default();
        while let Some(record) = rx.recv().await {
            self.process_record(format, server_id, &record, &mut summary)
                .await;
        }

        let (outcome, parsed) = parser
            .await
            .map_err(|err| StatsError::Internal(format!("import parser task failed: {err}")))?;
        if outcome.ignored_bare > 0 {
            debug!(
                server_id,
                ignored = outcome.ignored_bare,
                "ignored bare objects after a Jellystats wrapper section"
            );
        }

        let parse_error = match parsed {
            Ok(()) => None,
            Err(err) => {
                warn!(server_id, processed = summary.total, error = %err, "import stream is malformed");
                summary.errors += 1;
                Some(err.to_string())
            }
        };
        finish(format, server_id, summary, parse_error)
    }

    /// Playback Reporting TSV: one row per line, optional header line.
    #[instrument(skip(self, reader))]
    pub async fn import_tsv<R>(&self, server_id: i32, reader: R) -> Result<ImportSummary>
    where
        R: AsyncRead + Unpin,
    {
        let format = SourceFormat::PlaybackReporting;
        let mut lines = tokio::io::BufReader::new(reader);
        let mut buf = Vec::new();
        let mut summary = ImportSummary::default();
        let mut first = true;

        loop {
            match read_capped_line(&mut lines, &mut buf, self.max_line_bytes).await? {
                LineRead::Eof => break,
                LineRead::Line => {}
                LineRead::TooLong => {
                    warn!(server_id, max_bytes = self.max_line_bytes, "skipping over-long TSV line");
                    first = false;
                    summary.total += 1;
                    summary.skipped += 1;
                    continue;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            if std::mem::take(&mut first) && is_tsv_header(line) {
                continue;
            }
            match tsv_line_to_record(line) {
                Some(record) => {
                    self.process_record(format, server_id, &record, &mut summary)
                        .await
                }
                None => {
                    summary.total += 1;
                    summary.skipped += 1;
                }
            }
        }
        finish(format, server_id, summary, None)
    }

    async fn process_record(
        &self,
        format: SourceFormat,
        server_id: i32,
        record: &Value,
        summary: &mut ImportSummary,
    ) {
        summary.total += 1;
        let mut session = match map_record(format, record, server_id) {
            Ok(Some(session)) => session,
            Ok(None) => {
                summary.skipped += 1;
                return;
            }
            Err(err) => {
                debug!(server_id, error = %err, "record rejected by mapper");
                summary.errors += 1;
                return;
            }
        };

        ReferenceResolver::new(self.uow.references.as_ref())
            .apply(&mut session)
            .await;

        match self.uow.sessions.insert_session(&session).await {
            Ok(true) => summary.imported += 1,
            Ok(false) => debug!(server_id, session_id = %session.id, "session already imported"),
            Err(err) => {
                warn!(server_id, session_id = %session.id, error = %err, "failed to store session");
                summary.errors += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRead {
    Eof,
    Line,
    TooLong,
}

/// Reads one `\n`-terminated line into `buf`, holding at most `max` bytes.
/// The remainder of an over-long line is consumed and dropped.
async fn read_capped_line<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.len() <= max || buf.ends_with(b"\n") {
        return Ok(LineRead::Line);
    }
    loop {
        buf.clear();
        let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if read == 0 || buf.ends_with(b"\n") {
            buf.clear();
            return Ok(LineRead::TooLong);
        }
    }
}

fn finish(
    format: SourceFormat,
    server_id: i32,
    summary: ImportSummary,
    parse_error: Option<String>,
) -> Result<ImportSummary> {
    if summary.total == 0 {
        let message = match parse_error {
            Some(err) => format!("No records found in {format} import: {err}"),
            None => format!("No records found in {format} import"),
        };
        return Err(StatsError::Import(message));
    }
    info!(
        server_id,
        %format,
        imported = summary.imported,
        total = summary.total,
        errors = summary.errors,
        skipped = summary.skipped,
        duplicates = summary.duplicates(),
        "import finished"
    );
    Ok(summary)
}

/// Whether an upload should be read as Playback Reporting TSV.
pub fn detect_tsv(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    let by_type = content_type.is_some_and(|value| {
        let mime = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        mime == "text/tab-separated-values" || mime == "text/plain"
    });
    let by_name = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".tsv"));
    by_type || by_name
}
