//! The "last successful sync" marker file.

use std::{io::ErrorKind, path::Path};

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use tracing::warn;

use crate::{
    error::{JournalError, JournalResult},
    fs::operations::replace_file,
    utils::time::NOTE_DATE_FORMAT,
};

pub const MARKER_FILE_NAME: &str = ".last_sync";

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
pub fn parse_marker(contents: &str) -> Option<NaiveDate> {
    let contents = contents.trim();
    DateTime::parse_from_rfc3339(contents)
        .map(|v| v.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(contents, NOTE_DATE_FORMAT))
        .ok()
}

/// Day of the last successful sync. A corrupt marker is treated as absent.
pub async fn read_marker(path: &Path) -> JournalResult<Option<NaiveDate>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(JournalError::io("read sync marker", path, e)),
    };
    let date = parse_marker(&contents);
    if date.is_none() {
        warn!("Ignoring unreadable sync marker {path:?}: {contents:?}");
    }
    Ok(date)
}

pub async fn write_marker(path: &Path, synced_at: DateTime<FixedOffset>) -> JournalResult<()> {
    replace_file(
        path,
        &synced_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        true,
    )
    .await
    .map_err(|e| JournalError::io("write sync marker", path, e))
}
