use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::LazyLock,
};

use chrono::{DateTime, FixedOffset, NaiveDate};
use futures::{stream, StreamExt, TryStreamExt};
use regex::Regex;
use tracing::debug;

use crate::{
    error::{JournalError, JournalResult},
    fs::operations::replace_file,
    utils::time::{date_to_note_name, note_name_to_date},
};

pub const NOTE_EXTENSION: &str = "md";
const MARKER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*<small>(Created|Last modified):\s*(.*?)</small>\s*$")
        .expect("marker pattern is valid")
});

/// Daily notes inside the vault directory, one `YYYY-MM-DD.md` per day.
pub struct NoteStore {
    dir: PathBuf,
}

impl NoteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.{NOTE_EXTENSION}", date_to_note_name(date)))
    }

    pub async fn read(&self, date: NaiveDate) -> JournalResult<Option<String>> {
        let path = self.path_for(date);
        match tokio::fs::read_to_string(&path).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(JournalError::io("read note", path, e)),
        }
    }

    /// Dates of every daily note in the vault. Other files are ignored.
    pub async fn list_dates(&self) -> JournalResult<Vec<NaiveDate>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| JournalError::io("list vault", &self.dir, e))?;
        let mut dates = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| JournalError::io("list vault", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some(NOTE_EXTENSION) {
                continue;
            }
            if let Some(date) = path
                .file_stem()
                .and_then(|v| v.to_str())
                .and_then(note_name_to_date)
            {
                dates.push(date);
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }

    /// Reads the notes that exist among `dates`, keeping the given order.
    pub async fn read_many(
        &self,
        dates: Vec<NaiveDate>,
    ) -> JournalResult<Vec<(NaiveDate, String)>> {
        let notes = stream::iter(dates)
            .map(|date| async move { self.read(date).await.map(|v| v.map(|text| (date, text))) })
            .buffered(4)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(notes.into_iter().flatten().collect())
    }

    /// Atomically writes the note. In `create_new` mode nothing is written and `false` is returned
    /// when the note appeared in the meantime.
    pub async fn write(
        &self,
        date: NaiveDate,
        text: &str,
        create_new: bool,
    ) -> JournalResult<bool> {
        let path = self.path_for(date);
        debug!("Writing {path:?}");
        match replace_file(&path, text, !create_new).await {
            Ok(()) => Ok(true),
            Err(e) if create_new && e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(JournalError::io("write note", path, e)),
        }
    }
}

/// `Created` and `Last modified` lines kept at the bottom of a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub created: Option<String>,
    pub last_modified: Option<String>,
}

impl Markers {
    pub fn timestamp(now: DateTime<FixedOffset>) -> String {
        now.format(MARKER_TIME_FORMAT).to_string()
    }
}

/// Separates the markers from the rest of the note so content comparisons ignore them.
pub fn strip_markers(text: &str) -> (String, Markers) {
    let mut markers = Markers::default();
    let mut body = vec![];
    for line in text.lines() {
        match MARKER.captures(line) {
            Some(caps) if &caps[1] == "Created" => markers.created = Some(caps[2].to_string()),
            Some(caps) => markers.last_modified = Some(caps[2].to_string()),
            None => body.push(line),
        }
    }
    let mut body = body.join("\n").trim_end().to_string();
    if !body.is_empty() {
        body.push('\n');
    }
    (body, markers)
}

pub fn compose(body: &str, markers: &Markers) -> String {
    let mut text = body.trim_end().to_string();
    let lines = [
        markers.created.as_ref().map(|v| format!("<small>Created: {v}</small>")),
        markers
            .last_modified
            .as_ref()
            .map(|v| format!("<small>Last modified: {v}</small>")),
    ];
    let mut first = true;
    for line in lines.into_iter().flatten() {
        if !text.is_empty() {
            text.push_str(if first { "\n\n" } else { "\n" });
        }
        first = false;
        text.push_str(&line);
    }
    text.push('\n');
    text
}
