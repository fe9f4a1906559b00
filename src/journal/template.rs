//! Daily template loading and placeholder expansion.

use std::{
    fmt::Write,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use crate::{
    error::{JournalError, JournalResult},
    utils::time::date_to_note_name,
};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(date|time|title)\s*(?::([^}]*))?\}\}")
        .expect("placeholder pattern is valid")
});

/// Moment tokens, longest first so `MMMM` wins over `MM`.
const MOMENT_TOKENS: [(&str, &str); 16] = [
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("DD", "%d"),
    ("D", "%-d"),
    ("HH", "%H"),
    ("H", "%-H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("A", "%p"),
];

/// Converts a Moment-style format string (the one Obsidian uses) into a chrono one. Text inside
/// `[...]` is copied literally.
pub fn moment_to_chrono(format: &str) -> String {
    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                result.push_str(&rest[1..close].replace('%', "%%"));
                rest = &rest[close + 1..];
                continue;
            }
        }
        for (token, replacement) in MOMENT_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                result.push_str(replacement);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            result.push_str("%%");
        } else {
            result.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    result
}

fn format_moment(moment: NaiveDateTime, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", moment.format(&moment_to_chrono(format))).ok()?;
    Some(out)
}

/// Expands `{{date}}`, `{{time}}`, `{{title}}` and their `:FORMAT` forms. Anything not understood
/// is left as written.
pub fn render(template: &str, date: NaiveDate, now: DateTime<FixedOffset>) -> String {
    let moment = date.and_time(now.time());
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let verbatim = || caps[0].to_string();
            let format = caps.get(2).map(|m| m.as_str().trim());
            match (&caps[1], format) {
                ("title", None) | ("date", None) => date_to_note_name(date),
                ("time", None) => moment.format("%H:%M").to_string(),
                ("date" | "time", Some(format)) if !format.is_empty() => {
                    format_moment(moment, format).unwrap_or_else(verbatim)
                }
                _ => verbatim(),
            }
        })
        .into_owned()
}

pub struct TemplateResolver {
    path: PathBuf,
}

impl TemplateResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the template and expands it for `date`.
    pub async fn resolve(
        &self,
        date: NaiveDate,
        now: DateTime<FixedOffset>,
    ) -> JournalResult<String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(JournalError::TemplateNotFound(self.path.clone()))
            }
            Err(e) => return Err(JournalError::io("read template", &self.path, e)),
        };
        let text = String::from_utf8(bytes).map_err(|source| JournalError::TemplateRead {
            path: self.path.clone(),
            source,
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        Ok(render(text, date, now))
    }
}
