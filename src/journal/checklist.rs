//! Checklist items and the carryover of unfinished ones. Everything here is a pure function of
//! note text so it can be tested without touching disk.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sections::{end_of_content, heading_matches, join_lines, section_bounds, split_lines};
use crate::{journal::gap::PreviousNote, summary::SummaryKind};

/// Marker syntax for checklist lines. Defaults to the markdown task list syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistSyntax {
    pub open_marker: String,
    pub done_markers: Vec<String>,
}

impl Default for ChecklistSyntax {
    fn default() -> Self {
        Self {
            open_marker: "- [ ]".into(),
            done_markers: vec!["- [x]".into(), "- [X]".into()],
        }
    }
}

impl ChecklistSyntax {
    pub fn validate(&self) -> Result<(), String> {
        if self.open_marker.trim().is_empty() {
            return Err("checklist open_marker can't be empty".into());
        }
        if self.done_markers.iter().any(|m| m.trim().is_empty()) {
            return Err("checklist done_markers can't contain empty markers".into());
        }
        if self.done_markers.iter().any(|m| m.trim() == self.open_marker.trim()) {
            return Err("checklist open_marker can't also be a done marker".into());
        }
        ChecklistMatcher::new(self).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    /// The normalized line: trimmed, marker included.
    pub text: String,
    /// Text after the marker.
    pub body: String,
    pub completed: bool,
    /// Date of the note the item was read from.
    pub source: Option<NaiveDate>,
}

/// Compiled form of [ChecklistSyntax].
#[derive(Debug, Clone)]
pub struct ChecklistMatcher {
    pattern: Regex,
    open_marker: String,
}

impl ChecklistMatcher {
    pub fn new(syntax: &ChecklistSyntax) -> Result<Self, String> {
        let open_marker = syntax.open_marker.trim().to_string();
        let mut markers = std::iter::once(open_marker.clone())
            .chain(syntax.done_markers.iter().map(|m| m.trim().to_string()))
            .collect::<Vec<_>>();
        // Longest first so a marker that prefixes another never wins.
        markers.sort_by_key(|m| std::cmp::Reverse(m.len()));
        let alternatives = markers
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"^\s*(?P<marker>{alternatives})(?:\s+(?P<body>.*?))?\s*$");
        let pattern =
            Regex::new(&pattern).map_err(|e| format!("invalid checklist markers: {e}"))?;
        Ok(Self {
            pattern,
            open_marker,
        })
    }

    pub fn parse_line(&self, line: &str, source: Option<NaiveDate>) -> Option<ChecklistItem> {
        let captures = self.pattern.captures(line)?;
        let marker = captures.name("marker")?.as_str();
        let body = captures.name("body").map_or("", |m| m.as_str()).to_string();
        Some(ChecklistItem {
            text: line.trim().to_string(),
            completed: marker != self.open_marker,
            body,
            source,
        })
    }

    /// All checklist items in order of appearance, optionally limited to one section.
    pub fn items(
        &self,
        text: &str,
        section: Option<&str>,
        source: Option<NaiveDate>,
    ) -> Vec<ChecklistItem> {
        let lines = text.lines().collect::<Vec<_>>();
        let range = match section {
            Some(title) => match section_bounds(&lines, title) {
                Some((start, end)) => start + 1..end,
                None => return vec![],
            },
            None => 0..lines.len(),
        };
        lines[range]
            .iter()
            .filter_map(|line| self.parse_line(line, source))
            .collect()
    }

    /// Unfinished items of a previous note, in source order, each distinct text once. Items with
    /// an empty body carry nothing and are skipped.
    pub fn carryover_candidates(
        &self,
        previous_text: &str,
        section: Option<&str>,
        source: Option<NaiveDate>,
    ) -> Vec<ChecklistItem> {
        let mut seen = Vec::<String>::new();
        self.items(previous_text, section, source)
            .into_iter()
            .filter(|item| !item.completed && !item.body.is_empty())
            .filter(|item| {
                if seen.contains(&item.text) {
                    false
                } else {
                    seen.push(item.text.clone());
                    true
                }
            })
            .collect()
    }

    /// Whether `today` already holds the item, either verbatim or as a checklist item with the
    /// same body in any state.
    fn is_present(&self, today_lines: &[String], item: &ChecklistItem) -> bool {
        today_lines.iter().any(|line| {
            line.trim() == item.text
                || self
                    .parse_line(line, None)
                    .is_some_and(|existing| existing.body == item.body)
        })
    }

    /// Appends carried items that `today` doesn't have yet, ahead of any generated summary
    /// section. Returns the new text and the items that were actually inserted; running it again
    /// on its own output inserts nothing.
    pub fn merge_carryover(
        &self,
        today: &str,
        candidates: &[ChecklistItem],
        section: Option<&str>,
        previous: Option<&PreviousNote>,
    ) -> (String, Vec<ChecklistItem>) {
        let (mut lines, _) = split_lines(today);
        let missing = candidates
            .iter()
            .filter(|item| !self.is_present(&lines, item))
            .cloned()
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return (today.to_string(), missing);
        }

        let mut insertion = Vec::new();
        if let Some(note) = previous.filter(|p| p.gap_days > 1).map(provenance_comment) {
            if !lines.iter().any(|line| line.trim() == note) {
                insertion.push(note);
            }
        }
        insertion.extend(missing.iter().map(|item| item.text.clone()));

        let (from, to) = match section.and_then(|title| section_bounds(&lines, title)) {
            Some((start, end)) => (start + 1, end),
            None => (0, lines.len()),
        };
        let at = end_of_content(&lines, from, generated_section_start(&lines, from, to));
        let needs_gap_after = lines.get(at).is_some_and(|line| !line.trim().is_empty());
        if needs_gap_after {
            insertion.push(String::new());
        }
        lines.splice(at..at, insertion);

        (join_lines(&lines, true), missing)
    }
}

/// Index of the first summary heading in `lines[from..to]`, or `to`. Summary sections are
/// regenerated wholesale, so nothing the user owns may be placed inside them.
fn generated_section_start(lines: &[String], from: usize, to: usize) -> usize {
    (from..to)
        .find(|i| {
            SummaryKind::ALL
                .iter()
                .any(|kind| heading_matches(&lines[*i], kind.title()))
        })
        .unwrap_or(to)
}

/// Comment explaining where carried tasks came from after a multi-day gap.
pub fn provenance_comment(previous: &PreviousNote) -> String {
    format!(
        "<!-- Tasks carried over from {}, {} days ago -->",
        previous.date.format("%Y-%m-%d"),
        previous.gap_days
    )
}
