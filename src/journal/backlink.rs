//! The reference line pointing from today's note at the previous one.

use super::{
    gap::PreviousNote,
    sections::{heading_level, heading_matches, join_lines, split_lines},
};
use crate::utils::time::date_to_note_name;

pub const YESTERDAY_PREFIX: &str = "Yesterday's note: ";
pub const LAST_ENTRY_PREFIX: &str = "The last journal entry was ";

pub fn backlink_line(previous: &PreviousNote) -> String {
    let link = format!("[[{}]]", date_to_note_name(previous.date));
    if previous.is_yesterday() {
        format!("{YESTERDAY_PREFIX}{link}")
    } else {
        format!(
            "{LAST_ENTRY_PREFIX}{link}, which was {} days ago",
            previous.gap_days
        )
    }
}

pub fn has_backlink(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim();
        line.starts_with(YESTERDAY_PREFIX) || line.starts_with(LAST_ENTRY_PREFIX)
    })
}

/// Where the backlink goes: after the anchor heading when it exists, otherwise after front matter
/// and the title heading, otherwise at the very top.
fn insertion_index(lines: &[String], anchor: Option<&str>) -> usize {
    let anchor_title = anchor.map(|a| a.trim_start_matches('#').trim());
    if let Some(index) =
        anchor_title.and_then(|title| lines.iter().position(|l| heading_matches(l, title)))
    {
        return index + 1;
    }

    let mut index = 0;
    if lines.first().is_some_and(|l| l.trim() == "---") {
        if let Some(close) = lines[1..].iter().position(|l| l.trim() == "---") {
            index = close + 2;
        }
    }
    let next_content = (index..lines.len()).find(|i| !lines[*i].trim().is_empty());
    match next_content {
        Some(i) if heading_level(&lines[i]) == Some(1) => i + 1,
        _ => index,
    }
}

/// Inserts the backlink exactly once. Text that already has a backlink, or a first note with no
/// predecessor, comes back unchanged.
pub fn insert_backlink(
    text: &str,
    previous: Option<&PreviousNote>,
    anchor: Option<&str>,
) -> String {
    let Some(previous) = previous else {
        return text.to_string();
    };
    if has_backlink(text) {
        return text.to_string();
    }

    let (mut lines, trailing) = split_lines(text);
    let at = insertion_index(&lines, anchor);
    let mut insertion = Vec::new();
    if at > 0 && lines.get(at - 1).is_some_and(|l| !l.trim().is_empty()) {
        insertion.push(String::new());
    }
    insertion.push(backlink_line(previous));
    if lines.get(at).is_some_and(|l| !l.trim().is_empty()) {
        insertion.push(String::new());
    }
    lines.splice(at..at, insertion);
    join_lines(&lines, trailing || lines.len() == 1)
}
