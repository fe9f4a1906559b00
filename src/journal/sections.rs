//! Line-level helpers for markdown headings. Notes are edited as a list of lines so insertions
//! never disturb text the user wrote.

/// Splits text into owned lines, remembering whether it ended with a newline.
pub fn split_lines(text: &str) -> (Vec<String>, bool) {
    let trailing = text.ends_with('\n');
    (text.lines().map(str::to_string).collect(), trailing)
}

pub fn join_lines(lines: &[String], trailing_newline: bool) -> String {
    let mut text = lines.join("\n");
    if trailing_newline && !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Markdown heading level of a line, if it is a heading.
pub fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    let rest = &trimmed[level..];
    (level > 0 && (rest.is_empty() || rest.starts_with(' '))).then_some(level)
}

/// A heading matches when its whole text is `title`. Leading decoration is ignored, so
/// `## 🗓 Due in the next two weeks - Anticipation` still counts for the undecorated title.
pub fn heading_matches(line: &str, title: &str) -> bool {
    if heading_level(line).is_none() {
        return false;
    }
    let text = line.trim().trim_start_matches('#').trim();
    let title = title.trim();
    text == title || text.trim_start_matches(|c: char| !c.is_alphanumeric()) == title
}

/// Returns the heading index and the exclusive end of the section it opens. The section stops at
/// the next heading of the same or a higher level.
pub fn section_bounds<S: AsRef<str>>(lines: &[S], title: &str) -> Option<(usize, usize)> {
    let start = lines
        .iter()
        .position(|line| heading_matches(line.as_ref(), title))?;
    let level = heading_level(lines[start].as_ref()).unwrap_or(1);
    let end = lines[start + 1..]
        .iter()
        .position(|line| heading_level(line.as_ref()).is_some_and(|l| l <= level))
        .map_or(lines.len(), |offset| start + 1 + offset);
    Some((start, end))
}

/// Index right after the last non-blank line in `lines[from..to]`, or `from` when all are blank.
pub fn end_of_content<S: AsRef<str>>(lines: &[S], from: usize, to: usize) -> usize {
    (from..to)
        .rev()
        .find(|i| !lines[*i].as_ref().trim().is_empty())
        .map_or(from, |i| i + 1)
}

pub fn has_heading(text: &str, title: &str) -> bool {
    text.lines().any(|line| heading_matches(line, title))
}

/// Appends `## title` when no heading carries that title yet.
pub fn ensure_heading(text: &str, title: &str) -> String {
    if has_heading(text, title) {
        return text.to_string();
    }
    let mut result = text.trim_end().to_string();
    if !result.is_empty() {
        result.push_str("\n\n");
    }
    result.push_str(&format!("## {title}\n"));
    result
}

/// Writes `content` under `heading` (a full heading line such as `## 7-Day Summary`). An existing
/// section is only rewritten when `replace` is set.
pub fn upsert_section(text: &str, heading: &str, content: &str, replace: bool) -> String {
    let title = heading.trim_start_matches('#').trim();
    let (mut lines, trailing) = split_lines(text);
    match section_bounds(&lines, title) {
        Some(_) if !replace => text.to_string(),
        Some((start, end)) => {
            let at_end = end == lines.len();
            let mut replacement = content.trim().lines().map(str::to_string).collect::<Vec<_>>();
            if !at_end {
                replacement.push(String::new());
            }
            lines.splice(start + 1..end, replacement);
            join_lines(&lines, trailing || at_end)
        }
        None => {
            let mut result = text.trim_end().to_string();
            if !result.is_empty() {
                result.push_str("\n\n");
            }
            result.push_str(heading);
            result.push('\n');
            result.push_str(content.trim());
            result.push('\n');
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ensure_heading, heading_level, heading_matches, section_bounds, split_lines,
        upsert_section,
    };

    #[test]
    fn heading_levels() {
        assert_eq!(heading_level("# Title"), Some(1));
        assert_eq!(heading_level("### Sub"), Some(3));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("plain"), None);
    }

    #[test]
    fn headings_match_whole_titles_only() {
        assert!(heading_matches("## Tasks", "Tasks"));
        assert!(heading_matches("##   Tasks  ", " Tasks"));
        assert!(heading_matches("## 🗓 Due soon", "Due soon"));
        assert!(heading_matches("## 🗓 Due soon", "🗓 Due soon"));
        assert!(!heading_matches("## Tasks done yesterday", "Tasks"));
        assert!(!heading_matches("## Old Tasks", "Tasks"));
        assert!(!heading_matches("Tasks", "Tasks"));
    }

    #[test]
    fn similar_heading_does_not_capture_the_section() {
        let (lines, _) = split_lines("## Tasks done yesterday
- [x] a
## Tasks
- [ ] b
");
        assert_eq!(section_bounds(&lines, "Tasks"), Some((2, 4)));
    }

    #[test]
    fn section_stops_at_sibling_heading() {
        let (lines, _) = split_lines("# Day\n## Tasks\n- [ ] a\n### Detail\nx\n## Notes\ny\n");
        assert_eq!(section_bounds(&lines, "Tasks"), Some((1, 5)));
        assert_eq!(section_bounds(&lines, "Notes"), Some((5, 7)));
        assert_eq!(section_bounds(&lines, "Missing"), None);
    }

    #[test]
    fn ensure_heading_is_idempotent() {
        let once = ensure_heading("# Day\n", "Due soon");
        assert_eq!(once, "# Day\n\n## Due soon\n");
        assert_eq!(ensure_heading(&once, "Due soon"), once);
    }

    #[test]
    fn upsert_appends_then_respects_existing_unless_replacing() {
        let text = "# Day\n\n## Notes\nhello\n";
        let added = upsert_section(text, "## 7-Day Summary", "It was a week.", false);
        assert_eq!(added, "# Day\n\n## Notes\nhello\n\n## 7-Day Summary\nIt was a week.\n");

        let kept = upsert_section(&added, "## 7-Day Summary", "Different.", false);
        assert_eq!(kept, added);

        let replaced = upsert_section(&added, "## 7-Day Summary", "Different.", true);
        assert_eq!(replaced, "# Day\n\n## Notes\nhello\n\n## 7-Day Summary\nDifferent.\n");
    }

    #[test]
    fn replacing_a_middle_section_keeps_following_headings() {
        let text = "## 7-Day Summary\nold\nolder\n## Notes\nkeep\n";
        let replaced = upsert_section(text, "## 7-Day Summary", "new", true);
        assert_eq!(replaced, "## 7-Day Summary\nnew\n\n## Notes\nkeep\n");
    }
}
