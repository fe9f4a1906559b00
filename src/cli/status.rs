use ansi_term::{Colour, Style};

use crate::{
    journal::orchestrator::{NoteStatus, RunReport},
    lifelog::{BackfillReport, SyncReport},
};

fn paint(color: bool, style: Style, text: &str) -> String {
    if color {
        style.paint(text).to_string()
    } else {
        text.to_string()
    }
}

pub fn format_status(status: &NoteStatus, color: bool) -> String {
    let mut lines = vec![];
    let state = if status.exists {
        paint(color, Colour::Green.normal(), "exists")
    } else {
        paint(color, Colour::Yellow.normal(), "not created yet")
    };
    lines.push(format!(
        "{} {} ({state})",
        paint(color, Style::new().bold(), &status.date.to_string()),
        status.path.display()
    ));
    match &status.previous {
        Some(p) => lines.push(format!(
            "Previous note: {} ({} day{} before)",
            p.date,
            p.gap_days,
            if p.gap_days == 1 { "" } else { "s" }
        )),
        None => lines.push("Previous note: none".into()),
    }
    lines.push(format!(
        "Tasks: {} open, {} done",
        status.open_items, status.done_items
    ));
    if status.pending_carryover > 0 {
        lines.push(paint(
            color,
            Colour::Yellow.normal(),
            &format!("{} unfinished tasks waiting to be carried over", status.pending_carryover),
        ));
    }
    lines.join("\n")
}

pub fn format_run(report: &RunReport) -> String {
    let action = match (report.created, report.written) {
        (true, _) => "Created",
        (false, true) => "Updated",
        (false, false) => "Unchanged",
    };
    let mut text = format!("{action} {}", report.path.display());
    if !report.carried.is_empty() {
        text.push_str(&format!(", carried over {} tasks", report.carried.len()));
    }
    if !report.summaries.is_empty() {
        text.push_str(&format!(", added {} summaries", report.summaries.len()));
    }
    if !report.skipped_summaries.is_empty() {
        text.push_str(&format!(
            ", skipped {} summaries (see log)",
            report.skipped_summaries.len()
        ));
    }
    text
}

pub fn format_sync(report: &SyncReport) -> String {
    let range = match (report.start, report.end) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "nothing".into(),
    };
    let mut text = match &report.saved {
        Some(path) => format!("Synced {range} into {}", path.display()),
        None => format!("No lifelogs from {range}"),
    };
    if let Some(error) = &report.backup_error {
        text.push_str(&format!("\nBackup copy failed: {error}"));
    }
    text
}

pub fn format_backfill(report: &BackfillReport) -> String {
    format!(
        "Backfill: {} windows, {} saved, {} failed",
        report.windows, report.saved, report.failed
    )
}
