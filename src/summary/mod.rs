//! Rolling summaries of recent notes, produced by a local language model.

pub mod ollama;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{config::SummarySettings, error::JournalResult, utils::time::date_to_note_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Weekly,
    Monthly,
}

impl SummaryKind {
    pub const ALL: [Self; 2] = [Self::Weekly, Self::Monthly];

    pub fn heading(&self) -> &'static str {
        match self {
            Self::Weekly => "## 7-Day Summary",
            Self::Monthly => "## 30-Day Summary",
        }
    }

    /// Heading text without the `#` markers.
    pub fn title(&self) -> &'static str {
        self.heading().trim_start_matches('#').trim()
    }

    /// How many days before the target date are summarized.
    pub fn days(&self) -> u32 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    pub fn enabled(settings: &SummarySettings) -> Vec<Self> {
        let mut kinds = vec![];
        if settings.weekly {
            kinds.push(Self::Weekly);
        }
        if settings.monthly {
            kinds.push(Self::Monthly);
        }
        kinds
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Summarizes `input`, which is the output of [build_summary_input].
    async fn summarize(&self, kind: SummaryKind, input: &str) -> JournalResult<String>;
}

/// Joins notes (most recent first) into one document, each under its own date heading.
pub fn build_summary_input(notes: &[(NaiveDate, String)]) -> String {
    notes
        .iter()
        .map(|(date, text)| format!("### {}\n\n{}", date_to_note_name(*date), text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
