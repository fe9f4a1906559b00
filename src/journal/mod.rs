//! Daily note handling: templates, gap detection, task carryover and backlinks, tied together by
//! [orchestrator::ensure_daily_note].

pub mod backlink;
pub mod checklist;
pub mod gap;
pub mod note;
pub mod orchestrator;
pub mod sections;
pub mod template;
