//! The "ensure the daily note exists and is up to date" pass.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, error, info, instrument, warn};

use super::{
    backlink::insert_backlink,
    checklist::ChecklistItem,
    gap::{find_previous_note, PreviousNote},
    note::{compose, strip_markers, Markers},
    sections::{ensure_heading, has_heading, upsert_section},
};
use crate::{
    context::JournalContext,
    error::JournalResult,
    summary::{build_summary_input, SummaryKind},
    utils::time::{date_to_note_name, days_before},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Regenerate summaries even when their section already exists.
    pub refresh_summaries: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub created: bool,
    /// False when the note already had everything and was left untouched.
    pub written: bool,
    pub previous: Option<PreviousNote>,
    pub carried: Vec<ChecklistItem>,
    pub summaries: Vec<SummaryKind>,
    pub skipped_summaries: Vec<SummaryKind>,
    pub committed: bool,
}

enum Phase {
    CheckExists,
    Create,
    Update { existing: Option<String>, draft: String },
    Done(RunReport),
}

/// Creates the note for `date` from the template if needed, then adds the backlink, carried
/// tasks and due summaries. The whole text is composed in memory and written once, so a failure
/// leaves the file as it was. Running it again without outside changes writes nothing.
#[instrument(skip_all, fields(date = %date))]
pub async fn ensure_daily_note(
    ctx: &JournalContext,
    date: NaiveDate,
    now: DateTime<FixedOffset>,
    options: RunOptions,
) -> JournalResult<RunReport> {
    let mut phase = Phase::CheckExists;
    loop {
        let next = match phase {
            Phase::CheckExists => check_exists(ctx, date).await,
            Phase::Create => create(ctx, date, now).await,
            Phase::Update { existing, draft } => {
                update(ctx, date, now, options, existing, draft).await
            }
            Phase::Done(report) => return Ok(report),
        };
        phase = match next {
            Ok(v) => v,
            Err(e) => {
                error!("Daily note for {date} failed: {e}");
                return Err(e);
            }
        };
    }
}

async fn check_exists(ctx: &JournalContext, date: NaiveDate) -> JournalResult<Phase> {
    Ok(match ctx.store.read(date).await? {
        Some(text) => Phase::Update {
            draft: text.clone(),
            existing: Some(text),
        },
        None => Phase::Create,
    })
}

async fn create(
    ctx: &JournalContext,
    date: NaiveDate,
    now: DateTime<FixedOffset>,
) -> JournalResult<Phase> {
    info!("Creating note from {:?}", ctx.templates.path());
    let draft = ctx.templates.resolve(date, now).await?;
    Ok(Phase::Update {
        existing: None,
        draft,
    })
}

async fn update(
    ctx: &JournalContext,
    date: NaiveDate,
    now: DateTime<FixedOffset>,
    options: RunOptions,
    existing: Option<String>,
    draft: String,
) -> JournalResult<Phase> {
    let settings = &ctx.settings;
    let section = settings.carryover_section.as_deref();
    let (body, mut markers) = strip_markers(&draft);

    let previous = find_previous_note(ctx.store.list_dates().await?, date);
    match &previous {
        Some(p) if p.gap_days > settings.gap_warning_days => warn!(
            "Previous note {} is {} days old, more than the expected {}",
            p.date, p.gap_days, settings.gap_warning_days
        ),
        Some(p) => debug!("Previous note {} ({} days ago)", p.date, p.gap_days),
        None => info!("No previous note, nothing to link or carry over"),
    }

    let mut next = insert_backlink(&body, previous.as_ref(), settings.backlink_anchor.as_deref());
    if let Some(title) = section {
        next = ensure_heading(&next, title);
    }

    let mut carried = vec![];
    if let Some(p) = &previous {
        if let Some(previous_text) = ctx.store.read(p.date).await? {
            let (previous_body, _) = strip_markers(&previous_text);
            let candidates = ctx
                .matcher
                .carryover_candidates(&previous_body, section, Some(p.date));
            let (merged, inserted) =
                ctx.matcher
                    .merge_carryover(&next, &candidates, section, Some(p));
            next = merged;
            carried = inserted;
        }
    }
    if !carried.is_empty() {
        info!("Carried over {} unfinished items", carried.len());
    }

    let (next, summaries, skipped_summaries) = add_summaries(ctx, date, next, options).await?;

    let created = existing.is_none();
    let changed = created || next != body;
    let path = ctx.store.path_for(date);
    if changed {
        let timestamp = Markers::timestamp(now);
        if created {
            markers.created = Some(timestamp.clone());
        }
        markers.last_modified = Some(timestamp);
        let text = compose(&next, &markers);
        if !ctx.store.write(date, &text, created).await? {
            warn!("{path:?} appeared while it was being created, updating it instead");
            return Ok(Phase::CheckExists);
        }
        info!("Wrote {path:?}");
    } else {
        info!("{path:?} is already up to date");
    }

    let committed = match (&ctx.git, changed) {
        (Some(git), true) => {
            git.commit(&path, &format!("Daily carryover for {}", date_to_note_name(date)))
                .await
        }
        _ => false,
    };

    Ok(Phase::Done(RunReport {
        date,
        path,
        created,
        written: changed,
        previous,
        carried,
        summaries,
        skipped_summaries,
        committed,
    }))
}

/// Adds the summaries that are due. A summary that can't be produced is logged and skipped, it
/// never fails the run.
async fn add_summaries(
    ctx: &JournalContext,
    date: NaiveDate,
    mut text: String,
    options: RunOptions,
) -> JournalResult<(String, Vec<SummaryKind>, Vec<SummaryKind>)> {
    let mut added = vec![];
    let mut skipped = vec![];
    let Some(summarizer) = &ctx.summarizer else {
        return Ok((text, added, skipped));
    };

    for kind in SummaryKind::enabled(&ctx.settings.summary) {
        let title = kind.title();
        if has_heading(&text, title) && !options.refresh_summaries {
            continue;
        }
        let notes = ctx
            .store
            .read_many(days_before(date, kind.days()).collect())
            .await?
            .into_iter()
            .map(|(day, note)| (day, strip_markers(&note).0))
            .collect::<Vec<_>>();
        if notes.is_empty() {
            debug!("No notes in the last {} days, skipping {title}", kind.days());
            continue;
        }

        match summarizer.summarize(kind, &build_summary_input(&notes)).await {
            Ok(summary) => {
                text = upsert_section(&text, kind.heading(), &summary, true);
                added.push(kind);
            }
            Err(e) => {
                warn!("Skipping {title}: {e}");
                skipped.push(kind);
            }
        }
    }
    Ok((text, added, skipped))
}

/// What `status` prints about a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteStatus {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub exists: bool,
    pub previous: Option<PreviousNote>,
    pub open_items: usize,
    pub done_items: usize,
    /// Unfinished items of the previous note that today doesn't have yet.
    pub pending_carryover: usize,
}

pub async fn inspect(ctx: &JournalContext, date: NaiveDate) -> JournalResult<NoteStatus> {
    let section = ctx.settings.carryover_section.as_deref();
    let today = ctx.store.read(date).await?;
    let previous = find_previous_note(ctx.store.list_dates().await?, date);

    let items = today
        .as_deref()
        .map(|text| ctx.matcher.items(text, None, Some(date)))
        .unwrap_or_default();
    let open_items = items.iter().filter(|item| !item.completed).count();

    let mut pending_carryover = 0;
    if let Some(p) = &previous {
        if let Some(previous_text) = ctx.store.read(p.date).await? {
            let candidates = ctx
                .matcher
                .carryover_candidates(&previous_text, section, Some(p.date));
            let today_text = today.as_deref().unwrap_or_default();
            pending_carryover = ctx
                .matcher
                .merge_carryover(today_text, &candidates, section, None)
                .1
                .len();
        }
    }

    Ok(NoteStatus {
        date,
        path: ctx.store.path_for(date),
        exists: today.is_some(),
        previous,
        open_items,
        done_items: items.len() - open_items,
        pending_carryover,
    })
}
