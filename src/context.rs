use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{error, instrument};

use crate::{
    config::Settings,
    error::{JournalError, JournalResult},
    git::GitIntegration,
    journal::{
        checklist::ChecklistMatcher,
        note::NoteStore,
        orchestrator::{ensure_daily_note, RunOptions, RunReport},
        template::TemplateResolver,
    },
    lifelog::{LifelogSync, SyncReport},
    summary::{ollama::OllamaClient, SummaryProvider},
    utils::{clock::Clock, time::TimezonePolicy},
};

#[derive(Debug)]
pub struct PassReport {
    pub note: RunReport,
    pub sync: Option<SyncReport>,
}

/// Everything a run needs, built once by the process entry point and passed down explicitly.
pub struct JournalContext {
    pub settings: Settings,
    pub zone: TimezonePolicy,
    pub store: NoteStore,
    pub templates: TemplateResolver,
    pub matcher: ChecklistMatcher,
    pub clock: Arc<dyn Clock>,
    pub summarizer: Option<Arc<dyn SummaryProvider>>,
    pub lifelog: Option<LifelogSync>,
    pub git: Option<GitIntegration>,
}

impl JournalContext {
    /// Validates `settings` and wires up the optional collaborators they enable.
    pub fn from_settings(settings: Settings, clock: Arc<dyn Clock>) -> JournalResult<Self> {
        settings.validate()?;
        let zone = settings.timezone_policy()?;
        let matcher = ChecklistMatcher::new(&settings.checklist).map_err(JournalError::Config)?;

        let summarizer = if settings.summary.any_enabled() {
            let client = OllamaClient::new(settings.summary.clone(), clock.clone())?;
            Some(Arc::new(client) as Arc<dyn SummaryProvider>)
        } else {
            None
        };
        let lifelog = if settings.lifelog.enabled {
            Some(LifelogSync::new(&settings.lifelog, &zone, clock.clone())?)
        } else {
            None
        };

        Ok(Self {
            zone,
            store: NoteStore::new(&settings.vault_dir),
            templates: TemplateResolver::new(&settings.template_path),
            matcher,
            summarizer,
            lifelog,
            git: settings
                .use_git
                .then(|| GitIntegration::new(&settings.vault_dir)),
            clock,
            settings,
        })
    }

    /// The daily note for `date`, then the life-log sync when enabled and requested. A sync that
    /// can't reach the API is logged and leaves the note result intact.
    #[instrument(skip_all, fields(%date))]
    pub async fn daily_pass(
        &self,
        date: NaiveDate,
        now: DateTime<FixedOffset>,
        options: RunOptions,
        with_sync: bool,
    ) -> JournalResult<PassReport> {
        let note = ensure_daily_note(self, date, now, options).await?;
        let sync = match (&self.lifelog, with_sync) {
            (Some(lifelog), true) => match lifelog.sync(now).await {
                Ok(report) => Some(report),
                Err(e) if e.is_network() => {
                    error!("Lifelog sync skipped: {e}");
                    None
                }
                Err(e) => return Err(e),
            },
            _ => None,
        };
        Ok(PassReport { note, sync })
    }
}
