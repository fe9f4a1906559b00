//! Copies life-log records from the remote API into local directories.

pub mod client;
pub mod marker;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use self::{
    client::{is_empty_payload, LifelogClient},
    marker::{read_marker, write_marker, MARKER_FILE_NAME},
};
use crate::{
    config::LifelogSettings,
    error::{JournalError, JournalResult},
    fs::operations::replace_file,
    utils::{
        clock::Clock,
        time::{date_to_note_name, TimezonePolicy},
    },
};

pub const BACKFILL_WINDOW_DAYS: i64 = 7;

/// First day to request, given the day of the last successful sync.
pub fn sync_window_start(
    today: NaiveDate,
    last_sync: Option<NaiveDate>,
    default_window_days: u32,
    max_window_days: u32,
) -> NaiveDate {
    match last_sync {
        None => today - TimeDelta::days(i64::from(default_window_days)),
        Some(last) if last >= today => today - TimeDelta::days(1),
        Some(last) if (today - last).num_days() > i64::from(max_window_days) => {
            warn!(
                "Last sync was on {last}, limiting the request to {max_window_days} days"
            );
            today - TimeDelta::days(i64::from(max_window_days))
        }
        Some(last) => last,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Primary copy, `None` when the API had nothing for the window.
    pub saved: Option<PathBuf>,
    pub backup: Option<PathBuf>,
    pub backup_error: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub windows: usize,
    pub saved: usize,
    pub failed: usize,
}

pub struct LifelogSync {
    client: LifelogClient,
    save_dir: PathBuf,
    backup_dir: Option<PathBuf>,
    default_window_days: u32,
    max_window_days: u32,
    pause: Duration,
    clock: Arc<dyn Clock>,
}

impl LifelogSync {
    pub fn new(
        settings: &LifelogSettings,
        zone: &TimezonePolicy,
        clock: Arc<dyn Clock>,
    ) -> JournalResult<Self> {
        let save_dir = settings
            .save_dir
            .clone()
            .ok_or_else(|| JournalError::Config("lifelog save_dir is not set".into()))?;
        Ok(Self {
            client: LifelogClient::new(settings, zone.iana_name(), clock.clone())?,
            save_dir,
            backup_dir: settings.backup_dir.clone(),
            default_window_days: settings.default_window_days,
            max_window_days: settings.max_window_days,
            pause: Duration::from_millis(settings.backfill_pause_ms),
            clock,
        })
    }

    pub fn marker_path(&self) -> PathBuf {
        self.save_dir.join(MARKER_FILE_NAME)
    }

    /// Fetches everything since the last successful sync and saves it.
    #[instrument(skip_all)]
    pub async fn sync(&self, now: DateTime<FixedOffset>) -> JournalResult<SyncReport> {
        let today = now.date_naive();
        let last_sync = read_marker(&self.marker_path()).await?;
        let start = sync_window_start(
            today,
            last_sync,
            self.default_window_days,
            self.max_window_days,
        );
        self.sync_range(start, today, now).await
    }

    /// Fetches `since..=today` in week-long windows, pausing between requests. Failed windows are
    /// logged and counted.
    #[instrument(skip_all, fields(%since))]
    pub async fn backfill(
        &self,
        since: NaiveDate,
        now: DateTime<FixedOffset>,
    ) -> JournalResult<BackfillReport> {
        let today = now.date_naive();
        let mut report = BackfillReport::default();
        let mut start = since;
        while start <= today {
            if report.windows > 0 {
                self.clock.sleep(self.pause).await;
            }
            let end = (start + TimeDelta::days(BACKFILL_WINDOW_DAYS - 1)).min(today);
            report.windows += 1;
            match self.sync_range(start, end, now).await {
                Ok(window) => report.saved += usize::from(window.saved.is_some()),
                Err(e) if e.is_network() => {
                    error!("Backfill of {start}..{end} failed: {e}");
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
            start = end + TimeDelta::days(1);
        }
        info!(?report, "Backfill finished");
        Ok(report)
    }

    async fn sync_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<FixedOffset>,
    ) -> JournalResult<SyncReport> {
        let mut report = SyncReport {
            start: Some(start),
            end: Some(end),
            ..SyncReport::default()
        };
        let payload = self.client.fetch(start, end).await?;
        if is_empty_payload(&payload) {
            info!("No lifelogs between {start} and {end}");
            return Ok(report);
        }

        let file_name = format!(
            "lifelogs_{}_{}.json",
            date_to_note_name(end),
            now.format("%Y%m%d_%H%M%S")
        );
        let primary = self.save_dir.join(&file_name);
        save_payload(&self.save_dir, &primary, &payload).await?;
        info!("Saved lifelogs to {primary:?}");
        write_marker(&self.marker_path(), now).await?;
        report.saved = Some(primary);

        if let Some(backup_dir) = &self.backup_dir {
            let backup = backup_dir.join(&file_name);
            match save_payload(backup_dir, &backup, &payload).await {
                Ok(()) => {
                    info!("Saved backup copy to {backup:?}");
                    report.backup = Some(backup);
                }
                Err(e) => {
                    error!("Backup copy failed, primary copy is kept: {e}");
                    report.backup_error = Some(e.to_string());
                }
            }
        }
        Ok(report)
    }
}

async fn save_payload(dir: &Path, path: &Path, payload: &Value) -> JournalResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| JournalError::io("create lifelog directory", dir, e))?;
    let json = serde_json::to_string_pretty(payload)
        .map_err(|e| JournalError::io("encode lifelogs", path, e.into()))?;
    replace_file(path, &json, true)
        .await
        .map_err(|e| JournalError::io("write lifelogs", path, e))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::{DateTime, FixedOffset, NaiveDate};
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::{
        matchers::{header, method, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::{sync_window_start, LifelogSync};
    use crate::{
        config::LifelogSettings,
        utils::{clock::FixedClock, retry::RetryPolicy, time::TimezonePolicy},
    };

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-03-10T08:00:00+00:00").unwrap()
    }

    fn settings(
        server: &MockServer,
        save: &std::path::Path,
        backup: &std::path::Path,
    ) -> LifelogSettings {
        LifelogSettings {
            enabled: true,
            api_key: Some("secret".into()),
            endpoint: format!("{}/v1/lifelogs", server.uri()),
            save_dir: Some(save.to_path_buf()),
            backup_dir: Some(backup.to_path_buf()),
            retry: RetryPolicy::no_delay(2),
            ..LifelogSettings::default()
        }
    }

    fn sync(settings: &LifelogSettings, clock: Arc<FixedClock>) -> LifelogSync {
        let zone = TimezonePolicy::parse(Some("Europe/London")).unwrap();
        LifelogSync::new(settings, &zone, clock).unwrap()
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(now().to_utc()))
    }

    #[test]
    fn window_start_rules() {
        let today = day(3, 10);
        assert_eq!(sync_window_start(today, None, 1, 30), day(3, 9));
        assert_eq!(sync_window_start(today, Some(today), 1, 30), day(3, 9));
        assert_eq!(sync_window_start(today, Some(day(3, 12)), 1, 30), day(3, 9));
        assert_eq!(sync_window_start(today, Some(day(3, 4)), 1, 30), day(3, 4));
        assert_eq!(sync_window_start(today, Some(day(1, 1)), 1, 30), day(2, 8));
    }

    #[tokio::test]
    async fn saves_primary_and_backup_then_marks_sync() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "secret"))
            .and(query_param("start", "2025-03-09"))
            .and(query_param("end", "2025-03-10"))
            .and(query_param("timezone", "Europe/London"))
            .and(query_param("limit", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "lifelogs": [{ "id": "a" }] } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let save = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let sync = sync(&settings(&server, save.path(), backup.path()), clock());

        let report = sync.sync(now()).await.unwrap();

        let name = "lifelogs_2025-03-10_20250310_080000.json";
        assert_eq!(report.saved, Some(save.path().join(name)));
        assert_eq!(report.backup, Some(backup.path().join(name)));
        let saved = std::fs::read_to_string(save.path().join(name)).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved["data"]["lifelogs"][0]["id"], "a");
        assert!(backup.path().join(name).exists());
        assert_eq!(
            std::fs::read_to_string(sync.marker_path()).unwrap(),
            "2025-03-10T08:00:00Z"
        );
    }

    #[tokio::test]
    async fn empty_payload_saves_nothing_and_keeps_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let save = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let sync = sync(&settings(&server, save.path(), backup.path()), clock());

        let report = sync.sync(now()).await.unwrap();

        assert_eq!(report.saved, None);
        assert!(!sync.marker_path().exists());
        assert_eq!(std::fs::read_dir(save.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn backup_failure_keeps_primary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "a" }])))
            .mount(&server)
            .await;

        let save = tempdir().unwrap();
        let blocker = tempdir().unwrap();
        // A regular file where the backup directory should be.
        let backup = blocker.path().join("not-a-dir");
        std::fs::write(&backup, "x").unwrap();
        let sync = sync(&settings(&server, save.path(), &backup), clock());

        let report = sync.sync(now()).await.unwrap();

        assert!(report.saved.as_ref().is_some_and(|p| p.exists()));
        assert!(report.backup.is_none());
        assert!(report.backup_error.is_some());
        assert!(sync.marker_path().exists());
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let save = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let sync = sync(&settings(&server, save.path(), backup.path()), clock());

        let error = sync.sync(now()).await.unwrap_err();
        assert!(error.is_network());
        assert!(!sync.marker_path().exists());
    }

    #[tokio::test]
    async fn backfill_walks_weekly_windows_with_pauses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("start", "2025-02-24"))
            .and(query_param("end", "2025-03-02"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "a" }])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("start", "2025-03-03"))
            .and(query_param("end", "2025-03-09"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("start", "2025-03-10"))
            .and(query_param("end", "2025-03-10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let save = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let clock = clock();
        let mut settings = settings(&server, save.path(), backup.path());
        settings.backfill_pause_ms = 1000;
        let sync = sync(&settings, clock.clone());

        let report = sync.backfill(day(2, 24), now()).await.unwrap();

        assert_eq!(report.windows, 3);
        assert_eq!(report.saved, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(clock.total_slept(), Duration::from_secs(2));
    }
}
