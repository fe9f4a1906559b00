//! Settings file handling. The settings are a flat JSON document; every field has a default so a
//! partially filled file is still valid.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{JournalError, JournalResult},
    journal::checklist::ChecklistSyntax,
    utils::{
        retry::RetryPolicy,
        time::{parse_time_of_day, TimezonePolicy},
    },
};

pub const API_KEY_VARIABLE: &str = "LIMITLESS_API_KEY";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one `YYYY-MM-DD.md` file per day.
    pub vault_dir: PathBuf,
    pub template_path: PathBuf,
    pub checklist: ChecklistSyntax,
    /// Heading title that scopes carryover, e.g. "Due in the next two weeks - Anticipation".
    pub carryover_section: Option<String>,
    /// Heading line after which the backlink is placed, e.g. "## Life".
    pub backlink_anchor: Option<String>,
    /// Gaps longer than this are reported as suspicious in the log.
    pub gap_warning_days: u32,
    pub summary: SummarySettings,
    pub lifelog: LifelogSettings,
    /// IANA name. Empty means the machine's local timezone.
    pub timezone: Option<String>,
    pub use_git: bool,
    /// Daily trigger in `HH:MM`, used in scheduled mode.
    pub schedule_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub endpoint: String,
    pub model: String,
    pub weekly: bool,
    pub monthly: bool,
    pub weekly_prompt: String,
    pub monthly_prompt: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifelogSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub save_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub page_limit: u32,
    pub max_window_days: u32,
    pub default_window_days: u32,
    /// Pause between consecutive requests during backfill.
    pub backfill_pause_ms: u64,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default()
}

impl Default for Settings {
    fn default() -> Self {
        let obsidian = home_dir().join("Documents").join("Obsidian");
        Self {
            vault_dir: obsidian.join("Daily"),
            template_path: obsidian.join("Templates").join("Daily Template.md"),
            checklist: ChecklistSyntax::default(),
            carryover_section: None,
            backlink_anchor: None,
            gap_warning_days: 30,
            summary: SummarySettings::default(),
            lifelog: LifelogSettings::default(),
            timezone: None,
            use_git: false,
            schedule_time: "08:00".into(),
        }
    }
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".into(),
            model: "llama3.2".into(),
            weekly: true,
            monthly: true,
            weekly_prompt: "Summarize the main themes of the past 7 days of journal entries."
                .into(),
            monthly_prompt: "Summarize the main themes of the past 30 days of journal entries."
                .into(),
            timeout_secs: 120,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for LifelogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint: "https://api.limitless.ai/v1/lifelogs".into(),
            save_dir: None,
            backup_dir: None,
            page_limit: 100,
            max_window_days: 30,
            default_window_days: 1,
            backfill_pause_ms: 1000,
            timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

impl SummarySettings {
    pub fn any_enabled(&self) -> bool {
        self.weekly || self.monthly
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file is replaced by a freshly written default one so
    /// the user has something to edit.
    pub fn load(path: &Path) -> JournalResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Settings file {path:?} not found, creating one with defaults");
                let defaults = Settings::default();
                defaults.save(path)?;
                return Ok(defaults.with_environment(|name| std::env::var(name).ok()));
            }
            Err(e) => return Err(JournalError::io("read settings", path, e)),
        };

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| JournalError::Config(format!("invalid settings file {path:?}: {e}")))?;
        info!("Loaded settings from {path:?}");
        Ok(settings.with_environment(|name| std::env::var(name).ok()))
    }

    pub fn save(&self, path: &Path) -> JournalResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| JournalError::io("create settings directory", parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| JournalError::Config(format!("can't serialize settings: {e}")))?;
        std::fs::write(path, json).map_err(|e| JournalError::io("write settings", path, e))
    }

    /// Fills values that are allowed to come from the environment instead of the file.
    pub fn with_environment(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let has_key = self
            .lifelog
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        if !has_key {
            self.lifelog.api_key = lookup(API_KEY_VARIABLE).filter(|v| !v.trim().is_empty());
        }
        self
    }

    pub fn timezone_policy(&self) -> JournalResult<TimezonePolicy> {
        TimezonePolicy::parse(self.timezone.as_deref()).map_err(JournalError::Config)
    }

    pub fn schedule_time(&self) -> JournalResult<NaiveTime> {
        parse_time_of_day(&self.schedule_time).ok_or_else(|| {
            JournalError::Config(format!(
                "schedule_time {:?} is not in HH:MM form",
                self.schedule_time
            ))
        })
    }

    /// Everything that can be checked without touching the notes.
    pub fn validate(&self) -> JournalResult<()> {
        if self.vault_dir.as_os_str().is_empty() {
            return Err(JournalError::Config("vault_dir is not set".into()));
        }
        if !self.vault_dir.is_dir() {
            return Err(JournalError::Config(format!(
                "vault_dir {:?} does not exist or is not a directory",
                self.vault_dir
            )));
        }
        self.checklist.validate().map_err(JournalError::Config)?;
        self.timezone_policy()?;
        self.schedule_time()?;

        if self.summary.any_enabled() {
            reqwest::Url::parse(&self.summary.endpoint).map_err(|e| {
                JournalError::Config(format!(
                    "summary endpoint {:?} is not a URL: {e}",
                    self.summary.endpoint
                ))
            })?;
        }

        if self.lifelog.enabled {
            if self.lifelog.api_key.is_none() {
                return Err(JournalError::Config(format!(
                    "lifelog sync is enabled but no api_key is set and {API_KEY_VARIABLE} is empty"
                )));
            }
            if self.lifelog.save_dir.is_none() {
                return Err(JournalError::Config(
                    "lifelog sync is enabled but save_dir is not set".into(),
                ));
            }
            reqwest::Url::parse(&self.lifelog.endpoint).map_err(|e| {
                JournalError::Config(format!(
                    "lifelog endpoint {:?} is not a URL: {e}",
                    self.lifelog.endpoint
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{Settings, API_KEY_VARIABLE};
    use crate::error::JournalError;

    fn valid_settings(vault: &std::path::Path) -> Settings {
        Settings {
            vault_dir: vault.to_path_buf(),
            ..Settings::default()
        }
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "vault_dir": "/notes", "use_git": true }"#).unwrap();
        assert_eq!(settings.vault_dir, std::path::PathBuf::from("/notes"));
        assert!(settings.use_git);
        assert_eq!(settings.schedule_time, "08:00");
        assert_eq!(settings.checklist.open_marker, "- [ ]");
        assert!(settings.summary.weekly);
        assert!(!settings.lifelog.enabled);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let settings = Settings::load(&path).unwrap();

        assert!(path.exists());
        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(settings.vault_dir, reloaded.vault_dir);
        assert_eq!(settings.schedule_time, reloaded.schedule_time);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let error = Settings::load(&path).unwrap_err();
        assert!(matches!(error, JournalError::Config(_)), "got {error:?}");
    }

    #[test]
    fn validation_rejects_missing_vault() {
        let dir = tempdir().unwrap();
        let settings = valid_settings(&dir.path().join("does-not-exist"));
        assert!(matches!(settings.validate(), Err(JournalError::Config(_))));

        let settings = valid_settings(std::path::Path::new(""));
        assert!(matches!(settings.validate(), Err(JournalError::Config(_))));
    }

    #[test]
    fn validation_rejects_bad_timezone_and_schedule() {
        let dir = tempdir().unwrap();
        let mut settings = valid_settings(dir.path());
        settings.validate().unwrap();

        settings.timezone = Some("Nowhere/Special".into());
        assert!(matches!(settings.validate(), Err(JournalError::Config(_))));

        settings.timezone = Some("Europe/Kyiv".into());
        settings.schedule_time = "eight".into();
        assert!(matches!(settings.validate(), Err(JournalError::Config(_))));
    }

    #[test]
    fn lifelog_requires_key_and_directory() {
        let dir = tempdir().unwrap();
        let mut settings = valid_settings(dir.path());
        settings.lifelog.enabled = true;
        assert!(settings.validate().is_err());

        settings.lifelog.api_key = Some("key".into());
        assert!(settings.validate().is_err());

        settings.lifelog.save_dir = Some(dir.path().join("lifelog"));
        settings.validate().unwrap();
    }

    #[test]
    fn api_key_comes_from_environment_only_when_missing() {
        let lookup = |name: &str| (name == API_KEY_VARIABLE).then(|| "from-env".to_string());

        let settings = Settings::default().with_environment(lookup);
        assert_eq!(settings.lifelog.api_key.as_deref(), Some("from-env"));

        let mut configured = Settings::default();
        configured.lifelog.api_key = Some("from-file".into());
        let configured = configured.with_environment(lookup);
        assert_eq!(configured.lifelog.api_key.as_deref(), Some("from-file"));
    }
}
