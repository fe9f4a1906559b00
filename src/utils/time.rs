use std::str::FromStr;

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

pub const NOTE_DATE_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a note name in daybook.
pub fn date_to_note_name(date: NaiveDate) -> String {
    date.format(NOTE_DATE_FORMAT).to_string()
}

/// Inverse of [date_to_note_name]. Anything that isn't exactly a `YYYY-MM-DD` stem is not a daily
/// note.
pub fn note_name_to_date(stem: &str) -> Option<NaiveDate> {
    if stem.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(stem, NOTE_DATE_FORMAT).ok()
}

/// Dates strictly before `target`, most recent first.
pub fn days_before(target: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    (1..=i64::from(days))
        .filter_map(move |offset| target.checked_sub_signed(Duration::days(offset)))
}

/// Which timezone decides what "today" is. Both the journal and the life-log sync go through the
/// same policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimezonePolicy {
    #[default]
    Local,
    Named(Tz),
}

impl TimezonePolicy {
    pub fn parse(value: Option<&str>) -> Result<Self, String> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Local),
            Some(name) => Tz::from_str(name)
                .map(Self::Named)
                .map_err(|_| format!("unknown timezone {name:?}")),
        }
    }

    pub fn localize(&self, time: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Local => time.with_timezone(&Local).fixed_offset(),
            Self::Named(tz) => time.with_timezone(tz).fixed_offset(),
        }
    }

    /// Resolves a wall-clock moment in this zone. Times skipped by a DST jump resolve to the
    /// same wall time one hour later.
    pub fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        fn pick<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
            zone.from_local_datetime(&local)
                .earliest()
                .or_else(|| zone.from_local_datetime(&(local + Duration::hours(1))).earliest())
                .map(|v| v.fixed_offset())
        }
        match self {
            Self::Local => pick(&Local, local),
            Self::Named(tz) => pick(tz, local),
        }
    }

    /// IANA name handed to remote APIs that want to know the user's day boundaries.
    pub fn iana_name(&self) -> String {
        match self {
            Self::Named(tz) => tz.name().to_string(),
            Self::Local => iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".into()),
        }
    }
}

/// Wall-clock time of day in `HH:MM` form.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}
