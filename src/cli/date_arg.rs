use std::fmt::Display;

use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_english::parse_date_string;
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DateArg {
    #[arg(
        long = "date",
        help = "Day to work on instead of today. Examples are \"yesterday\", \"2 days ago\", \"15/03/2025\""
    )]
    pub date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    pub date_style: DateStyle,
}

impl DateArg {
    /// The requested day, or the day of `now` when none was given.
    pub fn resolve(&self, now: DateTime<FixedOffset>) -> Result<NaiveDate, String> {
        match &self.date {
            Some(text) => parse_day(text, now, self.date_style),
            None => Ok(now.date_naive()),
        }
    }
}

/// Parses a natural-language day relative to `now`.
pub fn parse_day(
    text: &str,
    now: DateTime<FixedOffset>,
    style: DateStyle,
) -> Result<NaiveDate, String> {
    parse_date_string(text, now, style.into())
        .map(|v| v.date_naive())
        .map_err(|e| format!("can't understand date {text:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::{parse_day, DateArg, DateStyle};

    #[test]
    fn parses_relative_and_styled_dates() {
        let now = DateTime::parse_from_rfc3339("2025-03-10T08:00:00+02:00").unwrap();
        assert_eq!(
            parse_day("yesterday", now, DateStyle::Uk),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap())
        );
        assert_eq!(
            parse_day("04/03/2025", now, DateStyle::Uk),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 4).unwrap())
        );
        assert_eq!(
            parse_day("04/03/2025", now, DateStyle::Us),
            Ok(NaiveDate::from_ymd_opt(2025, 4, 3).unwrap())
        );
        assert!(parse_day("the day after never", now, DateStyle::Uk).is_err());
    }

    #[test]
    fn missing_date_means_today() {
        let now = DateTime::parse_from_rfc3339("2025-03-10T23:30:00-05:00").unwrap();
        let arg = DateArg {
            date: None,
            date_style: DateStyle::Uk,
        };
        assert_eq!(arg.resolve(now), Ok(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()));
    }
}
