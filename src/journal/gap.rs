use chrono::NaiveDate;

/// The most recent note strictly before the target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousNote {
    pub date: NaiveDate,
    /// Whole days between the previous note and the target date, at least 1.
    pub gap_days: u32,
}

impl PreviousNote {
    pub fn is_yesterday(&self) -> bool {
        self.gap_days == 1
    }
}

/// Picks the latest date before `target`. Notes on or after `target` are never considered, so a
/// note created ahead of time can't become its own predecessor. The true gap is reported however
/// large it is; limiting how far back to look is up to the caller.
pub fn find_previous_note(
    dates: impl IntoIterator<Item = NaiveDate>,
    target: NaiveDate,
) -> Option<PreviousNote> {
    let mut dates = dates
        .into_iter()
        .filter(|date| *date < target)
        .collect::<Vec<_>>();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    let date = *dates.first()?;
    let gap_days = u32::try_from((target - date).num_days()).unwrap_or(u32::MAX);
    Some(PreviousNote { date, gap_days })
}
