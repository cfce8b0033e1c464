//! Cycle date generation

use chrono::{Duration, NaiveDateTime};

use crate::error::{SetupError, SetupResult};

/// All cycle start dates from `first` to `last` inclusive, every
/// `incr_hours` hours.
pub fn set_cycle_dates(
    first: NaiveDateTime,
    last: NaiveDateTime,
    incr_hours: i64,
) -> SetupResult<Vec<NaiveDateTime>> {
    if incr_hours <= 0 {
        return Err(SetupError::consistency(
            "cycle_fcst_lengths",
            format!("INCR_CYCL_FREQ must be a positive number of hours, got {}", incr_hours),
        ));
    }
    let step = Duration::try_hours(incr_hours).ok_or_else(|| {
        SetupError::consistency(
            "cycle_fcst_lengths",
            format!("INCR_CYCL_FREQ is too large: {} hours", incr_hours),
        )
    })?;
    let mut dates = Vec::new();
    let mut current = Some(first);
    while let Some(date) = current.filter(|d| *d <= last) {
        dates.push(date);
        current = date.checked_add_signed(step);
    }
    Ok(dates)
}

/// Cycle dates as `YYYYMMDDHH` strings.
pub fn cycle_strings(dates: &[NaiveDateTime]) -> Vec<String> {
    dates
        .iter()
        .map(|d| d.format("%Y%m%d%H").to_string())
        .collect()
}
