// Weekend date windows: Friday departure, Monday return
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use thiserror::Error;

// Friday -> Monday
pub const TRIP_LENGTH_DAYS: i64 = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WindowError {
    #[error("Weeks horizon must be at least 1")]
    EmptyHorizon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
}

impl DateWindow {
    pub fn starting(departure_date: NaiveDate) -> Self {
        Self {
            departure_date,
            return_date: departure_date + Duration::days(TRIP_LENGTH_DAYS),
        }
    }
}

// Days until the next Friday strictly after `today`
fn days_until_next_friday(today: NaiveDate) -> i64 {
    let today_idx = today.weekday().num_days_from_monday() as i64;
    let friday_idx = Weekday::Fri.num_days_from_monday() as i64;

    match (friday_idx - today_idx).rem_euclid(7) {
        0 => 7,
        days => days,
    }
}

// Produce `weeks_horizon` consecutive weekend windows after `today`
pub fn weekend_windows(
    today: NaiveDate,
    weeks_horizon: u32,
) -> Result<Vec<DateWindow>, WindowError> {
    if weeks_horizon == 0 {
        return Err(WindowError::EmptyHorizon);
    }

    let first_friday = today + Duration::days(days_until_next_friday(today));

    Ok((0..weeks_horizon)
        .map(|week| DateWindow::starting(first_friday + Duration::weeks(week as i64)))
        .collect())
}
