use chrono::{Local, NaiveDate};

pub mod attendance;
pub mod circulation;

/// School-local calendar date, used when a request does not name one.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
