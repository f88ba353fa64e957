use chrono::{DateTime, Datelike, TimeZone, Weekday};

/// A trait representing the weekend concept.
pub trait Weekend {
    /// Returns `true` if the date is on a Saturday or Sunday.
    fn is_weekend(&self) -> bool;
}

impl<Tz: TimeZone> Weekend for DateTime<Tz> {
    fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}
