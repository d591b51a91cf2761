use std::iter::successors;
use time::{Date, Duration, Month, Weekday};

pub(crate) const DAYS_IN_WEEK: usize = 7;

pub(super) trait WeekdayExt {
    /// Column of this weekday in a week that begins on `first`
    fn column_from(&self, first: Weekday) -> u8;

    fn short_name(&self) -> &'static str;
}

impl WeekdayExt for Weekday {
    fn column_from(&self, first: Weekday) -> u8 {
        (self.number_days_from_sunday() + 7 - first.number_days_from_sunday()) % 7
    }

    fn short_name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Su",
            Weekday::Monday => "Mo",
            Weekday::Tuesday => "Tu",
            Weekday::Wednesday => "We",
            Weekday::Thursday => "Th",
            Weekday::Friday => "Fr",
            Weekday::Saturday => "Sa",
        }
    }
}

pub(super) fn first_of_month(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

pub(super) fn days_in_month(year: i32, month: Month) -> Option<u8> {
    (28..=31)
        .rev()
        .find(|&d| Date::from_calendar_date(year, month, d).is_ok())
}

/// Move `date` by `delta` months, clamping the day to the length of the
/// target month.  Returns `None` if the result is outside the range of
/// representable dates.
pub(super) fn add_months(date: Date, delta: i32) -> Option<Date> {
    let index = date
        .year()
        .checked_mul(12)?
        .checked_add(i32::from(u8::from(date.month())) - 1)?
        .checked_add(delta)?;
    let year = index.div_euclid(12);
    let month = u8::try_from(index.rem_euclid(12) + 1).ok()?;
    let month = Month::try_from(month).ok()?;
    let day = date.day().min(days_in_month(year, month)?);
    Date::from_calendar_date(year, month, day).ok()
}

/// The earliest date that a grid may be anchored on such that every day the
/// grid shows is representable
pub(super) fn earliest_anchor() -> Date {
    Date::MIN.checked_add(Duration::days(31)).unwrap_or(Date::MIN)
}

/// The latest date that a grid may be anchored on such that every day the
/// grid shows is representable
pub(super) fn latest_anchor() -> Date {
    Date::MAX.checked_sub(Duration::days(31)).unwrap_or(Date::MAX)
}

pub(super) fn iter_days_from(date: Date) -> impl Iterator<Item = Date> {
    successors(Some(date), |&d| d.next_day())
}
