use chrono::{Datelike, Local, NaiveDate};

/// Source of the current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local server time
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// `{year}年{month}月{day}日{weekday}`, no zero padding.
///
/// `weekday_names` is indexed by days from Sunday and must have 7 entries.
pub fn format_date(date: NaiveDate, weekday_names: &[String]) -> String {
    let weekday = weekday_names
        .get(date.weekday().num_days_from_sunday() as usize)
        .map(String::as_str)
        .unwrap_or_default();
    format!(
        "{}年{}月{}日{}",
        date.year(),
        date.month(),
        date.day(),
        weekday
    )
}

#[cfg(test)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
