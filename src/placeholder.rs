use chrono::{Datelike, Local, NaiveDate};

/// Date placeholders substituted into user-facing poll text.
///
/// `%month%` and `%date%` expand to the unpadded month and day of month,
/// `%year%` to the four-digit year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    year: String,
    month: String,
    date: String,
}

impl Placeholders {
    /// Placeholders for the current local date
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Placeholders for a fixed date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year().to_string(),
            month: date.month().to_string(),
            date: date.day().to_string(),
        }
    }

    /// Replace every placeholder occurrence in `text`
    pub fn apply(&self, text: &str) -> String {
        text.replace("%year%", &self.year)
            .replace("%month%", &self.month)
            .replace("%date%", &self.date)
    }

    /// Apply to an optional value, keeping `None` as is
    pub fn apply_opt(&self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.apply(t))
    }
}
