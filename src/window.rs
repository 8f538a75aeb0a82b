use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone)]
pub struct RecencyWindow {
    dates: Vec<String>,
}

impl RecencyWindow {
    pub fn trailing(days: u32, offset: UtcOffset, now: OffsetDateTime) -> Self {
        let reference = now.to_offset(offset).date();
        let dates = (0..i64::from(days.max(1)))
            .filter_map(|back| reference.checked_sub(Duration::days(back)))
            .filter_map(iso_date)
            .collect();
        Self { dates }
    }

    pub fn current(days: u32, offset: UtcOffset) -> Self {
        Self::trailing(days, offset, OffsetDateTime::now_utc())
    }

    pub fn contains(&self, airdate: Option<&str>) -> bool {
        airdate.is_some_and(|date| self.dates.iter().any(|day| day == date))
    }

    // Newest first.
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn iso_date(date: Date) -> Option<String> {
    date.format(ISO_DATE).ok()
}
