use chrono::{Datelike, NaiveDate};

use crate::errors::{NdviError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarField {
    Year,
    Month,
}

impl CalendarField {
    fn of(&self, date: NaiveDate) -> i32 {
        match self {
            CalendarField::Year => date.year(),
            CalendarField::Month => date.month() as i32,
        }
    }
}

/// Inclusive range over one calendar field of an acquisition date.
///
/// Ranges never wrap: a December to February season can not be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarRange {
    start: i32,
    end: i32,
    field: CalendarField,
}

impl CalendarRange {
    pub fn new(start: i32, end: i32, field: CalendarField) -> Result<Self> {
        if start > end {
            return Err(NdviError::configuration(format!(
                "{field:?} range {start}..={end} is inverted, seasons crossing a year boundary are not supported"
            )));
        }
        if matches!(field, CalendarField::Month) && (start < 1 || end > 12) {
            return Err(NdviError::configuration(format!(
                "month range {start}..={end} outside 1..=12"
            )));
        }
        Ok(Self { start, end, field })
    }

    pub fn years(start: i32, end: i32) -> Result<Self> {
        Self::new(start, end, CalendarField::Year)
    }

    pub fn months(start: u32, end: u32) -> Result<Self> {
        Self::new(start as i32, end as i32, CalendarField::Month)
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&self.field.of(date))
    }
}

/// Conjunction of calendar ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFilter(Vec<CalendarRange>);

impl CalendarFilter {
    pub fn and(mut self, range: CalendarRange) -> Self {
        self.0.push(range);
        self
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        self.0.iter().all(|range| range.matches(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn growing_season() -> CalendarFilter {
        CalendarFilter::default()
            .and(CalendarRange::years(2018, 2020).unwrap())
            .and(CalendarRange::months(6, 10).unwrap())
    }

    #[rstest]
    #[case(2018, 6, 1, true)]
    #[case(2020, 10, 31, true)]
    #[case(2019, 5, 31, false)]
    #[case(2019, 11, 1, false)]
    #[case(2017, 7, 15, false)]
    #[case(2021, 7, 15, false)]
    fn year_and_month_are_both_required(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: bool,
    ) {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        assert_eq!(growing_season().matches(date), expected);
    }

    #[rstest]
    fn empty_filter_matches_everything() {
        let date = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        assert!(CalendarFilter::default().matches(date));
    }

    #[rstest]
    #[case(12, 2)]
    #[case(0, 5)]
    #[case(6, 13)]
    fn invalid_month_ranges(#[case] start: u32, #[case] end: u32) {
        assert!(matches!(
            CalendarRange::months(start, end),
            Err(NdviError::Configuration(_))
        ));
    }
}
