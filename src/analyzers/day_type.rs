//! Day-type classification against a pluggable public-holiday calendar.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::schema::DayType;

/// Source of public holidays for a country.
pub trait HolidayCalendar {
    /// Public holidays falling in `year`.
    fn holidays_in_year(&self, year: i32) -> Vec<NaiveDate>;
}

/// Statutory public holidays in Poland.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolishHolidays;

impl HolidayCalendar for PolishHolidays {
    fn holidays_in_year(&self, year: i32) -> Vec<NaiveDate> {
        let fixed: &[(u32, u32)] = &[
            (1, 1),   // Nowy Rok
            (5, 1),   // Święto Pracy
            (5, 3),   // Święto Konstytucji 3 Maja
            (8, 15),  // Wniebowzięcie NMP
            (11, 1),  // Wszystkich Świętych
            (11, 11), // Święto Niepodległości
            (12, 25),
            (12, 26),
        ];

        let mut days: Vec<NaiveDate> = fixed
            .iter()
            .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(year, m, d))
            .collect();

        if year >= 2011 {
            days.extend(NaiveDate::from_ymd_opt(year, 1, 6));
        }
        if year >= 2025 {
            days.extend(NaiveDate::from_ymd_opt(year, 12, 24));
        }

        if let Some(easter) = easter_sunday(year) {
            days.push(easter);
            days.push(easter + Duration::days(1));
            days.push(easter + Duration::days(49)); // Zielone Świątki
            days.push(easter + Duration::days(60)); // Boże Ciało
        }

        days.sort();
        days
    }
}

/// Western Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Set of holiday dates used for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet(BTreeSet<NaiveDate>);

impl HolidaySet {
    pub fn for_years(calendar: &impl HolidayCalendar, years: RangeInclusive<i32>) -> Self {
        years.flat_map(|y| calendar.holidays_in_year(y)).collect()
    }

    /// Holidays of every year touched by `[start, end]`.
    pub fn for_span(calendar: &impl HolidayCalendar, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self::for_years(calendar, start.year()..=end.year())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        HolidaySet(iter.into_iter().collect())
    }
}

/// Holidays win over weekends; everything else is a weekday.
pub fn classify_day_type(date: NaiveDate, holidays: &HolidaySet) -> DayType {
    if holidays.contains(date) {
        DayType::Holiday
    } else if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        DayType::Weekend
    } else {
        DayType::Weekday
    }
}
