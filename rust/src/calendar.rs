//! Working-day calendar used by all schedule date arithmetic.
//!
//! # Time Model
//! Durations are whole working days. A calendar is a weekly pattern of working
//! weekdays plus dated exceptions that force a single date working or non-working.
//! Exceptions override the weekly pattern.
//!
//! `working_duration_between(a, b)` counts the working days in the half-open range
//! `[a, b)` (negated when `b < a`), and `add_working_duration` is its inverse on
//! working days: `add_working_duration(d, working_duration_between(d, e)) == e`.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const DEFAULT_HOURS_PER_DAY: u8 = 8;

/// Errors raised by calendar construction and arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid calendar configuration for '{calendar}': {reason}")]
    InvalidConfig { calendar: String, reason: String },
    #[error("Date arithmetic from {0} left the supported date range")]
    DateOutOfRange(NaiveDate),
}

/// A dated override of the weekly pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarException {
    pub date: NaiveDate,
    /// `true` forces a working day (e.g. a Saturday shift), `false` a holiday.
    pub working: bool,
}

/// Serialized form of a [`WorkCalendar`]; validated on conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarData {
    pub name: String,
    #[serde(default = "default_working_days")]
    pub working_days: Vec<Weekday>,
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: u8,
    #[serde(default)]
    pub exceptions: Vec<CalendarException>,
}

fn default_working_days() -> Vec<Weekday> {
    WEEK[..5].to_vec()
}

fn default_hours_per_day() -> u8 {
    DEFAULT_HOURS_PER_DAY
}

/// Working-time calendar: weekly working days plus holiday/working-day exceptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CalendarData", into = "CalendarData")]
pub struct WorkCalendar {
    name: String,
    /// Indexed by `Weekday::num_days_from_monday`.
    working_days: [bool; 7],
    hours_per_day: u8,
    exceptions: BTreeMap<NaiveDate, bool>,
}

impl WorkCalendar {
    /// Create a calendar from its working weekdays and hours per working day.
    ///
    /// Fails with `InvalidConfig` when no weekday is working (date arithmetic could
    /// never terminate) or `hours_per_day` is outside `1..=24`.
    pub fn new(
        name: impl Into<String>,
        working_days: impl IntoIterator<Item = Weekday>,
        hours_per_day: u8,
    ) -> Result<Self, CalendarError> {
        let name = name.into();
        let mut days = [false; 7];
        for day in working_days {
            days[day.num_days_from_monday() as usize] = true;
        }

        if !days.iter().any(|&working| working) {
            return Err(CalendarError::InvalidConfig {
                calendar: name,
                reason: "no working weekdays".to_string(),
            });
        }
        if !(1..=24).contains(&hours_per_day) {
            return Err(CalendarError::InvalidConfig {
                calendar: name,
                reason: format!("hours per day must be within 1..=24, got {}", hours_per_day),
            });
        }

        Ok(Self {
            name,
            working_days: days,
            hours_per_day,
            exceptions: BTreeMap::new(),
        })
    }

    /// The default 5-day (Mon-Fri), 8-hour calendar.
    pub fn standard() -> Self {
        Self {
            name: "Standard".to_string(),
            working_days: [true, true, true, true, true, false, false],
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            exceptions: BTreeMap::new(),
        }
    }

    /// Mark a date as non-working.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.exceptions.insert(date, false);
        self
    }

    /// Mark a date as working regardless of the weekly pattern.
    pub fn with_working_day(mut self, date: NaiveDate) -> Self {
        self.exceptions.insert(date, true);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hours_per_day(&self) -> u8 {
        self.hours_per_day
    }

    /// Number of working weekdays in the weekly pattern (always >= 1).
    pub fn weekly_working_days(&self) -> i64 {
        self.working_days.iter().filter(|&&working| working).count() as i64
    }

    #[inline]
    fn weekday_rule(&self, date: NaiveDate) -> bool {
        self.working_days[date.weekday().num_days_from_monday() as usize]
    }

    /// Whether work happens on this date.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        match self.exceptions.get(&date) {
            Some(&working) => working,
            None => self.weekday_rule(date),
        }
    }

    /// The first working day at or after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        self.add_working_duration(date, 0)
    }

    /// The last working day strictly before `date`.
    pub fn last_working_day_before(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        self.add_working_duration(date, -1)
    }

    /// Move `days` working days away from `start`.
    ///
    /// For `days >= 0` this returns the first working day `e >= start` with exactly
    /// `days` working days in `[start, e)`; zero snaps a non-working start forward.
    /// For `days < 0` it returns the last working day `e < start` with `|days|`
    /// working days in `[e, start)`.
    pub fn add_working_duration(
        &self,
        start: NaiveDate,
        days: i64,
    ) -> Result<NaiveDate, CalendarError> {
        let forward = days >= 0;
        let target = days.abs();

        // Jump whole weeks while that stays short of the target, then walk day by day.
        // `counted` is the number of working days between `start` and `date`.
        let weekly = self.weekly_working_days();
        let mut date = start;
        let mut counted = 0;
        let mut weeks = target / weekly;
        while weeks > 0 {
            let span = Days::new((weeks * 7) as u64);
            let next = if forward {
                date.checked_add_days(span)
            } else {
                date.checked_sub_days(span)
            }
            .ok_or(CalendarError::DateOutOfRange(start))?;
            let gained = self.working_duration_between(date, next).abs();
            if counted + gained < target {
                date = next;
                counted += gained;
                weeks = (target - counted) / weekly;
            } else {
                weeks /= 2;
            }
        }

        if forward {
            loop {
                if self.is_working_day(date) {
                    if counted == target {
                        return Ok(date);
                    }
                    counted += 1;
                }
                date = date
                    .succ_opt()
                    .ok_or(CalendarError::DateOutOfRange(start))?;
            }
        }

        loop {
            date = date
                .pred_opt()
                .ok_or(CalendarError::DateOutOfRange(start))?;
            if self.is_working_day(date) {
                counted += 1;
                if counted == target {
                    return Ok(date);
                }
            }
        }
    }

    /// Signed count of working days in `[a, b)`; negative when `b < a`.
    pub fn working_duration_between(&self, a: NaiveDate, b: NaiveDate) -> i64 {
        if b < a {
            return -self.working_duration_between(b, a);
        }

        let total_days = (b - a).num_days();
        let weeks = total_days / 7;
        let mut count = weeks * self.weekly_working_days();

        // Remainder days after the whole weeks, weekly pattern only
        let mut day = a
            .checked_add_days(Days::new((weeks * 7) as u64))
            .unwrap_or(b);
        while day < b {
            if self.weekday_rule(day) {
                count += 1;
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        // Exceptions that disagree with the weekly pattern
        for (&date, &working) in self.exceptions.range(a..b) {
            match (working, self.weekday_rule(date)) {
                (true, false) => count += 1,
                (false, true) => count -= 1,
                _ => {}
            }
        }

        count
    }

    /// Signed working-day offset of `date` relative to `origin`, treating `date` as
    /// an inclusive finish: work on a working `date` counts as one more day.
    pub fn finish_offset(&self, origin: NaiveDate, date: NaiveDate) -> i64 {
        self.working_duration_between(origin, date) + i64::from(self.is_working_day(date))
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<CalendarData> for WorkCalendar {
    type Error = CalendarError;

    fn try_from(data: CalendarData) -> Result<Self, Self::Error> {
        let mut calendar = WorkCalendar::new(data.name, data.working_days, data.hours_per_day)?;
        for exception in data.exceptions {
            calendar.exceptions.insert(exception.date, exception.working);
        }
        Ok(calendar)
    }
}

impl From<WorkCalendar> for CalendarData {
    fn from(calendar: WorkCalendar) -> Self {
        CalendarData {
            working_days: WEEK
                .iter()
                .copied()
                .filter(|day| calendar.working_days[day.num_days_from_monday() as usize])
                .collect(),
            hours_per_day: calendar.hours_per_day,
            exceptions: calendar
                .exceptions
                .iter()
                .map(|(&date, &working)| CalendarException { date, working })
                .collect(),
            name: calendar.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_standard_week() {
        let cal = WorkCalendar::standard();
        assert!(cal.is_working_day(date(2025, 1, 6))); // Monday
        assert!(cal.is_working_day(date(2025, 1, 10))); // Friday
        assert!(!cal.is_working_day(date(2025, 1, 11))); // Saturday
        assert!(!cal.is_working_day(date(2025, 1, 12))); // Sunday
        assert_eq!(cal.weekly_working_days(), 5);
        assert_eq!(cal.hours_per_day(), 8);
    }

    #[test]
    fn test_no_working_days_rejected() {
        let result = WorkCalendar::new("Empty", Vec::<Weekday>::new(), 8);
        assert!(matches!(result, Err(CalendarError::InvalidConfig { .. })));
    }

    #[test]
    fn test_bad_hours_rejected() {
        let result = WorkCalendar::new("Long", [Weekday::Mon], 25);
        assert!(matches!(result, Err(CalendarError::InvalidConfig { .. })));
        let result = WorkCalendar::new("Zero", [Weekday::Mon], 0);
        assert!(matches!(result, Err(CalendarError::InvalidConfig { .. })));
    }

    #[test]
    fn test_add_across_weekend() {
        let cal = WorkCalendar::standard();
        // Friday + 1 working day = Monday
        assert_eq!(
            cal.add_working_duration(date(2025, 1, 10), 1).unwrap(),
            date(2025, 1, 13)
        );
        // Monday + 5 = next Monday
        assert_eq!(
            cal.add_working_duration(date(2025, 1, 6), 5).unwrap(),
            date(2025, 1, 13)
        );
    }

    #[test]
    fn test_zero_duration_snaps_forward() {
        let cal = WorkCalendar::standard();
        assert_eq!(
            cal.add_working_duration(date(2025, 1, 11), 0).unwrap(),
            date(2025, 1, 13)
        );
        assert_eq!(
            cal.next_working_day(date(2025, 1, 8)).unwrap(),
            date(2025, 1, 8)
        );
    }

    #[test]
    fn test_negative_duration() {
        let cal = WorkCalendar::standard();
        assert_eq!(
            cal.add_working_duration(date(2025, 1, 13), -1).unwrap(),
            date(2025, 1, 10)
        );
        assert_eq!(
            cal.last_working_day_before(date(2025, 1, 12)).unwrap(),
            date(2025, 1, 10)
        );
    }

    #[test]
    fn test_holiday_skipped() {
        let cal = WorkCalendar::standard().with_holiday(date(2025, 1, 8));
        assert!(!cal.is_working_day(date(2025, 1, 8)));
        assert_eq!(
            cal.add_working_duration(date(2025, 1, 6), 3).unwrap(),
            date(2025, 1, 10)
        );
        assert_eq!(
            cal.working_duration_between(date(2025, 1, 6), date(2025, 1, 13)),
            4
        );
    }

    #[test]
    fn test_working_exception_counts() {
        let cal = WorkCalendar::standard().with_working_day(date(2025, 1, 11));
        assert!(cal.is_working_day(date(2025, 1, 11)));
        assert_eq!(
            cal.working_duration_between(date(2025, 1, 6), date(2025, 1, 13)),
            6
        );
    }

    #[test]
    fn test_between_is_antisymmetric() {
        let cal = WorkCalendar::standard();
        let a = date(2025, 1, 6);
        let b = date(2025, 2, 19);
        assert_eq!(
            cal.working_duration_between(a, b),
            -cal.working_duration_between(b, a)
        );
        assert_eq!(cal.working_duration_between(a, a), 0);
    }

    #[test]
    fn test_inverse_consistency() {
        let cal = WorkCalendar::standard()
            .with_holiday(date(2025, 1, 1))
            .with_holiday(date(2025, 1, 20))
            .with_working_day(date(2025, 1, 25));
        let start = date(2024, 12, 23);
        let working: Vec<NaiveDate> = (0..60)
            .filter_map(|i| start.checked_add_days(Days::new(i)))
            .filter(|d| cal.is_working_day(*d))
            .collect();

        for &d in &working {
            for &e in &working {
                let between = cal.working_duration_between(d, e);
                assert_eq!(cal.add_working_duration(d, between).unwrap(), e);
            }
        }
    }

    #[test]
    fn test_long_durations_match_day_stepping() {
        let monday_to_saturday =
            std::iter::successors(Some(Weekday::Mon), |d| Some(d.succ())).take(6);
        let cal = WorkCalendar::new("Six day", monday_to_saturday, 8)
            .unwrap()
            .with_holiday(date(2025, 3, 3))
            .with_holiday(date(2025, 3, 4))
            .with_holiday(date(2025, 12, 25))
            .with_working_day(date(2025, 6, 8))
            .with_working_day(date(2026, 1, 4));
        let start = date(2025, 1, 15);

        let mut forward = start;
        let mut steps = 0;
        while steps < 400 {
            forward = forward.succ_opt().unwrap();
            if cal.is_working_day(forward) {
                steps += 1;
            }
        }
        assert_eq!(cal.add_working_duration(start, 400).unwrap(), forward);

        let mut backward = start;
        let mut steps = 0;
        while steps < 300 {
            backward = backward.pred_opt().unwrap();
            if cal.is_working_day(backward) {
                steps += 1;
            }
        }
        assert_eq!(cal.add_working_duration(start, -300).unwrap(), backward);

        for days in [-700, -365, -7, 6, 250, 800] {
            let e = cal.add_working_duration(start, days).unwrap();
            assert!(cal.is_working_day(e));
            assert_eq!(cal.working_duration_between(start, e), days, "{}", days);
        }
    }

    #[test]
    fn test_monotonic() {
        let cal = WorkCalendar::standard().with_holiday(date(2025, 1, 7));
        let start = date(2025, 1, 3);
        let mut previous = cal.add_working_duration(start, 0).unwrap();
        for n in 1..30 {
            let next = cal.add_working_duration(start, n).unwrap();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_finish_offset() {
        let cal = WorkCalendar::standard();
        let origin = date(2025, 1, 6);
        // Finishing Friday means five working days of work from Monday
        assert_eq!(cal.finish_offset(origin, date(2025, 1, 10)), 5);
        // Finishing on Saturday is the same as finishing Friday
        assert_eq!(cal.finish_offset(origin, date(2025, 1, 11)), 5);
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"{"name": "Weekend", "working_days": [], "hours_per_day": 8}"#;
        assert!(serde_json::from_str::<WorkCalendar>(json).is_err());

        let json = r#"{"name": "Six day", "working_days": ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
                       "exceptions": [{"date": "2025-01-01", "working": false}]}"#;
        let cal: WorkCalendar = serde_json::from_str(json).unwrap();
        assert_eq!(cal.weekly_working_days(), 6);
        assert_eq!(cal.hours_per_day(), 8);
        assert!(!cal.is_working_day(date(2025, 1, 1)));
        assert!(cal.is_working_day(date(2025, 1, 4)));
    }
}
