//! Accelerated in-game calendar.
//!
//! Real seconds are scaled by `base_rate / speed_multiplier` into simulated
//! seconds. Boundary queries compare the date before and after the most
//! recent `advance`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::warn;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Longest simulated span a single `advance` may cover.
pub const MAX_ADVANCE_DAYS: i64 = 36_500;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("unable to parse date '{input}'")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("clock rate must be a positive finite number, got {0}")]
    InvalidRate(f64),
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ClockError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|source| ClockError::Parse {
        input: input.to_string(),
        source,
    })
}

pub fn parse_date_time(input: &str) -> Result<NaiveDateTime, ClockError> {
    NaiveDateTime::parse_from_str(input.trim(), DATE_TIME_FORMAT).map_err(|source| {
        ClockError::Parse {
            input: input.to_string(),
            source,
        }
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn validate_rate(value: f64) -> Result<f64, ClockError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ClockError::InvalidRate(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    current: NaiveDateTime,
    previous: NaiveDateTime,
    base_rate: f64,
    speed_multiplier: f64,
    paused: bool,
}

impl Clock {
    /// `base_rate` is simulated seconds per real second at multiplier 1.
    pub fn new(start: NaiveDate, base_rate: f64, speed_multiplier: f64) -> Result<Self, ClockError> {
        let start = start.and_time(chrono::NaiveTime::default());
        Self::restore(start, base_rate, speed_multiplier, false)
    }

    pub fn restore(
        current: NaiveDateTime,
        base_rate: f64,
        speed_multiplier: f64,
        paused: bool,
    ) -> Result<Self, ClockError> {
        Ok(Self {
            current,
            previous: current,
            base_rate: validate_rate(base_rate)?,
            speed_multiplier: validate_rate(speed_multiplier)?,
            paused,
        })
    }

    pub fn advance(&mut self, delta_real_seconds: f64) {
        self.previous = self.current;
        if self.paused || !delta_real_seconds.is_finite() || delta_real_seconds <= 0.0 {
            return;
        }
        let limit = (MAX_ADVANCE_DAYS * 86_400) as f64;
        let simulated = (delta_real_seconds * (self.base_rate / self.speed_multiplier)).min(limit);
        let micros = (simulated * 1_000_000.0).round().max(1.0) as i64;
        match self.current.checked_add_signed(Duration::microseconds(micros)) {
            Some(next) => self.current = next,
            None => warn!(current = %self.current, simulated, "clock reached the end of the calendar"),
        }
    }

    pub fn day_changed(&self) -> bool {
        self.current.date() != self.previous.date()
    }

    pub fn month_changed(&self) -> bool {
        (self.current.year(), self.current.month()) != (self.previous.year(), self.previous.month())
    }

    pub fn year_changed(&self) -> bool {
        self.current.year() != self.previous.year()
    }

    /// Every calendar day entered by the last `advance`, oldest first.
    pub fn crossed_days(&self) -> Vec<NaiveDate> {
        let target = self.current.date();
        self.previous
            .date()
            .iter_days()
            .skip(1)
            .take_while(|day| *day <= target)
            .collect()
    }

    pub fn days_since(&self, past: &str) -> Result<i64, ClockError> {
        Ok(self.days_since_date(parse_date(past)?))
    }

    pub fn days_since_date(&self, past: NaiveDate) -> i64 {
        (self.current.date() - past).num_days()
    }

    pub fn current_time(&self) -> NaiveDateTime {
        self.current
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current.date()
    }

    pub fn current_date_str(&self) -> String {
        format_date(self.current.date())
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), ClockError> {
        self.speed_multiplier = validate_rate(multiplier)?;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }
}

/// True when `date` starts a new month relative to the day before it.
pub fn starts_month(date: NaiveDate) -> bool {
    date.day() == 1
}

pub fn starts_year(date: NaiveDate) -> bool {
    date.ordinal() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: f64 = 86_400.0;

    fn clock_at(date: &str) -> Clock {
        Clock::new(parse_date(date).unwrap(), DAY, 1.0).unwrap()
    }

    #[test]
    fn advance_scales_by_rate_over_multiplier() {
        let mut clock = Clock::new(parse_date("2023-05-20").unwrap(), DAY, 2.0).unwrap();
        clock.advance(2.0);
        assert_eq!(clock.current_date_str(), "2023-05-21");
        assert!(clock.day_changed());
        assert!(!clock.month_changed());
    }

    #[test]
    fn huge_advance_is_capped() {
        let mut clock = clock_at("2023-05-20");
        clock.advance(f64::MAX);
        assert_eq!(clock.crossed_days().len() as i64, MAX_ADVANCE_DAYS);

        let mut clock = Clock::new(NaiveDate::MAX, DAY, 1.0).unwrap();
        clock.advance(1_000.0);
        assert_eq!(clock.current_date(), NaiveDate::MAX);
        assert!(clock.crossed_days().is_empty());
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut clock = clock_at("2023-05-20");
        clock.pause();
        clock.advance(10.0);
        assert_eq!(clock.current_date_str(), "2023-05-20");
        assert!(!clock.day_changed());
        clock.resume();
        clock.advance(1.0);
        assert_eq!(clock.current_date_str(), "2023-05-21");
    }

    #[test]
    fn boundary_queries_are_edge_triggered() {
        let mut clock = clock_at("2023-12-31");
        clock.advance(1.0);
        assert!(clock.day_changed());
        assert!(clock.month_changed());
        assert!(clock.year_changed());

        clock.advance(0.25);
        assert!(!clock.day_changed());
        assert!(!clock.month_changed());
        assert!(!clock.year_changed());
    }

    #[test]
    fn crossed_days_lists_every_skipped_day() {
        let mut clock = clock_at("2023-01-30");
        clock.advance(3.0);
        let days: Vec<String> = clock.crossed_days().into_iter().map(format_date).collect();
        assert_eq!(days, vec!["2023-01-31", "2023-02-01", "2023-02-02"]);
        assert!(starts_month(parse_date("2023-02-01").unwrap()));
    }

    #[test]
    fn days_since_counts_whole_days() {
        let mut clock = clock_at("2023-05-20");
        clock.advance(0.5);
        assert_eq!(clock.days_since("2023-05-01").unwrap(), 19);
        assert_eq!(clock.days_since("2023-05-20").unwrap(), 0);
    }

    #[test]
    fn malformed_date_is_a_parse_error() {
        let clock = clock_at("2023-05-20");
        let err = clock.days_since("20/05/2023").unwrap_err();
        assert!(matches!(err, ClockError::Parse { .. }));
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let mut clock = clock_at("2023-05-20");
        assert!(clock.set_speed_multiplier(0.0).is_err());
        assert_eq!(clock.speed_multiplier(), 1.0);
    }
}
