//! Wall-clock widget: time, date, time-of-day bucket and day progress.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::Serialize;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

const MONTHS: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь",
    "Октябрь", "Ноябрь", "Декабрь",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Day,
    Evening,
    Night,
}

/// Order of the buckets on the timeline strip, midnight to midnight.
pub const TIMELINE: [TimeOfDay; 5] = [
    TimeOfDay::Night,
    TimeOfDay::Morning,
    TimeOfDay::Day,
    TimeOfDay::Evening,
    TimeOfDay::Night,
];

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Day,
            18..=22 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Утро",
            TimeOfDay::Day => "День",
            TimeOfDay::Evening => "Вечер",
            TimeOfDay::Night => "Ночь",
        }
    }
}

/// Percentage of the day elapsed at minute resolution, capped at 100.
pub fn day_progress(hour: u32, minute: u32) -> u8 {
    let total = f64::from(hour * 60 + minute);
    let pct = (total / MINUTES_PER_DAY * 100.0).round();
    pct.min(100.0) as u8
}

/// 1-indexed month name; `None` outside 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| MONTHS.get(idx as usize))
        .copied()
}

/// Source of local wall-clock time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct LocalClock;

impl TimeSource for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockState {
    pub time: String,
    pub time_of_day: TimeOfDay,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub day_progress: u8,
}

impl Default for ClockState {
    fn default() -> Self {
        Self {
            time: "12:00".to_string(),
            time_of_day: TimeOfDay::Day,
            day: 24,
            month: 11,
            year: 2025,
            day_progress: 70,
        }
    }
}

impl ClockState {
    pub fn at<T: Datelike + Timelike>(now: &T) -> Self {
        let (hour, minute) = (now.hour(), now.minute());
        Self {
            time: format!("{:02}:{:02}", hour, minute),
            time_of_day: TimeOfDay::from_hour(hour),
            day: now.day(),
            month: now.month(),
            year: now.year(),
            day_progress: day_progress(hour, minute),
        }
    }

    pub fn now() -> Self {
        Self::at(&LocalClock.now())
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month).unwrap_or("")
    }

    pub fn is_active(&self, bucket: TimeOfDay) -> bool {
        self.time_of_day == bucket
    }
}
