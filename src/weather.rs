//! Forecast snapshot as served by the backend `/weather` endpoint.

use serde::{Deserialize, Serialize};

use crate::http::FetchError;
use crate::logging::{info, obj, v_str, warn, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Sun,
    CloudSun,
    Cloud,
    Fog,
    Rain,
    Snow,
    Lightning,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Sun => "sun",
            Condition::CloudSun => "cloud-sun",
            Condition::Cloud => "cloud",
            Condition::Fog => "fog",
            Condition::Rain => "rain",
            Condition::Snow => "snow",
            // Backend spelling; also the icon file name.
            Condition::Lightning => "lighting",
        }
    }

    /// Icon name; fog has no icon of its own.
    pub fn icon(&self) -> &'static str {
        match self {
            Condition::Fog => Condition::Cloud.as_str(),
            other => other.as_str(),
        }
    }

    pub fn icon_path(&self) -> String {
        format!("/static/{}.svg", self.icon())
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sun" => Condition::Sun,
            "cloud-sun" => Condition::CloudSun,
            "fog" => Condition::Fog,
            "rain" => Condition::Rain,
            "snow" => Condition::Snow,
            "lighting" | "lightning" => Condition::Lightning,
            _ => Condition::Cloud,
        }
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temp: f64,
    pub state: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayParts {
    pub morning: Reading,
    pub day: Reading,
    pub evening: Reading,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub min: f64,
    pub max: f64,
    pub state: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub day_1: DayForecast,
    pub day_2: DayForecast,
    pub day_3: DayForecast,
    pub day_4: DayForecast,
    pub day_5: DayForecast,
    pub day_6: DayForecast,
}

pub const WEEKDAY_LABELS: [&str; 6] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб"];

impl Week {
    pub fn days(&self) -> [&DayForecast; 6] {
        [
            &self.day_1,
            &self.day_2,
            &self.day_3,
            &self.day_4,
            &self.day_5,
            &self.day_6,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub main: Reading,
    pub day: DayParts,
    pub week: Week,
}

impl WeatherSnapshot {
    /// Values shown before the first successful fetch.
    pub fn placeholder() -> Self {
        let cloud = |temp| Reading {
            temp,
            state: Condition::Cloud,
        };
        let forecast = |max| DayForecast {
            min: max,
            max,
            state: Condition::Cloud,
        };
        Self {
            main: cloud(14.0),
            day: DayParts {
                morning: cloud(10.0),
                day: cloud(14.0),
                evening: cloud(12.0),
            },
            week: Week {
                day_1: forecast(18.0),
                day_2: forecast(16.0),
                day_3: forecast(12.0),
                day_4: forecast(12.0),
                day_5: forecast(12.0),
                day_6: forecast(12.0),
            },
        }
    }
}

/// Last good snapshot; absent until the first successful fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub snapshot: Option<WeatherSnapshot>,
}

impl WeatherState {
    /// Replaces the snapshot on success; on failure keeps the stale one.
    pub fn apply(&mut self, result: Result<WeatherSnapshot, FetchError>) {
        match result {
            Ok(snapshot) => {
                info(
                    Domain::Weather,
                    "updated",
                    obj(&[("state", v_str(snapshot.main.state.as_str()))]),
                );
                self.snapshot = Some(snapshot);
            }
            Err(err) => {
                warn(
                    Domain::Weather,
                    "fetch_failed",
                    obj(&[
                        ("msg", v_str(&err.to_string())),
                        ("non_ok_status", serde_json::Value::Bool(err.is_status())),
                        ("kept_previous", serde_json::Value::Bool(self.snapshot.is_some())),
                    ]),
                );
            }
        }
    }

    pub fn display(&self) -> WeatherSnapshot {
        self.snapshot.unwrap_or_else(WeatherSnapshot::placeholder)
    }
}
