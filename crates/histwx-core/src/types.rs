//! Core data types for historical weather observations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Surrogate identifier assigned by the store on insert
pub type ObservationId = i64;

/// One weather reading.
///
/// Only the timestamp is guaranteed. Every measurement is independently
/// optional and an absent value is never the same thing as zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Observation instant (UTC)
    pub timestamp: DateTime<Utc>,

    /// Short condition label, e.g. "Haze" or "Light Rain"
    pub conditions: Option<String>,

    // Temperature fields (°C)
    pub dewpoint: Option<f64>,
    pub heat_index: Option<f64>,
    pub temperature: Option<f64>,
    pub wind_chill: Option<f64>,

    /// Relative humidity (%)
    pub humidity: Option<i32>,

    pub precipitation: Option<f64>,

    /// Station pressure (mbar)
    pub pressure: Option<f64>,

    pub visibility: Option<f64>,

    // Wind fields
    pub wind_direction_degrees: Option<i32>,
    pub wind_direction_name: Option<String>,
    pub wind_gust: Option<f64>,
    pub wind_speed: Option<f64>,

    // Event flags: absent, 0 or 1
    pub fog: Option<i32>,
    pub hail: Option<i32>,
    pub rain: Option<i32>,
    pub snow: Option<i32>,
    pub thunder: Option<i32>,
    pub tornado: Option<i32>,
}

impl Observation {
    /// An observation carrying only a timestamp
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            conditions: None,
            dewpoint: None,
            heat_index: None,
            temperature: None,
            wind_chill: None,
            humidity: None,
            precipitation: None,
            pressure: None,
            visibility: None,
            wind_direction_degrees: None,
            wind_direction_name: None,
            wind_gust: None,
            wind_speed: None,
            fog: None,
            hail: None,
            rain: None,
            snow: None,
            thunder: None,
            tornado: None,
        }
    }

    /// Raw flag value for an event
    pub fn event_flag(&self, event: WeatherEvent) -> Option<i32> {
        match event {
            WeatherEvent::Rain => self.rain,
            WeatherEvent::Snow => self.snow,
            WeatherEvent::Thunder => self.thunder,
            WeatherEvent::Fog => self.fog,
            WeatherEvent::Hail => self.hail,
            WeatherEvent::Tornado => self.tornado,
        }
    }

    /// True only when the flag is exactly 1
    pub fn has_event(&self, event: WeatherEvent) -> bool {
        self.event_flag(event) == Some(1)
    }
}

/// Observation together with its store-assigned identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredObservation {
    pub id: ObservationId,

    #[serde(flatten)]
    pub observation: Observation,
}

/// Discrete weather events recorded as flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherEvent {
    Rain,
    Snow,
    Thunder,
    Fog,
    Hail,
    Tornado,
}

impl WeatherEvent {
    /// Every flag carried by an observation
    pub const ALL: [WeatherEvent; 6] = [
        WeatherEvent::Rain,
        WeatherEvent::Snow,
        WeatherEvent::Thunder,
        WeatherEvent::Fog,
        WeatherEvent::Hail,
        WeatherEvent::Tornado,
    ];

    /// Events that can be used as a query filter
    pub const SEARCHABLE: [WeatherEvent; 5] = [
        WeatherEvent::Rain,
        WeatherEvent::Snow,
        WeatherEvent::Thunder,
        WeatherEvent::Fog,
        WeatherEvent::Hail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherEvent::Rain => "rain",
            WeatherEvent::Snow => "snow",
            WeatherEvent::Thunder => "thunder",
            WeatherEvent::Fog => "fog",
            WeatherEvent::Hail => "hail",
            WeatherEvent::Tornado => "tornado",
        }
    }
}

impl fmt::Display for WeatherEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown weather event: {0} (expected rain|snow|thunder|fog|hail)")]
pub struct UnknownEvent(pub String);

/// Parses the searchable vocabulary only, case-insensitively
impl FromStr for WeatherEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        WeatherEvent::SEARCHABLE
            .into_iter()
            .find(|event| event.as_str() == name)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_flag_tristate() {
        let mut obs = Observation::at(Utc.with_ymd_and_hms(2016, 5, 1, 6, 0, 0).unwrap());
        assert!(!obs.has_event(WeatherEvent::Rain));

        obs.rain = Some(0);
        assert!(!obs.has_event(WeatherEvent::Rain));

        obs.rain = Some(1);
        assert!(obs.has_event(WeatherEvent::Rain));
        assert_eq!(obs.event_flag(WeatherEvent::Rain), Some(1));
    }

    #[test]
    fn test_event_names() {
        assert_eq!("RAIN".parse::<WeatherEvent>().unwrap(), WeatherEvent::Rain);
        assert_eq!(" hail ".parse::<WeatherEvent>().unwrap(), WeatherEvent::Hail);
        assert!("tornado".parse::<WeatherEvent>().is_err());
        assert!("drizzle".parse::<WeatherEvent>().is_err());
    }

    #[test]
    fn test_stored_observation_serde() {
        let mut obs = Observation::at(Utc.with_ymd_and_hms(1996, 11, 1, 11, 0, 0).unwrap());
        obs.temperature = Some(30.0);
        obs.conditions = Some("Smoke".into());
        let stored = StoredObservation {
            id: 7,
            observation: obs,
        };

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["temperature"], 30.0);
        assert_eq!(json["conditions"], "Smoke");
        assert!(json["windSpeed"].is_null());

        let back: StoredObservation = serde_json::from_value(json).unwrap();
        assert_eq!(back, stored);
    }
}
