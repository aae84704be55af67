//! Descriptive statistics over a set of observations

use crate::types::{Observation, WeatherEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running accumulator over the present values of one measurement
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent values are skipped, never counted as zero
    pub fn add(&mut self, value: Option<f64>) {
        let Some(v) = value else {
            return;
        };
        self.count += 1;
        self.sum += v;
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumidityStats {
    pub average: f64,
}

/// Occurrences of each event flag equal to 1
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub rain: u64,
    pub snow: u64,
    pub thunder: u64,
    pub fog: u64,
    pub hail: u64,
    pub tornado: u64,
}

impl EventCounts {
    pub fn get(&self, event: WeatherEvent) -> u64 {
        match event {
            WeatherEvent::Rain => self.rain,
            WeatherEvent::Snow => self.snow,
            WeatherEvent::Thunder => self.thunder,
            WeatherEvent::Fog => self.fog,
            WeatherEvent::Hail => self.hail,
            WeatherEvent::Tornado => self.tornado,
        }
    }

    fn bump(&mut self, event: WeatherEvent) {
        let slot = match event {
            WeatherEvent::Rain => &mut self.rain,
            WeatherEvent::Snow => &mut self.snow,
            WeatherEvent::Thunder => &mut self.thunder,
            WeatherEvent::Fog => &mut self.fog,
            WeatherEvent::Hail => &mut self.hail,
            WeatherEvent::Tornado => &mut self.tornado,
        };
        *slot += 1;
    }
}

/// Aggregate view of a record set. Averages, minimum and maximum fall back
/// to 0 when no record carries the measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_records: u64,
    pub temperature: TemperatureStats,
    pub humidity: HumidityStats,
    pub weather_events: EventCounts,
}

impl Statistics {
    /// Compute statistics over any iterator of observations
    pub fn compute<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut total = 0u64;
        let mut temperature = Accumulator::new();
        let mut humidity = Accumulator::new();
        let mut events = EventCounts::default();

        for obs in observations {
            total += 1;
            temperature.add(obs.temperature);
            humidity.add(obs.humidity.map(f64::from));
            for event in WeatherEvent::ALL {
                if obs.has_event(event) {
                    events.bump(event);
                }
            }
        }

        Self {
            total_records: total,
            temperature: TemperatureStats {
                average: temperature.avg().unwrap_or(0.0),
                maximum: temperature.max().unwrap_or(0.0),
                minimum: temperature.min().unwrap_or(0.0),
            },
            humidity: HumidityStats {
                average: humidity.avg().unwrap_or(0.0),
            },
            weather_events: events,
        }
    }
}

/// Distinct condition labels with their occurrence counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSummary {
    pub total_conditions_found: usize,
    pub conditions: BTreeMap<String, u64>,
}

/// Count each distinct condition label; records without one are skipped
pub fn condition_counts<'a, I>(observations: I) -> ConditionSummary
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut conditions: BTreeMap<String, u64> = BTreeMap::new();
    for label in observations.into_iter().filter_map(|o| o.conditions.as_ref()) {
        *conditions.entry(label.clone()).or_insert(0) += 1;
    }
    ConditionSummary {
        total_conditions_found: conditions.len(),
        conditions,
    }
}
