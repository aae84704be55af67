//! Composable filters over observations
//!
//! A [`Predicate`] is a conjunction of independent clauses. Each active
//! criterion of an [`ObservationFilter`] contributes one clause; criteria
//! that are not set contribute nothing, so an empty filter matches every
//! observation.

use crate::types::{Observation, WeatherEvent};
use chrono::{DateTime, Utc};
use std::fmt;

type Clause = Box<dyn Fn(&Observation) -> bool + Send + Sync>;

/// AND-fold of boxed clauses
#[derive(Default)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Predicate that matches everything
    pub fn always() -> Self {
        Self::default()
    }

    pub fn and<F>(mut self, clause: F) -> Self
    where
        F: Fn(&Observation) -> bool + Send + Sync + 'static,
    {
        self.clauses.push(Box::new(clause));
        self
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.clauses.iter().all(|clause| clause(obs))
    }

    /// Number of active clauses
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("clauses", &self.clauses.len())
            .finish()
    }
}

/// Inclusive range with optional bounds on either side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Range<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn between(min: T, max: T) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn at_least(min: T) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: T) -> Self {
        Self::new(None, Some(max))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// An absent value never satisfies a bounded range
    pub fn contains(&self, value: Option<T>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(v) = value else {
            return false;
        };
        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
    }
}

/// Optional search criteria; unset criteria impose no constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFilter {
    pub temperature: Range<f64>,
    pub humidity: Range<i32>,
    pub date: Range<DateTime<Utc>>,
    pub condition: Option<String>,
    pub pressure: Range<f64>,
    pub visibility: Range<f64>,
    pub wind_speed: Range<f64>,
    pub event: Option<WeatherEvent>,
}

impl ObservationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, range: Range<f64>) -> Self {
        self.temperature = range;
        self
    }

    pub fn with_humidity(mut self, range: Range<i32>) -> Self {
        self.humidity = range;
        self
    }

    pub fn with_date(mut self, range: Range<DateTime<Utc>>) -> Self {
        self.date = range;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        self.condition = (!condition.is_empty()).then_some(condition);
        self
    }

    pub fn with_pressure(mut self, range: Range<f64>) -> Self {
        self.pressure = range;
        self
    }

    pub fn with_visibility(mut self, range: Range<f64>) -> Self {
        self.visibility = range;
        self
    }

    pub fn with_wind_speed(mut self, range: Range<f64>) -> Self {
        self.wind_speed = range;
        self
    }

    pub fn with_event(mut self, event: WeatherEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Event lookup by name.
    ///
    /// Names outside rain|snow|thunder|fog|hail leave the filter unchanged
    /// and therefore match everything. Callers that want an error for an
    /// unknown name must parse [`WeatherEvent`] themselves first.
    pub fn with_event_name(self, name: &str) -> Self {
        match name.parse::<WeatherEvent>() {
            Ok(event) => self.with_event(event),
            Err(_) => self,
        }
    }

    /// Compose every active criterion into a single predicate
    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::always();

        if !self.temperature.is_unbounded() {
            let range = self.temperature;
            predicate = predicate.and(move |o| range.contains(o.temperature));
        }
        if !self.humidity.is_unbounded() {
            let range = self.humidity;
            predicate = predicate.and(move |o| range.contains(o.humidity));
        }
        if !self.date.is_unbounded() {
            let range = self.date;
            predicate = predicate.and(move |o| range.contains(Some(o.timestamp)));
        }
        if let Some(condition) = &self.condition {
            let wanted = condition.to_lowercase();
            predicate = predicate.and(move |o| {
                o.conditions
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == wanted)
            });
        }
        if !self.pressure.is_unbounded() {
            let range = self.pressure;
            predicate = predicate.and(move |o| range.contains(o.pressure));
        }
        if !self.visibility.is_unbounded() {
            let range = self.visibility;
            predicate = predicate.and(move |o| range.contains(o.visibility));
        }
        if !self.wind_speed.is_unbounded() {
            let range = self.wind_speed;
            predicate = predicate.and(move |o| range.contains(o.wind_speed));
        }
        if let Some(event) = self.event {
            predicate = predicate.and(move |o| o.has_event(event));
        }

        predicate
    }
}
