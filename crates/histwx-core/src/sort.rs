//! Sort keys and their public aliases

use crate::types::StoredObservation;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Canonical sortable fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Timestamp,
    Temperature,
    Humidity,
    Pressure,
    Visibility,
    WindSpeed,
    Dewpoint,
    WindChill,
    Conditions,
}

impl SortField {
    /// Resolve a caller-supplied alias, case-insensitively.
    ///
    /// Total: anything unrecognised, including an empty or missing key,
    /// falls back to the timestamp.
    pub fn resolve(alias: Option<&str>) -> Self {
        let Some(alias) = alias else {
            return SortField::Timestamp;
        };
        match alias.trim().to_lowercase().as_str() {
            "temperature" | "temp" => SortField::Temperature,
            "humidity" => SortField::Humidity,
            "datetime" | "date" => SortField::Timestamp,
            "pressure" | "press" => SortField::Pressure,
            "visibility" | "vis" => SortField::Visibility,
            "windspeed" | "wind" => SortField::WindSpeed,
            "dewpoint" | "dew" => SortField::Dewpoint,
            "windchill" | "chill" => SortField::WindChill,
            "condition" => SortField::Conditions,
            _ => SortField::Timestamp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::Temperature => "temperature",
            SortField::Humidity => "humidity",
            SortField::Pressure => "pressure",
            SortField::Visibility => "visibility",
            SortField::WindSpeed => "windSpeed",
            SortField::Dewpoint => "dewpoint",
            SortField::WindChill => "windChill",
            SortField::Conditions => "conditions",
        }
    }

    /// Ascending order on this field; absent values sort first
    pub fn compare(&self, a: &StoredObservation, b: &StoredObservation) -> Ordering {
        let (a, b) = (&a.observation, &b.observation);
        match self {
            SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
            SortField::Temperature => cmp_f64(a.temperature, b.temperature),
            SortField::Humidity => a.humidity.cmp(&b.humidity),
            SortField::Pressure => cmp_f64(a.pressure, b.pressure),
            SortField::Visibility => cmp_f64(a.visibility, b.visibility),
            SortField::WindSpeed => cmp_f64(a.wind_speed, b.wind_speed),
            SortField::Dewpoint => cmp_f64(a.dewpoint, b.dewpoint),
            SortField::WindChill => cmp_f64(a.wind_chill, b.wind_chill),
            SortField::Conditions => a.conditions.cmp(&b.conditions),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid sort direction: {0} (expected ASC or DESC)")]
pub struct InvalidDirection(pub String);

impl FromStr for SortDirection {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(InvalidDirection(s.to_string())),
        }
    }
}

/// Single-field sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Total order used for paging. Ties are broken by ascending id so
    /// that consecutive pages never overlap.
    pub fn compare(&self, a: &StoredObservation, b: &StoredObservation) -> Ordering {
        let primary = self.field.compare(a, b);
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Observation;
    use chrono::{TimeZone, Utc};

    fn stored(id: i64, temp: Option<f64>) -> StoredObservation {
        let mut observation = Observation::at(Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap());
        observation.temperature = temp;
        StoredObservation { id, observation }
    }

    #[test]
    fn test_alias_table() {
        assert_eq!(SortField::resolve(Some("temperature")), SortField::Temperature);
        assert_eq!(SortField::resolve(Some("TEMP")), SortField::Temperature);
        assert_eq!(SortField::resolve(Some("humidity")), SortField::Humidity);
        assert_eq!(SortField::resolve(Some("date")), SortField::Timestamp);
        assert_eq!(SortField::resolve(Some("DateTime")), SortField::Timestamp);
        assert_eq!(SortField::resolve(Some("press")), SortField::Pressure);
        assert_eq!(SortField::resolve(Some("vis")), SortField::Visibility);
        assert_eq!(SortField::resolve(Some("windSpeed")), SortField::WindSpeed);
        assert_eq!(SortField::resolve(Some("wind")), SortField::WindSpeed);
        assert_eq!(SortField::resolve(Some("dew")), SortField::Dewpoint);
        assert_eq!(SortField::resolve(Some("windChill")), SortField::WindChill);
        assert_eq!(SortField::resolve(Some("chill")), SortField::WindChill);
        assert_eq!(SortField::resolve(Some("condition")), SortField::Conditions);
    }

    #[test]
    fn test_resolution_is_total() {
        for key in ["", "xyz", "conditions", "datetimeUtc", "tempm", "  "] {
            assert_eq!(SortField::resolve(Some(key)), SortField::Timestamp, "{key}");
        }
        assert_eq!(SortField::resolve(None), SortField::Timestamp);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("Desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("down".parse::<SortDirection>().is_err());
        assert!("".parse::<SortDirection>().is_err());
    }

    #[test]
    fn test_absent_values_sort_first_ascending() {
        let spec = SortSpec::new(SortField::Temperature, SortDirection::Asc);
        let mut rows = vec![stored(1, Some(5.0)), stored(2, None), stored(3, Some(-2.0))];
        rows.sort_by(|a, b| spec.compare(a, b));
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let spec = SortSpec::new(SortField::Temperature, SortDirection::Desc);
        rows.sort_by(|a, b| spec.compare(a, b));
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_ties_break_on_id() {
        let spec = SortSpec::new(SortField::Temperature, SortDirection::Desc);
        let mut rows = vec![stored(9, Some(1.0)), stored(4, Some(1.0))];
        rows.sort_by(|a, b| spec.compare(a, b));
        assert_eq!(rows[0].id, 4);
    }
}
