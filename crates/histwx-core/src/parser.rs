//! Record parser for the positional, comma-separated observation feed
//!
//! Column layout (0-based):
//!
//! | idx | field | idx | field |
//! |-----|-------|-----|-------|
//! | 0 | timestamp `yyyyMMdd-HH:mm` | 10 | snow |
//! | 1 | conditions | 11 | temperature |
//! | 2 | dewpoint | 12 | thunder |
//! | 3 | fog | 13 | tornado |
//! | 4 | hail | 14 | visibility |
//! | 5 | heat index | 15 | wind direction (degrees) |
//! | 6 | humidity | 16 | wind direction (name) |
//! | 7 | precipitation | 17 | wind gust |
//! | 8 | pressure | 18 | wind chill |
//! | 9 | rain | 19 | wind speed |

use crate::types::Observation;
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Minimum number of positional fields in a data line
pub const MIN_FIELDS: usize = 20;

/// Timestamp layout used by the feed
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H:%M";

/// Pressure reading meaning "no data"
pub const PRESSURE_SENTINEL: f64 = -9999.0;

/// Line-level parse failure; the caller logs and skips the line
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected at least 20 fields, found {0}")]
    TooFewFields(usize),

    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parse one data line into an observation.
///
/// Only the field count and the timestamp can fail the line. Any other
/// empty or unparseable field becomes an absent value.
pub fn parse_line(line: &str) -> Result<Observation, ParseError> {
    // str::split keeps trailing empty tokens
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields(parts.len()));
    }

    let mut obs = Observation::at(parse_timestamp(parts[0])?);
    obs.conditions = parse_text(parts[1]);
    obs.dewpoint = parse_f64(parts[2]);
    obs.fog = parse_i32(parts[3]);
    obs.hail = parse_i32(parts[4]);
    obs.heat_index = parse_f64(parts[5]);
    obs.humidity = parse_i32(parts[6]);
    obs.precipitation = parse_f64(parts[7]);
    obs.pressure = parse_f64(parts[8]).filter(|p| *p != PRESSURE_SENTINEL);
    obs.rain = parse_i32(parts[9]);
    obs.snow = parse_i32(parts[10]);
    obs.temperature = parse_f64(parts[11]);
    obs.thunder = parse_i32(parts[12]);
    obs.tornado = parse_i32(parts[13]);
    obs.visibility = parse_f64(parts[14]);
    obs.wind_direction_degrees = parse_i32(parts[15]);
    obs.wind_direction_name = parse_text(parts[16]);
    obs.wind_gust = parse_f64(parts[17]);
    obs.wind_chill = parse_f64(parts[18]);
    obs.wind_speed = parse_f64(parts[19]);

    Ok(obs)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let value = raw.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .map_err(|source| ParseError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_i32(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}
