//! Query-string parameters and their validation.
//!
//! Every parameter is taken as raw text so that a malformed value turns
//! into a 400 carrying a readable message instead of an extractor
//! rejection.

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use histwx_core::{ObservationFilter, Range, SearchRequest, SortDirection, WeatherEvent};
use serde::Deserialize;
use std::str::FromStr;

/// Layout of `startDate` / `endDate`
pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Sort key echoed when the caller names none
pub const DEFAULT_SORT: &str = "datetime";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortParams {
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

impl SortParams {
    /// Build a request with no filter, falling back to the given defaults
    pub fn into_request(
        self,
        default_sort: Option<&str>,
        default_dir: SortDirection,
    ) -> ApiResult<SearchRequest> {
        let direction = match non_empty(self.sort_dir.as_deref()) {
            Some(dir) => dir
                .parse::<SortDirection>()
                .map_err(|e| ApiError::Validation(e.to_string()))?,
            None => default_dir,
        };
        let sort_by = non_empty(self.sort_by.as_deref())
            .or(default_sort)
            .map(str::to_string);

        Ok(SearchRequest {
            filter: ObservationFilter::new(),
            sort_by,
            direction,
            page: parse_opt("page", self.page.as_deref())?.unwrap_or(0),
            size: parse_opt("size", self.size.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub min_temp: Option<String>,
    pub max_temp: Option<String>,
    pub min_humidity: Option<String>,
    pub max_humidity: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub condition: Option<String>,
    pub min_pressure: Option<String>,
    pub max_pressure: Option<String>,
    pub min_visibility: Option<String>,
    pub max_visibility: Option<String>,
    pub min_wind_speed: Option<String>,
    pub max_wind_speed: Option<String>,
    pub weather_event: Option<String>,
    #[serde(flatten)]
    pub sort: SortParams,
}

impl SearchParams {
    pub fn into_request(self) -> ApiResult<SearchRequest> {
        let filter = self.filter()?;
        let mut request = self
            .sort
            .into_request(Some(DEFAULT_SORT), SortDirection::Asc)?;
        request.filter = filter;
        Ok(request)
    }

    fn filter(&self) -> ApiResult<ObservationFilter> {
        let mut filter = ObservationFilter::new()
            .with_temperature(range("minTemp", &self.min_temp, "maxTemp", &self.max_temp)?)
            .with_humidity(range(
                "minHumidity",
                &self.min_humidity,
                "maxHumidity",
                &self.max_humidity,
            )?)
            .with_date(Range::new(
                parse_date("startDate", self.start_date.as_deref())?,
                parse_date("endDate", self.end_date.as_deref())?,
            ))
            .with_pressure(range(
                "minPressure",
                &self.min_pressure,
                "maxPressure",
                &self.max_pressure,
            )?)
            .with_visibility(range(
                "minVisibility",
                &self.min_visibility,
                "maxVisibility",
                &self.max_visibility,
            )?)
            .with_wind_speed(range(
                "minWindSpeed",
                &self.min_wind_speed,
                "maxWindSpeed",
                &self.max_wind_speed,
            )?);

        if let Some(condition) = non_empty(self.condition.as_deref()) {
            filter = filter.with_condition(condition);
        }
        if let Some(event) = non_empty(self.weather_event.as_deref()) {
            filter = filter.with_event(parse_event(event)?);
        }
        Ok(filter)
    }
}

/// Required-bound range parameters used by `/temperature` and `/humidity`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundParams {
    pub min_temp: Option<String>,
    pub max_temp: Option<String>,
    pub min_humidity: Option<String>,
    pub max_humidity: Option<String>,
    #[serde(flatten)]
    pub sort: SortParams,
}

pub fn parse_event(name: &str) -> ApiResult<WeatherEvent> {
    name.parse::<WeatherEvent>()
        .map_err(|e| ApiError::Validation(e.to_string()))
}

pub fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::Validation(format!("Invalid id: {raw}")))
}

/// A parameter that must be present and well-formed
pub fn required<T: FromStr>(name: &str, raw: Option<&str>) -> ApiResult<T> {
    parse_opt(name, raw)?.ok_or_else(|| {
        ApiError::Validation(format!("Required parameter '{name}' is not present"))
    })
}

pub fn parse_opt<T: FromStr>(name: &str, raw: Option<&str>) -> ApiResult<Option<T>> {
    non_empty(raw)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ApiError::Validation(format!("Invalid value for '{name}': {v}")))
        })
        .transpose()
}

fn range<T: FromStr + PartialOrd + Copy>(
    min_name: &str,
    min: &Option<String>,
    max_name: &str,
    max: &Option<String>,
) -> ApiResult<Range<T>> {
    Ok(Range::new(
        parse_opt(min_name, min.as_deref())?,
        parse_opt(max_name, max.as_deref())?,
    ))
}

fn parse_date(name: &str, raw: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    non_empty(raw)
        .map(|v| {
            NaiveDateTime::parse_from_str(v, REQUEST_DATE_FORMAT)
                .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                .map_err(|_| {
                    ApiError::Validation(format!(
                        "Invalid value for '{name}': {v} (expected yyyy-MM-dd HH:mm)"
                    ))
                })
        })
        .transpose()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}
