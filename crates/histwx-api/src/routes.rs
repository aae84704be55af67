//! Handlers for the `/api/weather` surface

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use histwx_core::{
    ConditionSummary, ObservationFilter, QueryResult, Range, SortDirection, Statistics,
    StoredObservation, WeatherEvent,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::params::{
    parse_event, parse_id, required, BoundParams, SearchParams, SortParams, DEFAULT_SORT,
};
use crate::AppState;

pub fn weather_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", get(search))
        .route("/all", get(all))
        .route("/id/:id", get(by_id))
        .route("/temperature", get(temperature))
        .route("/humidity", get(humidity))
        .route("/conditions", get(conditions))
        .route("/conditions/:condition", get(by_condition))
        .route("/events/:event", get(by_event))
        .route("/statistics", get(statistics))
        .route("/help", get(help))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureResponse {
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub records_in_range: u64,
    #[serde(flatten)]
    pub result: QueryResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HumidityResponse {
    pub min_humidity: i32,
    pub max_humidity: i32,
    pub records_in_range: u64,
    #[serde(flatten)]
    pub result: QueryResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionResponse {
    pub condition: String,
    #[serde(flatten)]
    pub result: QueryResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event_type: WeatherEvent,
    pub total_occurrences: u64,
    /// Two decimals followed by `%`
    pub percentage: String,
    #[serde(flatten)]
    pub result: QueryResult,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<QueryResult>> {
    state.count("search");
    let request = params.into_request()?;
    Ok(Json(state.service.search(&request).await?))
}

async fn all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SortParams>,
) -> ApiResult<Json<QueryResult>> {
    state.count("all");
    let request = params.into_request(Some(DEFAULT_SORT), SortDirection::Asc)?;
    Ok(Json(state.service.search(&request).await?))
}

async fn by_id(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<StoredObservation>> {
    state.count("id");
    let id = parse_id(&raw)?;
    state
        .service
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Weather observation with id {id} not found")))
}

async fn temperature(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundParams>,
) -> ApiResult<Json<TemperatureResponse>> {
    state.count("temperature");
    let min: f64 = required("minTemp", params.min_temp.as_deref())?;
    let max: f64 = required("maxTemp", params.max_temp.as_deref())?;

    let mut request = params
        .sort
        .into_request(Some("temperature"), SortDirection::Desc)?;
    request.filter = ObservationFilter::new().with_temperature(Range::between(min, max));

    let result = state.service.search(&request).await?;
    Ok(Json(TemperatureResponse {
        min_temperature: min,
        max_temperature: max,
        records_in_range: result.total_records,
        result,
    }))
}

async fn humidity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundParams>,
) -> ApiResult<Json<HumidityResponse>> {
    state.count("humidity");
    let min: i32 = required("minHumidity", params.min_humidity.as_deref())?;
    let max: i32 = required("maxHumidity", params.max_humidity.as_deref())?;

    let mut request = params
        .sort
        .into_request(Some("humidity"), SortDirection::Desc)?;
    request.filter = ObservationFilter::new().with_humidity(Range::between(min, max));

    let result = state.service.search(&request).await?;
    Ok(Json(HumidityResponse {
        min_humidity: min,
        max_humidity: max,
        records_in_range: result.total_records,
        result,
    }))
}

async fn by_condition(
    State(state): State<Arc<AppState>>,
    Path(condition): Path<String>,
    Query(params): Query<SortParams>,
) -> ApiResult<Json<ConditionResponse>> {
    state.count("condition");
    let mut request = params.into_request(Some(DEFAULT_SORT), SortDirection::Asc)?;
    request.filter = ObservationFilter::new().with_condition(condition.clone());

    let result = state.service.search(&request).await?;
    Ok(Json(ConditionResponse { condition, result }))
}

async fn by_event(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
    Query(params): Query<SortParams>,
) -> ApiResult<Json<EventResponse>> {
    state.count("event");
    let event = parse_event(&event)?;
    let request = params.into_request(Some(DEFAULT_SORT), SortDirection::Asc)?;

    let found = state.service.by_event(event, &request).await?;
    Ok(Json(EventResponse {
        event_type: found.event_type,
        total_occurrences: found.result.total_records,
        percentage: format!("{:.2}%", found.percentage),
        result: found.result,
    }))
}

async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<Json<Statistics>> {
    state.count("statistics");
    Ok(Json(state.service.statistics().await?))
}

async fn conditions(State(state): State<Arc<AppState>>) -> ApiResult<Json<ConditionSummary>> {
    state.count("conditions");
    Ok(Json(state.service.conditions().await?))
}

async fn help(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.count("help");
    Json(help_document(state.service.limits().max_size))
}

fn help_document(max_page_size: usize) -> Value {
    let events: Vec<&str> = WeatherEvent::SEARCHABLE.iter().map(|e| e.as_str()).collect();
    json!({
        "title": "Historical Weather API",
        "basePath": "/api/weather",
        "endpoints": {
            "GET /search": "Search with any combination of filters",
            "GET /all": "All observations, sorted and paged",
            "GET /id/{id}": "A single observation by id",
            "GET /temperature": "Observations within minTemp..maxTemp (both required)",
            "GET /humidity": "Observations within minHumidity..maxHumidity (both required)",
            "GET /conditions/{condition}": "Observations with a condition, ignoring case",
            "GET /events/{event}": "Observations flagged with a weather event",
            "GET /statistics": "Aggregate statistics over all observations",
            "GET /conditions": "Distinct conditions with occurrence counts",
            "GET /help": "This document"
        },
        "searchParameters": {
            "minTemp": "number",
            "maxTemp": "number",
            "minHumidity": "integer",
            "maxHumidity": "integer",
            "startDate": "yyyy-MM-dd HH:mm (UTC)",
            "endDate": "yyyy-MM-dd HH:mm (UTC)",
            "condition": "condition text, ignoring case",
            "minPressure": "number",
            "maxPressure": "number",
            "minVisibility": "number",
            "maxVisibility": "number",
            "minWindSpeed": "number",
            "maxWindSpeed": "number",
            "weatherEvent": events.join("|"),
        },
        "sorting": {
            "sortBy": "temperature|temp, humidity, datetime|date, pressure|press, visibility|vis, windspeed|wind, dewpoint|dew, windchill|chill, condition",
            "sortDir": "ASC|DESC",
        },
        "paging": {
            "page": "zero-based page index (default 0)",
            "size": format!("page size (default 100, at most {max_page_size})"),
        },
        "weatherEvents": events,
    })
}
