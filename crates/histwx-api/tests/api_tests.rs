use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use histwx_core::{Observation, ObservationGateway, PageLimits, QueryService};
use histwx_store::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

fn observation(hour: i64) -> Observation {
    Observation::at(Utc.with_ymd_and_hms(2016, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hour))
}

/// Five observations: temperatures 15..35, two rainy, three hazy
fn sample() -> Vec<Observation> {
    let rows = [
        (15.0, 80, "Haze", Some(1)),
        (25.0, 60, "Haze", Some(1)),
        (35.0, 20, "Clear", Some(0)),
        (28.0, 45, "Haze", None),
        (18.0, 90, "Mist", None),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (temp, hum, cond, rain))| {
            let mut o = observation(i as i64);
            o.temperature = Some(*temp);
            o.humidity = Some(*hum);
            o.conditions = Some(cond.to_string());
            o.rain = *rain;
            o.pressure = Some(1000.0 + i as f64);
            o
        })
        .collect()
}

async fn app_with(observations: Vec<Observation>, limits: PageLimits) -> Router {
    let store = Arc::new(MemoryStore::new());
    store.bulk_insert(observations).await.unwrap();
    let (app, _state) = histwx_api::build_app(QueryService::new(store, limits)).unwrap();
    app
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn search_filters_by_temperature_range() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(&app, "/api/weather/search?minTemp=20&maxTemp=30").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalRecords"], 2);
    assert_eq!(json["sortBy"], "datetime");
    assert_eq!(json["sortDirection"], "ASC");
    assert_eq!(json["data"][0]["temperature"], 25.0);
    assert_eq!(json["data"][1]["temperature"], 28.0);
}

#[tokio::test]
async fn search_combines_filters_and_sorts() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(
        &app,
        "/api/weather/search?condition=Haze&weatherEvent=rain&sortBy=temp&sortDir=desc",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalRecords"], 2);
    assert_eq!(json["sortBy"], "temp");
    assert_eq!(json["sortDirection"], "DESC");
    assert_eq!(json["data"][0]["temperature"], 25.0);
    assert_eq!(json["data"][1]["temperature"], 15.0);
}

#[tokio::test]
async fn search_by_date_window() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(
        &app,
        "/api/weather/search?startDate=2016-06-01%2001:00&endDate=2016-06-01%2002:00",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalRecords"], 2);
    assert_eq!(json["data"][0]["id"], 2);
    assert_eq!(json["data"][1]["id"], 3);
}

#[tokio::test]
async fn malformed_parameters_are_rejected() {
    let app = app_with(sample(), PageLimits::default()).await;
    for uri in [
        "/api/weather/search?startDate=yesterday",
        "/api/weather/search?sortDir=sideways",
        "/api/weather/search?minTemp=warm",
        "/api/weather/search?weatherEvent=tornado",
        "/api/weather/search?size=0",
        "/api/weather/events/sleet",
        "/api/weather/id/abc",
        "/api/weather/temperature?minTemp=10",
    ] {
        let (status, json) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()), "{uri}");
        assert!(json["timestamp"].as_i64().is_some(), "{uri}");
    }
}

#[tokio::test]
async fn lookup_by_id() {
    let app = app_with(sample(), PageLimits::default()).await;

    let (status, json) = get_json(&app, "/api/weather/id/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 3);
    assert_eq!(json["conditions"], "Clear");

    let (status, json) = get_json(&app, "/api/weather/id/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn temperature_range_endpoint() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(&app, "/api/weather/temperature?minTemp=15&maxTemp=25").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["minTemperature"], 15.0);
    assert_eq!(json["maxTemperature"], 25.0);
    assert_eq!(json["recordsInRange"], 3);
    assert_eq!(json["sortBy"], "temperature");
    assert_eq!(json["sortDirection"], "DESC");
    assert_eq!(json["data"][0]["temperature"], 25.0);
}

#[tokio::test]
async fn humidity_range_endpoint() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(&app, "/api/weather/humidity?minHumidity=50&maxHumidity=90").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["minHumidity"], 50);
    assert_eq!(json["maxHumidity"], 90);
    assert_eq!(json["recordsInRange"], 3);
    assert_eq!(json["data"][0]["humidity"], 90);

    let (status, _) = get_json(&app, "/api/weather/humidity?minHumidity=50").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn condition_endpoint_ignores_case() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(&app, "/api/weather/conditions/Haze").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["condition"], "Haze");
    assert_eq!(json["totalRecords"], 3);

    let (_, json) = get_json(&app, "/api/weather/conditions/haze").await;
    assert_eq!(json["totalRecords"], 3);

    let (_, json) = get_json(&app, "/api/weather/conditions/Smoke").await;
    assert_eq!(json["totalRecords"], 0);
}

#[tokio::test]
async fn rain_event_share() {
    let app = app_with(sample(), PageLimits::default()).await;
    let (status, json) = get_json(&app, "/api/weather/events/RAIN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["eventType"], "rain");
    assert_eq!(json["totalOccurrences"], 2);
    assert_eq!(json["percentage"], "40.00%");
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn statistics_and_condition_summary() {
    let app = app_with(sample(), PageLimits::default()).await;

    let (status, json) = get_json(&app, "/api/weather/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalRecords"], 5);
    assert_eq!(json["temperature"]["maximum"], 35.0);
    assert_eq!(json["temperature"]["minimum"], 15.0);
    assert_eq!(json["temperature"]["average"], 24.2);
    assert_eq!(json["humidity"]["average"], 59.0);
    assert_eq!(json["weatherEvents"]["rain"], 2);

    let (status, json) = get_json(&app, "/api/weather/conditions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalConditionsFound"], 3);
    assert_eq!(json["conditions"]["Haze"], 3);
    assert_eq!(json["conditions"]["Mist"], 1);
}

#[tokio::test]
async fn paging_is_clamped_and_echoed() {
    let limits = PageLimits {
        default_size: 2,
        max_size: 3,
    };
    let app = app_with(sample(), limits).await;

    let (_, json) = get_json(&app, "/api/weather/all").await;
    assert_eq!(json["pageSize"], 2);
    assert_eq!(json["totalPages"], 3);

    let (_, json) = get_json(&app, "/api/weather/all?page=1&size=50").await;
    assert_eq!(json["pageSize"], 3);
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"][0]["id"], 4);

    let (status, json) = get_json(&app, "/api/weather/all?page=9").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());
}
