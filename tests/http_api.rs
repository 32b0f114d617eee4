#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use timetable::app::{AppState, create_router};
use timetable::{Timetable, TimetableConfig};
use tower::ServiceExt;

fn router_with(dir: &TempDir) -> Router {
    let config = TimetableConfig {
        data_file: dir.path().join("timetable.bin.gz"),
        static_dir: dir.path().to_path_buf(),
        ..TimetableConfig::default()
    };
    let timetable = Timetable::from_config(&config);
    create_router(Arc::new(AppState::new(config, timetable)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn entry(group: &str, day: &str, time: &str, course: &str, teacher: &str) -> Value {
    json!({ "group": group, "day": day, "time": time, "course": course, "teacher": teacher })
}

#[tokio::test]
async fn test_upsert_then_read_timetable() {
    let dir = TempDir::new().unwrap();
    let app = router_with(&dir);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/entries",
        Some(entry("CS-1", "Monday", "08:30-10:00", "Math", "Dr. X")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["course"], "Math");
    assert_eq!(body["entry"]["subjectType"], "lecture");
    assert!(body["replaced"].is_null());

    let (status, body) = send(&app, Method::GET, "/api/timetable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groups"], json!(["CS-1"]));
    assert_eq!(body["timeSlots"][0], "08:30-10:00");
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_validation_errors_map_to_400() {
    let dir = TempDir::new().unwrap();
    let app = router_with(&dir);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/entries",
        Some(entry("CS-1", "Saturday", "08:30-10:00", "Math", "")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unknown_day");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/groups/missing",
        Some(json!({ "name": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "unknown_group");
}

#[tokio::test]
async fn test_conflicts_and_move() {
    let dir = TempDir::new().unwrap();
    let app = router_with(&dir);

    for (group, teacher) in [("A", "Dr. Ahmad"), ("B", "dr. ahmed B201")] {
        send(
            &app,
            Method::PUT,
            "/api/entries",
            Some(entry(group, "Sunday", "08:30-10:00", "Math", teacher)),
        )
        .await;
    }

    let (_, body) = send(&app, Method::GET, "/api/conflicts", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["type"], "teacher");
    assert_eq!(body[0]["value"], "Dr. Ahmad");

    let (_, body) = send(&app, Method::GET, "/api/teachers", None).await;
    assert_eq!(body, json!(["Dr. Ahmad"]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/entries/move",
        Some(json!({
            "from": { "group": "B", "day": "Sunday", "time": "08:30-10:00" },
            "to": { "group": "B", "day": "Sunday", "time": "10:00-11:30" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "moved");

    let (_, body) = send(&app, Method::GET, "/api/conflicts/count", None).await;
    assert_eq!(body["count"], 0);

    let (_, body) = send(&app, Method::GET, "/api/teachers/Dr.%20Ahmad/schedule", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_entry_and_group() {
    let dir = TempDir::new().unwrap();
    let app = router_with(&dir);

    let (status, _) = send(&app, Method::POST, "/api/groups", Some(json!({ "name": "G" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::POST, "/api/groups", Some(json!({ "name": "G" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "duplicate_group");

    send(
        &app,
        Method::PUT,
        "/api/entries",
        Some(entry("G", "Monday", "08:30-10:00", "Math", "")),
    )
    .await;
    let key = json!({ "group": "G", "day": "Monday", "time": "08:30-10:00" });
    let (_, body) = send(&app, Method::DELETE, "/api/entries", Some(key.clone())).await;
    assert_eq!(body["removed"], true);
    let (_, body) = send(&app, Method::DELETE, "/api/entries", Some(key)).await;
    assert_eq!(body["removed"], false);

    let (_, body) = send(&app, Method::DELETE, "/api/groups/G", None).await;
    assert_eq!(body["removed"], 0);
    let (_, body) = send(&app, Method::GET, "/api/groups", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let app = router_with(&dir);

    send(
        &app,
        Method::PUT,
        "/api/entries",
        Some(entry("G", "Monday", "08:30-10:00", "Math", "Dr. X")),
    )
    .await;
    let (status, body) = send(&app, Method::POST, "/api/save", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"], 1);

    send(&app, Method::DELETE, "/api/groups/G", None).await;
    let (status, body) = send(&app, Method::POST, "/api/load", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"], 1);
}

#[tokio::test]
async fn test_multipart_csv_import() {
    let dir = TempDir::new().unwrap();
    let app = router_with(&dir);

    let boundary = "XBOUNDARY";
    let csv = "group,day,time,course,teacher\n\
               G1,Monday,08:30-10:00,Math,Dr. X\n\
               G1,Funday,08:30-10:00,Art,Dr. Y\n";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"plan.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = boundary,
        csv = csv
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/import?mode=replace")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let report: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["imported"], 1);
    assert_eq!(report["skipped"][0][0], 2);

    let request = Request::builder()
        .uri("/api/export/csv")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("G1,Monday,08:30-10:00,Math,Dr. X,,lecture,1"));
}
