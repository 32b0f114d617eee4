use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::TimetableConfig;
use crate::downloader;
use crate::entry::{EntryFields, ScheduleEntry, SlotKey};
use crate::error::TimetableError;
use crate::loader;
use crate::saving;
use crate::timetable::{ImportMode, MoveOutcome, Timetable};

/// Shared server state. One lock guards the whole timetable: writers are
/// exclusive and every read sees a single consistent map.
pub struct AppState {
    timetable: RwLock<Timetable>,
    config: TimetableConfig,
}

impl AppState {
    pub fn new(config: TimetableConfig, timetable: Timetable) -> Self {
        AppState {
            timetable: RwLock::new(timetable),
            config,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Timetable> {
        self.timetable.read().unwrap_or_else(|poisoned| {
            warn!("timetable lock poisoned, continuing with last state");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Timetable> {
        self.timetable.write().unwrap_or_else(|poisoned| {
            warn!("timetable lock poisoned, continuing with last state");
            PoisonError::into_inner(poisoned)
        })
    }
}

/// JSON error body `{ code, message }` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl From<TimetableError> for ApiError {
    fn from(err: TimetableError) -> Self {
        let status = match &err {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            TimetableError::Import(_) => StatusCode::BAD_REQUEST,
            TimetableError::UnknownGroup(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = match &err {
            TimetableError::MissingField(_) => "missing_field",
            TimetableError::UnknownDay(_) => "unknown_day",
            TimetableError::UnknownTimeSlot(_) => "unknown_time_slot",
            TimetableError::InvalidDuration => "invalid_duration",
            TimetableError::DuplicateGroup(_) => "duplicate_group",
            TimetableError::UnknownGroup(_) => "unknown_group",
            TimetableError::Import(_) => "import_failed",
            TimetableError::Export(_) => "export_failed",
            TimetableError::Config(_) => "config",
            TimetableError::Io(_) => "io",
            TimetableError::Snapshot(_) => "snapshot",
            TimetableError::Json(_) => "json",
        };
        if status.is_server_error() {
            warn!("request failed: {}", err);
        }
        ApiError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimetableView {
    days: Vec<String>,
    time_slots: Vec<String>,
    groups: Vec<String>,
    entries: Vec<ScheduleEntry>,
}

#[derive(Deserialize)]
struct GroupBody {
    name: String,
}

#[derive(Deserialize)]
struct UpsertRequest {
    #[serde(flatten)]
    key: SlotKey,
    #[serde(flatten)]
    fields: EntryFields,
}

#[derive(Deserialize)]
struct MoveRequest {
    from: SlotKey,
    to: SlotKey,
}

#[derive(Serialize)]
struct MoveResponse {
    status: MoveOutcome,
}

#[derive(Deserialize)]
struct ImportQuery {
    #[serde(default)]
    mode: ImportMode,
}

/// Builds the HTTP API over `state`, with the static UI as fallback.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/api/timetable", get(get_timetable))
        .route("/api/groups", get(list_groups).post(add_group))
        .route("/api/groups/:name", put(rename_group).delete(delete_group))
        .route("/api/entries", put(upsert_entry).delete(delete_entry))
        .route("/api/entries/move", post(move_entry))
        .route("/api/conflicts", get(list_conflicts))
        .route("/api/conflicts/count", get(count_conflicts))
        .route("/api/teachers", get(list_teachers))
        .route("/api/teachers/:name/schedule", get(teacher_schedule))
        .route("/api/export/csv", get(export_csv))
        .route("/api/export/xlsx", get(export_xlsx))
        .route("/api/import", post(import_file))
        .route("/api/save", post(save_snapshot))
        .route("/api/load", post(load_snapshot))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on the configured address until the process stops.
pub async fn run(config: TimetableConfig, timetable: Timetable) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, timetable));
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_timetable(State(state): State<Arc<AppState>>) -> Json<TimetableView> {
    let timetable = state.read();
    Json(TimetableView {
        days: timetable.days().to_vec(),
        time_slots: timetable.time_slots().to_vec(),
        groups: timetable.groups().to_vec(),
        entries: timetable.entries().into_iter().cloned().collect(),
    })
}

async fn list_groups(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.read().groups().to_vec())
}

async fn add_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GroupBody>,
) -> ApiResult<impl IntoResponse> {
    let mut timetable = state.write();
    timetable.add_group(&body.name)?;
    Ok((StatusCode::CREATED, Json(timetable.groups().to_vec())))
}

async fn rename_group(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<GroupBody>,
) -> ApiResult<Json<Vec<String>>> {
    let mut timetable = state.write();
    timetable.rename_group(&name, &body.name)?;
    Ok(Json(timetable.groups().to_vec()))
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    let removed = state.write().delete_group(&name);
    Json(json!({ "removed": removed }))
}

async fn upsert_entry(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.write().upsert(request.key, request.fields)?;
    Ok(Json(outcome))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Json(key): Json<SlotKey>,
) -> Json<serde_json::Value> {
    let removed = state.write().delete(&key);
    Json(json!({ "removed": removed }))
}

async fn move_entry(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<Json<MoveResponse>> {
    let status = state.write().move_entry(&request.from, &request.to)?;
    Ok(Json(MoveResponse { status }))
}

async fn list_conflicts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.read().conflicts())
}

async fn count_conflicts(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let count = state.read().conflict_count();
    Json(json!({ "count": count }))
}

async fn list_teachers(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.read().teachers())
}

async fn teacher_schedule(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<Vec<ScheduleEntry>> {
    Json(state.read().teacher_schedule(&name))
}

async fn export_csv(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let csv = downloader::to_csv(&state.read());
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"timetable.csv\"",
            ),
        ],
        csv,
    )
}

async fn export_xlsx(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let bytes = downloader::to_xlsx(&state.read())?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"timetable.xlsx\"",
            ),
        ],
        bytes,
    ))
}

async fn import_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.csv").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            upload = Some((filename, bytes));
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request("multipart field `file` is missing"));
    };
    let records = loader::records_from_upload(&filename, &bytes)?;
    info!("importing {} ({} records, {:?})", filename, records.len(), query.mode);

    let report = state.write().import(records, query.mode);
    Ok(Json(report))
}

async fn save_snapshot(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let path = &state.config.data_file;
    let timetable = state.read();
    saving::save_timetable(&timetable, path)?;
    Ok(Json(json!({
        "status": "ok",
        "entries": timetable.len(),
        "path": path.display().to_string(),
    })))
}

async fn load_snapshot(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let path = &state.config.data_file;
    let mut timetable = state.write();
    saving::load_timetable(&mut timetable, path)?;
    Ok(Json(json!({
        "status": "ok",
        "entries": timetable.len(),
        "path": path.display().to_string(),
    })))
}
