use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use course_ics_core::{
    CompileOptions, IcsOptions, RawCourseRecord,
    compile::{Compilation, compile},
    reference::ReferenceTable,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared, read-only state.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<ReferenceTable>,
    pub compile: Arc<CompileOptions>,
    pub ics: Arc<IcsOptions>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Body accepted by every compile route.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoursesRequest {
    courses: Vec<RawCourseRecord>,
    #[serde(default)]
    calendar_name: Option<String>,
    #[serde(default)]
    reminder_minutes: Option<u32>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/courses/normalize", post(normalize_handler))
        .route("/calendar/ics", post(ics_handler))
        .route("/calendar/links", post(links_handler))
        .route("/reference", get(reference_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Course ICS Calendar Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Compiles course schedules into recurring calendar events",
        "endpoints": {
            "health": "GET /health",
            "normalize": "POST /courses/normalize",
            "ics": "POST /calendar/ics",
            "links": "POST /calendar/links",
            "reference": "GET /reference"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn reference_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "entries": state.table.rows()
    }))
}

fn compile_request(state: &AppState, request: &CoursesRequest) -> Compilation {
    tracing::info!("Compiling {} course records", request.courses.len());
    compile(&request.courses, &state.table, &state.compile)
}

/// Review table: normalized courses, validation flags, events and skips.
async fn normalize_handler(
    State(state): State<AppState>,
    Json(request): Json<CoursesRequest>,
) -> impl IntoResponse {
    let compilation = compile_request(&state, &request);
    Json(serde_json::json!({
        "courses": compilation.courses,
        "validation": compilation.validation_report(),
        "events": compilation.events,
        "skips": compilation.skips,
    }))
}

async fn ics_handler(
    State(state): State<AppState>,
    Json(request): Json<CoursesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let compilation = compile_request(&state, &request);

    let mut options = IcsOptions::clone(&state.ics);
    if request.calendar_name.is_some() {
        options.calendar_name = request.calendar_name;
    }
    options.reminder_minutes = request.reminder_minutes.or(options.reminder_minutes);

    let ics_content = compilation.to_ics(options)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
        ics_content,
    ))
}

async fn links_handler(
    State(state): State<AppState>,
    Json(request): Json<CoursesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let compilation = compile_request(&state, &request);
    let links = compilation.quick_add_links()?;

    Ok(Json(serde_json::json!({
        "links": links,
        "skips": compilation.skips,
    })))
}

#[derive(Debug)]
struct AppError(course_ics_core::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            course_ics_core::Error::Config(_)
            | course_ics_core::Error::UnknownTimezone(_)
            | course_ics_core::Error::DateTime(_)
            | course_ics_core::Error::Json(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        tracing::error!("{}: {}", error_message, self.0);

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<course_ics_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
