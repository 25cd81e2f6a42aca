use crate::errors::{AppError, ReportError};
use crate::models::{ReportQuery, ReportResponse};
use crate::report::build_report;
use crate::state::AppState;
use crate::ui::render_report;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

pub async fn index(State(state): State<AppState>, Query(query): Query<ReportQuery>) -> Response {
    match build_report(state.store.as_ref(), &state.config, &query).await {
        Ok(report) => Html(render_report(&report)).into_response(),
        Err(err) => {
            log_failure(&err);
            AppError::from(err).into_html_response()
        }
    }
}

pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let report = build_report(state.store.as_ref(), &state.config, &query)
        .await
        .inspect_err(log_failure)?;
    Ok(Json(report.to_response()))
}

pub async fn healthz() -> &'static str {
    "ok"
}

fn log_failure(err: &ReportError) {
    match err {
        ReportError::Store(detail) => error!("failed to load report: {detail}"),
        other => warn!("report unavailable: {other}"),
    }
}
