use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::export;
use crate::jobs::Job;
use crate::types::{
    Crossing, CrossingId, Platform, PlatformBatch, Report, ReportId, ReportStatus, VtexOptions,
};
use crate::Error;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub platform: Platform,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub vtex_options: Option<VtexOptions>,
}

pub async fn create_report(
    State(state): State<AppState>,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    if request.start_date > request.end_date {
        return Err(Error::InvalidDateRange {
            start: request.start_date,
            end: request.end_date,
        }
        .into());
    }
    if request.vtex_options.is_some() && request.platform != Platform::Vtex {
        return Err(ApiError::Unprocessable(
            "vtex_options only apply to vtex reports".to_string(),
        ));
    }

    let mut report = Report::new(request.platform, request.start_date, request.end_date);
    if let Some(options) = request.vtex_options {
        report = report.with_vtex_options(options);
    }

    state.storage.create_report(&report).await?;
    state.queue.enqueue(Job::GenerateReport {
        report_id: report.id,
    })?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Deserialize)]
pub struct ReportListQuery {
    pub platform: Option<String>,
    pub status: Option<String>,
}

pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let platform = parse_filter(query.platform, Platform::parse, "platform")?;
    let status = parse_filter(query.status, ReportStatus::parse, "status")?;
    Ok(Json(state.storage.list_reports(platform, status).await?))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<ReportId>,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .storage
        .get_report(id)
        .await?
        .ok_or_else(|| ApiError::not_found("report", id))?;
    Ok(Json(report))
}

pub async fn get_report_transactions(
    State(state): State<AppState>,
    Path(id): Path<ReportId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let batch = complete_report_batch(&state, id).await?;
    let rows = match batch {
        PlatformBatch::Vtex(rows) => serde_json::to_value(rows),
        PlatformBatch::Payway(rows) => serde_json::to_value(rows),
        PlatformBatch::Cdp(rows) => serde_json::to_value(rows),
        PlatformBatch::Janis(rows) => serde_json::to_value(rows),
    }
    .map_err(anyhow::Error::from)?;
    Ok(Json(rows))
}

pub async fn export_report(
    State(state): State<AppState>,
    Path(id): Path<ReportId>,
) -> Result<Response, ApiError> {
    let batch = complete_report_batch(&state, id).await?;
    let content = export::report_csv(&batch)?;
    Ok(csv_response(
        &format!("report-{}-{}.csv", batch.platform().as_str(), id),
        content,
    ))
}

#[derive(Deserialize)]
pub struct CreateCrossingRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vtex_report: Option<ReportId>,
    pub payway_report: Option<ReportId>,
    pub cdp_report: Option<ReportId>,
    pub janis_report: Option<ReportId>,
}

pub async fn create_crossing(
    State(state): State<AppState>,
    Json(request): Json<CreateCrossingRequest>,
) -> Result<(StatusCode, Json<Crossing>), ApiError> {
    if request.start_date > request.end_date {
        return Err(Error::InvalidDateRange {
            start: request.start_date,
            end: request.end_date,
        }
        .into());
    }

    let mut crossing = Crossing::new(request.start_date, request.end_date);
    crossing.vtex_report = request.vtex_report;
    crossing.payway_report = request.payway_report;
    crossing.cdp_report = request.cdp_report;
    crossing.janis_report = request.janis_report;

    if crossing.source_reports().is_empty() {
        return Err(ApiError::Unprocessable(
            "a crossing needs at least one source report".to_string(),
        ));
    }
    for report_id in crossing.source_reports() {
        state
            .storage
            .get_report(report_id)
            .await?
            .ok_or_else(|| ApiError::not_found("report", report_id))?;
    }

    state.storage.create_crossing(&crossing).await?;
    state.queue.enqueue(Job::RunCrossing {
        crossing_id: crossing.id,
    })?;

    Ok((StatusCode::CREATED, Json(crossing)))
}

#[derive(Deserialize)]
pub struct CrossingListQuery {
    pub status: Option<String>,
}

pub async fn list_crossings(
    State(state): State<AppState>,
    Query(query): Query<CrossingListQuery>,
) -> Result<Json<Vec<Crossing>>, ApiError> {
    let status = parse_filter(query.status, ReportStatus::parse, "status")?;
    Ok(Json(state.storage.list_crossings(status).await?))
}

pub async fn get_crossing(
    State(state): State<AppState>,
    Path(id): Path<CrossingId>,
) -> Result<Json<Crossing>, ApiError> {
    let crossing = state
        .storage
        .get_crossing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("crossing", id))?;
    Ok(Json(crossing))
}

#[derive(Deserialize)]
pub struct CrossingExportQuery {
    #[serde(default)]
    pub observations_only: bool,
}

pub async fn export_crossing(
    State(state): State<AppState>,
    Path(id): Path<CrossingId>,
    Query(query): Query<CrossingExportQuery>,
) -> Result<Response, ApiError> {
    let crossing = state
        .storage
        .get_crossing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("crossing", id))?;
    if crossing.status != ReportStatus::Complete {
        return Err(ApiError::Unprocessable(format!(
            "crossing is {}, not COMPLETE",
            crossing.status.as_str()
        )));
    }

    let rows = state.storage.get_crossed_transactions(id).await?;
    let content = export::crossing_csv(&rows, query.observations_only)?;
    Ok(csv_response(&format!("crossing-{id}.csv"), content))
}

async fn complete_report_batch(state: &AppState, id: ReportId) -> Result<PlatformBatch, ApiError> {
    let report = state
        .storage
        .get_report(id)
        .await?
        .ok_or_else(|| ApiError::not_found("report", id))?;
    if report.status != ReportStatus::Complete {
        return Err(ApiError::Unprocessable(format!(
            "report is {}, not COMPLETE",
            report.status.as_str()
        )));
    }

    Ok(match report.platform {
        Platform::Vtex => PlatformBatch::Vtex(state.storage.get_vtex_transactions(id).await?),
        Platform::Payway => PlatformBatch::Payway(state.storage.get_payway_transactions(id).await?),
        Platform::Cdp => PlatformBatch::Cdp(state.storage.get_cdp_transactions(id).await?),
        Platform::Janis => PlatformBatch::Janis(state.storage.get_janis_transactions(id).await?),
    })
}

fn parse_filter<T>(
    raw: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
    what: &str,
) -> Result<Option<T>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => parse(&s)
            .map(Some)
            .ok_or_else(|| ApiError::Unprocessable(format!("unknown {what} {s:?}"))),
    }
}

fn csv_response(filename: &str, content: String) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        content,
    )
        .into_response()
}
