use crate::crawler::BatchRequest;
use crate::jobs::Job;
use crate::output::UrlResult;
use crate::server::error::{ApiError, ApiJson, ApiResult};
use crate::server::schemas::{CrawlRequest, ExtractRequest, HealthResponse};
use crate::server::AppState;
use crate::url::parse_target_url;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn crawl(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CrawlRequest>,
) -> ApiResult<Json<UrlResult>> {
    parse_target_url(&request.url)?;

    let policy = state.coordinator.crawl_policy(
        request.extract_images,
        request.extract_links,
        request.session_config,
    );
    policy.validate()?;

    let result = state
        .coordinator
        .crawl_single(&request.url, &policy)
        .await
        .map_err(ApiError::CrawlFailed)?;

    Ok(Json(result))
}

pub async fn extract(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExtractRequest>,
) -> ApiResult<Json<UrlResult>> {
    let ExtractRequest {
        crawl,
        extraction_config,
    } = request;
    parse_target_url(&crawl.url)?;

    let policy = state.coordinator.crawl_policy(
        crawl.extract_images,
        crawl.extract_links,
        crawl.session_config,
    );
    policy.validate()?;

    let result = state
        .coordinator
        .crawl_and_extract(&crawl.url, &policy, &extraction_config)
        .await
        .map_err(ApiError::CrawlFailed)?;

    Ok(Json(result))
}

pub async fn submit_batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = state.coordinator.submit_batch(request)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn batch_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.coordinator.get_status(parse_job_id(&job_id)?)?;
    Ok(Json(job))
}

pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.coordinator.cancel(parse_job_id(&job_id)?)?;
    Ok(Json(job))
}

/// Malformed identifiers name no job, so they are reported as not found
fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("job {} not found", raw)))
}
