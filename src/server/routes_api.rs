use crate::server::{bad_request, error_response, AppContext};
use crate::store::{Job, JobState};
use alembic_common::{ConversionRequest, ConvertOptions, Error, FormatToken, JobId};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

type ApiError = (StatusCode, Json<Value>);

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/formats", get(formats))
        .route("/convert", post(convert))
        .route("/status/:id", get(status))
        .route("/download/:name", get(download))
}

pub async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let backends: Vec<Value> = ctx
        .registry
        .backends()
        .iter()
        .map(|b| {
            json!({
                "family": b.family().to_string(),
                "degraded": b.capabilities().is_empty(),
            })
        })
        .collect();

    Json(json!({
        "status": "healthy",
        "service": "alembic",
        "version": env!("CARGO_PKG_VERSION"),
        "backends": backends,
    }))
}

async fn formats(State(ctx): State<AppContext>) -> impl IntoResponse {
    let listing: BTreeMap<String, Value> = ctx
        .registry
        .list()
        .into_iter()
        .map(|(family, caps)| {
            (
                family.to_string(),
                json!({ "input": caps.inputs, "output": caps.outputs }),
            )
        })
        .collect();

    Json(json!({ "success": true, "formats": listing }))
}

/// Multipart upload: `files` (repeated), `source_format`, `target_format`,
/// and an optional JSON `options` field.
async fn convert(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut source_format: Option<FormatToken> = None;
    let mut target_format: Option<FormatToken> = None;
    let mut options = ConvertOptions::default();
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;
                if !data.is_empty() {
                    uploads.push((filename, data.to_vec()));
                }
            }
            "source_format" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("invalid source_format: {e}")))?;
                source_format = Some(FormatToken::new(&text));
            }
            "target_format" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("invalid target_format: {e}")))?;
                target_format = Some(FormatToken::new(&text));
            }
            "options" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("invalid options: {e}")))?;
                options = serde_json::from_str(&text)
                    .map_err(|e| bad_request(format!("invalid options: {e}")))?;
            }
            _ => {}
        }
    }

    let source_format =
        source_format.ok_or_else(|| bad_request("source_format is required"))?;
    let target_format =
        target_format.ok_or_else(|| bad_request("target_format is required"))?;
    if uploads.is_empty() {
        return Err(bad_request("no files provided"));
    }

    let mut requests = Vec::with_capacity(uploads.len());
    for (filename, bytes) in uploads {
        let source = ctx
            .storage
            .store_upload(&filename, &bytes)
            .map_err(|e| error_response(&e))?;
        requests.push(ConversionRequest {
            source,
            original_filename: filename,
            source_format: source_format.clone(),
            target_format: target_format.clone(),
            options: options.clone(),
        });
    }

    let file_count = requests.len();
    let job_id = ctx
        .scheduler
        .submit(requests)
        .map_err(|e| error_response(&e))?;

    Ok(Json(json!({
        "success": true,
        "job_id": job_id,
        "message": format!("Started conversion of {file_count} files"),
    })))
}

#[derive(Serialize)]
struct OutcomeView {
    original_filename: String,
    success: bool,
    converted_filename: Option<String>,
    download_url: Option<String>,
    size: u64,
    error: Option<String>,
}

#[derive(Serialize)]
struct JobStatusResponse {
    success: bool,
    job_id: JobId,
    status: JobState,
    progress: u8,
    results: Vec<OutcomeView>,
    error_message: Option<String>,
}

impl JobStatusResponse {
    fn from_job(job: &Job) -> Self {
        let results = job
            .outcomes
            .iter()
            .map(|outcome| {
                let download_url = outcome.output.as_ref().and_then(|path| {
                    path.file_name()
                        .map(|n| format!("/api/download/{}", n.to_string_lossy()))
                });
                OutcomeView {
                    original_filename: outcome.original_filename.clone(),
                    success: outcome.succeeded,
                    converted_filename: outcome.output_filename.clone(),
                    download_url,
                    size: outcome.size_bytes,
                    error: outcome.error.clone(),
                }
            })
            .collect();

        Self {
            success: true,
            job_id: job.id,
            status: job.state,
            progress: job.progress,
            results,
            error_message: job.error.clone(),
        }
    }
}

async fn status(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id: JobId = id
        .parse()
        .map_err(|_| error_response(&Error::not_found("job", &id)))?;
    let job = ctx
        .scheduler
        .status(job_id)
        .map_err(|e| error_response(&e))?;

    Ok(Json(JobStatusResponse::from_job(&job)))
}

async fn download(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = ctx
        .storage
        .download_path(&name)
        .map_err(|e| error_response(&e))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| error_response(&Error::from(e)))?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        ),
    ];
    Ok((headers, bytes))
}
