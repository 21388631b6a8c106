use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::sink::{ArchiveStatus, Outcome};
use crate::types::UploadRequest;
use crate::TIFF_MIME;
use super::models::*;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const ARCHIVE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-archive-status");

/// Failed request, rendered as `{ kind, message }`
#[derive(Debug)]
pub struct ApiError {
    request_id: Uuid,
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(request_id: Uuid, err: Error) -> Self {
        let status = match &err {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::GeoreferencingFailed { .. } | Error::ReprojectionFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            Error::Io(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            request_id,
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Body could not be read at all (too large, aborted upload)
    fn rejected(request_id: Uuid, rejection: BytesRejection) -> Self {
        Self {
            request_id,
            status: rejection.status(),
            kind: "InvalidRequest",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        insert_request_id(&mut headers, self.request_id);

        (
            self.status,
            headers,
            Json(ErrorResponse {
                kind: self.kind.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

fn insert_request_id(headers: &mut HeaderMap, request_id: Uuid) {
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
}

/// `POST /`: georeference an uploaded image and return or archive the result
pub async fn upload_image(
    State(pipeline): State<Arc<Pipeline>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let request_id = Uuid::new_v4();

    let body = body.map_err(|rejection| {
        tracing::warn!(%request_id, error = %rejection.body_text(), "request body rejected");
        ApiError::rejected(request_id, rejection)
    })?;

    let request: UploadRequest = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(
            request_id,
            Error::InvalidRequest(format!("malformed JSON body: {}", e)),
        )
    })?;

    match pipeline.run(request_id, request).await {
        Ok(outcome) => {
            tracing::info!(
                %request_id,
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "request served"
            );
            Ok(outcome_response(request_id, outcome))
        }
        Err(e) => {
            if matches!(e, Error::InvalidRequest(_)) {
                tracing::warn!(%request_id, error = %e, "request rejected");
            } else {
                tracing::error!(%request_id, kind = e.kind(), error = %e, "request failed");
            }
            Err(ApiError::new(request_id, e))
        }
    }
}

fn outcome_response(request_id: Uuid, outcome: Outcome) -> Response {
    let mut headers = HeaderMap::new();
    insert_request_id(&mut headers, request_id);

    match outcome {
        Outcome::Raster {
            bytes,
            download_name,
            archive,
        } => {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TIFF_MIME));
            let disposition = format!("attachment; filename=\"{}\"", download_name);
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }

            let archive_status = match archive {
                ArchiveStatus::Skipped => None,
                ArchiveStatus::Stored(_) => Some("stored"),
                ArchiveStatus::Failed(_) => Some("failed"),
            };
            if let Some(status) = archive_status {
                headers.insert(ARCHIVE_STATUS_HEADER, HeaderValue::from_static(status));
            }

            (StatusCode::OK, headers, bytes).into_response()
        }
        Outcome::Archived(object) => (
            StatusCode::OK,
            headers,
            Json(ArchiveResponse {
                request_id: request_id.to_string(),
                archived: true,
                bucket: object.bucket,
                key: object.key,
            }),
        )
            .into_response(),
    }
}
