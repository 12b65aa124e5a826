use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ytaudio_core::{Config, ConversionError, VideoMetadata};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    #[serde(default)]
    pub url: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

/// Resolve a video's title, author and duration without downloading it.
pub async fn video_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<VideoMetadata>, ApiError> {
    if query.url.trim().is_empty() {
        return Err(bad_request("Missing url parameter"));
    }

    state
        .service()
        .video_info(&query.url)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

/// Maps a conversion failure to its HTTP status.
pub fn status_for(err: &ConversionError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(err, ConversionError::InvalidOptions(_)) {
        StatusCode::BAD_REQUEST
    } else if err.is_transcoder_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn error_response(err: &ConversionError) -> ApiError {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytaudio_core::Tier;

    #[test]
    fn test_status_for() {
        assert_eq!(
            status_for(&ConversionError::NoAudioFormat),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ConversionError::InvalidOptions("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ConversionError::TranscoderUnavailable {
                path: "ffmpeg".into()
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&ConversionError::Extraction {
                tier: Tier::Preferred,
                cause: "boom".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
