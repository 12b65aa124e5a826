//! Form-driven conversion endpoint.
//!
//! `POST /convert` streams the transcoded audio straight into the response
//! body. The transcoder and the metadata are checked before the headers go
//! out so a missing ffmpeg gets a 503 and a missing video a 404; after that,
//! a failure can only abort the body.

use std::io;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Form, State},
    http::{header, StatusCode},
    response::{Html, Response},
    Json,
};
use futures::{future, stream, StreamExt};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use ytaudio_core::{output_filename, ConversionOptions};

use super::handlers::{bad_request, error_response, ApiError, ErrorResponse};
use crate::state::AppState;

/// Capacity of the in-memory pipe between the transcoder and the response.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>YouTube to MP3</title>
</head>
<body>
<main>
<h1>YouTube to MP3</h1>
<form method="post" action="/convert">
<input type="text" name="youtube-url" placeholder="Paste YouTube URL here..." autofocus required>
<button type="submit">Convert</button>
</form>
</main>
</body>
</html>
"#;

#[derive(Debug, Default, Deserialize)]
pub struct ConvertForm {
    #[serde(rename = "youtube-url", default)]
    pub youtube_url: String,
    #[serde(default)]
    pub bitrate: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<String>,
    #[serde(default)]
    pub channels: Option<String>,
}

impl ConvertForm {
    /// Request options; empty fields fall back to the service defaults.
    pub fn options(&self) -> Result<ConversionOptions, String> {
        let mut options = ConversionOptions::default();

        if let Some(bitrate) = non_empty(&self.bitrate) {
            options = options.with_bitrate(bitrate);
        }
        if let Some(rate) = non_empty(&self.sample_rate) {
            let rate = rate
                .parse()
                .map_err(|_| format!("Invalid sample_rate: {}", rate))?;
            options = options.with_sample_rate(rate);
        }
        if let Some(channels) = non_empty(&self.channels) {
            let channels = channels
                .parse()
                .map_err(|_| format!("Invalid channels: {}", channels))?;
            options = options.with_channels(channels);
        }

        Ok(options)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Convert the submitted video and stream the audio back as an attachment.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ConvertForm>,
) -> Result<Response, ApiError> {
    let url = form.youtube_url.trim().to_string();
    if url.is_empty() {
        return Err(bad_request("youtube-url is required"));
    }

    let options = form.options().map_err(bad_request)?;
    let service = state.service().clone();
    let resolved = service.resolve_options(&options);
    resolved
        .validate()
        .map_err(|e| bad_request(e.to_string()))?;
    service.check_transcoder().map_err(|e| error_response(&e))?;

    let metadata = service
        .video_info(&url)
        .await
        .map_err(|e| error_response(&e))?;
    let filename = output_filename(&metadata.title, &resolved);

    let (mut writer, reader) = tokio::io::duplex(STREAM_BUFFER_SIZE);
    let (err_tx, err_rx) = oneshot::channel::<String>();
    let cancel = CancellationToken::new();
    // Dropping the body (client gone) cancels the conversion
    let guard = cancel.clone().drop_guard();

    tokio::spawn(async move {
        match service
            .convert_to_writer(&url, &mut writer, &options, &cancel)
            .await
        {
            Ok(bytes) => {
                info!(url = %url, bytes, "Conversion streamed");
                if let Err(e) = writer.shutdown().await {
                    debug!(url = %url, error = %e, "Failed to close response stream");
                }
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!(url = %url, error = %e, "Conversion failed mid-stream");
                }
                // Must be sent before the writer drops so the body sees it
                let _ = err_tx.send(e.to_string());
            }
        }
    });

    let failure = stream::once(async move {
        err_rx
            .await
            .ok()
            .map(|message| Err::<Bytes, _>(io::Error::other(message)))
    })
    .filter_map(future::ready);

    let body = ReaderStream::new(reader).chain(failure).map(move |chunk| {
        let _ = &guard;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, resolved.mime_type())
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .body(Body::from_stream(body))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if ascii == filename {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("Song_ The _Remix_.mp3"),
            "attachment; filename=\"Song_ The _Remix_.mp3\""
        );
    }

    #[test]
    fn test_content_disposition_unicode() {
        assert_eq!(
            content_disposition("Café.mp3"),
            "attachment; filename=\"Caf_.mp3\"; filename*=UTF-8''Caf%C3%A9.mp3"
        );
    }

    #[test]
    fn test_form_options() {
        let form = ConvertForm {
            youtube_url: "dQw4w9WgXcQ".to_string(),
            bitrate: Some("128k".to_string()),
            sample_rate: Some(" ".to_string()),
            channels: Some("2".to_string()),
        };

        let options = form.options().unwrap();
        assert_eq!(
            options,
            ConversionOptions::default().with_bitrate("128k").with_channels(2)
        );
    }

    #[test]
    fn test_form_options_rejects_bad_numbers() {
        let form = ConvertForm {
            sample_rate: Some("fast".to_string()),
            ..Default::default()
        };
        assert_eq!(form.options().unwrap_err(), "Invalid sample_rate: fast");

        let form = ConvertForm {
            channels: Some("-1".to_string()),
            ..Default::default()
        };
        assert!(form.options().is_err());
    }
}
