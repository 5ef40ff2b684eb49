//! HTTP handlers
//!
//! One router per module, nested under `/api`. The session layer resolves
//! bearer tokens before the rate limiter so authenticated callers are
//! limited per user instead of per address. Login, refresh and verify sit
//! outside the session layer.

pub mod announcements;
pub mod carousel;
pub mod events;
pub mod feedback;
pub mod health;
pub mod interactions;
pub mod registrations;
pub mod results;
pub mod users;
pub mod wordcloud;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use crate::middleware::{rate_limit_layer, request_logging, session_layer};
use crate::services::spreadsheet::XLSX_CONTENT_TYPE;
use crate::state::AppState;
use crate::utils::errors::{Result, SportsHubError};

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the whole application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", users::router())
        .nest("/auth", users::auth_router())
        .nest("/events", events::router())
        .nest("/registrations", registrations::router())
        .nest("/results", results::router())
        .nest("/announcements", announcements::router())
        .nest("/carousels", carousel::router())
        .nest("/feedbacks", feedback::router())
        .nest("/interactions", interactions::router())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_layer))
        .layer(middleware::from_fn_with_state(state.clone(), session_layer));

    let tokens = Router::new()
        .nest("/auth", users::token_router())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_layer));

    Router::new()
        .nest("/api", api.merge(tokens))
        .route("/ws/comments/wordcloud/", get(wordcloud::socket))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.server.cors_origins))
        .with_state(state)
}

/// Any origin when none or `*` is configured, otherwise the listed ones
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    layer.allow_origin(allowed)
}

/// Acknowledgement body for actions without a richer payload
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// `.xlsx` attachment response
pub fn xlsx_download(bytes: Vec<u8>, filename: &str) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        filename,
        urlencoding::encode(filename)
    );
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// One uploaded file together with the text fields sent alongside it
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct UploadedFile {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadForm {
    /// Read a multipart body; the first part named in `file_fields` is the file
    pub async fn read(mut multipart: Multipart, file_fields: &[&str]) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if form.file.is_none() && file_fields.contains(&name.as_str()) {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?.to_vec();
                form.file = Some(UploadedFile { content_type, bytes });
            } else {
                let value = field.text().await?;
                form.fields.push((name, value));
            }
        }
        Ok(form)
    }

    pub fn require_file(self) -> Result<(UploadedFile, Vec<(String, String)>)> {
        match self.file {
            Some(file) => Ok((file, self.fields)),
            None => Err(SportsHubError::invalid("No file was uploaded")),
        }
    }
}

/// Text field lookup in a multipart form
pub fn form_field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xlsx_download_headers() {
        let response = xlsx_download(vec![1, 2, 3], "results_20250101120000.xlsx");
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"results_20250101120000.xlsx\"; filename*=UTF-8''results_20250101120000.xlsx"
        );
    }

    #[test]
    fn test_form_field_lookup() {
        let fields = vec![("context_event".to_string(), " 12 ".to_string()), ("empty".to_string(), " ".to_string())];
        assert_eq!(form_field(&fields, "context_event"), Some("12"));
        assert_eq!(form_field(&fields, "empty"), None);
        assert_eq!(form_field(&fields, "missing"), None);
    }
}
