use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform response wrapper returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: None }
    }

    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self { success: true, message: message.into(), data: Some(data) }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

/// Fallback body when the envelope itself cannot be encoded.
pub const INTERNAL_ERROR_BODY: &str =
    r#"{"Success":false,"Message":"Internal server error: failed to encode response"}"#;

pub(crate) fn json_response(status: StatusCode, envelope: &Envelope) -> Response {
    match serde_json::to_vec_pretty(envelope) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json; charset=utf-8")], body)
            .into_response(),
        Err(e) => {
            log::error!("failed to encode envelope: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
                INTERNAL_ERROR_BODY,
            )
                .into_response()
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        json_response(self.status_code(), &self)
    }
}

// Request payloads. Every field is optional so that a missing field surfaces
// as a validation failure rather than a decode failure.

#[derive(Debug, Default, Deserialize)]
pub struct MouseCommand {
    #[serde(rename = "X", alias = "x")]
    pub x: Option<i32>,
    #[serde(rename = "Y", alias = "y")]
    pub y: Option<i32>,
    #[serde(rename = "Button", alias = "button")]
    pub button: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeyboardCommand {
    #[serde(rename = "Text", alias = "text")]
    pub text: Option<String>,
    #[serde(rename = "Key", alias = "key")]
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowCommand {
    #[serde(rename = "WindowName", alias = "windowName", alias = "window_name")]
    pub window_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoiceCommand {
    #[serde(rename = "Text", alias = "text")]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenericCommand {
    #[serde(rename = "Command", alias = "command")]
    pub command: Option<String>,
    #[serde(rename = "Parameters", alias = "parameters")]
    pub parameters: Option<Value>,
}

// Success payloads.

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusData {
    pub status: &'static str,
    pub running: bool,
    pub requests_handled: u64,
    pub voice_listening: bool,
    pub serialized: bool,
    pub started_at: Option<String>,
    pub server_uptime: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureData {
    pub image: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScreenTextData {
    pub text: String,
    pub length: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WindowListData {
    pub windows: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisData {
    pub analysis: String,
}
