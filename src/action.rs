use axum::http::Method;
use serde::de::DeserializeOwned;

use crate::adapter::MouseButton;
use crate::error::ApiError;
use crate::models::{GenericCommand, KeyboardCommand, MouseCommand, VoiceCommand, WindowCommand};

/// Static routing table entry. Paths match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Status,
    ScreenCapture,
    ScreenRead,
    MouseMove,
    MouseClick,
    KeyboardType,
    KeyboardPress,
    WindowList,
    WindowSwitch,
    VoiceSpeak,
    VoiceListen,
    AccessibilityAnalyze,
    CommandExecute,
}

impl Endpoint {
    pub const ALL: [Endpoint; 13] = [
        Endpoint::Status,
        Endpoint::ScreenCapture,
        Endpoint::ScreenRead,
        Endpoint::MouseMove,
        Endpoint::MouseClick,
        Endpoint::KeyboardType,
        Endpoint::KeyboardPress,
        Endpoint::WindowList,
        Endpoint::WindowSwitch,
        Endpoint::VoiceSpeak,
        Endpoint::VoiceListen,
        Endpoint::AccessibilityAnalyze,
        Endpoint::CommandExecute,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Status => "/api/status",
            Endpoint::ScreenCapture => "/api/screen/capture",
            Endpoint::ScreenRead => "/api/screen/read",
            Endpoint::MouseMove => "/api/mouse/move",
            Endpoint::MouseClick => "/api/mouse/click",
            Endpoint::KeyboardType => "/api/keyboard/type",
            Endpoint::KeyboardPress => "/api/keyboard/press",
            Endpoint::WindowList => "/api/window/list",
            Endpoint::WindowSwitch => "/api/window/switch",
            Endpoint::VoiceSpeak => "/api/voice/speak",
            Endpoint::VoiceListen => "/api/voice/listen",
            Endpoint::AccessibilityAnalyze => "/api/accessibility/analyze",
            Endpoint::CommandExecute => "/api/command/execute",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::Status
            | Endpoint::ScreenCapture
            | Endpoint::ScreenRead
            | Endpoint::WindowList
            | Endpoint::AccessibilityAnalyze => Method::GET,
            _ => Method::POST,
        }
    }

    /// Decode the body for this route into a command. `Status` is answered by
    /// the server itself and has no command.
    pub fn decode(self, body: &[u8]) -> Result<Option<Command>, ApiError> {
        let cmd = match self {
            Endpoint::Status => return Ok(None),
            Endpoint::ScreenCapture => Command::CaptureScreen,
            Endpoint::ScreenRead => Command::ReadScreen,
            Endpoint::MouseMove => {
                let p: MouseCommand = decode_payload(body)?;
                match (p.x, p.y) {
                    (Some(x), Some(y)) => Command::MouseMove { x, y },
                    _ => return Err(ApiError::Validation("Missing X or Y coordinates".into())),
                }
            }
            Endpoint::MouseClick => {
                let p: MouseCommand = decode_payload(body)?;
                let button = match p.button.as_deref() {
                    None => MouseButton::default(),
                    Some(name) => MouseButton::parse(name).ok_or_else(|| {
                        ApiError::Validation(format!("Unsupported mouse button: {}", name))
                    })?,
                };
                let at = match (p.x, p.y) {
                    (Some(x), Some(y)) => Some((x, y)),
                    _ => None,
                };
                Command::MouseClick { at, button }
            }
            Endpoint::KeyboardType => {
                let p: KeyboardCommand = decode_payload(body)?;
                Command::TypeText { text: required(p.text, "Missing text to type")? }
            }
            Endpoint::KeyboardPress => {
                let p: KeyboardCommand = decode_payload(body)?;
                Command::PressKey { key: required(p.key, "Missing key to press")? }
            }
            Endpoint::WindowList => Command::ListWindows,
            Endpoint::WindowSwitch => {
                let p: WindowCommand = decode_payload(body)?;
                Command::SwitchWindow { name: required(p.window_name, "Missing window name")? }
            }
            Endpoint::VoiceSpeak => {
                let p: VoiceCommand = decode_payload(body)?;
                Command::Speak { text: required(p.text, "Missing text to speak")? }
            }
            Endpoint::VoiceListen => Command::Listen,
            Endpoint::AccessibilityAnalyze => Command::Analyze,
            Endpoint::CommandExecute => {
                let p: GenericCommand = decode_payload(body)?;
                if p.parameters.is_some() {
                    log::debug!("ignoring Parameters on command payload");
                }
                Command::Execute { command: required(p.command, "Missing command")? }
            }
        };
        Ok(Some(cmd))
    }
}

/// One capability invocation, already validated.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CaptureScreen,
    ReadScreen,
    MouseMove { x: i32, y: i32 },
    MouseClick { at: Option<(i32, i32)>, button: MouseButton },
    TypeText { text: String },
    PressKey { key: String },
    ListWindows,
    SwitchWindow { name: String },
    Speak { text: String },
    Listen,
    Analyze,
    Execute { command: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CaptureScreen => "capture",
            Command::ReadScreen => "read",
            Command::MouseMove { .. } => "move",
            Command::MouseClick { .. } => "click",
            Command::TypeText { .. } => "type",
            Command::PressKey { .. } => "press",
            Command::ListWindows => "windows",
            Command::SwitchWindow { .. } => "switch",
            Command::Speak { .. } => "speak",
            Command::Listen => "listen",
            Command::Analyze => "analyze",
            Command::Execute { .. } => "execute",
        }
    }
}

/// An empty body decodes as `{}`.
pub fn decode_payload<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.into()))
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}
