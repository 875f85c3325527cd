//! Automation capabilities consumed by the command router.
//!
//! Each trait is one external collaborator. Implementations are shared across
//! all request handlers and must tolerate concurrent calls; the router does not
//! serialise access to the pointer, keyboard focus or foreground window.

use anyhow::Result;
use futures::future::BoxFuture;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::accessibility::ScreenAnalyzer;
use crate::screenshot::Frame;

pub trait ScreenCapture: Send + Sync + 'static {
    /// Grab the full screen as it is right now.
    fn capture(&self) -> Result<Frame>;
}

pub trait TextExtractor: Send + Sync + 'static {
    /// OCR a frame. An empty string means nothing was recognised with enough
    /// confidence.
    fn extract_text<'a>(&'a self, frame: &'a Frame) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(s)
    }
}

pub trait PointerControl: Send + Sync + 'static {
    fn move_to(&self, x: i32, y: i32) -> Result<()>;
    /// Click at `at`, or at the current pointer position when `None`.
    fn click(&self, at: Option<(i32, i32)>, button: MouseButton) -> Result<()>;
}

pub trait KeyboardInput: Send + Sync + 'static {
    fn type_text(&self, text: &str) -> Result<()>;
    fn press_key(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowInfo {
    pub title: String,
    pub process: String,
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.process)
    }
}

pub trait WindowManager: Send + Sync + 'static {
    /// Open top-level windows ordered by title.
    fn list_windows(&self) -> Result<Vec<WindowInfo>>;
    /// Bring a window to the foreground. `Ok(false)` when nothing matched.
    fn switch_to(&self, name: &str) -> Result<bool>;
    fn current_window(&self) -> Result<Option<String>>;
}

pub trait SpeechOutput: Send + Sync + 'static {
    /// Resolves once playback has finished.
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<()>>;
}

pub trait SpeechInput: Send + Sync + 'static {
    fn start_listening(&self) -> Result<()>;
    fn stop_listening(&self) -> Result<()>;
    fn is_listening(&self) -> bool;
}

pub trait AccessibilityAnalyzer: Send + Sync + 'static {
    fn analyze(&self) -> BoxFuture<'_, Result<String>>;
}

/// The full set of collaborators, constructed once at startup and shared by
/// every handler.
#[derive(Clone)]
pub struct Capabilities {
    pub screen: Arc<dyn ScreenCapture>,
    pub ocr: Arc<dyn TextExtractor>,
    pub pointer: Arc<dyn PointerControl>,
    pub keyboard: Arc<dyn KeyboardInput>,
    pub windows: Arc<dyn WindowManager>,
    pub speech: Arc<dyn SpeechOutput>,
    pub listener: Arc<dyn SpeechInput>,
    pub accessibility: Arc<dyn AccessibilityAnalyzer>,
}

impl Capabilities {
    /// Wire every capability to one backend; accessibility analysis is
    /// composed from the backend's capture, OCR and window capabilities.
    pub fn from_desktop<D>(desktop: Arc<D>) -> Self
    where
        D: ScreenCapture
            + TextExtractor
            + PointerControl
            + KeyboardInput
            + WindowManager
            + SpeechOutput
            + SpeechInput,
    {
        let screen: Arc<dyn ScreenCapture> = desktop.clone();
        let ocr: Arc<dyn TextExtractor> = desktop.clone();
        let windows: Arc<dyn WindowManager> = desktop.clone();
        let accessibility = Arc::new(ScreenAnalyzer::new(
            screen.clone(),
            ocr.clone(),
            windows.clone(),
        ));
        Self {
            screen,
            ocr,
            pointer: desktop.clone(),
            keyboard: desktop.clone(),
            windows,
            speech: desktop.clone(),
            listener: desktop,
            accessibility,
        }
    }
}
