//! Free-text command adapter behind `/api/command/execute`.
//!
//! Plain substring matching over a handful of phrases. Anything unrecognised
//! is acknowledged as a no-op.

use anyhow::Result;
use std::sync::Arc;

use crate::adapter::{ScreenCapture, TextExtractor, WindowManager};

const SCREEN_PREVIEW_CHARS: usize = 200;
const WINDOW_PREVIEW_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ReadScreen,
    ListWindows,
    Echo(String),
}

impl Intent {
    pub fn classify(input: &str) -> Self {
        let normalized = input.trim().to_lowercase();
        if normalized.contains("read screen") {
            Intent::ReadScreen
        } else if normalized.contains("list windows") {
            Intent::ListWindows
        } else {
            Intent::Echo(normalized)
        }
    }
}

pub struct IntentAdapter {
    screen: Arc<dyn ScreenCapture>,
    ocr: Arc<dyn TextExtractor>,
    windows: Arc<dyn WindowManager>,
}

impl IntentAdapter {
    pub fn new(
        screen: Arc<dyn ScreenCapture>,
        ocr: Arc<dyn TextExtractor>,
        windows: Arc<dyn WindowManager>,
    ) -> Self {
        Self { screen, ocr, windows }
    }

    pub async fn execute(&self, input: &str) -> Result<String> {
        let intent = Intent::classify(input);
        log::info!("executing command {:?} as {:?}", input, intent);
        match intent {
            Intent::ReadScreen => {
                let frame = self.screen.capture()?;
                let text = self.ocr.extract_text(&frame).await?;
                let preview: String = text.chars().take(SCREEN_PREVIEW_CHARS).collect();
                Ok(format!("Screen text: {}...", preview))
            }
            Intent::ListWindows => {
                let windows = self.windows.list_windows()?;
                let names = windows
                    .iter()
                    .take(WINDOW_PREVIEW_COUNT)
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!("Found {} windows: {}", windows.len(), names))
            }
            Intent::Echo(text) => Ok(format!("Command executed: {}", text)),
        }
    }
}
