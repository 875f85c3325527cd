use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::adapter::{AccessibilityAnalyzer, ScreenCapture, TextExtractor, WindowManager};

const VISIBLE_TEXT_CHARS: usize = 300;

/// Screen analysis built from capture, OCR and window focus.
pub struct ScreenAnalyzer {
    screen: Arc<dyn ScreenCapture>,
    ocr: Arc<dyn TextExtractor>,
    windows: Arc<dyn WindowManager>,
}

impl ScreenAnalyzer {
    pub fn new(
        screen: Arc<dyn ScreenCapture>,
        ocr: Arc<dyn TextExtractor>,
        windows: Arc<dyn WindowManager>,
    ) -> Self {
        Self { screen, ocr, windows }
    }

    async fn run(&self) -> Result<String> {
        let frame = self.screen.capture().context("Failed to analyze screen")?;
        let text = self
            .ocr
            .extract_text(&frame)
            .await
            .context("Failed to analyze screen")?;

        let mut analysis = String::from("Screen analysis:\n");
        if !text.is_empty() {
            let visible: String = text.chars().take(VISIBLE_TEXT_CHARS).collect();
            let _ = writeln!(analysis, "Visible text: {}", visible);
        }
        if let Some(title) = self.windows.current_window()? {
            if !title.is_empty() {
                let _ = writeln!(analysis, "Current window: {}", title);
            }
        }
        log::debug!("accessibility analysis produced {} chars", analysis.len());
        Ok(analysis)
    }
}

impl AccessibilityAnalyzer for ScreenAnalyzer {
    fn analyze(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.run())
    }
}
