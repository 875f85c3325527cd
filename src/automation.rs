use serde_json::json;

use crate::action::Command;
use crate::adapter::Capabilities;
use crate::error::ApiError;
use crate::intent::IntentAdapter;
use crate::models::{AnalysisData, CaptureData, Envelope, ScreenTextData, WindowListData};
use crate::screenshot::encode_png_base64;

/// Runs validated commands against the shared capability set.
pub struct Automation {
    caps: Capabilities,
    intents: IntentAdapter,
}

impl Automation {
    pub fn new(caps: Capabilities) -> Self {
        let intents = IntentAdapter::new(caps.screen.clone(), caps.ocr.clone(), caps.windows.clone());
        Self { caps, intents }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub async fn execute(&self, command: Command) -> Result<Envelope, ApiError> {
        log::debug!("dispatching {:?}", command);
        let envelope = match command {
            Command::CaptureScreen => {
                let frame = self.caps.screen.capture()?;
                let image = encode_png_base64(&frame)?;
                let data = CaptureData { image, width: frame.width(), height: frame.height() };
                Envelope::ok_with("Screenshot captured", json!(data))
            }
            Command::ReadScreen => {
                let frame = self.caps.screen.capture()?;
                let text = self.caps.ocr.extract_text(&frame).await?;
                let length = text.chars().count();
                Envelope::ok_with("Screen text extracted", json!(ScreenTextData { text, length }))
            }
            Command::MouseMove { x, y } => {
                self.caps.pointer.move_to(x, y)?;
                Envelope::ok(format!("Mouse moved to ({}, {})", x, y))
            }
            Command::MouseClick { at, button } => {
                self.caps.pointer.click(at, button)?;
                Envelope::ok("Mouse clicked")
            }
            Command::TypeText { text } => {
                self.caps.keyboard.type_text(&text)?;
                Envelope::ok(format!("Typed: {}", text))
            }
            Command::PressKey { key } => {
                self.caps.keyboard.press_key(&key)?;
                Envelope::ok(format!("Pressed key: {}", key))
            }
            Command::ListWindows => {
                let windows: Vec<String> =
                    self.caps.windows.list_windows()?.iter().map(|w| w.to_string()).collect();
                let count = windows.len();
                Envelope::ok_with(
                    format!("Found {} windows", count),
                    json!(WindowListData { windows, count }),
                )
            }
            Command::SwitchWindow { name } => {
                if self.caps.windows.switch_to(&name)? {
                    Envelope::ok(format!("Switched to: {}", name))
                } else {
                    Envelope::fail(format!("Window not found: {}", name))
                }
            }
            Command::Speak { text } => {
                self.caps.speech.speak(&text).await?;
                Envelope::ok(format!("Spoken: {}", text))
            }
            Command::Listen => {
                if !self.caps.listener.is_listening() {
                    self.caps.listener.start_listening()?;
                }
                Envelope::ok("Voice recognition activated")
            }
            Command::Analyze => {
                let analysis = self.caps.accessibility.analyze().await?;
                Envelope::ok_with("Accessibility analysis completed", json!(AnalysisData { analysis }))
            }
            Command::Execute { command } => {
                log::info!("executing remote command: {}", command);
                Envelope::ok(self.intents.execute(&command).await?)
            }
        };
        Ok(envelope)
    }
}
