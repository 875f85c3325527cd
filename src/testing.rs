//! Test doubles shared by the unit and end-to-end tests.

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::adapter::*;
use crate::screenshot::{blank_frame, Frame};

#[derive(Default)]
struct Recorded {
    calls: HashMap<&'static str, usize>,
    moves: Vec<(i32, i32)>,
    clicks: Vec<(Option<(i32, i32)>, MouseButton)>,
    typed: Vec<String>,
    spoken: Vec<String>,
    screen_text: String,
    windows: Vec<WindowInfo>,
    foreground: Option<String>,
    failure: Option<String>,
    panic_on: Option<&'static str>,
    speech_gate: Option<Arc<Notify>>,
}

/// Desktop that records every capability call and can be told to fail.
#[derive(Default)]
pub struct RecordingDesktop {
    state: Mutex<Recorded>,
    listening: AtomicBool,
}

impl RecordingDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_screen_text(&self, text: &str) {
        self.state.lock().unwrap().screen_text = text.to_string();
    }

    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        self.state.lock().unwrap().windows = windows;
    }

    pub fn set_foreground(&self, title: &str) {
        self.state.lock().unwrap().foreground = Some(title.to_string());
    }

    /// Every subsequent capability call fails with `message`.
    pub fn fail_with(&self, message: &str) {
        self.state.lock().unwrap().failure = Some(message.to_string());
    }

    pub fn panic_on(&self, op: &'static str) {
        self.state.lock().unwrap().panic_on = Some(op);
    }

    /// Hold every `speak` until the returned gate is notified.
    pub fn gate_speech(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().speech_gate = Some(gate.clone());
        gate
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn moves(&self) -> Vec<(i32, i32)> {
        self.state.lock().unwrap().moves.clone()
    }

    pub fn clicks(&self) -> Vec<(Option<(i32, i32)>, MouseButton)> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.state.lock().unwrap().spoken.clone()
    }

    fn record<T>(&self, op: &'static str, f: impl FnOnce(&mut Recorded) -> T) -> Result<T> {
        let mut st = self.state.lock().unwrap();
        *st.calls.entry(op).or_insert(0) += 1;
        if st.panic_on == Some(op) {
            drop(st);
            panic!("{} exploded", op);
        }
        if let Some(msg) = &st.failure {
            return Err(anyhow!(msg.clone()));
        }
        Ok(f(&mut *st))
    }
}

impl ScreenCapture for RecordingDesktop {
    fn capture(&self) -> Result<Frame> {
        self.record("capture", |_| blank_frame(8, 6, [0, 0, 0, 255]))
    }
}

impl TextExtractor for RecordingDesktop {
    fn extract_text<'a>(&'a self, _frame: &'a Frame) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { self.record("extract_text", |st| st.screen_text.clone()) })
    }
}

impl PointerControl for RecordingDesktop {
    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.record("move_to", |st| st.moves.push((x, y)))
    }

    fn click(&self, at: Option<(i32, i32)>, button: MouseButton) -> Result<()> {
        self.record("click", |st| st.clicks.push((at, button)))
    }
}

impl KeyboardInput for RecordingDesktop {
    fn type_text(&self, text: &str) -> Result<()> {
        self.record("type_text", |st| st.typed.push(text.to_string()))
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.record("press_key", |_| log::debug!("pressed {}", key))
    }
}

impl WindowManager for RecordingDesktop {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        self.record("list_windows", |st| st.windows.clone())
    }

    fn switch_to(&self, name: &str) -> Result<bool> {
        self.record("switch_to", |st| {
            let found = st.windows.iter().any(|w| w.title == name);
            if found {
                st.foreground = Some(name.to_string());
            }
            found
        })
    }

    fn current_window(&self) -> Result<Option<String>> {
        self.record("current_window", |st| st.foreground.clone())
    }
}

impl SpeechOutput for RecordingDesktop {
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let gate = self.state.lock().unwrap().speech_gate.clone();
            match gate {
                Some(gate) => gate.notified().await,
                None => tokio::task::yield_now().await,
            }
            self.record("speak", |st| st.spoken.push(text.to_string()))
        })
    }
}

impl SpeechInput for RecordingDesktop {
    fn start_listening(&self) -> Result<()> {
        self.record("start_listening", |_| ())?;
        self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_listening(&self) -> Result<()> {
        self.record("stop_listening", |_| ())?;
        self.listening.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

/// Status, headers and body of one response.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Send one request to the server at `addr`.
pub async fn http_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> RawResponse {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap();
    let mut request = client.request(method, format!("http://{}{}", addr, path));
    if let Some(body) = body {
        request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
    }

    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let body = response.text().await.unwrap();
    RawResponse { status, headers, body }
}
