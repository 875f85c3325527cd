//! In-memory desktop used when no platform injection backend is wired in.
//!
//! Every operation mutates process-local state only: a cursor, an ordered
//! window list with one foreground entry, the text typed into the foreground
//! window, and the speech-input flag. Text extraction reads back what was typed.

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use globset::Glob;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::adapter::*;
use crate::config::DesktopConfig;
use crate::screenshot::{blank_frame, Frame};

/// Virtual-key codes for the named keys `press_key` accepts.
static KEY_CODES: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (name, code) in [
        ("backspace", 0x08),
        ("tab", 0x09),
        ("enter", 0x0D),
        ("return", 0x0D),
        ("shift", 0x10),
        ("ctrl", 0x11),
        ("control", 0x11),
        ("alt", 0x12),
        ("escape", 0x1B),
        ("esc", 0x1B),
        ("space", 0x20),
        ("pageup", 0x21),
        ("pagedown", 0x22),
        ("end", 0x23),
        ("home", 0x24),
        ("left", 0x25),
        ("up", 0x26),
        ("right", 0x27),
        ("down", 0x28),
        ("insert", 0x2D),
        ("delete", 0x2E),
        ("del", 0x2E),
        ("win", 0x5B),
    ] {
        m.insert(name, code);
    }
    for (i, c) in ('0'..='9').enumerate() {
        m.insert(digit_name(c), 0x30 + i as u8);
    }
    for (i, c) in ('a'..='z').enumerate() {
        m.insert(letter_name(c), 0x41 + i as u8);
    }
    for n in 1..=12u8 {
        m.insert(function_name(n), 0x6F + n);
    }
    m
});

fn digit_name(c: char) -> &'static str {
    const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
    DIGITS[c as usize - '0' as usize]
}

fn letter_name(c: char) -> &'static str {
    const LETTERS: [&str; 26] = [
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
        "s", "t", "u", "v", "w", "x", "y", "z",
    ];
    LETTERS[c as usize - 'a' as usize]
}

fn function_name(n: u8) -> &'static str {
    const KEYS: [&str; 12] =
        ["f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12"];
    KEYS[n as usize - 1]
}

/// Look up the virtual-key code for a key name (case-insensitive).
pub fn key_code(name: &str) -> Option<u8> {
    KEY_CODES.get(name.trim().to_lowercase().as_str()).copied()
}

struct DesktopState {
    cursor: (i32, i32),
    windows: Vec<WindowInfo>,
    foreground: Option<usize>,
    buffers: HashMap<String, String>,
    spoken: Vec<String>,
}

pub struct HeadlessDesktop {
    width: u32,
    height: u32,
    state: Mutex<DesktopState>,
    listening: AtomicBool,
}

impl HeadlessDesktop {
    pub fn new(config: &DesktopConfig) -> Self {
        let mut windows: Vec<WindowInfo> = config.windows.clone();
        windows.sort_by(|a, b| a.title.cmp(&b.title));
        let foreground = if windows.is_empty() { None } else { Some(0) };
        log::info!(
            "headless desktop {}x{} with {} windows",
            config.screen_width,
            config.screen_height,
            windows.len()
        );
        Self {
            width: config.screen_width,
            height: config.screen_height,
            state: Mutex::new(DesktopState {
                cursor: (half(config.screen_width), half(config.screen_height)),
                windows,
                foreground,
                buffers: HashMap::new(),
                spoken: Vec::new(),
            }),
            listening: AtomicBool::new(false),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, DesktopState>> {
        self.state.lock().map_err(|_| anyhow!("desktop state is poisoned"))
    }

    fn check_bounds(&self, x: i32, y: i32) -> Result<()> {
        let (px, py) = (i64::from(x), i64::from(y));
        if px < 0 || py < 0 || px >= i64::from(self.width) || py >= i64::from(self.height) {
            return Err(anyhow!(
                "Point ({}, {}) is outside the screen bounds {}x{}",
                x,
                y,
                self.width,
                self.height
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn cursor(&self) -> Result<(i32, i32)> {
        Ok(self.state()?.cursor)
    }

    #[cfg(test)]
    pub fn spoken(&self) -> Result<Vec<String>> {
        Ok(self.state()?.spoken.clone())
    }

    fn foreground_title(st: &DesktopState) -> Option<String> {
        st.foreground.and_then(|i| st.windows.get(i)).map(|w| w.title.clone())
    }
}

fn half(extent: u32) -> i32 {
    i32::try_from(extent / 2).unwrap_or(i32::MAX)
}

/// Glob patterns match the whole title; plain names match a case-insensitive
/// substring of the title or the exact process name.
fn window_matches(window: &WindowInfo, name: &str) -> bool {
    if name.contains(|c: char| matches!(c, '*' | '?' | '[')) {
        if let Ok(glob) = Glob::new(&name.to_lowercase()) {
            return glob.compile_matcher().is_match(window.title.to_lowercase());
        }
    }
    let needle = name.to_lowercase();
    window.title.to_lowercase().contains(&needle) || window.process.to_lowercase() == needle
}

impl ScreenCapture for HeadlessDesktop {
    fn capture(&self) -> Result<Frame> {
        log::debug!("capturing headless screen {}x{}", self.width, self.height);
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("no display attached"));
        }
        Ok(blank_frame(self.width, self.height, [32, 32, 32, 255]))
    }
}

impl TextExtractor for HeadlessDesktop {
    fn extract_text<'a>(&'a self, frame: &'a Frame) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let st = self.state()?;
            let text = Self::foreground_title(&st)
                .and_then(|t| st.buffers.get(&t).cloned())
                .unwrap_or_default();
            log::debug!(
                "extracted {} chars from {}x{} frame",
                text.chars().count(),
                frame.width(),
                frame.height()
            );
            Ok(text)
        })
    }
}

impl PointerControl for HeadlessDesktop {
    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.check_bounds(x, y)?;
        self.state()?.cursor = (x, y);
        log::info!("mouse moved to ({}, {})", x, y);
        Ok(())
    }

    fn click(&self, at: Option<(i32, i32)>, button: MouseButton) -> Result<()> {
        let mut st = self.state()?;
        if let Some((x, y)) = at {
            self.check_bounds(x, y)?;
            st.cursor = (x, y);
        }
        log::info!("{} click at {:?}", button, st.cursor);
        Ok(())
    }
}

impl KeyboardInput for HeadlessDesktop {
    fn type_text(&self, text: &str) -> Result<()> {
        if let Some(c) = text.chars().find(|c| c.is_control() && *c != '\n' && *c != '\t') {
            return Err(anyhow!("Failed to type character {:?}: unsupported character", c));
        }
        let mut st = self.state()?;
        let title = Self::foreground_title(&st).unwrap_or_default();
        st.buffers.entry(title).or_default().push_str(text);
        log::info!("typed {} chars", text.chars().count());
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<()> {
        let code = key_code(key).ok_or_else(|| anyhow!("Unsupported key: {}", key))?;
        let mut st = self.state()?;
        let title = Self::foreground_title(&st).unwrap_or_default();
        let buffer = st.buffers.entry(title).or_default();
        match code {
            0x08 => {
                buffer.pop();
            }
            0x0D => buffer.push('\n'),
            0x09 => buffer.push('\t'),
            0x20 => buffer.push(' '),
            _ => {}
        }
        log::info!("pressed key {} (0x{:02X})", key, code);
        Ok(())
    }
}

impl WindowManager for HeadlessDesktop {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self.state()?.windows.clone())
    }

    fn switch_to(&self, name: &str) -> Result<bool> {
        let mut st = self.state()?;
        match st.windows.iter().position(|w| window_matches(w, name)) {
            Some(i) => {
                st.foreground = Some(i);
                log::info!("switched to window {}", st.windows[i]);
                Ok(true)
            }
            None => {
                log::info!("no window matches {:?}", name);
                Ok(false)
            }
        }
    }

    fn current_window(&self) -> Result<Option<String>> {
        Ok(Self::foreground_title(&*self.state()?))
    }
}

impl SpeechOutput for HeadlessDesktop {
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::info!("speaking: {}", text);
            tokio::task::yield_now().await;
            self.state()?.spoken.push(text.to_string());
            Ok(())
        })
    }
}

impl SpeechInput for HeadlessDesktop {
    fn start_listening(&self) -> Result<()> {
        if !self.listening.swap(true, Ordering::SeqCst) {
            log::info!("voice recognition started");
        }
        Ok(())
    }

    fn stop_listening(&self) -> Result<()> {
        if self.listening.swap(false, Ordering::SeqCst) {
            log::info!("voice recognition stopped");
        }
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}
