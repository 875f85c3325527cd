//! Remote control listener lifecycle.
//!
//! The server owns the TCP listener through its accept task; aborting that
//! task closes the listener. Each connection runs on its own task, so requests
//! already accepted finish after a stop. Capabilities are handed in already
//! constructed and outlive the server.

use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::adapter::Capabilities;
use crate::api::{build_router, AppState};
use crate::automation::Automation;
use crate::error::ServerError;
use crate::job::Dispatcher;

pub const DEFAULT_PREFIX: &str = "http://localhost:8080/";

/// Counters shared between the server handle and every request handler.
pub struct ServerStats {
    requests: AtomicU64,
    running: AtomicBool,
    started_at: Mutex<Option<DateTime<Utc>>>,
    in_flight: watch::Sender<usize>,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self {
            requests: AtomicU64::new(0),
            running: AtomicBool::new(false),
            started_at: Mutex::new(None),
            in_flight: watch::channel(0).0,
        }
    }
}

/// Marks one request as in flight until dropped.
pub struct InFlight(Arc<ServerStats>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n -= 1);
    }
}

impl ServerStats {
    pub fn begin_request(self: &Arc<Self>) -> InFlight {
        self.in_flight.send_modify(|n| *n += 1);
        InFlight(self.clone())
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Resolves once no request is being handled.
    pub async fn idle(&self) {
        let mut rx = self.in_flight.subscribe();
        if rx.wait_for(|n| *n == 0).await.is_err() {
            log::debug!("in-flight counter closed");
        }
    }

    /// Count one request and return its sequence number.
    pub fn record_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn requests_handled(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at.lock().ok().and_then(|t| *t)
    }

    pub fn uptime_secs(&self) -> i64 {
        self.started_at()
            .map(|t| (Utc::now() - t).num_seconds())
            .unwrap_or(0)
    }

    fn mark_started(&self) {
        if let Ok(mut t) = self.started_at.lock() {
            *t = Some(Utc::now());
        }
        self.running.store(true, Ordering::SeqCst);
    }

    fn mark_stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

struct Listening {
    addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

pub struct RemoteControlServer {
    automation: Arc<Automation>,
    serialized: bool,
    stats: Arc<ServerStats>,
    listening: Mutex<Option<Listening>>,
}

impl RemoteControlServer {
    pub fn new(caps: Capabilities, serialized: bool) -> Self {
        log::info!("remote control service initialized (serialized: {})", serialized);
        Self {
            automation: Arc::new(Automation::new(caps)),
            serialized,
            stats: Arc::new(ServerStats::default()),
            listening: Mutex::new(None),
        }
    }

    /// Bind `prefix` and start accepting in the background. Returns `false`
    /// when the address cannot be bound; the caller decides whether to retry
    /// elsewhere.
    pub async fn start(&self, prefix: &str) -> bool {
        match self.try_start(prefix).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("failed to start remote control server: {}", e);
                false
            }
        }
    }

    pub async fn try_start(&self, prefix: &str) -> Result<SocketAddr, ServerError> {
        let started = Instant::now();
        log::info!("starting remote control server on {}", prefix);
        if self.local_addr().is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let (host, port) = parse_prefix(prefix)?;
        let bind_err = |source| ServerError::Bind { addr: format!("{}:{}", host, port), source };
        let listener = TcpListener::bind((host.as_str(), port)).await.map_err(bind_err)?;
        let addr = listener.local_addr().map_err(bind_err)?;

        let state = AppState {
            dispatcher: Dispatcher::new(self.automation.clone(), self.serialized),
            stats: self.stats.clone(),
            voice: self.automation.capabilities().listener.clone(),
        };
        let router = build_router(state);

        let mut slot = self.slot();
        if slot.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let accept_task = tokio::spawn(async move {
            log::info!("listening for remote control commands on {}", addr);
            if let Err(e) = axum::serve(listener, router.into_make_service()).await {
                log::error!("request listener failed: {}", e);
            }
        });
        *slot = Some(Listening { addr, accept_task });
        self.stats.mark_started();

        log::info!(
            "remote control server started on {} in {}ms",
            addr,
            started.elapsed().as_millis()
        );
        Ok(addr)
    }

    /// Stop accepting and close the listener. Idempotent. Returns once the
    /// address is free again; requests already accepted keep running to
    /// completion in the background.
    pub async fn stop(&self) {
        if let Some(task) = self.halt() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    log::error!("request listener task ended abnormally: {}", e);
                }
            }
        }
    }

    /// Stop, then wait until every in-flight request has drained.
    pub async fn shutdown(&self) {
        self.stop().await;
        let pending = self.stats.in_flight();
        if pending > 0 {
            log::info!("waiting for {} in-flight requests", pending);
        }
        self.stats.idle().await;
    }

    fn slot(&self) -> MutexGuard<'_, Option<Listening>> {
        self.listening.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt(&self) -> Option<JoinHandle<()>> {
        let listening = self.slot().take()?;
        log::info!("stopping remote control server on {}", listening.addr);
        self.stats.mark_stopped();
        listening.accept_task.abort();
        log::info!(
            "remote control server stopped - total requests handled: {}",
            self.stats.requests_handled()
        );
        Some(listening.accept_task)
    }

    pub fn is_running(&self) -> bool {
        self.stats.is_running()
    }

    pub fn requests_handled(&self) -> u64 {
        self.stats.requests_handled()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.slot().as_ref().map(|l| l.addr)
    }

    pub fn log_statistics(&self) {
        log::info!(
            "remote control statistics - requests handled: {}, running: {}",
            self.requests_handled(),
            self.is_running()
        );
    }
}

impl Drop for RemoteControlServer {
    fn drop(&mut self) {
        // the aborted accept task drops the listener on its next poll
        drop(self.halt());
    }
}

/// Split an HTTP listener prefix into a bindable host and port.
///
/// Accepts `http://host:port/`, bare `host:port`, and `+`/`*` as the
/// all-interfaces wildcard.
pub fn parse_prefix(prefix: &str) -> Result<(String, u16), ServerError> {
    let invalid = || ServerError::InvalidPrefix(prefix.to_string());
    let trimmed = prefix.trim();
    let rest = match trimmed.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => rest,
        Some(_) => return Err(invalid()),
        None => trimmed,
    };
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(invalid());
    }

    let (host, port) = if let Some(stripped) = authority.strip_prefix('[') {
        // [v6]:port
        let (host, tail) = stripped.split_once(']').ok_or_else(invalid)?;
        let port = match tail.strip_prefix(':') {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None if tail.is_empty() => 80,
            None => return Err(invalid()),
        };
        (host.to_string(), port)
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host.to_string(), port.parse().map_err(|_| invalid())?),
            None => (authority.to_string(), 80),
        }
    };

    let host = match host.as_str() {
        "" => return Err(invalid()),
        "+" | "*" => "0.0.0.0".to_string(),
        _ => host,
    };
    Ok((host, port))
}
