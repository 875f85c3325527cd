use crate::action::Endpoint;
use crate::adapter::SpeechInput;
use crate::error::ApiError;
use crate::job::Dispatcher;
use crate::models::{Envelope, StatusData};
use crate::server::ServerStats;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub stats: Arc<ServerStats>,
    pub voice: Arc<dyn SpeechInput>,
}

/// Decode, dispatch and wrap one request for an already matched endpoint.
async fn handle(
    st: AppState,
    endpoint: Endpoint,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // HEAD is routed to GET handlers
    if method != endpoint.method() {
        return method_not_allowed(method, endpoint).into_response();
    }
    let result = match body {
        Ok(body) => match endpoint.decode(&body) {
            Ok(None) => Ok(status_envelope(&st)),
            Ok(Some(command)) => st.dispatcher.dispatch(command).await,
            Err(e) => Err(e),
        },
        Err(rejection) => Err(ApiError::BadRequest(anyhow::anyhow!(rejection.body_text()))),
    };
    match result {
        Ok(envelope) => envelope.into_response(),
        Err(e) => {
            log::warn!("{} failed: {}", endpoint.path(), e);
            e.into_response()
        }
    }
}

fn status_envelope(st: &AppState) -> Envelope {
    let data = StatusData {
        status: "Online",
        running: st.stats.is_running(),
        requests_handled: st.stats.requests_handled(),
        voice_listening: st.voice.is_listening(),
        serialized: st.dispatcher.is_serialized(),
        started_at: st.stats.started_at().map(|t| t.to_rfc3339()),
        server_uptime: st.stats.uptime_secs(),
    };
    Envelope::ok_with("AION Desktop Assistant is running", json!(data))
}

async fn unknown_endpoint(uri: Uri) -> ApiError {
    ApiError::UnknownEndpoint(uri.path().to_string())
}

fn method_not_allowed(method: Method, endpoint: Endpoint) -> ApiError {
    ApiError::MethodNotAllowed { method: method.to_string(), path: endpoint.path().to_string() }
}

fn endpoint_route(endpoint: Endpoint) -> MethodRouter<AppState> {
    let handler = move |State(st): State<AppState>,
                        method: Method,
                        body: Result<Bytes, BytesRejection>| {
        handle(st, endpoint, method, body)
    };
    let filter = if endpoint.method() == Method::GET { MethodFilter::GET } else { MethodFilter::POST };
    on(filter, handler)
        .fallback(move |method: Method| async move { method_not_allowed(method, endpoint) })
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
}

/// Counts every request, answers preflights and stamps CORS headers on
/// everything that goes out.
async fn envelope_layer(State(st): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let n = st.stats.record_request();
    let _in_flight = st.stats.begin_request();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    log::debug!("incoming request #{}: {} {}", n, method, path);

    let mut response = if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };
    apply_cors(response.headers_mut());

    let outcome = if response.status().is_success() { "OK" } else { "ERROR" };
    log::info!(
        "request #{} handled in {}ms - {} {} -> {}",
        n,
        started.elapsed().as_millis(),
        method,
        path,
        outcome
    );
    response
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new();
    for endpoint in Endpoint::ALL {
        router = router.route(endpoint.path(), endpoint_route(endpoint));
    }
    router
        .fallback(unknown_endpoint)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn_with_state(state.clone(), envelope_layer))
        .with_state(state)
}
