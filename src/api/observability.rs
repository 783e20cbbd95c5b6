use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::AppState;
use crate::policy::LOGIN_PATH;

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "error"
    } else if status.is_client_error() {
        "client_error"
    } else if status.is_redirection() {
        "redirect"
    } else {
        "success"
    }
}

fn declared_length(req: &Request) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Wraps each request in a span and records one wide event plus the HTTP
/// metrics when it finishes. The `user_id` field is filled in by the auth
/// middleware further in.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    // Route template, not the raw path, so ids do not explode label cardinality.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |mp| mp.as_str().to_string());
    let request_bytes = declared_length(&req);

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route,
        user_id = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;
        let status = response.status();

        let labels = [
            ("method", method),
            ("path", route.clone()),
            ("status", status.as_u16().to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        if let Some(bytes) = request_bytes.filter(|_| route == "/product/create") {
            #[allow(clippy::cast_precision_loss)]
            let bytes = bytes as f64;
            metrics::histogram!("catalog_upload_bytes").record(bytes);
        }

        let sent_to_login = status.is_redirection()
            && response
                .headers()
                .get(header::LOCATION)
                .is_some_and(|l| l.as_bytes().starts_with(LOGIN_PATH.as_bytes()));

        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            status_code = status.as_u16(),
            outcome = outcome(status),
            sent_to_login,
            request_bytes,
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}
