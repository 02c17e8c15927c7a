use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::AppState;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    let Some(handle) = state.prometheus_handle.as_ref() else {
        return (StatusCode::NOT_FOUND, "Metrics not enabled").into_response();
    };

    metrics::gauge!("techinder_uptime_seconds").set(state.start_time.elapsed().as_secs_f64());
    if let Ok(users) = state.store().user_count().await {
        #[allow(clippy::cast_precision_loss)]
        let users = users as f64;
        metrics::gauge!("techinder_users").set(users);
    }

    handle.render().into_response()
}

/// Request span, access log line and HTTP metrics.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri,
        route = matched_path.clone(),
        user_id = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();

        let metrics_path = matched_path.as_deref().unwrap_or("unmatched");
        let labels = [
            ("method", method.clone()),
            ("path", metrics_path.to_string()),
            ("status", status.to_string()),
        ];

        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        if response.status().is_redirection() {
            let target = response
                .headers()
                .get(axum::http::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            info!(
                event = "http_request_finished",
                duration_ms,
                status_code = status,
                redirect_to = %target,
                "Request finished"
            );
        } else {
            info!(
                event = "http_request_finished",
                duration_ms,
                status_code = status,
                "Request finished"
            );
        }

        response
    }
    .instrument(span)
    .await
}
