use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use schooldesk_models::attendance::Session;
use schooldesk_models::library::{MemberType, ReturnCondition};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and its upkeep task.
/// Returns None if observability is disabled or the recorder cannot be installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0,
            ],
        )
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full("library_fines_assessed".to_string()),
                &[0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0],
            )
        });

    let handle = match builder.and_then(|b| b.install_recorder()) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed, metrics disabled");
            return None;
        }
    };

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

/// Metrics middleware to track HTTP requests
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let uri_path = req.uri().path().to_owned();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or(uri_path);

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    let status_category = match status {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };
    counter!("http_requests_by_status", "status_category" => status_category).increment(1);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router serving `/metrics` in the Prometheus text format
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Library

pub fn track_book_issued(member_type: MemberType) {
    if !is_observability_enabled() {
        return;
    }
    counter!("library_books_issued_total", "member_type" => member_type.as_str()).increment(1);
}

pub fn track_book_renewed() {
    if !is_observability_enabled() {
        return;
    }
    counter!("library_renewals_total").increment(1);
}

pub fn track_book_returned(condition: ReturnCondition) {
    if !is_observability_enabled() {
        return;
    }
    counter!("library_books_returned_total", "condition" => condition.as_str()).increment(1);
}

pub fn track_fine_assessed(amount: Decimal) {
    if !is_observability_enabled() {
        return;
    }
    counter!("library_fines_assessed_total").increment(1);
    histogram!("library_fines_assessed").record(amount.to_f64().unwrap_or_default());
}

pub fn track_fine_paid() {
    if !is_observability_enabled() {
        return;
    }
    counter!("library_fines_paid_total").increment(1);
}

// Attendance

pub fn track_attendance_saved(records: u64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("attendance_records_saved_total").increment(records);
}

pub fn track_attendance_submitted(session: Session) {
    if !is_observability_enabled() {
        return;
    }
    counter!("attendance_sessions_submitted_total", "session" => session.as_str()).increment(1);
}

pub fn track_attendance_rejected(reason: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("attendance_submissions_rejected_total", "reason" => reason).increment(1);
}
