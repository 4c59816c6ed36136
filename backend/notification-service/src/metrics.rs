use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, TextEncoder};

static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "notification_service_ws_connections",
        "Live WebSocket links registered with notification-service",
    )
    .expect("failed to create notification_service_ws_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register notification_service_ws_connections");
    gauge
});

static PUSHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "notification_service_pushes_total",
            "Envelopes pushed by notification-service, by event and outcome",
        ),
        &["event", "outcome"],
    )
    .expect("failed to create notification_service_pushes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notification_service_pushes_total");
    counter
});

static WORKER_PASSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "notification_service_worker_passes_total",
            "Scheduler passes run by notification-service, by pass and outcome",
        ),
        &["pass", "outcome"],
    )
    .expect("failed to create notification_service_worker_passes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notification_service_worker_passes_total");
    counter
});

pub fn set_ws_connections(count: usize) {
    WS_CONNECTIONS.set(count as i64);
}

pub fn observe_push(event: &str, delivered: usize) {
    let outcome = if delivered > 0 { "delivered" } else { "no_links" };
    PUSHES_TOTAL.with_label_values(&[event, outcome]).inc();
}

pub fn observe_worker_pass(pass: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    WORKER_PASSES_TOTAL
        .with_label_values(&[pass, outcome])
        .inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
