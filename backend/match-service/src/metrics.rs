use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, TextEncoder,
};
use std::time::Duration;

static SUGGESTION_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "match_service_suggestion_requests_total",
            "Suggestion requests handled by match-service, by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create match_service_suggestion_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register match_service_suggestion_requests_total");
    counter
});

static SUGGESTION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "match_service_suggestion_duration_seconds",
            "Time spent building one suggestion page",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
        &["sort_by"],
    )
    .expect("failed to create match_service_suggestion_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register match_service_suggestion_duration_seconds");
    histogram
});

static ELIGIBLE_CANDIDATES: Lazy<Histogram> = Lazy::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "match_service_eligible_candidates",
            "Eligible candidates per suggestion request before pagination",
        )
        .buckets(vec![
            0.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ]),
    )
    .expect("failed to create match_service_eligible_candidates");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register match_service_eligible_candidates");
    histogram
});

static FAME_RECALCULATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "match_service_fame_recalculations_total",
            "Fame rating recalculations, by event type and outcome",
        ),
        &["event", "outcome"],
    )
    .expect("failed to create match_service_fame_recalculations_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register match_service_fame_recalculations_total");
    counter
});

pub fn record_suggestion(outcome: &str, sort_by: &str, elapsed: Duration) {
    SUGGESTION_REQUESTS_TOTAL
        .with_label_values(&[outcome])
        .inc();
    SUGGESTION_DURATION_SECONDS
        .with_label_values(&[sort_by])
        .observe(elapsed.as_secs_f64());
}

pub fn record_eligible_candidates(count: usize) {
    ELIGIBLE_CANDIDATES.observe(count as f64);
}

pub fn record_fame_recalculation(event: &str, outcome: &str) {
    FAME_RECALCULATIONS_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
}

pub async fn metrics_handler() -> HttpResponse {
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
