//! Request-Tracing fuer den Observability-Server

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Axum-Layer fuer Request-Tracing
///
/// Health-Probes und Scrapes kommen regelmaessig, deshalb laufen Span und
/// Antwort-Log nur auf `debug`. Serverfehler loggt der Layer weiterhin
/// als `error`.
pub fn request_timing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
}
