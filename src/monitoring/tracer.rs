/*!
 * Structured Tracing
 * Subscriber setup and timed spans around policy change notifications
 */

use crate::avc::AvcEvent;
use crate::core::types::SeqNo;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Notifications slower than this are reported
const SLOW_NOTIFICATION: Duration = Duration::from_millis(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - AVC_TRACE_JSON: Enable JSON output (default: false)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("AVC_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one security server notification
pub struct NotificationSpan {
    span: tracing::Span,
    start: Instant,
    event: AvcEvent,
}

impl NotificationSpan {
    pub fn new(event: AvcEvent, seqno: SeqNo) -> Self {
        let span = span!(
            Level::DEBUG,
            "avc_notification",
            event = %event,
            seqno,
            touched = tracing::field::Empty,
            callbacks = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            event,
        }
    }

    /// Cache entries edited by the notification
    pub fn record_touched(&self, touched: usize) {
        self.span.record("touched", touched);
    }

    /// Callbacks invoked
    pub fn record_callbacks(&self, callbacks: usize) {
        self.span.record("callbacks", callbacks);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for NotificationSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();
        if elapsed > SLOW_NOTIFICATION {
            warn!(
                event = %self.event,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "slow AVC notification"
            );
        } else {
            debug!(
                event = %self.event,
                duration_us = elapsed.as_micros() as u64,
                "AVC notification completed"
            );
        }
    }
}
