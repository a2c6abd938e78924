//! Process-wide dispatch outcome counters.
//!
//! The chat route always answers HTTP 200, so failure visibility lives
//! here instead of in the status line: every dispatch records which path
//! produced the reply and whether a placeholder was substituted. The
//! snapshot is rendered by `GET /metrics`.

use std::sync::atomic::{AtomicUsize, Ordering};

static RELAY_TOTAL_REQUESTS: AtomicUsize = AtomicUsize::new(0);
static RELAY_MODEL_REPLIES: AtomicUsize = AtomicUsize::new(0);
static RELAY_BASIC_REPLIES: AtomicUsize = AtomicUsize::new(0);
static RELAY_FALLBACK_HOPS: AtomicUsize = AtomicUsize::new(0);
static RELAY_EMPTY_SHAPES: AtomicUsize = AtomicUsize::new(0);
static RELAY_UNAVAILABLE: AtomicUsize = AtomicUsize::new(0);
static RELAY_DEFAULTED_MODES: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub model_replies: usize,
    pub basic_replies: usize,
    pub fallback_hops: usize,
    pub empty_shapes: usize,
    pub unavailable: usize,
    pub defaulted_modes: usize,
}

pub fn record_request() {
    RELAY_TOTAL_REQUESTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_model_reply() {
    RELAY_MODEL_REPLIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_basic_reply() {
    RELAY_BASIC_REPLIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_fallback_hop() {
    RELAY_FALLBACK_HOPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_empty_shape() {
    RELAY_EMPTY_SHAPES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_unavailable() {
    RELAY_UNAVAILABLE.fetch_add(1, Ordering::Relaxed);
}

pub fn record_defaulted_mode() {
    RELAY_DEFAULTED_MODES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        total_requests: RELAY_TOTAL_REQUESTS.load(Ordering::Relaxed),
        model_replies: RELAY_MODEL_REPLIES.load(Ordering::Relaxed),
        basic_replies: RELAY_BASIC_REPLIES.load(Ordering::Relaxed),
        fallback_hops: RELAY_FALLBACK_HOPS.load(Ordering::Relaxed),
        empty_shapes: RELAY_EMPTY_SHAPES.load(Ordering::Relaxed),
        unavailable: RELAY_UNAVAILABLE.load(Ordering::Relaxed),
        defaulted_modes: RELAY_DEFAULTED_MODES.load(Ordering::Relaxed),
    }
}

impl MetricsSnapshot {
    pub fn render(&self) -> String {
        format!(
            "relay_requests_total {}\n\
             relay_model_replies_total {}\n\
             relay_basic_replies_total {}\n\
             relay_fallback_hops_total {}\n\
             relay_empty_shapes_total {}\n\
             relay_unavailable_total {}\n\
             relay_defaulted_modes_total {}\n",
            self.total_requests,
            self.model_replies,
            self.basic_replies,
            self.fallback_hops,
            self.empty_shapes,
            self.unavailable,
            self.defaulted_modes,
        )
    }
}
