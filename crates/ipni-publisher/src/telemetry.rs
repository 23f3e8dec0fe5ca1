//! Metrics and logging.
//!
//! Every outbound call is counted and timed through the `metrics` facade;
//! whichever recorder the binary installs receives the values. Without a
//! recorder the calls are no-ops.

use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

pub const HEAD_FETCHES: &str = "http_head_cid_fetches_total";
pub const HEAD_FETCH_DURATION: &str = "http_head_cid_fetch_duration_seconds";
pub const INDEXER_ANNOUNCEMENTS: &str = "http_indexer_announcements_total";
pub const INDEXER_ANNOUNCEMENT_DURATION: &str = "http_indexer_announcement_duration_seconds";
pub const STORE_UPLOADS: &str = "store_uploads_total";
pub const STORE_UPLOAD_DURATION: &str = "store_upload_duration_seconds";
pub const STORE_FETCHES: &str = "store_fetches_total";
pub const STORE_FETCH_DURATION: &str = "store_fetch_duration_seconds";

/// Register descriptions for every metric this crate emits.
pub fn describe_metrics() {
    metrics::describe_counter!(HEAD_FETCHES, "Chain head fetches, by outcome");
    metrics::describe_histogram!(
        HEAD_FETCH_DURATION,
        metrics::Unit::Seconds,
        "Chain head fetch latency"
    );
    metrics::describe_counter!(INDEXER_ANNOUNCEMENTS, "Indexer announcements, by outcome");
    metrics::describe_histogram!(
        INDEXER_ANNOUNCEMENT_DURATION,
        metrics::Unit::Seconds,
        "Indexer announcement latency"
    );
    metrics::describe_counter!(STORE_UPLOADS, "Object store writes, by outcome");
    metrics::describe_histogram!(
        STORE_UPLOAD_DURATION,
        metrics::Unit::Seconds,
        "Object store write latency"
    );
    metrics::describe_counter!(STORE_FETCHES, "Object store reads, by outcome");
    metrics::describe_histogram!(
        STORE_FETCH_DURATION,
        metrics::Unit::Seconds,
        "Object store read latency"
    );
}

/// Outcome label attached to every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    Failure,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Failure => "failure",
        }
    }
}

/// One timed call. Dropping it without [`Timer::finish`] records nothing.
#[derive(Debug)]
pub struct Timer {
    counter: &'static str,
    histogram: &'static str,
    start: Instant,
}

impl Timer {
    pub fn head_fetch() -> Self {
        Self::start(HEAD_FETCHES, HEAD_FETCH_DURATION)
    }

    pub fn announcement() -> Self {
        Self::start(INDEXER_ANNOUNCEMENTS, INDEXER_ANNOUNCEMENT_DURATION)
    }

    pub fn store_upload() -> Self {
        Self::start(STORE_UPLOADS, STORE_UPLOAD_DURATION)
    }

    pub fn store_fetch() -> Self {
        Self::start(STORE_FETCHES, STORE_FETCH_DURATION)
    }

    fn start(counter: &'static str, histogram: &'static str) -> Self {
        Self {
            counter,
            histogram,
            start: Instant::now(),
        }
    }

    /// Record the call and return how long it took.
    pub fn finish(self, outcome: Outcome) -> Duration {
        let elapsed = self.start.elapsed();
        metrics::counter!(self.counter, "outcome" => outcome.as_str()).increment(1);
        metrics::histogram!(self.histogram).record(elapsed.as_secs_f64());
        elapsed
    }
}

/// Milliseconds as a float, for `elapsed_ms` log fields.
pub fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `pretty` selects human-readable output; anything else is JSON.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("pretty") => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Install the global tracing subscriber.
///
/// The filter comes from `LOG_LEVEL` (default `info`), the format from
/// `LOG_FORMAT`.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .pretty()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .try_init(),
    }
}
