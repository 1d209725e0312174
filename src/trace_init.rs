//! Trace output for the segmentation pipeline.
//!
//! With the `trace` feature, [`init_tracing`] writes one JSON line per event
//! and per closed span to `<log_dir>/fenci-trace.jsonl`. The spans cover
//! resource loading, cache reads and writes, `build_dag`, `solve_route` and
//! `viterbi`, so a slow cut can be traced to the stage that caused it.
//!
//! The filter comes from `FENCI_LOG` (an `EnvFilter` directive such as
//! `fenci_core::segmenter=trace`), then `RUST_LOG`, then
//! [`DEFAULT_FILTER`]. Without the feature the call does nothing.

#[cfg(feature = "trace")]
use std::path::Path;
#[cfg(feature = "trace")]
use std::sync::Once;

/// Debug level for both crates of the segmenter, nothing from dependencies.
pub const DEFAULT_FILTER: &str = "fenci=debug,fenci_core=debug";

/// Trace file created inside the log directory.
pub const TRACE_FILE: &str = "fenci-trace.jsonl";

#[cfg(feature = "trace")]
static INIT: Once = Once::new();

#[cfg(feature = "trace")]
fn env_filter() -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    EnvFilter::try_from_env("FENCI_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the JSON trace subscriber. Only the first call has an effect.
#[cfg(feature = "trace")]
pub fn init_tracing(log_dir: &Path) {
    INIT.call_once(|| {
        let file_appender = tracing_appender::rolling::never(log_dir, TRACE_FILE);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard); // flushed on process exit

        tracing_subscriber::fmt()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_env_filter(env_filter())
            .init();
    });
}

#[cfg(not(feature = "trace"))]
pub fn init_tracing(_log_dir: &std::path::Path) {}
