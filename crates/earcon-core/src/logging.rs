//! Logging and tracing facilities for Horizon Earcon.
//!
//! Horizon Earcon uses the `tracing` crate for instrumentation. The library
//! never installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("earcon::playback=debug")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every subsystem logs under one of the [`targets`], so output can be
//! filtered per subsystem.

/// Span names used throughout Horizon Earcon for tracing.
pub mod span_names {
    /// One `sonify` call.
    pub const SONIFY: &str = "earcon::sonify";
    /// One `cancel_sonify` call.
    pub const CANCEL: &str = "earcon::cancel";
    /// Synthesized voice lifetime.
    pub const VOICE: &str = "earcon::voice";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "earcon::signal";
    /// Earcon playback and completion join.
    pub const PLAYBACK: &str = "earcon::playback";
    /// Instrument registry.
    pub const REGISTRY: &str = "earcon::registry";
    /// Synthesized instruments and the audio output.
    pub const SYNTH: &str = "earcon::synth";
    /// Earcon definition files.
    pub const DEFINITION: &str = "earcon::definition";
    /// Performance spans.
    pub const PERF: &str = "earcon::perf";
}

/// Keeps an `earcon::perf` span entered for as long as the guard lives.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a span recording `name` as its operation.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
