//! The instrument capability and the values exchanged with it.
//!
//! An [`Instrument`] is anything that can produce one voice of sound: it can
//! be played with [`PlayOptions`], stopped, and copied into an independent
//! instance with its own [`InstrumentId`]. Earcons never play a template
//! instrument directly; every playback works on a fresh copy.
//!
//! When a voice finishes, naturally or because it was stopped, the instrument
//! invokes the `on_end` callback from its play options with a
//! [`PlaybackEnded`] value.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Unique identifier of one instrument instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(u64);

impl InstrumentId {
    /// Allocate a new process-wide unique ID.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instrument-{}", self.0)
    }
}

/// Why a voice was stopped before finishing on its own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The owning earcon cancelled its playback.
    Cancelled,
    /// Any other host-defined reason.
    Custom(String),
}

impl StopReason {
    /// The reason as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Custom(reason) => reason,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passed to `on_end` callbacks when a voice finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackEnded {
    /// The instrument copy that finished.
    pub instrument: InstrumentId,
    /// `None` when the voice ended naturally.
    pub reason: Option<StopReason>,
}

impl PlaybackEnded {
    /// A voice that played to its natural end.
    pub fn finished(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            reason: None,
        }
    }

    /// A voice that was stopped.
    pub fn stopped(instrument: InstrumentId, reason: StopReason) -> Self {
        Self {
            instrument,
            reason: Some(reason),
        }
    }

    /// Whether the voice was stopped by a cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.reason == Some(StopReason::Cancelled)
    }
}

/// Completion callback shared between an earcon and its voices.
pub type EndCallback = Arc<dyn Fn(&PlaybackEnded) + Send + Sync>;

/// A playback parameter that is either constant or evaluated over time.
///
/// Dynamic values receive the time elapsed since the voice started.
#[derive(Clone)]
pub enum ParamValue {
    /// A constant value.
    Fixed(f64),
    /// A value computed from the elapsed playback time.
    Dynamic(Arc<dyn Fn(Duration) -> f64 + Send + Sync>),
}

impl ParamValue {
    /// Create a dynamic value from a closure.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(Duration) -> f64 + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Whether the value is computed over time.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    /// The constant value, if this is not dynamic.
    pub fn as_fixed(&self) -> Option<f64> {
        match self {
            Self::Fixed(value) => Some(*value),
            Self::Dynamic(_) => None,
        }
    }

    /// Evaluate the value at the given playback time.
    pub fn value_at(&self, elapsed: Duration) -> f64 {
        match self {
            Self::Fixed(value) => *value,
            Self::Dynamic(f) => f(elapsed),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Fixed(value)
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Fixed(a), Self::Fixed(b)) => a == b,
            (Self::Dynamic(a), Self::Dynamic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Options for playing one voice.
///
/// Unset fields let the instrument fall back to its own configuration.
#[derive(Clone, Default)]
pub struct PlayOptions {
    /// Frequency in Hz.
    pub frequency: Option<ParamValue>,
    /// How long the voice sounds.
    pub duration: Option<Duration>,
    /// Lower frequency clamp in Hz.
    pub min_frequency: Option<f64>,
    /// Upper frequency clamp in Hz.
    pub max_frequency: Option<f64>,
    /// Volume, 0 to 1.
    pub volume: Option<ParamValue>,
    /// Stereo pan, -1 (left) to 1 (right).
    pub pan: Option<f64>,
    /// Invoked once when the voice ends.
    pub on_end: Option<EndCallback>,
}

impl PlayOptions {
    /// Create empty play options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frequency.
    pub fn frequency(mut self, frequency: impl Into<ParamValue>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// Set the duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Clamp the frequency to `[min, max]`.
    pub fn frequency_range(mut self, min: f64, max: f64) -> Self {
        self.min_frequency = Some(min);
        self.max_frequency = Some(max);
        self
    }

    /// Set the volume.
    pub fn volume(mut self, volume: impl Into<ParamValue>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    /// Set the pan.
    pub fn pan(mut self, pan: f64) -> Self {
        self.pan = Some(pan);
        self
    }

    /// Set the end callback.
    pub fn on_end<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PlaybackEnded) + Send + Sync + 'static,
    {
        self.on_end = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for PlayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayOptions")
            .field("frequency", &self.frequency)
            .field("duration", &self.duration)
            .field("min_frequency", &self.min_frequency)
            .field("max_frequency", &self.max_frequency)
            .field("volume", &self.volume)
            .field("pan", &self.pan)
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// A sound-producing capability.
///
/// Implementations must be safe to share across threads: completion is
/// usually reported from an audio or monitor thread.
///
/// # Contract
///
/// - [`play`](Self::play) starts sound production and returns without
///   waiting. The `on_end` callback, if any, is invoked at most once when the
///   voice ends.
/// - [`stop`](Self::stop) halts sound production, immediately or with a fade
///   over `fade` (instrument default when `None`). Whether stopping invokes
///   `on_end` is up to the instrument.
/// - [`copy`](Self::copy) returns an identically configured instance with a
///   fresh [`InstrumentId`].
pub trait Instrument: Send + Sync {
    /// This instance's identity.
    fn id(&self) -> InstrumentId;

    /// Start playing one voice.
    fn play(&self, options: PlayOptions);

    /// Stop the voice.
    fn stop(&self, immediate: bool, fade: Option<Duration>, reason: StopReason);

    /// Create an independent copy with its own identity.
    fn copy(&self) -> Arc<dyn Instrument>;
}

/// How an earcon refers to an instrument.
#[derive(Clone)]
pub enum InstrumentRef {
    /// Resolved through the instrument registry at playback time.
    Name(String),
    /// A concrete instrument used as template.
    Instance(Arc<dyn Instrument>),
}

impl InstrumentRef {
    /// Wrap a concrete instrument.
    pub fn instance<I: Instrument + 'static>(instrument: I) -> Self {
        Self::Instance(Arc::new(instrument))
    }

    /// The registry name, if this is a name reference.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Instance(_) => None,
        }
    }
}

impl From<&str> for InstrumentRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for InstrumentRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Arc<dyn Instrument>> for InstrumentRef {
    fn from(instrument: Arc<dyn Instrument>) -> Self {
        Self::Instance(instrument)
    }
}

impl fmt::Debug for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Instance(instrument) => f.debug_tuple("Instance").field(&instrument.id()).finish(),
        }
    }
}
