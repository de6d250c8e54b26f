//! Horizon Earcon: composite sound cues.
//!
//! This crate coordinates the playback of earcons, short sound cues built
//! from several instrument voices:
//!
//! - **Earcons**: Play every configured instrument at once and report one
//!   completion when all voices have ended
//! - **Instruments**: A capability trait plus synthesized rodio instruments
//! - **Registry**: Explicit name-to-instrument lookup with standard presets
//! - **Definitions**: Earcons described in TOML files
//!
//! # Playing an Earcon
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use earcon::{AudioOutput, Earcon, EarconInstrument, EarconOptions, InstrumentRegistry, PlayOptions};
//!
//! // The output must be kept alive for audio to play
//! let output = AudioOutput::try_default()?;
//! let registry = Arc::new(InstrumentRegistry::with_standard_instruments(&output.handle()));
//!
//! let earcon = Earcon::with_registry(
//!     EarconOptions::new()
//!         .instrument(EarconInstrument::new(
//!             "sineMajor",
//!             PlayOptions::new().frequency(660.0).duration(Duration::from_millis(120)),
//!         ))
//!         .instrument(EarconInstrument::new(
//!             "triangle",
//!             PlayOptions::new().frequency(990.0).duration(Duration::from_millis(240)),
//!         ))
//!         .on_end(|_| println!("done")),
//!     registry,
//! );
//!
//! let report = earcon.sonify(None);
//! for err in &report.errors {
//!     eprintln!("{err}");
//! }
//!
//! // Stop everything that is still sounding
//! earcon.cancel_sonify(true);
//! ```
//!
//! # Custom Instruments
//!
//! Anything implementing [`Instrument`] can be used, either registered under
//! a name or referenced directly through [`InstrumentRef::Instance`].

pub mod definition;
mod earcon;
mod error;
mod instrument;
mod registry;
pub mod synth;

pub use error::{AudioError, DefinitionError, DefinitionResult, EarconError, ErrorKind, Result};

// Re-export commonly used types at the crate root
pub use definition::{EarconDefinition, InstrumentDefinition};
pub use earcon::{
    CancelPolicy, Earcon, EarconInstrument, EarconOptions, JoinMode, SonifyOptions, SonifyReport,
};
pub use instrument::{
    EndCallback, Instrument, InstrumentId, InstrumentRef, ParamValue, PlayOptions, PlaybackEnded,
    StopReason,
};
pub use registry::InstrumentRegistry;
pub use synth::{AudioOutput, FrequencyQuantize, OutputHandle, SynthConfig, SynthInstrument, Waveform};

pub use earcon_core::ConnectionId;
