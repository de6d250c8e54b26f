//! Name-to-instrument lookup.
//!
//! Earcons that reference instruments by name resolve them through an
//! [`InstrumentRegistry`] handed to them at construction. There is no global
//! registry; hosts create one, fill it, and share it behind an `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use earcon::{AudioOutput, Earcon, EarconOptions, InstrumentRegistry};
//!
//! let output = AudioOutput::try_default()?;
//! let registry = Arc::new(InstrumentRegistry::with_standard_instruments(&output.handle()));
//!
//! let earcon = Earcon::with_registry(EarconOptions::new(), registry.clone());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use earcon_core::logging::targets;

use crate::instrument::Instrument;
use crate::synth::{FrequencyQuantize, OutputHandle, SynthConfig, SynthInstrument, Waveform};

/// A thread-safe mapping from names to template instruments.
#[derive(Default)]
pub struct InstrumentRegistry {
    instruments: RwLock<HashMap<String, Arc<dyn Instrument>>>,
}

impl InstrumentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard synthesized presets.
    ///
    /// Registered names: `sine`, `square`, `sawtooth` and `triangle`, each
    /// also with a `Musical` suffix (snapped to the chromatic scale) and a
    /// `Major` suffix (snapped to the C major scale), plus `whitenoise`.
    pub fn with_standard_instruments(output: &OutputHandle) -> Self {
        let registry = Self::new();

        for (base, waveform) in [
            ("sine", Waveform::Sine),
            ("square", Waveform::Square),
            ("sawtooth", Waveform::Sawtooth),
            ("triangle", Waveform::Triangle),
        ] {
            for (suffix, quantize) in [
                ("", FrequencyQuantize::None),
                ("Musical", FrequencyQuantize::Chromatic),
                ("Major", FrequencyQuantize::Major),
            ] {
                let config = SynthConfig::new(waveform).quantize(quantize);
                registry.register_instrument(
                    format!("{base}{suffix}"),
                    SynthInstrument::new(output.clone(), config),
                );
            }
        }

        registry.register_instrument(
            "whitenoise",
            SynthInstrument::new(output.clone(), SynthConfig::new(Waveform::WhiteNoise)),
        );

        registry
    }

    /// Register an instrument under a name.
    ///
    /// Returns the instrument previously registered under that name, if any.
    pub fn register(
        &self,
        name: impl Into<String>,
        instrument: Arc<dyn Instrument>,
    ) -> Option<Arc<dyn Instrument>> {
        let name = name.into();
        tracing::debug!(target: targets::REGISTRY, %name, id = %instrument.id(), "registering instrument");
        self.instruments.write().insert(name, instrument)
    }

    /// Register a concrete instrument under a name.
    pub fn register_instrument<I: Instrument + 'static>(
        &self,
        name: impl Into<String>,
        instrument: I,
    ) -> Option<Arc<dyn Instrument>> {
        self.register(name, Arc::new(instrument))
    }

    /// Remove an instrument. Returns it if it was registered.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Instrument>> {
        self.instruments.write().remove(name)
    }

    /// Look up an instrument by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Instrument>> {
        self.instruments.read().get(name).cloned()
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.instruments.read().contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instruments.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered instruments.
    pub fn len(&self) -> usize {
        self.instruments.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.instruments.read().is_empty()
    }
}

impl std::fmt::Debug for InstrumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentRegistry")
            .field("names", &self.names())
            .finish()
    }
}

static_assertions::assert_impl_all!(InstrumentRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{InstrumentId, PlayOptions, StopReason};
    use crate::synth::AudioOutput;
    use std::time::Duration;

    struct Silent {
        id: InstrumentId,
    }

    impl Silent {
        fn new() -> Self {
            Self {
                id: InstrumentId::next(),
            }
        }
    }

    impl Instrument for Silent {
        fn id(&self) -> InstrumentId {
            self.id
        }

        fn play(&self, _options: PlayOptions) {}

        fn stop(&self, _immediate: bool, _fade: Option<Duration>, _reason: StopReason) {}

        fn copy(&self) -> Arc<dyn Instrument> {
            Arc::new(Silent::new())
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = InstrumentRegistry::new();
        assert!(registry.is_empty());

        let silent = Silent::new();
        let id = silent.id();
        assert!(registry.register_instrument("silent", silent).is_none());

        assert!(registry.contains("silent"));
        assert_eq!(registry.get("silent").map(|i| i.id()), Some(id));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces() {
        let registry = InstrumentRegistry::new();
        registry.register_instrument("a", Silent::new());
        let previous = registry.register_instrument("a", Silent::new());
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = InstrumentRegistry::new();
        registry.register_instrument("a", Silent::new());
        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_names_sorted() {
        let registry = InstrumentRegistry::new();
        registry.register_instrument("b", Silent::new());
        registry.register_instrument("a", Silent::new());
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_standard_instruments() {
        // This test may fail in CI environments without audio hardware
        if let Ok(output) = AudioOutput::try_default() {
            let registry = InstrumentRegistry::with_standard_instruments(&output.handle());
            assert_eq!(registry.len(), 13);
            for name in ["sine", "sineMusical", "squareMajor", "triangle", "whitenoise"] {
                assert!(registry.contains(name), "missing {name}");
            }
        }
    }
}
