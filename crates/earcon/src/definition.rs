//! Earcon definitions stored as TOML.
//!
//! A definition describes an earcon declaratively, with instruments referenced
//! by registry name:
//!
//! ```toml
//! id = "message-received"
//! volume = 0.8
//!
//! [[instruments]]
//! instrument = "sineMajor"
//! frequency = 660.0
//! duration_ms = 120
//!
//! [[instruments]]
//! instrument = "triangle"
//! frequency = 880.0
//! duration_ms = 200
//! pan = 0.5
//! ```
//!
//! ```ignore
//! use earcon::definition::EarconDefinition;
//!
//! let definition = EarconDefinition::load("sounds/message.toml")?;
//! let earcon = Earcon::with_registry(definition.into_options()?, registry);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use earcon_core::logging::targets;

use crate::earcon::{EarconInstrument, EarconOptions};
use crate::error::{DefinitionError, DefinitionResult};
use crate::instrument::PlayOptions;

/// One instrument entry of a definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentDefinition {
    /// Registry name of the instrument.
    pub instrument: String,
    /// Frequency in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Lower frequency clamp in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_frequency: Option<f64>,
    /// Upper frequency clamp in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frequency: Option<f64>,
    /// Volume, 0 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Pan, -1 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
}

impl InstrumentDefinition {
    /// Create an entry for a registry name.
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            ..Default::default()
        }
    }

    fn validate(&self, index: usize) -> DefinitionResult<()> {
        let field = |name: &str| format!("instruments[{index}].{name}");

        if self.instrument.trim().is_empty() {
            return Err(DefinitionError::invalid_value(
                field("instrument"),
                "must not be empty",
            ));
        }
        for (name, value) in [
            ("frequency", self.frequency),
            ("min_frequency", self.min_frequency),
            ("max_frequency", self.max_frequency),
        ] {
            if let Some(value) = value {
                check_positive(&field(name), value)?;
            }
        }
        if let (Some(min), Some(max)) = (self.min_frequency, self.max_frequency) {
            if min > max {
                return Err(DefinitionError::invalid_value(
                    field("min_frequency"),
                    format!("{min} is above max_frequency {max}"),
                ));
            }
        }
        if self.duration_ms == Some(0) {
            return Err(DefinitionError::invalid_value(
                field("duration_ms"),
                "must be positive",
            ));
        }
        if let Some(volume) = self.volume {
            check_volume(&field("volume"), volume)?;
        }
        if let Some(pan) = self.pan {
            check_pan(&field("pan"), pan)?;
        }
        Ok(())
    }

    fn play_options(&self) -> PlayOptions {
        let mut options = PlayOptions::new();
        if let Some(frequency) = self.frequency {
            options = options.frequency(frequency);
        }
        if let Some(duration_ms) = self.duration_ms {
            options = options.duration(Duration::from_millis(duration_ms));
        }
        options.min_frequency = self.min_frequency;
        options.max_frequency = self.max_frequency;
        if let Some(volume) = self.volume {
            options = options.volume(volume);
        }
        options.pan = self.pan;
        options
    }
}

/// A declarative earcon description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EarconDefinition {
    /// Earcon identifier. Generated at construction when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Master volume, 0 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Master pan, -1 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
    /// Instruments in launch order.
    #[serde(default)]
    pub instruments: Vec<InstrumentDefinition>,
}

impl EarconDefinition {
    /// Parse and validate a definition.
    pub fn from_toml_str(source: &str) -> DefinitionResult<Self> {
        let definition: Self = toml::from_str(source)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Read, parse and validate a definition file.
    pub fn load(path: impl AsRef<Path>) -> DefinitionResult<Self> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|err| DefinitionError::io(path, err))?;
        let definition = Self::from_toml_str(&source)?;
        tracing::debug!(
            target: targets::DEFINITION,
            path = %path.display(),
            id = ?definition.id,
            instruments = definition.instruments.len(),
            "loaded earcon definition"
        );
        Ok(definition)
    }

    /// Write the definition as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> DefinitionResult<()> {
        let path = path.as_ref();
        let contents = self.to_toml_string()?;
        std::fs::write(path, contents).map_err(|err| DefinitionError::io(path, err))?;
        tracing::debug!(target: targets::DEFINITION, path = %path.display(), "saved earcon definition");
        Ok(())
    }

    /// Serialize the definition to a TOML string.
    pub fn to_toml_string(&self) -> DefinitionResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check every value against its accepted range.
    pub fn validate(&self) -> DefinitionResult<()> {
        if let Some(volume) = self.volume {
            check_volume("volume", volume)?;
        }
        if let Some(pan) = self.pan {
            check_pan("pan", pan)?;
        }
        for (index, instrument) in self.instruments.iter().enumerate() {
            instrument.validate(index)?;
        }
        Ok(())
    }

    /// Validate and convert into earcon options with name references.
    ///
    /// Completion callbacks, join mode and cancel policy are left at their
    /// defaults for the caller to set.
    pub fn into_options(self) -> DefinitionResult<EarconOptions> {
        self.validate()?;

        let instruments = self
            .instruments
            .iter()
            .map(|entry| EarconInstrument::new(entry.instrument.as_str(), entry.play_options()))
            .collect();

        let mut options = EarconOptions::new().instruments(instruments);
        options.id = self.id;
        options.volume = self.volume;
        options.pan = self.pan;
        Ok(options)
    }
}

fn check_positive(field: &str, value: f64) -> DefinitionResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DefinitionError::invalid_value(field, format!("{value} must be positive")))
    }
}

fn check_volume(field: &str, value: f64) -> DefinitionResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DefinitionError::invalid_value(
            field,
            format!("{value} must be between 0 and 1"),
        ))
    }
}

fn check_pan(field: &str, value: f64) -> DefinitionResult<()> {
    if (-1.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DefinitionError::invalid_value(
            field,
            format!("{value} must be between -1 and 1"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{InstrumentRef, ParamValue};

    const CHIME: &str = r#"
id = "chime"
volume = 0.8

[[instruments]]
instrument = "sineMajor"
frequency = 660.0
duration_ms = 120

[[instruments]]
instrument = "triangle"
frequency = 880.0
duration_ms = 200
min_frequency = 100.0
max_frequency = 2000.0
volume = 0.5
pan = 0.5
"#;

    #[test]
    fn test_parse_definition() {
        let definition = EarconDefinition::from_toml_str(CHIME).unwrap();
        assert_eq!(definition.id.as_deref(), Some("chime"));
        assert_eq!(definition.volume, Some(0.8));
        assert_eq!(definition.pan, None);
        assert_eq!(definition.instruments.len(), 2);
        assert_eq!(definition.instruments[1].pan, Some(0.5));
    }

    #[test]
    fn test_into_options() {
        let options = EarconDefinition::from_toml_str(CHIME)
            .unwrap()
            .into_options()
            .unwrap();

        assert_eq!(options.id.as_deref(), Some("chime"));
        assert_eq!(options.volume, Some(0.8));
        assert_eq!(options.instruments.len(), 2);

        let second = &options.instruments[1];
        assert_eq!(second.instrument.name(), Some("triangle"));
        let play = second.play_options.as_ref().unwrap();
        assert_eq!(play.frequency, Some(ParamValue::Fixed(880.0)));
        assert_eq!(play.duration, Some(Duration::from_millis(200)));
        assert_eq!(play.min_frequency, Some(100.0));
        assert_eq!(play.max_frequency, Some(2000.0));
        assert_eq!(play.volume, Some(ParamValue::Fixed(0.5)));
        assert_eq!(play.pan, Some(0.5));

        let first = options.instruments[0].play_options.as_ref().unwrap();
        assert_eq!(first.volume, None);
        assert_eq!(first.pan, None);
        assert!(matches!(options.instruments[0].instrument, InstrumentRef::Name(_)));
    }

    #[test]
    fn test_empty_definition() {
        let definition = EarconDefinition::from_toml_str("").unwrap();
        assert_eq!(definition, EarconDefinition::default());
        assert!(definition.into_options().unwrap().instruments.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_volume() {
        let err = EarconDefinition::from_toml_str("volume = 1.5").unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::InvalidValue { ref field, .. } if field == "volume"
        ));
    }

    #[test]
    fn test_rejects_instrument_values() {
        let cases = [
            ("frequency = -3.0", "instruments[0].frequency"),
            ("duration_ms = 0", "instruments[0].duration_ms"),
            ("pan = -2.0", "instruments[0].pan"),
            ("volume = -0.1", "instruments[0].volume"),
            (
                "min_frequency = 900.0\nmax_frequency = 100.0",
                "instruments[0].min_frequency",
            ),
        ];
        for (entry, expected) in cases {
            let source = format!("[[instruments]]\ninstrument = \"sine\"\n{entry}\n");
            match EarconDefinition::from_toml_str(&source) {
                Err(DefinitionError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("{entry}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_empty_instrument_name() {
        let source = "[[instruments]]\ninstrument = \"\"\n";
        assert!(EarconDefinition::from_toml_str(source).is_err());
    }

    #[test]
    fn test_parse_error() {
        let err = EarconDefinition::from_toml_str("volume = ").unwrap_err();
        assert!(matches!(err, DefinitionError::Parse(_)));
    }

    #[test]
    fn test_toml_string_reparses() {
        let definition = EarconDefinition {
            id: Some("ping".into()),
            volume: Some(0.25),
            pan: None,
            instruments: vec![InstrumentDefinition {
                frequency: Some(440.0),
                duration_ms: Some(90),
                ..InstrumentDefinition::new("square")
            }],
        };
        let text = definition.to_toml_string().unwrap();
        assert!(!text.contains("pan"));
        assert_eq!(EarconDefinition::from_toml_str(&text).unwrap(), definition);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chime.toml");
        std::fs::write(&path, CHIME).unwrap();

        let definition = EarconDefinition::load(&path).unwrap();
        assert_eq!(definition.instruments.len(), 2);

        let copy_path = dir.path().join("copy.toml");
        definition.save(&copy_path).unwrap();
        assert_eq!(EarconDefinition::load(&copy_path).unwrap(), definition);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EarconDefinition::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, DefinitionError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }
}
