//! Engine configuration record
//!
//! Everything the persistence layer stores for one engine: cadence, trigger
//! definitions, mappings and presets. Parsing happens from text only; the
//! caller owns file access.

use crate::error::{ConfigError, Result};
use crate::mapping::ParameterMapping;
use crate::parameters::ParameterSet;
use crate::trigger::TriggerDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Reference tick cadence (about 60 Hz)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Default audio sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// How a configured transition advances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransitionDrive {
    /// Progress follows elapsed time from loop start or restart
    Timed {
        /// Length of the run in seconds; zero or negative jumps to the end preset,
        /// NaN and infinity are rejected
        duration_secs: f64,
    },
    /// Progress follows a trigger's intensity over `[threshold, max]`
    Trigger {
        /// Trigger to follow
        trigger: String,
        /// Intensity at which progress starts rising
        threshold: f32,
        /// Intensity at which progress reaches 1
        max: f32,
        /// EMA memory applied to the remapped progress, in [0, 1]
        #[serde(default)]
        smoothing: f32,
    },
    /// Progress is only set through loop commands
    Manual,
}

impl TransitionDrive {
    /// Duration of a timed drive; invalid or negative lengths become zero
    pub fn duration(duration_secs: f64) -> Duration {
        Duration::try_from_secs_f64(duration_secs).unwrap_or(Duration::ZERO)
    }
}

/// Preset pair and drive for a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Preset at progress 0
    pub start: ParameterSet,
    /// Preset at progress 1
    pub end: ParameterSet,
    /// Progress source
    pub drive: TransitionDrive,
}

impl TransitionConfig {
    /// Check drive parameters
    pub fn validate(&self) -> Result<()> {
        match &self.drive {
            TransitionDrive::Timed { duration_secs } => {
                if !duration_secs.is_finite() {
                    return Err(ConfigError::NonFinite("duration_secs"));
                }
            }
            TransitionDrive::Trigger {
                threshold,
                max,
                smoothing,
                ..
            } => {
                if !threshold.is_finite() {
                    return Err(ConfigError::NonFinite("threshold"));
                }
                if !max.is_finite() {
                    return Err(ConfigError::NonFinite("max"));
                }
                if !(0.0..=1.0).contains(smoothing) {
                    return Err(ConfigError::DecayOutOfRange(*smoothing));
                }
            }
            TransitionDrive::Manual => {}
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loop cadence in milliseconds
    pub tick_interval_ms: u64,
    /// Sample rate of the spectra, in Hz
    pub sample_rate: u32,
    /// Parameters used when no transition is configured
    pub base: ParameterSet,
    /// Trigger definitions
    pub triggers: Vec<TriggerDefinition>,
    /// Mappings, in evaluation order
    pub mappings: Vec<ParameterMapping>,
    /// Optional preset transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            base: ParameterSet::default(),
            triggers: Vec::new(),
            mappings: Vec::new(),
            transition: None,
        }
    }
}

impl EngineConfig {
    /// Loop cadence
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate the whole record
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }

        let mut names = HashSet::new();
        for trigger in &self.triggers {
            trigger.validate()?;
            if !names.insert(trigger.name.as_str()) {
                return Err(ConfigError::DuplicateTrigger(trigger.name.clone()));
            }
        }

        let mut ids = HashSet::new();
        for mapping in &self.mappings {
            mapping.validate()?;
            if !ids.insert(mapping.id) {
                return Err(ConfigError::DuplicateMapping(mapping.id));
            }
        }

        if let Some(transition) = &self.transition {
            transition.validate()?;
        }
        Ok(())
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Serialize as pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingMode;
    use crate::parameters::ParameterName;
    use crate::trigger::{AudioSignal, TriggerKind};

    const SAMPLE: &str = r#"
tick_interval_ms = 20

[[triggers]]
name = "Bass1Mid63"
threshold = 0.63
kind = { type = "Audio", track = 1, signal = "Bass" }

[[triggers]]
name = "fader"
threshold = 0.5
kind = { type = "Manual" }

[[mappings]]
target = "ZoomScale"
trigger = "Bass1Mid63"
mode = "AddInertia"
inertia_decay = 0.9
multiplier = 2.0
min_value = 0.0
max_value = 5.0

[transition]
drive = { type = "Timed", duration_secs = 4.0 }

[transition.start]
zoom_scale = 1.0

[transition.end]
zoom_scale = 2.0
"#;

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.triggers.len(), 2);
        assert_eq!(
            config.triggers[0].kind,
            TriggerKind::Audio {
                track: 1,
                signal: AudioSignal::Bass
            }
        );

        let mapping = &config.mappings[0];
        assert_eq!(mapping.target, ParameterName::ZoomScale);
        assert_eq!(mapping.mode, MappingMode::AddInertia);
        assert!(mapping.enabled);

        let transition = config.transition.unwrap();
        assert_eq!(transition.end.zoom_scale, 2.0);
        // Unlisted preset fields take defaults
        assert_eq!(transition.end.contrast, ParameterSet::default().contrast);
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let mut config = EngineConfig::default();
        config.triggers.push(TriggerDefinition::manual("a", 0.1));
        config.triggers.push(TriggerDefinition::manual("a", 0.2));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTrigger(_))
        ));
    }

    #[test]
    fn test_duplicate_mapping_id_rejected() {
        let mapping = ParameterMapping::set_value(ParameterName::Contrast, "a", 1.0, 0.0, 1.0);
        let mut config = EngineConfig::default();
        config.mappings.push(mapping.clone());
        config.mappings.push(ParameterMapping {
            target: ParameterName::ZoomScale,
            ..mapping.clone()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateMapping(id)) if id == mapping.id
        ));
    }

    #[test]
    fn test_infinite_duration_rejected() {
        let transition = TransitionConfig {
            start: ParameterSet::default(),
            end: ParameterSet::default(),
            drive: TransitionDrive::Timed {
                duration_secs: f64::INFINITY,
            },
        };
        assert!(matches!(
            transition.validate(),
            Err(ConfigError::NonFinite("duration_secs"))
        ));

        let text = r#"
[transition]
drive = { type = "Timed", duration_secs = inf }
"#;
        assert!(EngineConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let config = EngineConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroTickInterval)
        ));
    }

    #[test]
    fn test_unknown_parameter_rejected_at_parse() {
        let text = r#"
[[mappings]]
target = "wobble"
trigger = "t"
mode = "SetValue"
"#;
        assert!(matches!(
            EngineConfig::from_toml_str(text),
            Err(ConfigError::TomlDe(_))
        ));
    }

    #[test]
    fn test_negative_duration_is_zero() {
        assert_eq!(TransitionDrive::duration(-1.0), Duration::ZERO);
        assert_eq!(TransitionDrive::duration(1.5), Duration::from_millis(1500));
    }
}
