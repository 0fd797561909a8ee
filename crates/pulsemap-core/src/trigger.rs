//! Triggers - named, threshold-gated signals
//!
//! A trigger holds the latest intensity of its source and is active whenever
//! that intensity is strictly above its threshold. There is no hysteresis;
//! smoothing belongs to inertia mappings.

use crate::audio::TrackAnalysis;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Threshold given to triggers created implicitly by [`TriggerRegistry::upsert`]
pub const DEFAULT_THRESHOLD: f32 = 0.0;

/// Which per-track reading feeds an audio trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioSignal {
    /// RMS energy of the whole spectrum
    #[default]
    Intensity,
    /// Bass band average
    Bass,
    /// Mid band average
    Mid,
    /// High band average
    High,
    /// Bass band peak
    BassPeak,
    /// Mid band peak
    MidPeak,
    /// High band peak
    HighPeak,
}

impl AudioSignal {
    /// Pick this signal out of a track analysis
    pub fn sample(self, analysis: &TrackAnalysis) -> f32 {
        match self {
            AudioSignal::Intensity => analysis.intensity,
            AudioSignal::Bass => analysis.bass.average,
            AudioSignal::Mid => analysis.mid.average,
            AudioSignal::High => analysis.high.average,
            AudioSignal::BassPeak => analysis.bass.peak,
            AudioSignal::MidPeak => analysis.mid.peak,
            AudioSignal::HighPeak => analysis.high.peak,
        }
    }
}

/// Where a trigger gets its intensity from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerKind {
    /// Refreshed every tick from a track's analysis
    Audio {
        /// Track index in the spectrum source
        track: usize,
        /// Reading to follow
        #[serde(default)]
        signal: AudioSignal,
    },
    /// Intensity pushed from outside (faders, OSC, scripts)
    Manual,
}

impl TriggerKind {
    /// Intensity for this tick, or `None` if the kind is not tick-driven.
    ///
    /// A missing track reads as silence.
    pub fn sample(&self, tracks: &[TrackAnalysis]) -> Option<f32> {
        match self {
            TriggerKind::Audio { track, signal } => Some(
                tracks
                    .get(*track)
                    .map(|analysis| signal.sample(analysis))
                    .unwrap_or(0.0),
            ),
            TriggerKind::Manual => None,
        }
    }
}

/// Persistable trigger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    /// Unique trigger name
    pub name: String,
    /// Signal source
    pub kind: TriggerKind,
    /// Activation threshold (strict)
    pub threshold: f32,
}

impl TriggerDefinition {
    /// Audio trigger on `track` following `signal`
    pub fn audio(
        name: impl Into<String>,
        track: usize,
        signal: AudioSignal,
        threshold: f32,
    ) -> Self {
        Self {
            name: name.into(),
            kind: TriggerKind::Audio { track, signal },
            threshold,
        }
    }

    /// Manually driven trigger
    pub fn manual(name: impl Into<String>, threshold: f32) -> Self {
        Self {
            name: name.into(),
            kind: TriggerKind::Manual,
            threshold,
        }
    }

    /// Reject empty names and non-finite thresholds
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyTriggerName);
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::NonFinite("threshold"));
        }
        Ok(())
    }
}

/// Live trigger state published for meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerReading {
    /// Trigger name
    pub name: String,
    /// Latest intensity
    pub intensity: f32,
    /// Activation threshold
    pub threshold: f32,
    /// `intensity > threshold`
    pub active: bool,
}

/// A named threshold-gated signal
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    name: String,
    kind: TriggerKind,
    threshold: f32,
    current_intensity: f32,
    is_active: bool,
}

impl Trigger {
    /// Create an inactive trigger with zero intensity
    pub fn new(name: impl Into<String>, kind: TriggerKind, threshold: f32) -> Self {
        Self {
            name: name.into(),
            kind,
            threshold,
            current_intensity: 0.0,
            is_active: 0.0 > threshold,
        }
    }

    /// Build from a persisted definition
    pub fn from_definition(definition: TriggerDefinition) -> Self {
        Self::new(definition.name, definition.kind, definition.threshold)
    }

    /// Store a new intensity and recompute the active flag
    #[inline]
    pub fn update_state(&mut self, intensity: f32) {
        self.current_intensity = intensity;
        self.is_active = intensity > self.threshold;
    }

    /// Change the threshold; the active flag follows immediately
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
        self.is_active = self.current_intensity > threshold;
    }

    /// Trigger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal source
    pub fn kind(&self) -> &TriggerKind {
        &self.kind
    }

    /// Activation threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Latest intensity
    pub fn intensity(&self) -> f32 {
        self.current_intensity
    }

    /// Whether the latest intensity is above threshold
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Current state as a reading
    pub fn reading(&self) -> TriggerReading {
        TriggerReading {
            name: self.name.clone(),
            intensity: self.current_intensity,
            threshold: self.threshold,
            active: self.is_active,
        }
    }

    /// Configuration of this trigger
    pub fn definition(&self) -> TriggerDefinition {
        TriggerDefinition {
            name: self.name.clone(),
            kind: self.kind.clone(),
            threshold: self.threshold,
        }
    }
}

/// Name-keyed collection of live triggers
#[derive(Debug, Clone, Default)]
pub struct TriggerRegistry {
    triggers: BTreeMap<String, Trigger>,
}

impl TriggerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or reconfigure a trigger.
    ///
    /// Reconfiguring keeps the current intensity and re-evaluates it against
    /// the new threshold.
    pub fn configure(&mut self, definition: TriggerDefinition) -> Result<()> {
        definition.validate()?;
        match self.triggers.get_mut(&definition.name) {
            Some(existing) => {
                existing.kind = definition.kind;
                existing.set_threshold(definition.threshold);
                debug!("Reconfigured trigger {}", definition.name);
            }
            None => {
                debug!("Added trigger {}", definition.name);
                self.triggers
                    .insert(definition.name.clone(), Trigger::from_definition(definition));
            }
        }
        Ok(())
    }

    /// Update a trigger's intensity, creating a manual trigger if the name is new.
    ///
    /// Never touches the threshold of an existing trigger.
    pub fn upsert(&mut self, name: &str, intensity: f32) {
        match self.triggers.get_mut(name) {
            Some(trigger) => trigger.update_state(intensity),
            None => {
                let mut trigger = Trigger::new(name, TriggerKind::Manual, DEFAULT_THRESHOLD);
                trigger.update_state(intensity);
                self.triggers.insert(name.to_string(), trigger);
            }
        }
    }

    /// Refresh every tick-driven trigger from this tick's track analyses
    pub fn refresh(&mut self, tracks: &[TrackAnalysis]) {
        for trigger in self.triggers.values_mut() {
            if let Some(intensity) = trigger.kind.sample(tracks) {
                trigger.update_state(intensity);
            }
        }
    }

    /// Remove a trigger by name
    pub fn remove(&mut self, name: &str) -> Option<Trigger> {
        let removed = self.triggers.remove(name);
        if removed.is_some() {
            debug!("Removed trigger {}", name);
        }
        removed
    }

    /// Look up a trigger
    pub fn get(&self, name: &str) -> Option<&Trigger> {
        self.triggers.get(name)
    }

    /// Iterate triggers in name order
    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.values()
    }

    /// Number of triggers
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// True when no triggers are configured
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Live state of every trigger, in name order
    pub fn readings(&self) -> Vec<TriggerReading> {
        self.triggers.values().map(Trigger::reading).collect()
    }

    /// Configuration of every trigger, in name order
    pub fn definitions(&self) -> Vec<TriggerDefinition> {
        self.triggers.values().map(Trigger::definition).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BandReading;

    #[test]
    fn test_new_trigger_is_inactive() {
        let trigger = Trigger::new("t", TriggerKind::Manual, 0.5);
        assert_eq!(trigger.intensity(), 0.0);
        assert!(!trigger.is_active());
    }

    #[test]
    fn test_threshold_change_reevaluates() {
        let mut trigger = Trigger::new("t", TriggerKind::Manual, 0.5);
        trigger.update_state(0.4);
        assert!(!trigger.is_active());
        trigger.set_threshold(0.3);
        assert!(trigger.is_active());
    }

    #[test]
    fn test_upsert_keeps_threshold() {
        let mut registry = TriggerRegistry::new();
        registry
            .configure(TriggerDefinition::manual("fader", 0.8))
            .unwrap();
        registry.upsert("fader", 0.9);
        let trigger = registry.get("fader").unwrap();
        assert_eq!(trigger.threshold(), 0.8);
        assert!(trigger.is_active());
    }

    #[test]
    fn test_upsert_creates_manual_trigger() {
        let mut registry = TriggerRegistry::new();
        registry.upsert("new", 0.2);
        let trigger = registry.get("new").unwrap();
        assert_eq!(trigger.kind(), &TriggerKind::Manual);
        assert_eq!(trigger.threshold(), DEFAULT_THRESHOLD);
        assert!(trigger.is_active());
    }

    #[test]
    fn test_refresh_reads_track_signal() {
        let mut registry = TriggerRegistry::new();
        registry
            .configure(TriggerDefinition::audio("kick", 1, AudioSignal::BassPeak, 0.5))
            .unwrap();
        registry
            .configure(TriggerDefinition::audio("gone", 7, AudioSignal::Intensity, -1.0))
            .unwrap();

        let tracks = [
            TrackAnalysis::default(),
            TrackAnalysis {
                bass: BandReading {
                    average: 0.1,
                    peak: 0.9,
                },
                ..Default::default()
            },
        ];
        registry.refresh(&tracks);

        assert!(registry.get("kick").unwrap().is_active());
        assert_eq!(registry.get("kick").unwrap().intensity(), 0.9);
        // Missing track reads as zero, still above a negative threshold
        assert_eq!(registry.get("gone").unwrap().intensity(), 0.0);
        assert!(registry.get("gone").unwrap().is_active());
    }

    #[test]
    fn test_refresh_leaves_manual_triggers() {
        let mut registry = TriggerRegistry::new();
        registry.upsert("fader", 0.7);
        registry.refresh(&[]);
        assert_eq!(registry.get("fader").unwrap().intensity(), 0.7);
    }

    #[test]
    fn test_configure_rejects_bad_definitions() {
        let mut registry = TriggerRegistry::new();
        assert!(matches!(
            registry.configure(TriggerDefinition::manual("  ", 0.5)),
            Err(ConfigError::EmptyTriggerName)
        ));
        assert!(matches!(
            registry.configure(TriggerDefinition::manual("x", f32::NAN)),
            Err(ConfigError::NonFinite(_))
        ));
        assert!(registry.is_empty());
    }
}
