//! Parameter mappings - trigger to parameter routing
//!
//! A [`ParameterMapping`] links one trigger (by name) to one scalar parameter.
//! [`MappingEngine`] evaluates every mapping once per tick and owns the
//! per-mapping inertia state.
//!
//! # Response modes
//!
//! - **SetValue**: `clamp(intensity * multiplier)`, memoryless.
//! - **AddInertia**: a single-state exponential moving average,
//!   `state = state * decay + intensity * multiplier * (1 - decay)`, then
//!   clamped. Decay near 1 drifts slowly and outlasts a single hit; decay 0
//!   behaves like SetValue.

use crate::error::{ConfigError, Result};
use crate::parameters::ParameterName;
use crate::trigger::{Trigger, TriggerRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// How a mapping turns trigger intensity into a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingMode {
    /// Direct, memoryless assignment
    SetValue,
    /// Exponential memory of past intensity
    AddInertia,
}

fn default_multiplier() -> f32 {
    1.0
}

fn default_max_value() -> f32 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// Declarative link from a trigger to a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// Identity of this mapping; keys its runtime state
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Parameter written by this mapping
    pub target: ParameterName,
    /// Trigger read by this mapping (lookup key, not ownership)
    pub trigger: String,
    /// Response mode
    pub mode: MappingMode,
    /// Memory factor for [`MappingMode::AddInertia`], in [0, 1]
    #[serde(default)]
    pub inertia_decay: f32,
    /// Gain applied to trigger intensity
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
    /// Lower output bound
    #[serde(default)]
    pub min_value: f32,
    /// Upper output bound
    #[serde(default = "default_max_value")]
    pub max_value: f32,
    /// Disabled mappings publish nothing and keep their state
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ParameterMapping {
    /// Direct mapping
    pub fn set_value(
        target: ParameterName,
        trigger: impl Into<String>,
        multiplier: f32,
        min_value: f32,
        max_value: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            trigger: trigger.into(),
            mode: MappingMode::SetValue,
            inertia_decay: 0.0,
            multiplier,
            min_value,
            max_value,
            enabled: true,
        }
    }

    /// Inertia mapping
    pub fn inertia(
        target: ParameterName,
        trigger: impl Into<String>,
        decay: f32,
        multiplier: f32,
        min_value: f32,
        max_value: f32,
    ) -> Self {
        Self {
            mode: MappingMode::AddInertia,
            inertia_decay: decay,
            ..Self::set_value(target, trigger, multiplier, min_value, max_value)
        }
    }

    /// Check everything the tick path relies on
    pub fn validate(&self) -> Result<()> {
        if !self.target.is_scalar() {
            return Err(ConfigError::NotScalar(self.target.to_string()));
        }
        if !self.multiplier.is_finite() {
            return Err(ConfigError::NonFinite("multiplier"));
        }
        if !self.min_value.is_finite() {
            return Err(ConfigError::NonFinite("min_value"));
        }
        if !self.max_value.is_finite() {
            return Err(ConfigError::NonFinite("max_value"));
        }
        if self.min_value > self.max_value {
            return Err(ConfigError::InvertedRange {
                parameter: self.target.to_string(),
                min: self.min_value,
                max: self.max_value,
            });
        }
        if !(0.0..=1.0).contains(&self.inertia_decay) {
            return Err(ConfigError::DecayOutOfRange(self.inertia_decay));
        }
        Ok(())
    }

    #[inline]
    fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min_value, self.max_value)
    }
}

/// Evaluate one mapping for one tick.
///
/// `state` is the mapping's inertia memory; SetValue ignores it. A missing
/// trigger contributes no signal: SetValue clamps zero, AddInertia lets the
/// existing state decay without new forcing.
#[inline]
pub fn evaluate(mapping: &ParameterMapping, trigger: Option<&Trigger>, state: &mut f32) -> f32 {
    match mapping.mode {
        MappingMode::SetValue => {
            let signal = trigger.map_or(0.0, |t| t.intensity() * mapping.multiplier);
            mapping.clamp(signal)
        }
        MappingMode::AddInertia => {
            let decay = mapping.inertia_decay;
            *state = match trigger {
                Some(t) => *state * decay + t.intensity() * mapping.multiplier * (1.0 - decay),
                None => *state * decay,
            };
            mapping.clamp(*state)
        }
    }
}

#[derive(Debug, Clone)]
struct MappingSlot {
    mapping: ParameterMapping,
    state: f32,
    last_value: Option<f32>,
    faulted: bool,
}

impl MappingSlot {
    fn new(mapping: ParameterMapping) -> Self {
        Self {
            mapping,
            state: 0.0,
            last_value: None,
            faulted: false,
        }
    }
}

/// Ordered mapping list with persistent per-mapping state
#[derive(Debug, Clone, Default)]
pub struct MappingEngine {
    slots: Vec<MappingSlot>,
    fault_count: u64,
}

impl MappingEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a mapping. Its state starts at zero.
    ///
    /// Adding a mapping whose id already exists replaces it.
    pub fn add(&mut self, mapping: ParameterMapping) -> Result<Uuid> {
        mapping.validate()?;
        let id = mapping.id;
        match self.slots.iter_mut().find(|s| s.mapping.id == id) {
            Some(slot) => *slot = MappingSlot::new(mapping),
            None => self.slots.push(MappingSlot::new(mapping)),
        }
        debug!("Mapping {} added", id);
        Ok(id)
    }

    /// Replace an existing mapping, resetting its state
    pub fn replace(&mut self, mapping: ParameterMapping) -> Result<()> {
        mapping.validate()?;
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.mapping.id == mapping.id)
            .ok_or(ConfigError::MappingNotFound(mapping.id))?;
        debug!("Mapping {} replaced", mapping.id);
        *slot = MappingSlot::new(mapping);
        Ok(())
    }

    /// Remove a mapping and its state
    pub fn remove(&mut self, id: Uuid) -> Result<ParameterMapping> {
        let index = self
            .slots
            .iter()
            .position(|s| s.mapping.id == id)
            .ok_or(ConfigError::MappingNotFound(id))?;
        debug!("Mapping {} removed", id);
        Ok(self.slots.remove(index).mapping)
    }

    /// Enable or disable a mapping
    pub fn set_enabled(&mut self, id: Uuid, enabled: bool) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.mapping.id == id)
            .ok_or(ConfigError::MappingNotFound(id))?;
        slot.mapping.enabled = enabled;
        Ok(())
    }

    /// Drop every mapping
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Configured mappings, in evaluation order
    pub fn mappings(&self) -> impl Iterator<Item = &ParameterMapping> {
        self.slots.iter().map(|s| &s.mapping)
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no mappings are configured
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Inertia state of a mapping
    pub fn state(&self, id: Uuid) -> Option<f32> {
        self.slots
            .iter()
            .find(|s| s.mapping.id == id)
            .map(|s| s.state)
    }

    /// Total non-finite results seen since creation
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    /// Evaluate every enabled mapping against the registry.
    ///
    /// When several mappings target the same parameter the later one wins.
    /// A mapping that yields a non-finite value, or whose inertia state
    /// overflows, is skipped for the tick with its state reset. Its parameter
    /// keeps the last good value, so the rest still publish.
    pub fn evaluate_all(&mut self, triggers: &TriggerRegistry) -> BTreeMap<ParameterName, f32> {
        let mut values = BTreeMap::new();

        for slot in &mut self.slots {
            if !slot.mapping.enabled {
                continue;
            }

            let trigger = triggers.get(&slot.mapping.trigger);
            let value = evaluate(&slot.mapping, trigger, &mut slot.state);

            // An overflowed inertia state still clamps to a finite value
            if value.is_finite() && slot.state.is_finite() {
                if slot.faulted {
                    debug!("Mapping {} recovered", slot.mapping.id);
                    slot.faulted = false;
                }
                slot.last_value = Some(value);
                values.insert(slot.mapping.target, value);
                continue;
            }

            self.fault_count += 1;
            slot.state = 0.0;
            if !slot.faulted {
                warn!(
                    "Mapping {} ({} <- {}) produced a non-finite value, holding last value",
                    slot.mapping.id, slot.mapping.target, slot.mapping.trigger
                );
                slot.faulted = true;
            }
            if let Some(last) = slot.last_value {
                values.insert(slot.mapping.target, last);
            }
        }

        values
    }
}
