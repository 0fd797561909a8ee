//! Single-slot "latest frame" channel from the analysis loop to readers
//!
//! Publishing overwrites the previous frame. There is no queue and no
//! backpressure; readers always see the newest complete frame.

use crate::parameters::{ParameterName, ParameterSet, ParameterValue};
use crate::trigger::TriggerReading;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything one tick publishes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterFrame {
    /// Tick counter, starting at 1 for the first published tick
    pub tick: u64,
    /// Mapping outputs by parameter name
    pub values: BTreeMap<ParameterName, f32>,
    /// Full parameter state: base or transition preset with mapping outputs applied
    pub parameters: ParameterSet,
    /// Live trigger state, in name order
    pub triggers: Vec<TriggerReading>,
    /// Transition progress, if a transition is configured
    pub transition_progress: Option<f32>,
}

impl ParameterFrame {
    /// Mapping output for a parameter
    pub fn value(&self, name: ParameterName) -> Option<f32> {
        self.values.get(&name).copied()
    }

    /// Live state of a trigger
    pub fn trigger(&self, name: &str) -> Option<&TriggerReading> {
        self.triggers.iter().find(|t| t.name == name)
    }

    /// Name-keyed updates for a rendering surface
    pub fn renderer_updates(&self) -> Vec<(&'static str, ParameterValue)> {
        self.parameters
            .named_values()
            .into_iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }
}

/// Create a connected publisher/reader pair holding an empty frame
pub fn snapshot_channel() -> (SnapshotPublisher, SnapshotReader) {
    let slot = Arc::new(ArcSwap::from_pointee(ParameterFrame::default()));
    (
        SnapshotPublisher { slot: slot.clone() },
        SnapshotReader { slot },
    )
}

/// Write side, owned by the analysis loop
#[derive(Debug)]
pub struct SnapshotPublisher {
    slot: Arc<ArcSwap<ParameterFrame>>,
}

impl SnapshotPublisher {
    /// Replace the latest frame
    pub fn publish(&self, frame: ParameterFrame) {
        self.slot.store(Arc::new(frame));
    }

    /// A new reader on this slot
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            slot: self.slot.clone(),
        }
    }
}

/// Read side, cheap to clone and share with render/UI threads
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: Arc<ArcSwap<ParameterFrame>>,
}

impl SnapshotReader {
    /// Latest published frame
    pub fn latest(&self) -> Arc<ParameterFrame> {
        self.slot.load_full()
    }

    /// Tick number of the latest frame
    pub fn tick(&self) -> u64 {
        self.slot.load().tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sees_latest_only() {
        let (publisher, reader) = snapshot_channel();
        assert_eq!(reader.tick(), 0);

        for tick in 1..=3 {
            publisher.publish(ParameterFrame {
                tick,
                ..Default::default()
            });
        }
        assert_eq!(reader.latest().tick, 3);
        assert_eq!(publisher.reader().tick(), 3);
    }

    #[test]
    fn test_renderer_updates_use_field_names() {
        let frame = ParameterFrame::default();
        let updates = frame.renderer_updates();
        assert_eq!(updates.len(), ParameterName::ALL.len());
        assert!(updates.iter().any(|(name, _)| *name == "zoom_scale"));
    }
}
