//! PulseMap Core - Audio-Reactive Parameter Engine
//!
//! This crate turns live spectra into visual parameters:
//! - Band extraction (Bass/Mid/High, RMS intensity)
//! - Threshold-gated triggers
//! - Trigger to parameter mappings (direct and inertia)
//! - Parameter presets and preset transitions
//! - A fixed-cadence analysis loop publishing the latest frame
//!
//! The crate performs no file I/O; configuration arrives as text or values.

#![warn(missing_docs)]

pub mod analysis_loop;
pub mod audio;
pub mod config;
pub mod error;
pub mod mapping;
pub mod parameters;
pub mod snapshot;
pub mod transition;
pub mod trigger;

// --- Re-exports grouped by category ---

// Audio
pub use audio::{
    extract_band, intensity, BandExtractor, BandReading, FrequencyBand, SpectrumBank,
    SpectrumBuffer, SpectrumSource, TrackAnalysis,
};

// Triggers & Mappings
pub use mapping::{evaluate, MappingEngine, MappingMode, ParameterMapping};
pub use trigger::{
    AudioSignal, Trigger, TriggerDefinition, TriggerKind, TriggerReading, TriggerRegistry,
};

// Parameters & Transitions
pub use parameters::{lerp, ParameterName, ParameterSet, ParameterValue, Rgba};
pub use transition::{remap_progress, Transition};

// Loop & Publication
pub use analysis_loop::{AnalysisLoop, LoopCommand, LoopController, LoopHandle, LoopStats};
pub use snapshot::{snapshot_channel, ParameterFrame, SnapshotPublisher, SnapshotReader};

// Configuration & Errors
pub use config::{EngineConfig, TransitionConfig, TransitionDrive};
pub use error::{ConfigError, Result};
