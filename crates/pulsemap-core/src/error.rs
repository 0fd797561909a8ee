//! Error types for engine configuration
//!
//! Only configuration entry points return these. Tick-time code absorbs
//! missing data as zero signal and never fails.
use thiserror::Error;
use uuid::Uuid;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Inertia decay outside [0, 1]
    #[error("Inertia decay {0} is outside [0, 1]")]
    DecayOutOfRange(f32),

    /// Output range is inverted
    #[error("Invalid range for '{parameter}': min {min} > max {max}")]
    InvertedRange {
        /// Target parameter of the offending mapping
        parameter: String,
        /// Configured minimum
        min: f32,
        /// Configured maximum
        max: f32,
    },

    /// A numeric field is NaN or infinite
    #[error("Field '{0}' must be a finite number")]
    NonFinite(&'static str),

    /// Two triggers share a name
    #[error("Duplicate trigger name: {0}")]
    DuplicateTrigger(String),

    /// Two mappings share an id
    #[error("Duplicate mapping id: {0}")]
    DuplicateMapping(Uuid),

    /// Trigger name is empty
    #[error("Trigger name must not be empty")]
    EmptyTriggerName,

    /// Parameter name does not exist in a parameter set
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Mapping targets a color field
    #[error("Parameter '{0}' is not a scalar and cannot be mapped")]
    NotScalar(String),

    /// No mapping with this id
    #[error("Mapping not found: {0}")]
    MappingNotFound(Uuid),

    /// Tick interval of zero
    #[error("Tick interval must be greater than zero")]
    ZeroTickInterval,

    /// Sample rate of zero
    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,

    /// The analysis loop is no longer running
    #[error("Analysis loop has stopped")]
    LoopStopped,

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
