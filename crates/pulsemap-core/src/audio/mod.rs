//! Audio-side inputs: spectrum hand-off and band extraction

pub mod bands;
pub mod spectrum;

pub use bands::{
    extract_band, intensity, BandExtractor, BandReading, FrequencyBand, TrackAnalysis,
};
pub use spectrum::{SpectrumBank, SpectrumBuffer, SpectrumSource};
