//! Spectrum hand-off between the audio engine and the analysis loop
//!
//! The audio engine owns the spectra and overwrites them as it plays; the
//! loop only ever reads the latest buffer per track.

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Magnitude spectrum of one track (positive frequencies only)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumBuffer {
    magnitudes: Vec<f32>,
}

impl SpectrumBuffer {
    /// Wrap a magnitude array
    pub fn new(magnitudes: Vec<f32>) -> Self {
        Self { magnitudes }
    }

    /// All-zero spectrum with `bins` bins
    pub fn silent(bins: usize) -> Self {
        Self {
            magnitudes: vec![0.0; bins],
        }
    }

    /// Bin magnitudes
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    /// True when the buffer has no bins
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}

impl From<Vec<f32>> for SpectrumBuffer {
    fn from(magnitudes: Vec<f32>) -> Self {
        Self::new(magnitudes)
    }
}

/// Read side of the audio engine: latest spectrum per track
pub trait SpectrumSource: Send + Sync {
    /// Number of tracks currently known
    fn track_count(&self) -> usize;

    /// Latest spectrum for `track`, or `None` if the track has none yet
    fn spectrum(&self, track: usize) -> Option<Arc<SpectrumBuffer>>;
}

/// Per-track last-writer-wins spectrum store
///
/// Writers replace a track's buffer atomically, so readers never observe a
/// half-written spectrum.
#[derive(Default)]
pub struct SpectrumBank {
    tracks: RwLock<Vec<ArcSwap<SpectrumBuffer>>>,
}

impl SpectrumBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bank with `tracks` silent tracks of `bins` bins each
    pub fn with_tracks(tracks: usize, bins: usize) -> Self {
        let slots = (0..tracks)
            .map(|_| ArcSwap::from_pointee(SpectrumBuffer::silent(bins)))
            .collect();
        Self {
            tracks: RwLock::new(slots),
        }
    }

    /// Replace the spectrum of `track`, growing the track table if needed
    pub fn publish(&self, track: usize, spectrum: impl Into<SpectrumBuffer>) {
        let spectrum = Arc::new(spectrum.into());
        {
            let tracks = self.tracks.read();
            if let Some(slot) = tracks.get(track) {
                slot.store(spectrum);
                return;
            }
        }

        let mut tracks = self.tracks.write();
        while tracks.len() <= track {
            tracks.push(ArcSwap::from_pointee(SpectrumBuffer::default()));
        }
        tracks[track].store(spectrum);
        debug!("Spectrum bank grew to {} tracks", tracks.len());
    }

    /// Reset every track to an empty spectrum
    pub fn clear(&self) {
        for slot in self.tracks.read().iter() {
            slot.store(Arc::new(SpectrumBuffer::default()));
        }
    }
}

impl SpectrumSource for SpectrumBank {
    fn track_count(&self) -> usize {
        self.tracks.read().len()
    }

    fn spectrum(&self, track: usize) -> Option<Arc<SpectrumBuffer>> {
        self.tracks.read().get(track).map(|slot| slot.load_full())
    }
}
