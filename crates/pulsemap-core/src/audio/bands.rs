//! Band extraction - spectrum to band/intensity readings
//!
//! Pure functions over a magnitude spectrum. Bin layout follows a real FFT
//! of `2 * bin_count` samples, so bin `i` covers `i * sample_rate / (2 * bin_count)` Hz.

use serde::{Deserialize, Serialize};

/// Average and peak magnitude over a bin range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandReading {
    /// Mean magnitude in range
    pub average: f32,
    /// Largest magnitude in range
    pub peak: f32,
}

impl BandReading {
    /// Reading for an empty or degenerate range
    pub const ZERO: BandReading = BandReading {
        average: 0.0,
        peak: 0.0,
    };
}

/// Canonical frequency bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyBand {
    /// 20 - 250 Hz
    Bass,
    /// 250 - 2000 Hz
    Mid,
    /// 2000 - 20000 Hz (clamped to Nyquist)
    High,
}

impl FrequencyBand {
    /// All canonical bands, low to high
    pub const ALL: [FrequencyBand; 3] = [
        FrequencyBand::Bass,
        FrequencyBand::Mid,
        FrequencyBand::High,
    ];

    /// Frequency range in Hz as (low, high)
    pub fn range_hz(self) -> (f32, f32) {
        match self {
            FrequencyBand::Bass => (20.0, 250.0),
            FrequencyBand::Mid => (250.0, 2000.0),
            FrequencyBand::High => (2000.0, 20000.0),
        }
    }
}

/// Per-track readings computed once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackAnalysis {
    /// RMS energy of the whole spectrum
    pub intensity: f32,
    /// Bass band reading
    pub bass: BandReading,
    /// Mid band reading
    pub mid: BandReading,
    /// High band reading
    pub high: BandReading,
}

impl TrackAnalysis {
    /// Reading for one canonical band
    pub fn band(&self, band: FrequencyBand) -> BandReading {
        match band {
            FrequencyBand::Bass => self.bass,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::High => self.high,
        }
    }
}

#[inline]
fn sanitize(magnitude: f32) -> f32 {
    if magnitude.is_finite() {
        magnitude
    } else {
        0.0
    }
}

/// Extract the average and peak magnitude between `low_hz` and `high_hz`.
///
/// The bin range is inclusive on both ends. A degenerate range
/// (`low_bin >= high_bin` or `low_bin >= bin_count`) yields [`BandReading::ZERO`].
pub fn extract_band(spectrum: &[f32], sample_rate: f32, low_hz: f32, high_hz: f32) -> BandReading {
    let bin_count = spectrum.len();
    if bin_count == 0 || sample_rate.is_nan() || sample_rate <= 0.0 {
        return BandReading::ZERO;
    }

    let bin_width = sample_rate / (2.0 * bin_count as f32);
    let low_bin = (low_hz / bin_width).floor().max(0.0) as usize;
    let high_bin = ((high_hz / bin_width).floor().max(0.0) as usize).min(bin_count - 1);

    if low_bin >= high_bin || low_bin >= bin_count {
        return BandReading::ZERO;
    }

    let range = &spectrum[low_bin..=high_bin];
    let (sum, peak) = range.iter().fold((0.0f32, 0.0f32), |(sum, peak), &m| {
        let m = sanitize(m);
        (sum + m, peak.max(m))
    });

    BandReading {
        average: sum / range.len() as f32,
        peak,
    }
}

/// RMS energy of a spectrum: `sqrt(mean(m^2))`. Empty spectra yield 0.
pub fn intensity(spectrum: &[f32]) -> f32 {
    if spectrum.is_empty() {
        return 0.0;
    }
    // f64 accumulation keeps tiny magnitudes from squaring to zero
    let sum: f64 = spectrum
        .iter()
        .map(|&m| {
            let m = sanitize(m) as f64;
            m * m
        })
        .sum();
    (sum / spectrum.len() as f64).sqrt() as f32
}

/// Computes [`TrackAnalysis`] for spectra at a fixed sample rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandExtractor {
    sample_rate: f32,
}

impl BandExtractor {
    /// Create an extractor for the given sample rate in Hz
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Reading for one canonical band
    pub fn band(&self, spectrum: &[f32], band: FrequencyBand) -> BandReading {
        let (low, high) = band.range_hz();
        extract_band(spectrum, self.sample_rate, low, high)
    }

    /// Intensity and all canonical band readings for one track
    pub fn analyze(&self, spectrum: &[f32]) -> TrackAnalysis {
        TrackAnalysis {
            intensity: intensity(spectrum),
            bass: self.band(spectrum, FrequencyBand::Bass),
            mid: self.band(spectrum, FrequencyBand::Mid),
            high: self.band(spectrum, FrequencyBand::High),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spectrum_is_zero() {
        assert_eq!(extract_band(&[], 44100.0, 20.0, 250.0), BandReading::ZERO);
        assert_eq!(intensity(&[]), 0.0);
    }

    #[test]
    fn test_inverted_range_is_zero() {
        let spectrum = vec![1.0; 512];
        assert_eq!(
            extract_band(&spectrum, 44100.0, 2000.0, 250.0),
            BandReading::ZERO
        );
    }

    #[test]
    fn test_range_above_nyquist_is_zero() {
        let spectrum = vec![1.0; 512];
        assert_eq!(
            extract_band(&spectrum, 8000.0, 5000.0, 9000.0),
            BandReading::ZERO
        );
    }

    #[test]
    fn test_high_band_clamps_to_last_bin() {
        let mut spectrum = vec![0.0; 256];
        spectrum[255] = 4.0;
        // Nyquist is 11025 Hz, well below the 20 kHz band edge
        let reading = extract_band(&spectrum, 22050.0, 2000.0, 20000.0);
        assert_eq!(reading.peak, 4.0);
        assert!(reading.average > 0.0);
    }

    #[test]
    fn test_intensity_of_constant_spectrum() {
        let spectrum = vec![0.5; 1024];
        assert!((intensity(&spectrum) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_bins_read_as_silence() {
        let spectrum = vec![f32::NAN, f32::INFINITY, 0.0, 0.0];
        assert_eq!(intensity(&spectrum), 0.0);
        let reading = extract_band(&spectrum, 16.0, 0.0, 8.0);
        assert_eq!(reading, BandReading::ZERO);
    }
}
