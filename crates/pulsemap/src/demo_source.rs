//! Synthetic audio engine for headless runs
//!
//! Renders a short loop per track (kick, hats, pad), runs a windowed FFT over
//! each block and publishes the magnitudes into a [`SpectrumBank`]. It stands
//! in for a real player so the analysis loop has something to react to.

use pulsemap_core::SpectrumBank;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// FFT length; yields `FFT_SIZE / 2` bins per spectrum
pub const FFT_SIZE: usize = 4096;

/// Voices rendered by the demo, one per track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoVoice {
    /// Decaying low sine on every beat
    Kick,
    /// Short noise bursts on the off-beats
    HiHat,
    /// Slowly swelling mid-range chord
    Pad,
}

impl DemoVoice {
    /// Track layout of the demo
    pub const TRACKS: [DemoVoice; 3] = [DemoVoice::HiHat, DemoVoice::Kick, DemoVoice::Pad];

    fn sample(self, t: f32, beat: f32, rng: &mut StdRng) -> f32 {
        let phase = (t / beat).fract() * beat;
        match self {
            DemoVoice::Kick => {
                // Pitch drops from ~110 Hz to ~50 Hz over the hit
                let freq = 50.0 + 60.0 * (-phase * 30.0).exp();
                0.9 * (-phase * 8.0).exp() * (2.0 * PI * freq * phase).sin()
            }
            DemoVoice::HiHat => {
                let off = ((t + beat / 2.0) / beat).fract() * beat;
                let envelope = (-off * 60.0).exp();
                let noise: f32 = rng.random_range(-1.0..1.0);
                0.5 * envelope * noise
            }
            DemoVoice::Pad => {
                let swell = 0.5 - 0.5 * (2.0 * PI * t / (beat * 8.0)).cos();
                let chord = [440.0, 554.37, 659.25]
                    .iter()
                    .map(|f| (2.0 * PI * f * t).sin())
                    .sum::<f32>()
                    / 3.0;
                0.4 * swell * chord
            }
        }
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Windowed FFT producing normalized magnitudes
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Plan a forward FFT of `size` samples
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(size),
            window: (0..size).map(|i| hann_window(i, size)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); size],
        }
    }

    /// Magnitudes of the positive-frequency half, scaled so a full-scale
    /// sine reads about 0.5 after the window
    pub fn magnitudes(&mut self, samples: &[f32]) -> Vec<f32> {
        let size = self.buffer.len();
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 2.0 / size as f32;
        self.buffer[..size / 2]
            .iter()
            .map(|c| c.norm() * scale)
            .collect()
    }
}

/// Settings for the synthetic engine
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Sample rate used for synthesis and for bin spacing
    pub sample_rate: u32,
    /// Tempo of the loop
    pub bpm: f32,
    /// How often a fresh spectrum is published
    pub update_interval: Duration,
    /// RNG seed for the noise voice
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bpm: 120.0,
            update_interval: Duration::from_millis(20),
            seed: 7,
        }
    }
}

/// Render one block of `FFT_SIZE` samples ending at time `t`
fn render_block(voice: DemoVoice, end: f32, config: &DemoConfig, rng: &mut StdRng) -> Vec<f32> {
    let beat = 60.0 / config.bpm.max(1.0);
    let dt = 1.0 / config.sample_rate as f32;
    let start = end - FFT_SIZE as f32 * dt;
    (0..FFT_SIZE)
        .map(|i| voice.sample((start + i as f32 * dt).max(0.0), beat, rng))
        .collect()
}

/// Running synthetic engine. Dropping it stops the thread.
pub struct DemoSource {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DemoSource {
    /// Start publishing spectra for [`DemoVoice::TRACKS`] into `bank`
    pub fn spawn(config: DemoConfig, bank: Arc<SpectrumBank>) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let thread = thread::Builder::new()
            .name("demo-audio".to_string())
            .spawn(move || {
                info!(
                    "Demo audio started: {} tracks at {} BPM, {} Hz",
                    DemoVoice::TRACKS.len(),
                    config.bpm,
                    config.sample_rate
                );
                let mut analyzer = SpectrumAnalyzer::new(FFT_SIZE);
                let mut rng = StdRng::seed_from_u64(config.seed);
                let started = Instant::now();
                let mut blocks = 0u64;

                while flag.load(Ordering::Relaxed) {
                    let tick = Instant::now();
                    let now = started.elapsed().as_secs_f32();
                    for (track, voice) in DemoVoice::TRACKS.iter().enumerate() {
                        let samples = render_block(*voice, now, &config, &mut rng);
                        bank.publish(track, analyzer.magnitudes(&samples));
                    }
                    blocks += 1;

                    let elapsed = tick.elapsed();
                    if elapsed < config.update_interval {
                        thread::sleep(config.update_interval - elapsed);
                    }
                }
                debug!("Demo audio stopped after {} blocks", blocks);
            })?;

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    /// Stop the engine and wait for its thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Demo audio thread panicked");
            }
        }
    }
}

impl Drop for DemoSource {
    fn drop(&mut self) {
        self.stop();
    }
}
