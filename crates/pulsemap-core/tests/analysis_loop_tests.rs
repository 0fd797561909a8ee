//! End-to-end tests for the analysis loop, driven tick by tick and threaded

use pulsemap_core::{
    AnalysisLoop, AudioSignal, ConfigError, EngineConfig, ParameterMapping, ParameterName,
    ParameterSet, SpectrumBank, TransitionConfig, TransitionDrive, TriggerDefinition,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const BINS: usize = 2048;

/// Helper to wait for a condition with timeout
fn wait_for_condition<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::yield_now();
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn spectrum_with_bass_peak(peak: f32) -> Vec<f32> {
    let mut magnitudes = vec![0.0; BINS];
    // ~54 Hz at 44.1 kHz, inside the bass band
    magnitudes[5] = peak;
    magnitudes
}

fn bass_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.triggers.push(TriggerDefinition::audio(
        "Bass1Mid63",
        1,
        AudioSignal::BassPeak,
        0.63,
    ));
    config
}

#[test]
fn test_trigger_sequence_through_loop() {
    let bank = Arc::new(SpectrumBank::with_tracks(2, BINS));
    let mut analysis = AnalysisLoop::new(&bass_config(), bank.clone()).unwrap();
    let reader = analysis.reader();

    let mut activity = Vec::new();
    for peak in [0.5, 0.7, 0.4] {
        bank.publish(1, spectrum_with_bass_peak(peak));
        analysis.tick();
        let frame = reader.latest();
        let reading = frame.trigger("Bass1Mid63").unwrap();
        assert!((reading.intensity - peak).abs() < 1e-6);
        activity.push(reading.active);
    }

    assert_eq!(activity, vec![false, true, false]);
    assert_eq!(reader.tick(), 3);
}

#[test]
fn test_inertia_mapping_rides_on_base_parameters() {
    let mut config = bass_config();
    config.mappings.push(ParameterMapping::inertia(
        ParameterName::ZoomScale,
        "Bass1Mid63",
        0.9,
        2.0,
        0.0,
        5.0,
    ));
    let bank = Arc::new(SpectrumBank::with_tracks(2, BINS));
    bank.publish(1, spectrum_with_bass_peak(1.0));

    let mut analysis = AnalysisLoop::new(&config, bank).unwrap();
    let reader = analysis.reader();
    let id = analysis.engine().mappings().next().unwrap().id;
    assert_eq!(analysis.engine().state(id), Some(0.0));

    analysis.tick();
    assert!((analysis.engine().state(id).unwrap() - 0.2).abs() < 1e-6);
    let frame = reader.latest();
    let zoom = frame.value(ParameterName::ZoomScale).unwrap();
    assert!((zoom - 0.2).abs() < 1e-6);
    assert_eq!(frame.parameters.zoom_scale, zoom);
    // Unmapped fields keep their base value
    assert_eq!(frame.parameters.contrast, ParameterSet::default().contrast);

    for _ in 0..300 {
        analysis.tick();
    }
    let settled = reader.latest().parameters.zoom_scale;
    assert!((settled - 2.0).abs() < 1e-3);
}

#[test]
fn test_timed_transition_follows_clock() {
    let end = ParameterSet {
        zoom_scale: 3.0,
        ..ParameterSet::default()
    };
    let config = EngineConfig {
        transition: Some(TransitionConfig {
            start: ParameterSet::default(),
            end,
            drive: TransitionDrive::Timed { duration_secs: 2.0 },
        }),
        ..Default::default()
    };
    let mut analysis = AnalysisLoop::new(&config, Arc::new(SpectrumBank::new())).unwrap();
    let reader = analysis.reader();

    let t0 = Instant::now();
    analysis.tick_at(t0);
    assert_eq!(reader.latest().transition_progress, Some(0.0));
    assert_eq!(reader.latest().parameters, ParameterSet::default());

    analysis.tick_at(t0 + Duration::from_secs(1));
    let frame = reader.latest();
    assert_eq!(frame.transition_progress, Some(0.5));
    assert!((frame.parameters.zoom_scale - 2.0).abs() < 1e-6);

    analysis.tick_at(t0 + Duration::from_secs(3));
    let frame = reader.latest();
    assert_eq!(frame.transition_progress, Some(1.0));
    assert_eq!(frame.parameters, end);
}

#[test]
fn test_restart_rewinds_timed_transition() {
    let config = EngineConfig {
        transition: Some(TransitionConfig {
            start: ParameterSet::default(),
            end: ParameterSet::default(),
            drive: TransitionDrive::Timed { duration_secs: 2.0 },
        }),
        ..Default::default()
    };
    let mut analysis = AnalysisLoop::new(&config, Arc::new(SpectrumBank::new())).unwrap();
    let reader = analysis.reader();

    let t0 = Instant::now();
    analysis.tick_at(t0);
    analysis.tick_at(t0 + Duration::from_secs(5));
    assert_eq!(reader.latest().transition_progress, Some(1.0));

    analysis.controller().restart_transition().unwrap();
    analysis.tick_at(t0 + Duration::from_secs(6));
    assert_eq!(reader.latest().transition_progress, Some(0.0));
}

#[test]
fn test_restart_resumes_drive_after_held_progress() {
    let config = EngineConfig {
        transition: Some(TransitionConfig {
            start: ParameterSet::default(),
            end: ParameterSet::default(),
            drive: TransitionDrive::Timed { duration_secs: 2.0 },
        }),
        ..Default::default()
    };
    let mut analysis = AnalysisLoop::new(&config, Arc::new(SpectrumBank::new())).unwrap();
    let reader = analysis.reader();
    let controller = analysis.controller();

    let t0 = Instant::now();
    analysis.tick_at(t0);
    controller.set_transition_progress(0.8).unwrap();
    analysis.tick_at(t0 + Duration::from_millis(100));
    analysis.tick_at(t0 + Duration::from_secs(5));
    assert_eq!(reader.latest().transition_progress, Some(0.8));

    controller.restart_transition().unwrap();
    let t1 = t0 + Duration::from_secs(10);
    analysis.tick_at(t1);
    assert_eq!(reader.latest().transition_progress, Some(0.0));

    analysis.tick_at(t1 + Duration::from_secs(1));
    assert_eq!(reader.latest().transition_progress, Some(0.5));
}

#[test]
fn test_trigger_window_drives_transition() {
    let mut config = EngineConfig::default();
    config.triggers.push(TriggerDefinition::manual("pad", 0.0));
    config.transition = Some(TransitionConfig {
        start: ParameterSet::default(),
        end: ParameterSet {
            spin_amount: 1.25,
            ..ParameterSet::default()
        },
        drive: TransitionDrive::Trigger {
            trigger: "pad".to_string(),
            threshold: 0.2,
            max: 0.6,
            smoothing: 0.0,
        },
    });
    let mut analysis = AnalysisLoop::new(&config, Arc::new(SpectrumBank::new())).unwrap();
    let reader = analysis.reader();
    let controller = analysis.controller();

    controller.set_manual_intensity("pad", 0.4).unwrap();
    analysis.tick();
    let frame = reader.latest();
    let progress = frame.transition_progress.unwrap();
    assert!((progress - 0.5).abs() < 1e-5);
    assert!((frame.parameters.spin_amount - 0.75).abs() < 1e-5);

    controller.set_manual_intensity("pad", 0.1).unwrap();
    analysis.tick();
    assert_eq!(reader.latest().transition_progress, Some(0.0));
}

#[test]
fn test_disabled_mapping_is_skipped() {
    let mut config = EngineConfig::default();
    config.triggers.push(TriggerDefinition::manual("fader", 0.0));
    let mut analysis = AnalysisLoop::new(&config, Arc::new(SpectrumBank::new())).unwrap();
    let reader = analysis.reader();
    let controller = analysis.controller();

    let id = controller
        .add_mapping(ParameterMapping::set_value(
            ParameterName::ParallaxX,
            "fader",
            1.0,
            -1.0,
            1.0,
        ))
        .unwrap();
    controller.set_manual_intensity("fader", 0.6).unwrap();
    analysis.tick();
    assert_eq!(reader.latest().value(ParameterName::ParallaxX), Some(0.6));

    controller.set_mapping_enabled(id, false).unwrap();
    analysis.tick();
    let frame = reader.latest();
    assert_eq!(frame.value(ParameterName::ParallaxX), None);
    assert_eq!(frame.parameters.parallax_x, 0.0);
}

#[test]
fn test_spawned_loop_publishes_and_stops() {
    let mut config = bass_config();
    config.tick_interval_ms = 2;
    config.mappings.push(ParameterMapping::set_value(
        ParameterName::Contrast,
        "Bass1Mid63",
        4.0,
        0.0,
        10.0,
    ));
    let bank = Arc::new(SpectrumBank::with_tracks(2, BINS));
    let analysis = AnalysisLoop::new(&config, bank.clone()).unwrap();
    let mut handle = analysis.spawn().unwrap();
    assert!(handle.is_running());

    bank.publish(1, spectrum_with_bass_peak(0.9));
    let reader = handle.reader().clone();
    let updated = wait_for_condition(Duration::from_secs(2), || {
        reader
            .latest()
            .value(ParameterName::Contrast)
            .is_some_and(|v| (v - 3.6).abs() < 1e-5)
    });
    assert!(updated, "loop never published the mapped value");
    assert!(handle.stats().ticks > 0);

    let controller = handle.controller().clone();
    handle.stop();
    assert!(!handle.is_running());
    assert!(matches!(
        controller.set_manual_intensity("Bass1Mid63", 1.0),
        Err(ConfigError::LoopStopped)
    ));
}
