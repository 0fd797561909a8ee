//! Analysis loop - fixed-cadence audio-to-parameter pipeline
//!
//! Each tick:
//! 1. apply queued configuration commands
//! 2. read the latest spectrum of every track (missing data reads as silence)
//! 3. compute intensity and Bass/Mid/High readings per track
//! 4. refresh every trigger
//! 5. evaluate every mapping
//! 6. publish a fresh [`ParameterFrame`]
//!
//! The loop owns its trigger registry and mapping state exclusively. Other
//! threads talk to it through a [`LoopController`], whose commands are
//! validated on send and applied at the start of the next tick.

use crate::audio::{BandExtractor, SpectrumSource, TrackAnalysis};
use crate::config::{EngineConfig, TransitionConfig, TransitionDrive};
use crate::error::{ConfigError, Result};
use crate::mapping::{MappingEngine, ParameterMapping};
use crate::parameters::ParameterSet;
use crate::snapshot::{snapshot_channel, ParameterFrame, SnapshotPublisher, SnapshotReader};
use crate::transition::{remap_progress, Transition};
use crate::trigger::{TriggerDefinition, TriggerRegistry};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Configuration change queued for the next tick
#[derive(Debug, Clone, PartialEq)]
pub enum LoopCommand {
    /// Add or reconfigure a trigger
    ConfigureTrigger(TriggerDefinition),
    /// Remove a trigger; mappings reading it fall back to zero signal
    RemoveTrigger(String),
    /// Push an intensity into a (manual) trigger
    SetManualIntensity {
        /// Trigger name
        trigger: String,
        /// New intensity
        intensity: f32,
    },
    /// Add a mapping, or replace one with the same id
    AddMapping(ParameterMapping),
    /// Remove a mapping
    RemoveMapping(Uuid),
    /// Enable or disable a mapping
    SetMappingEnabled {
        /// Mapping id
        id: Uuid,
        /// New state
        enabled: bool,
    },
    /// Replace the parameters used when no transition is configured
    SetBaseParameters(ParameterSet),
    /// Install or clear the preset transition
    SetTransition(Option<TransitionConfig>),
    /// Rewind the transition to progress 0 and resume its configured drive
    RestartTransition,
    /// Hold transition progress at a value until the next restart
    SetTransitionProgress(f32),
}

/// Loop counters shared with observers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    /// Ticks completed
    pub ticks: u64,
    /// Duration of the last tick in microseconds
    pub last_tick_micros: u64,
    /// Longest tick so far in microseconds
    pub max_tick_micros: u64,
    /// Commands that failed to apply
    pub rejected_commands: u64,
    /// Non-finite mapping results skipped
    pub mapping_faults: u64,
}

#[derive(Debug)]
struct TransitionState {
    transition: Transition,
    drive: TransitionDrive,
    smoothed: f32,
    needs_start: bool,
    // Set by SetTransitionProgress; the configured drive resumes on restart
    held: bool,
}

impl TransitionState {
    fn new(config: TransitionConfig) -> Self {
        Self {
            transition: Transition::new(config.start, config.end),
            drive: config.drive,
            smoothed: 0.0,
            needs_start: true,
            held: false,
        }
    }

    fn restart(&mut self, registry: &TriggerRegistry, now: Instant) {
        self.held = false;
        self.needs_start = true;
        self.smoothed = 0.0;
        self.transition.set_progress(0.0);
        self.advance(registry, now);
    }

    fn hold(&mut self, progress: f32) {
        self.held = true;
        self.transition.set_progress(progress);
    }

    fn advance(&mut self, registry: &TriggerRegistry, now: Instant) {
        if self.held {
            return;
        }
        match &self.drive {
            TransitionDrive::Timed { duration_secs } => {
                if self.needs_start {
                    self.transition
                        .start_at(TransitionDrive::duration(*duration_secs), now);
                    self.needs_start = false;
                }
            }
            TransitionDrive::Trigger {
                trigger,
                threshold,
                max,
                smoothing,
            } => {
                let intensity = registry.get(trigger).map_or(0.0, |t| t.intensity());
                let target = remap_progress(intensity, *threshold, *max);
                self.smoothed = self.smoothed * smoothing + target * (1.0 - smoothing);
                self.transition.set_progress(self.smoothed);
            }
            TransitionDrive::Manual => {}
        }
    }
}

/// Validated, thread-safe command sender for a running or pending loop
#[derive(Debug, Clone)]
pub struct LoopController {
    sender: Sender<LoopCommand>,
}

impl LoopController {
    fn send(&self, command: LoopCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| ConfigError::LoopStopped)
    }

    /// Add or reconfigure a trigger
    pub fn configure_trigger(&self, definition: TriggerDefinition) -> Result<()> {
        definition.validate()?;
        self.send(LoopCommand::ConfigureTrigger(definition))
    }

    /// Remove a trigger
    pub fn remove_trigger(&self, name: impl Into<String>) -> Result<()> {
        self.send(LoopCommand::RemoveTrigger(name.into()))
    }

    /// Push an intensity into a manual trigger
    pub fn set_manual_intensity(&self, trigger: impl Into<String>, intensity: f32) -> Result<()> {
        if !intensity.is_finite() {
            return Err(ConfigError::NonFinite("intensity"));
        }
        self.send(LoopCommand::SetManualIntensity {
            trigger: trigger.into(),
            intensity,
        })
    }

    /// Add a mapping; returns its id
    pub fn add_mapping(&self, mapping: ParameterMapping) -> Result<Uuid> {
        mapping.validate()?;
        let id = mapping.id;
        self.send(LoopCommand::AddMapping(mapping))?;
        Ok(id)
    }

    /// Remove a mapping
    pub fn remove_mapping(&self, id: Uuid) -> Result<()> {
        self.send(LoopCommand::RemoveMapping(id))
    }

    /// Enable or disable a mapping
    pub fn set_mapping_enabled(&self, id: Uuid, enabled: bool) -> Result<()> {
        self.send(LoopCommand::SetMappingEnabled { id, enabled })
    }

    /// Replace the base parameters
    pub fn set_base_parameters(&self, parameters: ParameterSet) -> Result<()> {
        self.send(LoopCommand::SetBaseParameters(parameters))
    }

    /// Install or clear the transition
    pub fn set_transition(&self, transition: Option<TransitionConfig>) -> Result<()> {
        if let Some(config) = &transition {
            config.validate()?;
        }
        self.send(LoopCommand::SetTransition(transition))
    }

    /// Rewind the transition and resume its configured drive
    pub fn restart_transition(&self) -> Result<()> {
        self.send(LoopCommand::RestartTransition)
    }

    /// Hold transition progress at a value until the next restart
    pub fn set_transition_progress(&self, progress: f32) -> Result<()> {
        self.send(LoopCommand::SetTransitionProgress(progress))
    }
}

/// Audio-reactive parameter engine
pub struct AnalysisLoop {
    source: Arc<dyn SpectrumSource>,
    extractor: BandExtractor,
    registry: TriggerRegistry,
    engine: MappingEngine,
    base: ParameterSet,
    transition: Option<TransitionState>,
    tick_interval: Duration,
    command_tx: Sender<LoopCommand>,
    command_rx: Receiver<LoopCommand>,
    publisher: SnapshotPublisher,
    stats: Arc<RwLock<LoopStats>>,
    tick: u64,
    analyses: Vec<TrackAnalysis>,
}

impl AnalysisLoop {
    /// Build a loop from a validated configuration
    pub fn new(config: &EngineConfig, source: Arc<dyn SpectrumSource>) -> Result<Self> {
        config.validate()?;

        let mut registry = TriggerRegistry::new();
        for definition in &config.triggers {
            registry.configure(definition.clone())?;
        }

        let mut engine = MappingEngine::new();
        for mapping in &config.mappings {
            engine.add(mapping.clone())?;
        }

        let (command_tx, command_rx) = unbounded();
        let (publisher, _) = snapshot_channel();

        debug!(
            "AnalysisLoop created: {} triggers, {} mappings, {} ms cadence",
            registry.len(),
            engine.len(),
            config.tick_interval_ms
        );

        Ok(Self {
            source,
            extractor: BandExtractor::new(config.sample_rate as f32),
            registry,
            engine,
            base: config.base,
            transition: config.transition.clone().map(TransitionState::new),
            tick_interval: config.tick_interval(),
            command_tx,
            command_rx,
            publisher,
            stats: Arc::new(RwLock::new(LoopStats::default())),
            tick: 0,
            analyses: Vec::new(),
        })
    }

    /// Command sender for this loop
    pub fn controller(&self) -> LoopController {
        LoopController {
            sender: self.command_tx.clone(),
        }
    }

    /// Reader for published frames
    pub fn reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    /// Trigger registry (loop-thread view)
    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Mapping engine (loop-thread view)
    pub fn engine(&self) -> &MappingEngine {
        &self.engine
    }

    /// Current counters
    pub fn stats(&self) -> LoopStats {
        *self.stats.read()
    }

    /// Configured cadence
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    fn apply_command(&mut self, command: LoopCommand, now: Instant) -> Result<()> {
        match command {
            LoopCommand::ConfigureTrigger(definition) => self.registry.configure(definition)?,
            LoopCommand::RemoveTrigger(name) => {
                self.registry.remove(&name);
            }
            LoopCommand::SetManualIntensity { trigger, intensity } => {
                self.registry.upsert(&trigger, intensity)
            }
            LoopCommand::AddMapping(mapping) => {
                self.engine.add(mapping)?;
            }
            LoopCommand::RemoveMapping(id) => {
                self.engine.remove(id)?;
            }
            LoopCommand::SetMappingEnabled { id, enabled } => {
                self.engine.set_enabled(id, enabled)?
            }
            LoopCommand::SetBaseParameters(parameters) => self.base = parameters,
            LoopCommand::SetTransition(config) => {
                self.transition = config.map(TransitionState::new);
            }
            LoopCommand::RestartTransition => {
                if let Some(state) = &mut self.transition {
                    state.restart(&self.registry, now);
                }
            }
            LoopCommand::SetTransitionProgress(progress) => {
                if let Some(state) = &mut self.transition {
                    state.hold(progress);
                }
            }
        }
        Ok(())
    }

    fn drain_commands(&mut self, now: Instant) -> u64 {
        let mut rejected = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            debug!("Applying {:?}", command);
            if let Err(e) = self.apply_command(command, now) {
                warn!("Rejected loop command: {}", e);
                rejected += 1;
            }
        }
        rejected
    }

    /// Run one tick now
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Run one tick with `now` as the clock for timed transitions
    pub fn tick_at(&mut self, now: Instant) {
        let started = Instant::now();
        let rejected = self.drain_commands(now);

        self.analyses.clear();
        for track in 0..self.source.track_count() {
            let analysis = self
                .source
                .spectrum(track)
                .map(|spectrum| self.extractor.analyze(spectrum.magnitudes()))
                .unwrap_or_default();
            self.analyses.push(analysis);
        }

        self.registry.refresh(&self.analyses);
        let values = self.engine.evaluate_all(&self.registry);

        let (mut parameters, transition_progress) = match &mut self.transition {
            Some(state) => {
                state.advance(&self.registry, now);
                (
                    state.transition.interpolated_at(now),
                    Some(state.transition.progress_at(now)),
                )
            }
            None => (self.base, None),
        };
        parameters.apply(&values);

        self.tick += 1;
        trace!(
            "Tick {}: {} tracks, {} triggers, {} values",
            self.tick,
            self.analyses.len(),
            self.registry.len(),
            values.len()
        );

        self.publisher.publish(ParameterFrame {
            tick: self.tick,
            values,
            parameters,
            triggers: self.registry.readings(),
            transition_progress,
        });

        let micros = started.elapsed().as_micros() as u64;
        let mut stats = self.stats.write();
        stats.ticks = self.tick;
        stats.last_tick_micros = micros;
        stats.max_tick_micros = stats.max_tick_micros.max(micros);
        stats.rejected_commands += rejected;
        stats.mapping_faults = self.engine.fault_count();
    }

    /// Move the loop onto its own thread and start ticking
    pub fn spawn(mut self) -> std::io::Result<LoopHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let controller = self.controller();
        let reader = self.reader();
        let stats = self.stats.clone();
        let flag = running.clone();

        let thread = thread::Builder::new()
            .name("analysis-loop".to_string())
            .spawn(move || {
                info!(
                    "Analysis loop started ({} ms cadence)",
                    self.tick_interval.as_millis()
                );
                while flag.load(Ordering::Relaxed) {
                    let start = Instant::now();
                    self.tick_at(start);

                    let elapsed = start.elapsed();
                    if elapsed < self.tick_interval {
                        thread::sleep(self.tick_interval - elapsed);
                    }
                }
                info!("Analysis loop stopped after {} ticks", self.tick);
            })?;

        Ok(LoopHandle {
            running,
            thread: Some(thread),
            controller,
            reader,
            stats,
        })
    }
}

/// Handle to a loop running on its own thread. Dropping it stops the loop.
pub struct LoopHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    controller: LoopController,
    reader: SnapshotReader,
    stats: Arc<RwLock<LoopStats>>,
}

impl LoopHandle {
    /// Command sender
    pub fn controller(&self) -> &LoopController {
        &self.controller
    }

    /// Frame reader
    pub fn reader(&self) -> &SnapshotReader {
        &self.reader
    }

    /// Current counters
    pub fn stats(&self) -> LoopStats {
        *self.stats.read()
    }

    /// Whether the loop thread is still ticking
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal stop and wait for the in-flight tick to finish
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Analysis loop thread panicked");
            }
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
