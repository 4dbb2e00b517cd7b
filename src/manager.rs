//! Engine orchestration.
//!
//! The [`Manager`] owns one instance of every engine component behind a
//! single lock and exposes the engine's public operations. Two periodic
//! background tasks keep the link plausible: cover-traffic generation on
//! the active profile's probing interval, and adaptive profile switching
//! driven by the classifier's view of recently observed cell sizes.
//!
//! No operation blocks: `get_outbound_traffic` and `read_application_data`
//! return immediately with a "nothing ready" result, leaving the polling
//! cadence to the caller (typically the carrying transport's send loop).

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::classifier::HmmClassifier;
use crate::error::Result;
use crate::framing::{Cell, CellType, Framer, Reassembler};
use crate::profile::{Profile, TrafficClass};
use crate::scheduler::Scheduler;

/// Configuration for the engine orchestrator.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Traffic profile active at startup
    pub profile: Profile,
    /// Cadence of the adaptive re-classification task
    pub adaptive_interval: Duration,
    /// Observations required before a prediction is attempted
    pub min_observations: usize,
    /// Cap on the retained observation history (oldest dropped first)
    pub max_observations: usize,
    /// Train the classifier on the outgoing profile's history when switching
    pub train_on_switch: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            profile: Profile::dynamic(),
            adaptive_interval: Duration::from_secs(5),
            min_observations: 10,
            max_observations: 256,
            train_on_switch: true,
        }
    }
}

/// All mutable engine state, guarded by the manager's single lock.
struct EngineState {
    profile: Profile,
    framer: Framer,
    scheduler: Scheduler,
    reassembler: Reassembler,
    classifier: HmmClassifier,
    inbound: BytesMut,
    observations: Vec<usize>,
    last_switch: Instant,
}

impl EngineState {
    fn new(profile: Profile) -> Self {
        Self {
            framer: Framer::new(profile.clone()),
            scheduler: Scheduler::new(&profile),
            reassembler: Reassembler::new(),
            classifier: HmmClassifier::new(),
            inbound: BytesMut::new(),
            observations: Vec::new(),
            last_switch: Instant::now(),
            profile,
        }
    }

    fn record_observation(&mut self, payload_len: usize, cap: usize) {
        self.observations.push(HmmClassifier::discretize(payload_len));
        if self.observations.len() > cap {
            let excess = self.observations.len() - cap;
            self.observations.drain(..excess);
        }
    }

    fn switch_profile(&mut self, profile: Profile, train_on_switch: bool) {
        if train_on_switch && !self.observations.is_empty() {
            let outgoing = self.profile.primary_class();
            if let Err(err) = self.classifier.train(&self.observations, outgoing) {
                warn!(%err, "classifier training skipped");
            }
            self.observations.clear();
        }

        debug!(
            from = ?self.profile.primary_class(),
            to = ?profile.primary_class(),
            "switching traffic profile"
        );
        self.framer.set_profile(profile.clone());
        self.scheduler.set_profile(&profile);
        self.profile = profile;
        self.last_switch = Instant::now();
    }
}

/// Orchestrates the obfuscation engine.
///
/// All public operations are safe to call concurrently; each acquires the
/// single engine lock for its full critical section and never holds it
/// across an await point.
pub struct Manager {
    state: Arc<Mutex<EngineState>>,
    config: ManagerConfig,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Manager {
    /// Create an engine with the given configuration.
    ///
    /// Background tasks are not started until [`Manager::start`].
    pub fn new(config: ManagerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(EngineState::new(config.profile.clone()))),
            config,
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Spawn the cover-traffic and adaptive-profiling tasks.
    ///
    /// Must be called within a Tokio runtime. Calling it again while the
    /// tasks are running has no effect.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }
        self.tasks.push(self.spawn_cover_traffic());
        self.tasks.push(self.spawn_adaptive_profiling());
    }

    /// Stop both background tasks and wait for them to exit.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }

    /// Fragment application data and queue the resulting cells for sending.
    ///
    /// Always accepts the full input; the transmission queue is unbounded.
    pub fn queue_application_data(&self, data: &[u8]) {
        let mut engine = self.state.lock();
        let cells = engine.framer.fragment(data);
        trace!(bytes = data.len(), cells = cells.len(), "queueing application data");
        for cell in cells {
            engine.record_observation(cell.payload.len(), self.config.max_observations);
            engine.scheduler.schedule_cell(cell);
        }
    }

    /// Pull the next eligible outbound cell, encoded for the carrying
    /// transport.
    ///
    /// `Ok(None)` is the normal "nothing eligible right now" signal, not
    /// an error; poll again later.
    pub fn get_outbound_traffic(&self) -> Result<Option<Bytes>> {
        let mut engine = self.state.lock();
        match engine.scheduler.next_cell() {
            Some(cell) => Ok(Some(cell.encode()?)),
            None => Ok(None),
        }
    }

    /// Decode one inbound cell and feed it through reassembly.
    ///
    /// Data cells are recorded as classifier observations; a completed
    /// message lands in the inbound buffer for
    /// [`Manager::read_application_data`]. Out-of-window cells are dropped
    /// without surfacing an error — they must not produce observable
    /// signal — while undecodable input is reported to the caller.
    /// Non-data cells are accepted and otherwise ignored.
    pub fn process_inbound_traffic(&self, data: &[u8]) -> Result<()> {
        let cell = Cell::decode(Bytes::copy_from_slice(data))?;

        let mut engine = self.state.lock();
        if cell.cell_type != CellType::Data {
            trace!(cell_type = ?cell.cell_type, "ignoring non-data cell");
            return Ok(());
        }

        engine.record_observation(cell.payload.len(), self.config.max_observations);
        match engine.reassembler.process_cell(&cell) {
            Ok(Some(message)) => engine.inbound.put_slice(&message),
            Ok(None) => {}
            Err(err) => debug!(%err, "dropping cell"),
        }
        Ok(())
    }

    /// Drain all reassembled application data received so far.
    ///
    /// Returns an empty buffer when nothing is available.
    pub fn read_application_data(&self) -> Bytes {
        let mut engine = self.state.lock();
        engine.inbound.split().freeze()
    }

    /// Swap the active traffic profile.
    ///
    /// Takes effect on subsequently produced cells only; cells already
    /// queued keep their shapes and send times.
    pub fn set_profile(&self, profile: Profile) {
        self.state
            .lock()
            .switch_profile(profile, self.config.train_on_switch);
    }

    /// Primary traffic class of the active profile.
    pub fn active_class(&self) -> TrafficClass {
        self.state.lock().profile.primary_class()
    }

    /// Number of cells queued for transmission.
    pub fn pending_cells(&self) -> usize {
        self.state.lock().scheduler.len()
    }

    /// Smoothed load estimate of the active profile.
    pub fn current_load(&self) -> f64 {
        self.state.lock().framer.profile().load()
    }

    /// Time elapsed since the profile last changed.
    pub fn since_last_switch(&self) -> Duration {
        self.state.lock().last_switch.elapsed()
    }

    fn spawn_cover_traffic(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let mut stop = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                // Re-read every round so profile switches take effect.
                let interval = state.lock().profile.probing_interval;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let mut engine = state.lock();
                        let cell = engine.framer.dummy_cell();
                        trace!(size = cell.wire_size(), "scheduling cover cell");
                        engine.scheduler.schedule_cell(cell);
                    }
                    _ = stop.changed() => break,
                }
            }
        })
    }

    fn spawn_adaptive_profiling(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let mut stop = self.shutdown.subscribe();
        let interval = self.config.adaptive_interval;
        let min_observations = self.config.min_observations;
        let train_on_switch = self.config.train_on_switch;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut engine = state.lock();
                        if engine.observations.len() < min_observations {
                            continue;
                        }
                        match engine.classifier.predict(&engine.observations) {
                            Ok(predicted) if predicted != engine.profile.primary_class() => {
                                debug!(?predicted, "adaptive reclassification");
                                engine.switch_profile(Profile::for_class(predicted), train_on_switch);
                            }
                            Ok(_) => {}
                            Err(err) => trace!(%err, "prediction skipped"),
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
        })
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}
