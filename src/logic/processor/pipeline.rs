//! Event Processing Loop
//!
//! Per event: feed the rate window, run the threshold check on the window
//! counts, and only if that stays quiet run the ordered-sequence check on the
//! event's source. With profiles on, the per-source rules come next, then the
//! type-baseline spike and off-hours rules. A failure on one event is logged
//! and the loop moves on.
//!
//! Idle profiles are swept on a fixed interval, so steady traffic cannot
//! starve the TTL.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::types::{ProcessorConfig, ProcessorSnapshot, ProcessorState};
use crate::logic::error::{DetectError, DetectResult};
use crate::logic::event::{Event, EventType};
use crate::logic::incident::Incident;
use crate::logic::profile::{local_hour, ProfileTracker, SourceProfile};
use crate::logic::rate::RateTracker;
use crate::logic::sequence::SequenceMatcher;

/// Queued snapshot/profile requests before senders wait
const COMMAND_BUFFER: usize = 16;

/// Seconds since the Unix epoch, millisecond resolution
pub fn wall_clock() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1_000.0
}

enum Command {
    Snapshot(oneshot::Sender<ProcessorSnapshot>),
    Profile(String, oneshot::Sender<Option<SourceProfile>>),
}

enum Step {
    Shutdown,
    Command(Command),
    Event(Event),
    Tick,
    Idle,
    Closed,
}

// ============================================================================
// HANDLE
// ============================================================================

/// Cloneable control surface for a processor owned by another task
#[derive(Clone)]
pub struct ProcessorHandle {
    shutdown: Arc<watch::Sender<bool>>,
    commands: mpsc::Sender<Command>,
    state: Arc<RwLock<ProcessorState>>,
}

impl ProcessorHandle {
    /// Request shutdown. An idle processor goes straight to `Stopped`.
    pub fn stop(&self) {
        {
            let mut state = self.state.write();
            if *state == ProcessorState::Idle {
                *state = ProcessorState::Stopped;
            }
        }
        self.shutdown.send_replace(true);
    }

    pub fn state(&self) -> ProcessorState {
        *self.state.read()
    }

    pub async fn snapshot(&self) -> DetectResult<ProcessorSnapshot> {
        self.request(Command::Snapshot).await
    }

    pub async fn profile(&self, source_ip: &str) -> DetectResult<Option<SourceProfile>> {
        let ip = source_ip.to_string();
        self.request(move |tx| Command::Profile(ip, tx)).await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> DetectResult<T> {
        let state = self.state();
        if state != ProcessorState::Running {
            return Err(DetectError::InvalidState {
                expected: ProcessorState::Running.as_str(),
                actual: state.as_str(),
            });
        }

        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| DetectError::ChannelClosed)?;
        rx.await.map_err(|_| DetectError::ChannelClosed)
    }
}

// ============================================================================
// PROCESSOR
// ============================================================================

pub struct EventProcessor {
    inbound: mpsc::Receiver<Event>,
    outbound: mpsc::Sender<Incident>,
    rate: RateTracker,
    sequence: SequenceMatcher,
    profiles: Option<ProfileTracker>,
    config: ProcessorConfig,
    clock: fn() -> f64,
    hour: fn() -> u32,

    handle: ProcessorHandle,
    shutdown: watch::Receiver<bool>,
    commands: mpsc::Receiver<Command>,

    processed: u64,
    incidents: u64,
    failed: u64,
}

impl EventProcessor {
    pub fn new(
        inbound: mpsc::Receiver<Event>,
        outbound: mpsc::Sender<Incident>,
        rate: RateTracker,
        sequence: SequenceMatcher,
    ) -> Self {
        let config = ProcessorConfig::default();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        Self {
            inbound,
            outbound,
            rate,
            sequence,
            profiles: None,
            config,
            clock: wall_clock,
            hour: local_hour,
            handle: ProcessorHandle {
                shutdown: Arc::new(shutdown_tx),
                commands: command_tx,
                state: Arc::new(RwLock::new(ProcessorState::Idle)),
            },
            shutdown: shutdown_rx,
            commands: command_rx,
            processed: 0,
            incidents: 0,
            failed: 0,
        }
    }

    /// Apply a config; `enable_profiles` installs a default tracker if none is set
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        if config.enable_profiles && self.profiles.is_none() {
            self.profiles = Some(ProfileTracker::default());
        }
        self.config = config;
        self
    }

    pub fn with_profiles(mut self, profiles: ProfileTracker) -> Self {
        self.profiles = Some(profiles);
        self.config.enable_profiles = true;
        self
    }

    /// Replace the arrival-time source
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the local-hour source used by the off-hours rule
    pub fn with_hour_source(mut self, hour: fn() -> u32) -> Self {
        self.hour = hour;
        self
    }

    pub fn handle(&self) -> ProcessorHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ProcessorState {
        self.handle.state()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    // ========================================================================
    // LOOP
    // ========================================================================

    /// Run until stopped or until every inbound sender is dropped
    pub async fn start(&mut self) -> DetectResult<()> {
        self.transition(ProcessorState::Idle, ProcessorState::Running)?;
        log::info!(
            "[Processor] Monitoring events (poll {}ms, profiles {})",
            self.config.poll_interval_ms,
            if self.profiles.is_some() { "on" } else { "off" }
        );

        let poll = self.config.poll_interval();
        let mut sweep = interval(self.config.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let step = tokio::select! {
                biased;
                _ = self.shutdown.changed() => Step::Shutdown,
                Some(cmd) = self.commands.recv() => Step::Command(cmd),
                _ = sweep.tick() => Step::Tick,
                received = timeout(poll, self.inbound.recv()) => match received {
                    Ok(Some(event)) => Step::Event(event),
                    Ok(None) => Step::Closed,
                    Err(_) => Step::Idle,
                },
            };

            match step {
                Step::Shutdown => continue,
                Step::Command(cmd) => self.answer(cmd),
                Step::Event(event) => self.consume(event).await,
                Step::Tick => self.housekeeping(),
                Step::Idle => {}
                Step::Closed => {
                    log::info!("[Processor] Inbound channel closed");
                    break;
                }
            }
        }

        *self.handle.state.write() = ProcessorState::Stopped;
        self.commands.close();
        while self.commands.try_recv().is_ok() {}

        log::info!(
            "[Processor] Stopped ({} processed, {} incidents, {} failed)",
            self.processed,
            self.incidents,
            self.failed
        );
        Ok(())
    }

    fn transition(&self, from: ProcessorState, to: ProcessorState) -> DetectResult<()> {
        let mut state = self.handle.state.write();
        if *state != from {
            return Err(DetectError::InvalidState {
                expected: from.as_str(),
                actual: state.as_str(),
            });
        }
        *state = to;
        Ok(())
    }

    async fn consume(&mut self, event: Event) {
        let now = (self.clock)();
        match self.process_event(event, now) {
            Ok(Some(incident)) => {
                log::warn!(
                    "[Processor] {} ({}): {}",
                    incident.threat_type,
                    incident.severity,
                    incident.reason
                );
                self.incidents += 1;
                if self.outbound.send(incident).await.is_err() {
                    log::error!("[Processor] Incident dropped: outbound channel closed");
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.failed += 1;
                log::error!("[Processor] Error processing event: {}", e);
            }
        }
    }

    fn housekeeping(&mut self) {
        if let Some(profiles) = self.profiles.as_mut() {
            profiles.sweep((self.clock)());
        }
    }

    fn answer(&mut self, cmd: Command) {
        let now = (self.clock)();
        match cmd {
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot(now));
            }
            Command::Profile(ip, reply) => {
                let profile = self.profiles.as_ref().and_then(|p| p.profile(&ip).cloned());
                let _ = reply.send(profile);
            }
        }
    }

    fn snapshot(&mut self, now: f64) -> ProcessorSnapshot {
        ProcessorSnapshot {
            state: self.state(),
            window_counts: self.rate.event_counts(now),
            window_total: self.rate.total(now),
            processed: self.processed,
            incidents: self.incidents,
            failed: self.failed,
            profiles: self.profiles.as_ref().map_or(0, |p| p.len()),
        }
    }

    // ========================================================================
    // PER-EVENT
    // ========================================================================

    /// One step of the pipeline for an event arriving at `now`.
    /// Returns at most one incident.
    pub fn process_event(&mut self, event: Event, now: f64) -> DetectResult<Option<Incident>> {
        event.validate()?;
        self.processed += 1;

        if let Some(profiles) = self.profiles.as_mut() {
            profiles.observe(&event, now);
        }

        let source = event.source_ip.clone();
        self.rate.add(event, now);

        let counts = self.rate.event_counts(now);
        if let Some(incident) = self.sequence.check_thresholds(&counts) {
            return Ok(Some(incident));
        }

        if let Some(ip) = source.as_deref() {
            let recent = self.rate.events_by_source(ip, now);
            if recent.len() >= 2 {
                if let Some(incident) = self.sequence.check_events(&recent) {
                    return Ok(Some(incident));
                }
            }
        }

        Ok(self.check_profiles(source.as_deref(), &counts, now))
    }

    /// Per-source rules, then the spike and off-hours rules over all traffic
    fn check_profiles(
        &self,
        source: Option<&str>,
        counts: &BTreeMap<EventType, usize>,
        now: f64,
    ) -> Option<Incident> {
        let profiles = self.profiles.as_ref()?;
        source
            .and_then(|ip| profiles.check_source(ip, now))
            .or_else(|| profiles.check_spike(counts, now))
            .or_else(|| profiles.check_off_hours((self.hour)(), now))
    }
}
