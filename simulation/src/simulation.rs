//! Deterministic simulation engine for Arbor
//!
//! Messages travel through a single FIFO queue. Every message produced
//! while handling round *k* is appended behind all of round *k*'s
//! messages, so delivery proceeds in synchronous rounds and a run is
//! fully reproducible.
//!
//! A run is a sequence of phases:
//! - phase 0: every switch announces itself as root, in ascending ID
//!   order, and the queue drains
//! - one phase per dropped switch: the switch leaves the topology, its
//!   former neighbours are told in ascending order, every surviving
//!   switch restarts from the root assumption, the network is reseeded
//!   with a fresh TTL, and the queue drains
//!
//! Messages still queued when a switch is dropped carry views from the
//! previous phase and are discarded.

use std::collections::{BTreeMap, VecDeque};

use arbor_core::{ConfigMessage, ScenarioError, SwitchId, TopologyError};
use arbor_switch::{ProcessOutcome, Switch, SwitchSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::scenarios::Scenario;
use crate::topology::Topology;
use crate::types::{SimEvent, SimStats};

/// Configuration for the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Lifetime, in hops, of every message a switch originates
    pub ttl: u32,
    /// Record a `Delivered` event for every message
    pub trace_messages: bool,
    /// Maximum events kept in the event log; the oldest are evicted
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ttl: 16,
            trace_messages: false,
            max_events: 10_000,
        }
    }
}

impl SimConfig {
    /// Default configuration with the given TTL
    pub fn with_ttl(ttl: u32) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    /// Record every delivery in the event log
    pub fn with_message_trace(mut self, enabled: bool) -> Self {
        self.trace_messages = enabled;
        self
    }
}

/// Serializable summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub phase: u32,
    pub ttl: u32,
    pub log_lines: Vec<String>,
    pub switches: Vec<SwitchSnapshot>,
    pub stats: SimStats,
}

/// The simulation state
#[derive(Debug)]
pub struct Simulation {
    topology: Topology,
    switches: BTreeMap<SwitchId, Switch>,
    queue: VecDeque<ConfigMessage>,
    /// Configuration
    pub config: SimConfig,
    phase: u32,
    /// Recent events, oldest first
    pub event_log: VecDeque<SimEvent>,
    /// Statistics
    pub stats: SimStats,
    run_id: Uuid,
    delivered_in_phase: u64,
}

impl Simulation {
    /// Create a simulation with one switch per topology entry
    pub fn new(topology: Topology, config: SimConfig) -> Self {
        let switches = topology
            .iter()
            .map(|(id, neighbors)| (id, Switch::new(id, neighbors.iter().copied())))
            .collect();
        Self {
            topology,
            switches,
            queue: VecDeque::new(),
            config,
            phase: 0,
            event_log: VecDeque::new(),
            stats: SimStats::default(),
            run_id: Uuid::new_v4(),
            delivered_in_phase: 0,
        }
    }

    /// Create a simulation for a scenario, taking the TTL from it
    pub fn from_scenario(scenario: &Scenario, config: SimConfig) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let config = SimConfig {
            ttl: scenario.ttl,
            ..config
        };
        Ok(Self::new(scenario.topology.clone(), config))
    }

    /// Every switch announces itself as root, lowest ID first
    pub fn seed(&mut self) {
        let ttl = self.config.ttl;
        let mut messages = 0;
        for switch in self.switches.values() {
            messages += switch.announce(ttl, &mut self.queue);
        }
        self.stats.messages_sent += messages as u64;
        info!(run = %self.run_id, switches = self.switches.len(), messages, ttl, "Seeded simulation");
        self.emit_event(SimEvent::Seeded {
            phase: self.phase,
            messages,
        });
    }

    /// Deliver the message at the head of the queue
    ///
    /// Returns `None` once the queue is empty. A message whose origin or
    /// destination has been dropped is discarded and yields an empty
    /// outcome.
    pub fn step(&mut self) -> Option<ProcessOutcome> {
        let msg = self.queue.pop_front()?;

        if !self.switches.contains_key(&msg.origin) || !self.switches.contains_key(&msg.destination)
        {
            return Some(self.discard(msg));
        }
        let switch = self.switches.get_mut(&msg.destination)?;

        let destination = msg.destination;
        let run_id = self.run_id;
        let outcome = arbor_logging::with_switch_context!(destination, run_id, {
            switch.process_message(msg, &mut self.queue)
        });
        let view = switch.view();

        self.stats.messages_delivered += 1;
        self.delivered_in_phase += 1;
        self.stats.record(&outcome);

        if self.config.trace_messages {
            self.emit_event(SimEvent::Delivered {
                phase: self.phase,
                message: msg,
                change: outcome.change,
                sent: outcome.sent,
            });
        }
        if outcome.view_changed() {
            self.emit_event(SimEvent::ViewChanged {
                phase: self.phase,
                switch: destination,
                root: view.root,
                distance: view.distance,
                next_hop: view.next_hop,
                change: outcome.change,
            });
        }
        Some(outcome)
    }

    /// Deliver messages until none is in flight
    ///
    /// Terminates because every message carries a finite TTL. Returns the
    /// number of messages delivered.
    pub fn run_until_quiescent(&mut self) -> u64 {
        let before = self.stats.messages_delivered;
        while self.step().is_some() {}
        let delivered = self.stats.messages_delivered - before;
        debug!(phase = self.phase, delivered = self.delivered_in_phase, "Queue drained");
        self.emit_event(SimEvent::Quiescent {
            phase: self.phase,
            delivered: self.delivered_in_phase,
        });
        delivered
    }

    /// Remove a switch and start a new phase
    ///
    /// Queued messages are discarded, former neighbours are told in
    /// ascending ID order, and every surviving switch restarts and
    /// announces itself again. Returns the notified neighbours.
    pub fn drop_switch(&mut self, id: SwitchId) -> Result<Vec<SwitchId>, TopologyError> {
        let notified = self.topology.remove_switch(id)?;
        self.switches.remove(&id);
        self.phase += 1;
        self.delivered_in_phase = 0;
        self.stats.switches_dropped += 1;
        info!(run = %self.run_id, switch = %id, phase = self.phase, "Dropping switch");

        let stale: Vec<ConfigMessage> = self.queue.drain(..).collect();
        for msg in stale {
            self.discard(msg);
        }

        let run_id = self.run_id;
        for &neighbor in &notified {
            let Some(switch) = self.switches.get_mut(&neighbor) else {
                continue;
            };
            let outcome = arbor_logging::with_switch_context!(neighbor, run_id, {
                switch.neighbor_lost(id)
            });
            self.stats.record(&outcome);
        }

        self.emit_event(SimEvent::SwitchDropped {
            phase: self.phase,
            switch: id,
            notified: notified.clone(),
        });

        let mut restarted = 0;
        for switch in self.switches.values_mut() {
            if switch.restart() {
                restarted += 1;
            }
        }
        debug!(phase = self.phase, restarted, "Switches restarted");
        self.seed();
        Ok(notified)
    }

    /// Seed, converge, then drop each switch in turn and reconverge
    pub fn run(&mut self, drops: &[SwitchId]) -> Result<(), TopologyError> {
        self.seed();
        self.run_until_quiescent();
        for drop in drops {
            self.drop_switch(*drop)?;
            self.run_until_quiescent();
        }
        info!(run = %self.run_id, phases = self.phase + 1, "Simulation complete");
        Ok(())
    }

    /// A live switch by ID
    pub fn switch(&self, id: SwitchId) -> Option<&Switch> {
        self.switches.get(&id)
    }

    /// Live switches in ascending ID order
    pub fn switches(&self) -> impl Iterator<Item = &Switch> + '_ {
        self.switches.values()
    }

    /// The current topology, without dropped switches
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Current phase (0 until the first drop)
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Identifier of this run, attached to every switch span
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Messages still queued
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether no message is in flight
    pub fn is_quiescent(&self) -> bool {
        self.queue.is_empty()
    }

    /// One log line per live switch, ascending by ID
    pub fn log_lines(&self) -> Vec<String> {
        self.switches.values().map(Switch::log_string).collect()
    }

    /// Snapshots of every live switch, ascending by ID
    pub fn snapshots(&self) -> Vec<SwitchSnapshot> {
        self.switches.values().map(Switch::snapshot).collect()
    }

    /// Events recorded during `phase`
    pub fn events_in_phase(&self, phase: u32) -> impl Iterator<Item = &SimEvent> + '_ {
        self.event_log.iter().filter(move |e| e.phase() == phase)
    }

    /// One-line summary of the current state
    pub fn state_summary(&self) -> String {
        let roots = self.switches.values().filter(|s| s.is_root()).count();
        let links: usize = self.switches.values().map(|s| s.links().len()).sum();
        format!(
            "Phase {}: switches={}, roots={}, active link ends={}, pending={}, delivered={}",
            self.phase,
            self.switches.len(),
            roots,
            links,
            self.queue.len(),
            self.stats.messages_delivered
        )
    }

    /// Serializable summary of the run so far
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            run_id: self.run_id,
            phase: self.phase,
            ttl: self.config.ttl,
            log_lines: self.log_lines(),
            switches: self.snapshots(),
            stats: self.stats.clone(),
        }
    }

    fn discard(&mut self, msg: ConfigMessage) -> ProcessOutcome {
        trace!(message = %msg, "Discarding stale message");
        self.stats.messages_discarded += 1;
        self.emit_event(SimEvent::Discarded {
            phase: self.phase,
            message: msg,
        });
        ProcessOutcome::default()
    }

    fn emit_event(&mut self, event: SimEvent) {
        if self.config.max_events == 0 {
            return;
        }
        while self.event_log.len() >= self.config.max_events {
            self.event_log.pop_front();
        }
        self.event_log.push_back(event);
    }
}

/// Run a scenario to completion
pub fn run_scenario(scenario: &Scenario, config: SimConfig) -> Result<Simulation, ScenarioError> {
    let mut sim = Simulation::from_scenario(scenario, config)?;
    sim.run(&scenario.drops)?;
    Ok(sim)
}
