//! Core simulation types: events and statistics

use arbor_core::{ConfigMessage, SwitchId};
use arbor_switch::ViewChange;
use serde::{Deserialize, Serialize};

/// Events that occur while driving a simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Every switch announced itself as root
    Seeded { phase: u32, messages: usize },
    /// A message was handed to its destination
    Delivered {
        phase: u32,
        message: ConfigMessage,
        change: ViewChange,
        sent: usize,
    },
    /// A switch changed its root, distance or next hop
    ViewChanged {
        phase: u32,
        switch: SwitchId,
        root: SwitchId,
        distance: u32,
        next_hop: SwitchId,
        change: ViewChange,
    },
    /// A message queued before a drop was discarded
    Discarded { phase: u32, message: ConfigMessage },
    /// A switch was removed from the topology
    SwitchDropped {
        phase: u32,
        switch: SwitchId,
        notified: Vec<SwitchId>,
    },
    /// No message is in flight
    Quiescent { phase: u32, delivered: u64 },
}

impl SimEvent {
    /// The phase the event belongs to (0 is the initial convergence)
    pub fn phase(&self) -> u32 {
        match self {
            SimEvent::Seeded { phase, .. }
            | SimEvent::Delivered { phase, .. }
            | SimEvent::ViewChanged { phase, .. }
            | SimEvent::Discarded { phase, .. }
            | SimEvent::SwitchDropped { phase, .. }
            | SimEvent::Quiescent { phase, .. } => *phase,
        }
    }
}

/// Simulation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_discarded: u64,
    /// Strictly better paths adopted
    pub improvements: u64,
    /// Switches that fell back to claiming root
    pub resets: u64,
    /// Replies sent to inferior senders
    pub replies: u64,
    /// Deliveries that changed some active link set
    pub link_changes: u64,
    pub switches_dropped: u64,
}

impl SimStats {
    /// Fold one processing outcome into the counters
    pub fn record(&mut self, outcome: &arbor_switch::ProcessOutcome) {
        self.messages_sent += outcome.sent as u64;
        match outcome.change {
            ViewChange::Unchanged => {}
            ViewChange::Improved => self.improvements += 1,
            ViewChange::Reset => self.resets += 1,
        }
        if outcome.replied {
            self.replies += 1;
        }
        if outcome.links_changed {
            self.link_changes += 1;
        }
    }
}
