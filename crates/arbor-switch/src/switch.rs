//! The per-switch protocol state machine
//!
//! A [`Switch`] owns its view of the tree and its active links and
//! changes them only in response to delivered messages or to the driver
//! reporting a lost neighbour. Everything it emits goes through an
//! [`Outbox`].

use arbor_core::{ConfigMessage, Outbox, SwitchId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::links::ActiveLinks;
use crate::snapshot::SwitchSnapshot;
use crate::view::RootView;

/// How a delivered message changed the switch's view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewChange {
    /// Nothing changed, or only link bookkeeping did
    #[default]
    Unchanged,
    /// A strictly better path was adopted
    Improved,
    /// The path through the next hop became unusable; the switch claims root
    Reset,
}

/// Result of handing a message or event to a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    /// How the view changed
    pub change: ViewChange,
    /// Whether the active link set changed
    pub links_changed: bool,
    /// Number of messages handed to the outbox
    pub sent: usize,
    /// Whether the only message sent was a reply to an inferior sender
    pub replied: bool,
}

impl ProcessOutcome {
    /// Whether the root, distance or next hop changed
    pub fn view_changed(&self) -> bool {
        self.change != ViewChange::Unchanged
    }
}

/// A switch participating in spanning tree construction
///
/// # Example
///
/// ```
/// use std::collections::VecDeque;
/// use arbor_core::{ConfigMessage, SwitchId};
/// use arbor_switch::Switch;
///
/// let mut outbox: VecDeque<ConfigMessage> = VecDeque::new();
/// let switch = Switch::new(SwitchId(2), [SwitchId(1), SwitchId(3)]);
/// switch.announce(3, &mut outbox);
///
/// assert_eq!(outbox.len(), 2);
/// assert_eq!(switch.log_string(), "2");
/// ```
#[derive(Debug, Clone)]
pub struct Switch {
    id: SwitchId,
    neighbors: Vec<SwitchId>,
    view: RootView,
    links: ActiveLinks,
}

impl Switch {
    /// Create a switch that believes itself to be root
    ///
    /// # Panics
    ///
    /// Panics if `neighbors` contains `id` or lists a neighbour twice.
    pub fn new(id: SwitchId, neighbors: impl IntoIterator<Item = SwitchId>) -> Self {
        let neighbors: Vec<SwitchId> = neighbors.into_iter().collect();
        assert!(
            !neighbors.contains(&id),
            "switch {} cannot be its own neighbor",
            id
        );
        for (i, n) in neighbors.iter().enumerate() {
            assert!(
                !neighbors[i + 1..].contains(n),
                "switch {} lists neighbor {} twice",
                id,
                n
            );
        }

        Self {
            id,
            neighbors,
            view: RootView::own(id),
            links: ActiveLinks::new(),
        }
    }

    /// This switch's identity
    pub fn id(&self) -> SwitchId {
        self.id
    }

    /// Neighbours in adjacency order
    pub fn neighbors(&self) -> &[SwitchId] {
        &self.neighbors
    }

    /// Current view of the tree
    pub fn view(&self) -> RootView {
        self.view
    }

    /// Best known root
    pub fn root(&self) -> SwitchId {
        self.view.root
    }

    /// Distance to the best known root
    pub fn distance(&self) -> u32 {
        self.view.distance
    }

    /// Neighbour on the path to the root (self when root)
    pub fn next_hop(&self) -> SwitchId {
        self.view.next_hop
    }

    /// Whether this switch currently claims to be root
    pub fn is_root(&self) -> bool {
        self.view.is_own(self.id)
    }

    /// Active link bookkeeping
    pub fn links(&self) -> &ActiveLinks {
        &self.links
    }

    /// Active links in ascending order
    pub fn active_links(&self) -> Vec<SwitchId> {
        self.links.iter().collect()
    }

    /// Send the current view to every neighbour
    ///
    /// Used by drivers to seed the protocol. Returns the number of
    /// messages sent; nothing is sent for a zero TTL.
    pub fn announce(&self, ttl: u32, outbox: &mut impl Outbox) -> usize {
        if ttl == 0 {
            return 0;
        }
        trace!(switch = %self.id, ttl, "Announcing view");
        self.broadcast(ttl, outbox)
    }

    /// Handle one delivered configuration message
    ///
    /// # Panics
    ///
    /// Panics if the message is addressed to another switch, comes from a
    /// switch that is not a neighbour, or arrives with an exhausted TTL.
    pub fn process_message(
        &mut self,
        mut msg: ConfigMessage,
        outbox: &mut impl Outbox,
    ) -> ProcessOutcome {
        assert_eq!(
            msg.destination, self.id,
            "switch {} received message addressed to {}",
            self.id, msg.destination
        );
        assert!(
            self.neighbors.contains(&msg.origin),
            "switch {} received message from non-neighbor {}",
            self.id,
            msg.origin
        );
        // One hop of lifetime is consumed on receipt
        msg.decrement_ttl();

        trace!(switch = %self.id, message = %msg, "Processing configuration message");

        let mut outcome = ProcessOutcome::default();
        let candidate = self.view.is_improved_by(&msg);

        // The path-through flag is honoured whatever the root comparison says
        outcome.links_changed |= if msg.path_through {
            self.links.add_dependent(msg.origin)
        } else {
            self.links.remove_dependent(msg.origin, self.view.next_hop)
        };

        if candidate {
            let old = self.view.next_hop;
            self.view = RootView::via(&msg);
            outcome.links_changed |= self.links.switch_next_hop(self.id, old, msg.origin);
            outcome.change = ViewChange::Improved;
            debug!(
                switch = %self.id,
                root = %self.view.root,
                distance = self.view.distance,
                next_hop = %self.view.next_hop,
                "Adopted better path"
            );
        } else if !self.is_root() && self.view.is_contradicted_by(&msg) {
            // Never follow a next hop onto a worse path; stale roots would circulate
            outcome.links_changed |= self.reset_to_root();
            outcome.change = ViewChange::Reset;
            debug!(switch = %self.id, lost_via = %msg.origin, "Next hop changed its view, claiming root");
        }

        if msg.can_forward() {
            if outcome.view_changed() {
                outcome.sent = self.broadcast(msg.ttl, outbox);
            } else if self.view.is_better_than_sender(&msg) {
                trace!(switch = %self.id, to = %msg.origin, "Replying to inferior sender");
                outbox.send_message(self.message_to(msg.origin, msg.ttl));
                outcome.sent = 1;
                outcome.replied = true;
            }
        } else if outcome.view_changed() {
            trace!(switch = %self.id, "TTL exhausted, change not propagated");
        }

        debug_assert!(self.invariants_hold(), "switch {} broke its invariants", self.id);
        outcome
    }

    /// Handle the removal of a neighbouring switch
    ///
    /// The link disappears from the neighbour list and from the tree.
    /// If it was the path to the root, the switch claims root; links that
    /// dependents still rely on are kept. Nothing is sent: announcing the
    /// new view is left to the driver's next seeding.
    ///
    /// # Panics
    ///
    /// Panics if `lost` is not a neighbour.
    pub fn neighbor_lost(&mut self, lost: SwitchId) -> ProcessOutcome {
        let pos = self
            .neighbors
            .iter()
            .position(|n| *n == lost)
            .unwrap_or_else(|| panic!("switch {} has no neighbor {}", self.id, lost));
        self.neighbors.remove(pos);

        let mut outcome = ProcessOutcome {
            links_changed: self.links.forget(lost),
            ..Default::default()
        };

        if self.view.next_hop == lost {
            self.view = RootView::own(self.id);
            outcome.change = ViewChange::Reset;
            debug!(switch = %self.id, lost = %lost, "Lost next hop, claiming root");
        } else {
            debug!(switch = %self.id, lost = %lost, "Lost neighbor");
        }

        debug_assert!(self.invariants_hold(), "switch {} broke its invariants", self.id);
        outcome
    }

    /// Return to the state of a freshly created switch
    ///
    /// The switch claims root again and forgets every active link and
    /// dependent; only the neighbour list survives. Drivers call this on
    /// every switch before reseeding a new phase so that no view learned
    /// from a dropped switch outlives it. Returns true if anything changed.
    pub fn restart(&mut self) -> bool {
        let changed = !self.is_root() || !self.links.is_empty();
        self.view = RootView::own(self.id);
        self.links = ActiveLinks::new();
        if changed {
            trace!(switch = %self.id, "Restarted");
        }
        changed
    }

    /// The switch's log line: active links ascending, `"{id} - {n}"`
    /// joined by `", "`, or just `"{id}"`
    pub fn log_string(&self) -> String {
        self.links.log_string(self.id)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SwitchSnapshot {
        SwitchSnapshot {
            id: self.id,
            root: self.view.root,
            distance: self.view.distance,
            next_hop: self.view.next_hop,
            active_links: self.active_links(),
            neighbors: self.neighbors.clone(),
            log_line: self.log_string(),
        }
    }

    /// Check the local state invariants
    ///
    /// - a root has distance 0 and claims itself
    /// - active links are neighbours
    /// - active links are exactly the dependents plus the next hop
    pub fn invariants_hold(&self) -> bool {
        if self.is_root() && (self.view.distance != 0 || self.view.root != self.id) {
            return false;
        }
        if !self.is_root() && !self.neighbors.contains(&self.view.next_hop) {
            return false;
        }
        if self.links.iter().any(|n| !self.neighbors.contains(&n)) {
            return false;
        }
        self.links.is_consistent(self.id, self.view.next_hop)
    }

    fn reset_to_root(&mut self) -> bool {
        let old = self.view.next_hop;
        self.view = RootView::own(self.id);
        self.links.switch_next_hop(self.id, old, self.id)
    }

    fn broadcast(&self, ttl: u32, outbox: &mut impl Outbox) -> usize {
        for n in &self.neighbors {
            outbox.send_message(self.message_to(*n, ttl));
        }
        self.neighbors.len()
    }

    fn message_to(&self, neighbor: SwitchId, ttl: u32) -> ConfigMessage {
        ConfigMessage::new(
            self.view.root,
            self.view.distance,
            self.id,
            neighbor,
            neighbor == self.view.next_hop,
            ttl,
        )
    }
}
