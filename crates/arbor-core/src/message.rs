//! Configuration messages exchanged between neighbouring switches

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::identity::SwitchId;

/// A configuration message carrying the sender's current view of the tree
///
/// Messages are immutable once sent except for the TTL, which the
/// receiver decrements exactly once on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigMessage {
    /// Root claimed by the sender
    pub root: SwitchId,
    /// Sender's distance to that root
    pub distance: u32,
    /// The sender
    pub origin: SwitchId,
    /// The neighbour this message is addressed to
    pub destination: SwitchId,
    /// True iff the sender uses `destination` as its next hop to the root
    pub path_through: bool,
    /// Remaining hops
    pub ttl: u32,
}

impl ConfigMessage {
    /// Create a new configuration message
    pub fn new(
        root: SwitchId,
        distance: u32,
        origin: SwitchId,
        destination: SwitchId,
        path_through: bool,
        ttl: u32,
    ) -> Self {
        Self {
            root,
            distance,
            origin,
            destination,
            path_through,
            ttl,
        }
    }

    /// Consume one hop of lifetime
    ///
    /// # Panics
    ///
    /// Panics if the TTL is already zero. A zero-TTL message must never
    /// be delivered.
    pub fn decrement_ttl(&mut self) {
        assert!(
            self.ttl > 0,
            "message {} -> {} delivered with exhausted TTL",
            self.origin,
            self.destination
        );
        self.ttl -= 1;
    }

    /// Whether another hop is allowed after this one
    pub fn can_forward(&self) -> bool {
        self.ttl > 0
    }
}

impl Display for ConfigMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{} [root={} dist={} pt={} ttl={}]",
            self.origin, self.destination, self.root, self.distance, self.path_through, self.ttl
        )
    }
}
