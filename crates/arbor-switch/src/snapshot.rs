//! Read-only copies of switch state
//!
//! Snapshots decouple reporting from the live switches: the actor
//! network hands them across task boundaries, and verification and
//! JSON reports work from them alone.

use arbor_core::SwitchId;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a switch's protocol state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSnapshot {
    pub id: SwitchId,
    pub root: SwitchId,
    pub distance: u32,
    pub next_hop: SwitchId,
    /// Active links, ascending
    pub active_links: Vec<SwitchId>,
    /// Remaining neighbours, in adjacency order
    pub neighbors: Vec<SwitchId>,
    /// The switch's final log line
    pub log_line: String,
}

impl SwitchSnapshot {
    /// Whether this switch considers itself the root
    pub fn is_root(&self) -> bool {
        self.next_hop == self.id
    }

    /// Whether the link to `neighbor` is active
    pub fn has_active_link(&self, neighbor: SwitchId) -> bool {
        self.active_links.binary_search(&neighbor).is_ok()
    }
}
