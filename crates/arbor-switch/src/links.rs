//! Active link bookkeeping
//!
//! A link is active when it belongs to the spanning tree as seen from
//! this switch: either it leads to the next hop, or the neighbour on the
//! other end declared (with `path_through = true`) that it routes
//! through this switch. Those neighbours are tracked as dependents so
//! that a change of next hop never prunes a link another switch still
//! relies on.

use std::collections::BTreeSet;

use arbor_core::SwitchId;

/// Ordered set of active links plus the dependents that justify them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveLinks {
    active: BTreeSet<SwitchId>,
    dependents: BTreeSet<SwitchId>,
}

impl ActiveLinks {
    /// Create an empty link set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `neighbor` routes through us
    ///
    /// Returns true if the active set changed.
    pub fn add_dependent(&mut self, neighbor: SwitchId) -> bool {
        self.dependents.insert(neighbor);
        self.active.insert(neighbor)
    }

    /// Record that `neighbor` no longer routes through us
    ///
    /// The link stays active if it is our own path to the root.
    /// Returns true if the active set changed.
    pub fn remove_dependent(&mut self, neighbor: SwitchId, next_hop: SwitchId) -> bool {
        self.dependents.remove(&neighbor);
        if neighbor != next_hop {
            self.active.remove(&neighbor)
        } else {
            false
        }
    }

    /// Move our own path from `old` to `new`
    ///
    /// `old` is pruned unless it is a dependent or is `own_id` (the
    /// placeholder next hop of a root). `new` is activated unless it is
    /// `own_id`. Returns true if the active set changed.
    pub fn switch_next_hop(&mut self, own_id: SwitchId, old: SwitchId, new: SwitchId) -> bool {
        let mut changed = false;
        if old != new && old != own_id && !self.dependents.contains(&old) {
            changed |= self.active.remove(&old);
        }
        if new != own_id {
            changed |= self.active.insert(new);
        }
        changed
    }

    /// Forget a neighbour entirely, e.g. after its switch was removed
    pub fn forget(&mut self, neighbor: SwitchId) -> bool {
        self.dependents.remove(&neighbor);
        self.active.remove(&neighbor)
    }

    /// Whether the link to `neighbor` is active
    pub fn contains(&self, neighbor: &SwitchId) -> bool {
        self.active.contains(neighbor)
    }

    /// Whether `neighbor` currently routes through us
    pub fn is_dependent(&self, neighbor: &SwitchId) -> bool {
        self.dependents.contains(neighbor)
    }

    /// Active links in ascending order
    pub fn iter(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.active.iter().copied()
    }

    /// Dependents in ascending order
    pub fn dependents(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.dependents.iter().copied()
    }

    /// Number of active links
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no link is active
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Check that the active set is exactly the dependents plus `next_hop`
    pub fn is_consistent(&self, own_id: SwitchId, next_hop: SwitchId) -> bool {
        let mut expected = self.dependents.clone();
        if next_hop != own_id {
            expected.insert(next_hop);
        }
        expected == self.active
    }

    /// Render the links as `"{id} - {n1}, {id} - {n2}"`, or just `"{id}"`
    pub fn log_string(&self, own_id: SwitchId) -> String {
        if self.active.is_empty() {
            return own_id.to_string();
        }
        self.active
            .iter()
            .map(|n| format!("{} - {}", own_id, n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
