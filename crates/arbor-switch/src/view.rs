//! A switch's view of the spanning tree root
//!
//! The view is the triple (claimed root, distance, next hop). Comparing
//! a received message against the view decides whether the switch
//! moves to a better path, falls back to claiming root because its next
//! hop changed its story, or stays put.

use arbor_core::{ConfigMessage, SwitchId};
use serde::{Deserialize, Serialize};

/// Best known root, the distance to it, and the neighbour leading there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootView {
    /// Best known root
    pub root: SwitchId,
    /// Hops to the root
    pub distance: u32,
    /// Neighbour on the path to the root; the switch itself when it is root
    pub next_hop: SwitchId,
}

impl RootView {
    /// The view every switch starts with: itself as root
    pub fn own(id: SwitchId) -> Self {
        Self {
            root: id,
            distance: 0,
            next_hop: id,
        }
    }

    /// The view obtained by routing through the sender of `msg`
    pub fn via(msg: &ConfigMessage) -> Self {
        Self {
            root: msg.root,
            distance: msg.distance + 1,
            next_hop: msg.origin,
        }
    }

    /// Whether this view claims `id` itself as root
    pub fn is_own(&self, id: SwitchId) -> bool {
        self.next_hop == id
    }

    /// Whether routing through the sender of `msg` is strictly better
    ///
    /// Better means a lower root, or the same root at a shorter
    /// distance, or the same root and distance through a lower-ID
    /// neighbour.
    pub fn is_improved_by(&self, msg: &ConfigMessage) -> bool {
        if msg.root != self.root {
            return msg.root < self.root;
        }
        let offered = msg.distance + 1;
        offered < self.distance || (offered == self.distance && msg.origin < self.next_hop)
    }

    /// Whether the sender of `msg` would improve by hearing this view
    ///
    /// True when the sender claims a higher root, or the same root at a
    /// distance greater than this view plus one hop.
    pub fn is_better_than_sender(&self, msg: &ConfigMessage) -> bool {
        msg.root > self.root || (msg.root == self.root && msg.distance > self.distance + 1)
    }

    /// Whether `msg` comes from the next hop and disagrees with what this
    /// view was derived from
    pub fn is_contradicted_by(&self, msg: &ConfigMessage) -> bool {
        msg.origin == self.next_hop
            && (msg.root != self.root || msg.distance + 1 != self.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(root: u32, distance: u32, origin: u32) -> ConfigMessage {
        ConfigMessage::new(
            SwitchId(root),
            distance,
            SwitchId(origin),
            SwitchId(9),
            false,
            3,
        )
    }

    fn view(root: u32, distance: u32, next_hop: u32) -> RootView {
        RootView {
            root: SwitchId(root),
            distance,
            next_hop: SwitchId(next_hop),
        }
    }

    #[test]
    fn test_own_view() {
        let v = RootView::own(SwitchId(4));
        assert_eq!(v.root, SwitchId(4));
        assert_eq!(v.distance, 0);
        assert!(v.is_own(SwitchId(4)));
        assert!(!v.is_own(SwitchId(5)));
    }

    #[test]
    fn test_lower_root_improves() {
        assert!(view(3, 0, 3).is_improved_by(&msg(1, 5, 7)));
        assert!(!view(1, 5, 2).is_improved_by(&msg(3, 0, 3)));
    }

    #[test]
    fn test_shorter_distance_improves() {
        let v = view(1, 3, 5);
        assert!(v.is_improved_by(&msg(1, 1, 6)));
        assert!(!v.is_improved_by(&msg(1, 3, 2)));
    }

    #[test]
    fn test_equal_distance_breaks_tie_on_lower_neighbor() {
        let v = view(1, 2, 5);
        assert!(v.is_improved_by(&msg(1, 1, 4)));
        assert!(!v.is_improved_by(&msg(1, 1, 6)));
        // Same neighbour, same offer: nothing to do
        assert!(!v.is_improved_by(&msg(1, 1, 5)));
    }

    #[test]
    fn test_root_is_not_improved_by_own_claims() {
        let v = RootView::own(SwitchId(2));
        assert!(!v.is_improved_by(&msg(2, 1, 3)));
        assert!(!v.is_improved_by(&msg(5, 0, 5)));
    }

    #[test]
    fn test_sender_inferiority() {
        let v = view(1, 2, 3);
        assert!(v.is_better_than_sender(&msg(4, 0, 4)));
        assert!(v.is_better_than_sender(&msg(1, 4, 6)));
        assert!(!v.is_better_than_sender(&msg(1, 3, 6)));
        assert!(!v.is_better_than_sender(&msg(1, 1, 3)));
    }

    #[test]
    fn test_contradiction_only_from_next_hop() {
        let v = view(1, 2, 3);
        assert!(v.is_contradicted_by(&msg(3, 0, 3)));
        assert!(v.is_contradicted_by(&msg(1, 4, 3)));
        assert!(!v.is_contradicted_by(&msg(1, 1, 3)));
        assert!(!v.is_contradicted_by(&msg(3, 0, 4)));
    }
}
