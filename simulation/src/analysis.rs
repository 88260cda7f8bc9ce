//! Convergence checks over switch snapshots
//!
//! A converged network is a shortest-path spanning forest: every switch
//! agrees on the lowest ID in its component as root, reaches it along
//! next hops at BFS distance, breaks ties toward the lowest-ID
//! neighbour, and keeps exactly the tree links active on both ends.
//!
//! [`verify`] reports every way a set of snapshots falls short of that.
//!
//! ## Key Types
//!
//! - [`ConvergenceReport`]: the violations found plus forest summary
//! - [`Violation`]: one broken property

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use arbor_core::SwitchId;
use arbor_switch::SwitchSnapshot;
use serde::{Deserialize, Serialize};

use crate::topology::Topology;

/// One broken convergence property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// A topology switch has no snapshot
    MissingSwitch(SwitchId),
    /// A snapshot names a switch the topology does not have
    UnknownSwitch(SwitchId),
    /// The switch settled on a root other than its component minimum
    WrongRoot {
        switch: SwitchId,
        expected: SwitchId,
        actual: SwitchId,
    },
    /// The switch is not at shortest-path distance from the root
    WrongDistance {
        switch: SwitchId,
        expected: u32,
        actual: u32,
    },
    /// The next hop is not a neighbour
    NextHopNotNeighbor { switch: SwitchId, next_hop: SwitchId },
    /// A lower-ID neighbour offers an equally short path
    TieNotBroken {
        switch: SwitchId,
        next_hop: SwitchId,
        preferred: SwitchId,
    },
    /// The view does not follow from the next hop's view
    InconsistentWithNextHop { switch: SwitchId, next_hop: SwitchId },
    /// Following next hops from `switch` loops without reaching a root
    NextHopCycle { switch: SwitchId },
    /// An active link points outside the neighbour list
    LinkOutsideNeighbors { switch: SwitchId, link: SwitchId },
    /// An active link is not active on the other end
    AsymmetricLink { from: SwitchId, to: SwitchId },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingSwitch(id) => write!(f, "switch {} has no snapshot", id),
            Violation::UnknownSwitch(id) => write!(f, "switch {} is not in the topology", id),
            Violation::WrongRoot {
                switch,
                expected,
                actual,
            } => write!(f, "switch {} has root {} instead of {}", switch, actual, expected),
            Violation::WrongDistance {
                switch,
                expected,
                actual,
            } => write!(
                f,
                "switch {} is at distance {} instead of {}",
                switch, actual, expected
            ),
            Violation::NextHopNotNeighbor { switch, next_hop } => {
                write!(f, "switch {} routes via non-neighbor {}", switch, next_hop)
            }
            Violation::TieNotBroken {
                switch,
                next_hop,
                preferred,
            } => write!(
                f,
                "switch {} routes via {} but {} is equally close",
                switch, next_hop, preferred
            ),
            Violation::InconsistentWithNextHop { switch, next_hop } => write!(
                f,
                "switch {} disagrees with its next hop {}",
                switch, next_hop
            ),
            Violation::NextHopCycle { switch } => {
                write!(f, "next hops from switch {} never reach a root", switch)
            }
            Violation::LinkOutsideNeighbors { switch, link } => {
                write!(f, "switch {} has active link to non-neighbor {}", switch, link)
            }
            Violation::AsymmetricLink { from, to } => {
                write!(f, "link {} - {} is only active on {}", from, to, from)
            }
        }
    }
}

/// The outcome of [`verify`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Everything found wrong, in discovery order
    pub violations: Vec<Violation>,
    /// Switches claiming to be root
    pub roots: Vec<SwitchId>,
    /// Distinct active links
    pub tree_links: usize,
    /// Largest distance from a root
    pub depth: u32,
}

impl ConvergenceReport {
    /// Whether every property holds
    pub fn is_converged(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_converged() {
            write!(
                f,
                "converged: {} root(s), {} tree links, depth {}",
                self.roots.len(),
                self.tree_links,
                self.depth
            )
        } else {
            writeln!(f, "not converged: {} violation(s)", self.violations.len())?;
            for violation in &self.violations {
                writeln!(f, "  - {}", violation)?;
            }
            Ok(())
        }
    }
}

/// Check snapshots against the topology they were taken from
pub fn verify(snapshots: &[SwitchSnapshot], topology: &Topology) -> ConvergenceReport {
    let mut report = ConvergenceReport::default();
    let by_id: BTreeMap<SwitchId, &SwitchSnapshot> = snapshots.iter().map(|s| (s.id, s)).collect();

    for id in topology.switch_ids() {
        if !by_id.contains_key(&id) {
            report.violations.push(Violation::MissingSwitch(id));
        }
    }
    for id in by_id.keys() {
        if !topology.contains(*id) {
            report.violations.push(Violation::UnknownSwitch(*id));
        }
    }

    let expected_roots = topology.expected_roots();
    let distances: BTreeMap<SwitchId, BTreeMap<SwitchId, u32>> = expected_roots
        .values()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|root| (*root, topology.distances_from(*root)))
        .collect();

    let mut links = BTreeSet::new();

    for snapshot in by_id.values() {
        let id = snapshot.id;
        let Some(neighbors) = topology.neighbors(id) else {
            continue;
        };

        if snapshot.is_root() {
            report.roots.push(id);
        }
        report.depth = report.depth.max(snapshot.distance);

        if let Some(expected) = expected_roots.get(&id) {
            if snapshot.root != *expected {
                report.violations.push(Violation::WrongRoot {
                    switch: id,
                    expected: *expected,
                    actual: snapshot.root,
                });
            } else if let Some(root_distances) = distances.get(expected) {
                let expected = root_distances.get(&id).copied().unwrap_or_default();
                if snapshot.distance != expected {
                    report.violations.push(Violation::WrongDistance {
                        switch: id,
                        expected,
                        actual: snapshot.distance,
                    });
                }
                // Lowest-ID neighbour one hop closer to the root
                let preferred = neighbors
                    .iter()
                    .filter(|n| expected > 0 && root_distances.get(*n) == Some(&(expected - 1)))
                    .min();
                if let Some(preferred) = preferred {
                    if !snapshot.is_root() && snapshot.next_hop != *preferred {
                        report.violations.push(Violation::TieNotBroken {
                            switch: id,
                            next_hop: snapshot.next_hop,
                            preferred: *preferred,
                        });
                    }
                }
            }
        }

        if !snapshot.is_root() {
            if !neighbors.contains(&snapshot.next_hop) {
                report.violations.push(Violation::NextHopNotNeighbor {
                    switch: id,
                    next_hop: snapshot.next_hop,
                });
            } else if let Some(parent) = by_id.get(&snapshot.next_hop) {
                if parent.root != snapshot.root || parent.distance + 1 != snapshot.distance {
                    report.violations.push(Violation::InconsistentWithNextHop {
                        switch: id,
                        next_hop: snapshot.next_hop,
                    });
                }
            }
        }

        for link in &snapshot.active_links {
            if !neighbors.contains(link) {
                report.violations.push(Violation::LinkOutsideNeighbors {
                    switch: id,
                    link: *link,
                });
                continue;
            }
            match by_id.get(link) {
                Some(other) if other.has_active_link(id) => {
                    links.insert((id.min(*link), id.max(*link)));
                }
                _ => report.violations.push(Violation::AsymmetricLink { from: id, to: *link }),
            }
        }
    }

    for id in by_id.keys() {
        if !reaches_root(*id, &by_id) {
            report.violations.push(Violation::NextHopCycle { switch: *id });
        }
    }

    report.tree_links = links.len();
    report
}

/// Follow next hops from `start` until a root, a gap or a repeat
fn reaches_root(start: SwitchId, by_id: &BTreeMap<SwitchId, &SwitchSnapshot>) -> bool {
    let mut seen = BTreeSet::new();
    let mut current = start;
    while let Some(snapshot) = by_id.get(&current) {
        if snapshot.is_root() {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        current = snapshot.next_hop;
    }
    // The chain left the snapshot set; that is reported elsewhere
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{SimConfig, Simulation};
    use crate::topology::from_adjacency_list;

    fn snapshot(id: u32, root: u32, distance: u32, next_hop: u32, links: &[u32]) -> SwitchSnapshot {
        SwitchSnapshot {
            id: SwitchId(id),
            root: SwitchId(root),
            distance,
            next_hop: SwitchId(next_hop),
            active_links: links.iter().copied().map(SwitchId).collect(),
            neighbors: Vec::new(),
            log_line: String::new(),
        }
    }

    fn line() -> Topology {
        from_adjacency_list(&[(1, &[2]), (2, &[1, 3]), (3, &[2])]).unwrap()
    }

    #[test]
    fn test_converged_line() {
        let snapshots = vec![
            snapshot(1, 1, 0, 1, &[2]),
            snapshot(2, 1, 1, 1, &[1, 3]),
            snapshot(3, 1, 2, 2, &[2]),
        ];
        let report = verify(&snapshots, &line());
        assert!(report.is_converged(), "{}", report);
        assert_eq!(report.roots, vec![SwitchId(1)]);
        assert_eq!(report.tree_links, 2);
        assert_eq!(report.depth, 2);
    }

    #[test]
    fn test_unconverged_line() {
        let snapshots = vec![
            snapshot(1, 1, 0, 1, &[2]),
            snapshot(2, 1, 1, 1, &[1]),
            snapshot(3, 3, 0, 3, &[2]),
        ];
        let report = verify(&snapshots, &line());
        assert!(!report.is_converged());
        assert!(report.violations.contains(&Violation::WrongRoot {
            switch: SwitchId(3),
            expected: SwitchId(1),
            actual: SwitchId(3),
        }));
        assert!(report.violations.contains(&Violation::AsymmetricLink {
            from: SwitchId(3),
            to: SwitchId(2),
        }));
    }

    #[test]
    fn test_cycle_and_missing_switch() {
        let snapshots = vec![snapshot(2, 1, 1, 3, &[3]), snapshot(3, 1, 2, 2, &[2])];
        let report = verify(&snapshots, &line());
        assert!(report.violations.contains(&Violation::MissingSwitch(SwitchId(1))));
        assert!(report
            .violations
            .contains(&Violation::NextHopCycle { switch: SwitchId(2) }));
        assert!(report.violations.contains(&Violation::InconsistentWithNextHop {
            switch: SwitchId(2),
            next_hop: SwitchId(3),
        }));
    }

    #[test]
    fn test_tie_breaking_is_checked() {
        // 1 - 2, 1 - 3, 2 - 4, 3 - 4: switch 4 must route via 2
        let diamond = from_adjacency_list(&[(1, &[2, 3]), (2, &[1, 4]), (3, &[1, 4]), (4, &[2, 3])])
            .unwrap();
        let snapshots = vec![
            snapshot(1, 1, 0, 1, &[2, 3]),
            snapshot(2, 1, 1, 1, &[1]),
            snapshot(3, 1, 1, 1, &[1, 4]),
            snapshot(4, 1, 2, 3, &[3]),
        ];
        let report = verify(&snapshots, &diamond);
        assert_eq!(
            report.violations,
            vec![Violation::TieNotBroken {
                switch: SwitchId(4),
                next_hop: SwitchId(3),
                preferred: SwitchId(2),
            }]
        );
    }

    #[test]
    fn test_simulated_scenario_verifies() {
        let mut sim = Simulation::new(line(), SimConfig::with_ttl(3));
        sim.run(&[]).unwrap();
        let report = verify(&sim.snapshots(), sim.topology());
        assert!(report.is_converged(), "{}", report);
    }

    #[test]
    fn test_report_display() {
        let report = ConvergenceReport {
            violations: vec![Violation::NextHopCycle { switch: SwitchId(5) }],
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("1 violation"));
        assert!(text.contains("next hops from switch 5 never reach a root"));
    }
}
