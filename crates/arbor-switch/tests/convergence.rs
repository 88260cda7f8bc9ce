//! Convergence tests for arbor-switch
//!
//! These tests wire switches together with a minimal FIFO driver and
//! check the converged trees, both on hand-picked topologies and on
//! randomly generated connected graphs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use arbor_switch::{ConfigMessage, Switch, SwitchId};
use proptest::prelude::*;

// Test helpers
fn make_id(id: u32) -> SwitchId {
    SwitchId(id)
}

/// Run the protocol to quiescence over an adjacency list
fn converge(adjacency: &[(u32, Vec<u32>)], ttl: u32) -> BTreeMap<SwitchId, Switch> {
    let mut switches: BTreeMap<SwitchId, Switch> = adjacency
        .iter()
        .map(|(id, ns)| (make_id(*id), Switch::new(make_id(*id), ns.iter().copied().map(SwitchId))))
        .collect();

    seed_and_drain(&mut switches, ttl);
    switches
}

fn seed_and_drain(switches: &mut BTreeMap<SwitchId, Switch>, ttl: u32) {
    let mut queue: VecDeque<ConfigMessage> = VecDeque::new();
    for switch in switches.values() {
        switch.announce(ttl, &mut queue);
    }

    let mut delivered = 0usize;
    while let Some(msg) = queue.pop_front() {
        delivered += 1;
        assert!(delivered < 1_000_000, "no quiescence");
        let switch = switches.get_mut(&msg.destination).unwrap();
        switch.process_message(msg, &mut queue);
    }
}

/// Remove a switch the way the drivers do: tell its neighbours, restart
/// everyone else, and reseed
fn drop_and_reconverge(switches: &mut BTreeMap<SwitchId, Switch>, id: SwitchId, ttl: u32) {
    let dropped = switches.remove(&id).unwrap();
    for n in dropped.neighbors() {
        switches.get_mut(n).unwrap().neighbor_lost(id);
    }
    for switch in switches.values_mut() {
        switch.restart();
    }
    seed_and_drain(switches, ttl);
}

fn is_connected(switches: &BTreeMap<SwitchId, Switch>) -> bool {
    let Some(start) = switches.keys().next().copied() else {
        return true;
    };
    let mut seen = BTreeSet::from([start]);
    let mut frontier = vec![start];
    while let Some(id) = frontier.pop() {
        for n in switches[&id].neighbors() {
            if seen.insert(*n) {
                frontier.push(*n);
            }
        }
    }
    seen.len() == switches.len()
}

/// Check agreement on the lowest root, a loop-free tree and symmetric links
fn assert_spanning_tree(switches: &BTreeMap<SwitchId, Switch>) -> Result<(), TestCaseError> {
    let min_id = switches.keys().min().copied().unwrap();

    for switch in switches.values() {
        prop_assert!(switch.invariants_hold());
        prop_assert_eq!(switch.root(), min_id);
        prop_assert_eq!(switch.is_root(), switch.id() == min_id);

        // Symmetric active links
        for n in switch.active_links() {
            prop_assert!(switches[&n].links().contains(&switch.id()));
        }

        // Next hop is strictly closer to the root
        if !switch.is_root() {
            let hop = &switches[&switch.next_hop()];
            prop_assert_eq!(hop.distance() + 1, switch.distance());
        }
    }

    // A spanning tree has exactly n - 1 edges
    let link_ends: usize = switches.values().map(|s| s.active_links().len()).sum();
    prop_assert_eq!(link_ends, 2 * (switches.len() - 1));
    Ok(())
}

fn adjacency(pairs: &[(u32, &[u32])]) -> Vec<(u32, Vec<u32>)> {
    pairs.iter().map(|(id, ns)| (*id, ns.to_vec())).collect()
}

fn log_lines(switches: &BTreeMap<SwitchId, Switch>) -> Vec<String> {
    switches.values().map(Switch::log_string).collect()
}

#[test]
fn test_line_of_three() {
    let switches = converge(&adjacency(&[(1, &[2]), (2, &[1, 3]), (3, &[2])]), 3);
    assert_eq!(log_lines(&switches), vec!["1 - 2", "2 - 1, 2 - 3", "3 - 2"]);
}

#[test]
fn test_single_switch() {
    let switches = converge(&adjacency(&[(4, &[])]), 3);
    assert_eq!(log_lines(&switches), vec!["4"]);
}

#[test]
fn test_diamond_picks_lower_neighbor() {
    let switches = converge(
        &adjacency(&[(1, &[2, 3]), (2, &[1, 4]), (3, &[1, 4]), (4, &[3, 2])]),
        6,
    );
    assert_eq!(switches[&make_id(4)].next_hop(), make_id(2));
    assert_eq!(switches[&make_id(4)].distance(), 2);
    assert_eq!(
        log_lines(&switches),
        vec!["1 - 2, 1 - 3", "2 - 1, 2 - 4", "3 - 1", "4 - 2"]
    );
}

#[test]
fn test_tie_breaking_topology() {
    let switches = converge(
        &adjacency(&[
            (1, &[2, 3]),
            (2, &[1, 4]),
            (3, &[1, 5]),
            (4, &[2, 5, 6]),
            (5, &[3, 4, 7]),
            (6, &[4]),
            (7, &[5]),
        ]),
        9,
    );

    let next_hops: Vec<(u32, u32)> = switches
        .values()
        .map(|s| (s.id().as_u32(), s.next_hop().as_u32()))
        .collect();
    assert_eq!(
        next_hops,
        vec![(1, 1), (2, 1), (3, 1), (4, 2), (5, 3), (6, 4), (7, 5)]
    );
    assert_eq!(switches[&make_id(4)].log_string(), "4 - 2, 4 - 6");
    assert_eq!(switches[&make_id(5)].log_string(), "5 - 3, 5 - 7");
}

#[test]
fn test_lowest_id_wins_regardless_of_position() {
    // Ring with the lowest ID in the middle of the adjacency order
    let switches = converge(
        &adjacency(&[(7, &[3, 9]), (3, &[7, 5]), (5, &[3, 9]), (9, &[5, 7])]),
        8,
    );
    for switch in switches.values() {
        assert_eq!(switch.root(), make_id(3));
    }
    assert_eq!(switches[&make_id(9)].next_hop(), make_id(5));
}

#[test]
fn test_short_ttl_leaves_far_switches_unconverged() {
    let line = adjacency(&[(1, &[2]), (2, &[1, 3]), (3, &[2, 4]), (4, &[3, 5]), (5, &[4])]);
    let switches = converge(&line, 2);
    assert_eq!(switches[&make_id(2)].root(), make_id(1));
    assert_ne!(switches[&make_id(5)].root(), make_id(1));
}

#[test]
fn test_root_drop_in_a_ring_reconverges() {
    // 1 - 2 - 3
    // |       |
    // 4 - 5 - 6
    let ring = adjacency(&[
        (1, &[2, 4]),
        (2, &[1, 3]),
        (3, &[2, 6]),
        (4, &[1, 5]),
        (5, &[4, 6]),
        (6, &[3, 5]),
    ]);
    let mut switches = converge(&ring, 8);
    drop_and_reconverge(&mut switches, make_id(1), 8);

    assert_eq!(
        log_lines(&switches),
        vec!["2 - 3", "3 - 2, 3 - 6", "4 - 5", "5 - 4, 5 - 6", "6 - 3, 6 - 5"]
    );
    assert_eq!(switches[&make_id(4)].distance(), 4);
}

/// Random connected graph: a random spanning tree plus extra edges, over
/// shuffled IDs
fn connected_graph() -> impl Strategy<Value = Vec<(u32, Vec<u32>)>> {
    (2usize..12).prop_flat_map(|n| {
        (
            Just((1..=n as u32).map(|i| i * 3).collect::<Vec<_>>()).prop_shuffle(),
            proptest::collection::vec(any::<prop::sample::Index>(), n - 1),
            proptest::collection::vec((0..n, 0..n), 0..(2 * n)),
        )
            .prop_map(move |(ids, parents, extra)| {
                let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
                for (child, parent) in parents.iter().enumerate() {
                    let child = child + 1;
                    let parent = parent.index(child);
                    edges.insert((parent.min(child), parent.max(child)));
                }
                for (a, b) in extra {
                    if a != b {
                        edges.insert((a.min(b), a.max(b)));
                    }
                }

                let mut adj: Vec<(u32, Vec<u32>)> = ids.iter().map(|id| (*id, Vec::new())).collect();
                for (a, b) in edges {
                    adj[a].1.push(ids[b]);
                    adj[b].1.push(ids[a]);
                }
                adj
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_converges_to_loop_free_symmetric_tree(adj in connected_graph()) {
        let ttl = adj.len() as u32 + 2;
        let switches = converge(&adj, ttl);
        assert_spanning_tree(&switches)?;
    }

    #[test]
    fn prop_reconverges_after_a_drop(
        adj in connected_graph(),
        victim in any::<prop::sample::Index>(),
    ) {
        let ttl = adj.len() as u32 + 2;
        let mut switches = converge(&adj, ttl);
        let ids: Vec<SwitchId> = switches.keys().copied().collect();
        let drop = *victim.get(&ids);

        drop_and_reconverge(&mut switches, drop, ttl);
        prop_assume!(!switches.is_empty() && is_connected(&switches));
        assert_spanning_tree(&switches)?;
    }

    #[test]
    fn prop_converged_result_is_deterministic(adj in connected_graph()) {
        let ttl = adj.len() as u32 + 2;
        let first = log_lines(&converge(&adj, ttl));
        let second = log_lines(&converge(&adj, ttl));
        prop_assert_eq!(first, second);
    }
}
