//! Switch topology definitions for Arbor
//!
//! A [`Topology`] is an ordered adjacency map: the order of each
//! neighbour list is the order in which that switch sends its
//! broadcasts, so it is preserved exactly as given.
//!
//! Provides functions to create various topologies:
//! - Line, ring, star, full mesh and grid
//! - Random: a random spanning tree plus extra links
//! - Custom: Build from an adjacency map or an edge list

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use arbor_core::{SwitchId, TopologyError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// An undirected switch topology with ordered neighbour lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<SwitchId, Vec<SwitchId>>",
    into = "BTreeMap<SwitchId, Vec<SwitchId>>"
)]
pub struct Topology {
    adjacency: BTreeMap<SwitchId, Vec<SwitchId>>,
}

impl Topology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a topology from an adjacency map, validating it
    ///
    /// Every listed neighbour must exist, no switch may list itself or
    /// the same neighbour twice, and every link must be listed on both
    /// ends.
    pub fn from_adjacency(
        adjacency: BTreeMap<SwitchId, Vec<SwitchId>>,
    ) -> Result<Self, TopologyError> {
        if adjacency.is_empty() {
            return Err(TopologyError::Empty);
        }

        for (switch, neighbors) in &adjacency {
            let mut seen = BTreeSet::new();
            for neighbor in neighbors {
                if neighbor == switch {
                    return Err(TopologyError::SelfLoop(*switch));
                }
                if !seen.insert(*neighbor) {
                    return Err(TopologyError::DuplicateNeighbor {
                        switch: *switch,
                        neighbor: *neighbor,
                    });
                }
                let Some(back) = adjacency.get(neighbor) else {
                    return Err(TopologyError::UnknownNeighbor {
                        switch: *switch,
                        neighbor: *neighbor,
                    });
                };
                if !back.contains(switch) {
                    return Err(TopologyError::AsymmetricLink {
                        from: *switch,
                        to: *neighbor,
                    });
                }
            }
        }

        Ok(Self { adjacency })
    }

    /// Build a topology from an edge list
    ///
    /// Neighbour lists follow edge order.
    pub fn from_edges(edges: &[(u32, u32)]) -> Result<Self, TopologyError> {
        let mut topology = Self::new();
        for &(a, b) in edges {
            let (a, b) = (SwitchId(a), SwitchId(b));
            if a == b {
                return Err(TopologyError::SelfLoop(a));
            }
            if topology.are_connected(a, b) {
                return Err(TopologyError::DuplicateNeighbor {
                    switch: a,
                    neighbor: b,
                });
            }
            topology.link(a, b);
        }
        if topology.adjacency.is_empty() {
            return Err(TopologyError::Empty);
        }
        Ok(topology)
    }

    /// Add an isolated switch (no-op if it exists)
    pub fn add_switch(&mut self, id: SwitchId) {
        self.adjacency.entry(id).or_default();
    }

    /// Add a bidirectional link, appending to both neighbour lists
    fn link(&mut self, a: SwitchId, b: SwitchId) {
        if a == b || self.are_connected(a, b) {
            return;
        }
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
    }

    /// Remove a switch and every link to it
    ///
    /// Returns the former neighbours in ascending order.
    pub fn remove_switch(&mut self, id: SwitchId) -> Result<Vec<SwitchId>, TopologyError> {
        let neighbors = self
            .adjacency
            .remove(&id)
            .ok_or(TopologyError::UnknownSwitch(id))?;
        for neighbor in &neighbors {
            if let Some(list) = self.adjacency.get_mut(neighbor) {
                list.retain(|n| *n != id);
            }
        }
        let mut former: Vec<SwitchId> = neighbors;
        former.sort();
        Ok(former)
    }

    /// Neighbours of a switch, in adjacency order
    pub fn neighbors(&self, id: SwitchId) -> Option<&[SwitchId]> {
        self.adjacency.get(&id).map(Vec::as_slice)
    }

    /// Whether a switch exists
    pub fn contains(&self, id: SwitchId) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// Check if two switches are directly connected
    pub fn are_connected(&self, a: SwitchId, b: SwitchId) -> bool {
        self.adjacency
            .get(&a)
            .map(|neighbors| neighbors.contains(&b))
            .unwrap_or(false)
    }

    /// All switch IDs, ascending
    pub fn switch_ids(&self) -> Vec<SwitchId> {
        self.adjacency.keys().copied().collect()
    }

    /// Iterate over switches and their neighbour lists, ascending by ID
    pub fn iter(&self) -> impl Iterator<Item = (SwitchId, &[SwitchId])> + '_ {
        self.adjacency.iter().map(|(id, ns)| (*id, ns.as_slice()))
    }

    /// Number of switches
    pub fn switch_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of links
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }

    /// Hop distances from `start` to every reachable switch
    pub fn distances_from(&self, start: SwitchId) -> BTreeMap<SwitchId, u32> {
        let mut distances = BTreeMap::new();
        if !self.contains(start) {
            return distances;
        }
        let mut frontier = VecDeque::from([start]);
        distances.insert(start, 0);
        while let Some(current) = frontier.pop_front() {
            let next = distances[&current] + 1;
            for neighbor in self.neighbors(current).unwrap_or_default() {
                if !distances.contains_key(neighbor) {
                    distances.insert(*neighbor, next);
                    frontier.push_back(*neighbor);
                }
            }
        }
        distances
    }

    /// Connected components, each as an ascending set
    pub fn components(&self) -> Vec<BTreeSet<SwitchId>> {
        let mut seen: BTreeSet<SwitchId> = BTreeSet::new();
        let mut components = Vec::new();
        for id in self.adjacency.keys() {
            if seen.contains(id) {
                continue;
            }
            let component: BTreeSet<SwitchId> = self.distances_from(*id).into_keys().collect();
            seen.extend(component.iter().copied());
            components.push(component);
        }
        components
    }

    /// Whether every switch can reach every other
    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }

    /// The root every switch should converge to: the lowest ID in its component
    pub fn expected_roots(&self) -> BTreeMap<SwitchId, SwitchId> {
        let mut roots = BTreeMap::new();
        for component in self.components() {
            if let Some(root) = component.first().copied() {
                roots.extend(component.into_iter().map(|id| (id, root)));
            }
        }
        roots
    }

    /// Longest shortest path between two connected switches
    pub fn diameter(&self) -> u32 {
        self.adjacency
            .keys()
            .filter_map(|id| self.distances_from(*id).into_values().max())
            .max()
            .unwrap_or(0)
    }

    /// Print a simple ASCII visualization of the topology
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Switch Topology:\n");
        output.push_str(&format!("  Switches: {}\n", self.switch_count()));
        output.push_str(&format!("  Links: {}\n", self.edge_count()));
        output.push_str(&format!("  Diameter: {}\n\n", self.diameter()));

        for (id, neighbors) in &self.adjacency {
            let neighbor_str: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
            output.push_str(&format!("  {} -> [{}]\n", id, neighbor_str.join(", ")));
        }
        output
    }
}

impl TryFrom<BTreeMap<SwitchId, Vec<SwitchId>>> for Topology {
    type Error = TopologyError;

    fn try_from(adjacency: BTreeMap<SwitchId, Vec<SwitchId>>) -> Result<Self, Self::Error> {
        Self::from_adjacency(adjacency)
    }
}

impl From<Topology> for BTreeMap<SwitchId, Vec<SwitchId>> {
    fn from(topology: Topology) -> Self {
        topology.adjacency
    }
}

/// Build a validated topology from `(switch, neighbours)` pairs
pub fn from_adjacency_list(pairs: &[(u32, &[u32])]) -> Result<Topology, TopologyError> {
    Topology::from_adjacency(
        pairs
            .iter()
            .map(|(id, ns)| (SwitchId(*id), ns.iter().copied().map(SwitchId).collect()))
            .collect(),
    )
}

/// Builder for creating standard topologies over switches `1..=count`
pub struct TopologyBuilder {
    switch_count: u32,
}

impl TopologyBuilder {
    /// Create a builder with the given number of switches
    pub fn new(switch_count: u32) -> Self {
        assert!(switch_count > 0, "a topology needs at least one switch");
        Self { switch_count }
    }

    fn isolated(&self) -> (Topology, Vec<SwitchId>) {
        let ids = SwitchId::range_to(self.switch_count);
        let mut topology = Topology::new();
        for id in &ids {
            topology.add_switch(*id);
        }
        (topology, ids)
    }

    /// Build a line: 1 - 2 - 3 - ...
    pub fn line(self) -> Topology {
        let (mut topology, ids) = self.isolated();
        for pair in ids.windows(2) {
            topology.link(pair[0], pair[1]);
        }
        topology
    }

    /// Build a ring: 1 - 2 - ... - n - 1
    pub fn ring(self) -> Topology {
        let (mut topology, ids) = self.isolated();
        for i in 0..ids.len() {
            topology.link(ids[i], ids[(i + 1) % ids.len()]);
        }
        topology
    }

    /// Build a star with switch 1 in the center
    pub fn star(self) -> Topology {
        let (mut topology, ids) = self.isolated();
        for id in ids.iter().skip(1) {
            topology.link(ids[0], *id);
        }
        topology
    }

    /// Build a full mesh where every switch is linked to every other
    pub fn full_mesh(self) -> Topology {
        let (mut topology, ids) = self.isolated();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                topology.link(ids[i], ids[j]);
            }
        }
        topology
    }

    /// Build a grid with `columns` switches per row, numbered row by row
    pub fn grid(self, columns: u32) -> Topology {
        let columns = columns.max(1);
        let (mut topology, ids) = self.isolated();
        for (i, id) in ids.iter().enumerate() {
            let i = i as u32;
            if (i + 1) % columns != 0 && i + 1 < self.switch_count {
                topology.link(*id, ids[i as usize + 1]);
            }
            if i + columns < self.switch_count {
                topology.link(*id, ids[(i + columns) as usize]);
            }
        }
        topology
    }

    /// Build a random connected topology
    ///
    /// Every switch after the first links to a random earlier switch,
    /// then each remaining pair is linked with the given probability.
    /// The same seed always yields the same topology.
    pub fn random(self, extra_link_probability: f64, seed: Option<u64>) -> Topology {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let (mut topology, ids) = self.isolated();

        for i in 1..ids.len() {
            let parent = rng.random_range(0..i);
            topology.link(ids[parent], ids[i]);
        }
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if rng.random::<f64>() < extra_link_probability {
                    topology.link(ids[i], ids[j]);
                }
            }
        }
        topology
    }
}
