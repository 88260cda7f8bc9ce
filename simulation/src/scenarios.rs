//! Scenario descriptions and the built-in edge-case suite
//!
//! A scenario is a topology, a TTL for every message, and an ordered
//! list of switches to drop after the initial convergence. Scenarios
//! load from JSON:
//!
//! ```text
//! {
//!   "name": "bidirectional",
//!   "topology": { "1": [2], "2": [1, 3, 4], "3": [2, 5], ... },
//!   "ttl": 3,
//!   "drops": [1]
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use arbor_core::{ArborResult, ScenarioError, SwitchId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::{SimConfig, Simulation};
use crate::topology::{Topology, from_adjacency_list};
use crate::types::SimEvent;

/// A topology, a TTL and the switches to drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub topology: Topology,
    pub ttl: u32,
    #[serde(default)]
    pub drops: Vec<SwitchId>,
}

/// Names of the built-in scenarios, in listing order
const BUILTIN_NAMES: &[&str] = &[
    "line",
    "bidirectional",
    "tie-breaking",
    "path-through",
    "active-links",
    "active-to-inactive",
    "multiple-paths",
];

impl Scenario {
    /// Create a scenario with no drops
    pub fn new(name: impl Into<String>, topology: Topology, ttl: u32) -> Self {
        Self {
            name: name.into(),
            topology,
            ttl,
            drops: Vec::new(),
        }
    }

    /// Set the drop list
    pub fn with_drops(mut self, drops: impl IntoIterator<Item = u32>) -> Self {
        self.drops = drops.into_iter().map(SwitchId).collect();
        self
    }

    /// Replace the drop list with a comma-separated list of IDs
    ///
    /// An empty string clears the list. The result is validated.
    pub fn with_drop_list(mut self, list: &str) -> ArborResult<Self> {
        self.drops = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<SwitchId>)
            .collect::<Result<Vec<_>, _>>()?;
        self.validate()?;
        Ok(self)
    }

    /// Replace the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Check the TTL and the drop list against the topology
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.ttl == 0 {
            return Err(ScenarioError::InvalidTtl(self.ttl));
        }
        let mut seen = BTreeSet::new();
        for drop in &self.drops {
            if !self.topology.contains(*drop) {
                return Err(ScenarioError::UnknownDrop(*drop));
            }
            if !seen.insert(*drop) {
                return Err(ScenarioError::DuplicateDrop(*drop));
            }
        }
        Ok(())
    }

    /// Parse and validate a scenario from JSON
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            serde_json::from_str(json).map_err(|e| ScenarioError::Parse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file, naming it after the file if it has no name
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(format!("{}: {}", path.display(), e)))?;
        let mut scenario = Self::from_json_str(&json)?;
        if scenario.name.is_empty() {
            scenario.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(scenario)
    }

    /// Serialize as pretty JSON
    pub fn to_json_string(&self) -> Result<String, ScenarioError> {
        serde_json::to_string_pretty(self).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// Resolve a built-in name or, failing that, a scenario file path
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Ok(scenario) => Ok(scenario),
            Err(ScenarioError::UnknownBuiltin(_)) if Path::new(name_or_path).exists() => {
                Self::from_path(name_or_path)
            }
            Err(e) => Err(e),
        }
    }

    /// Names of the built-in scenarios
    pub fn builtin_names() -> &'static [&'static str] {
        BUILTIN_NAMES
    }

    /// Look up a built-in scenario by name
    pub fn builtin(name: &str) -> Result<Self, ScenarioError> {
        let scenario = match name {
            // 1 - 2 - 3
            "line" => Self::new(name, from_adjacency_list(&[(1, &[2]), (2, &[1, 3]), (3, &[2])])?, 3),

            //      1
            //      |
            //      2
            //     / \
            //    3   4
            //   /     \
            //  5       6
            "bidirectional" => Self::new(
                name,
                from_adjacency_list(&[
                    (1, &[2]),
                    (2, &[1, 3, 4]),
                    (3, &[2, 5]),
                    (4, &[2, 6]),
                    (5, &[3]),
                    (6, &[4]),
                ])?,
                3,
            )
            .with_drops([1]),

            //    1
            //   / \
            //  2   3
            //  |   |
            //  4---5
            //  |   |
            //  6   7
            "tie-breaking" => Self::new(
                name,
                from_adjacency_list(&[
                    (1, &[2, 3]),
                    (2, &[1, 4]),
                    (3, &[1, 5]),
                    (4, &[2, 5, 6]),
                    (5, &[3, 4, 7]),
                    (6, &[4]),
                    (7, &[5]),
                ])?,
                4,
            ),

            // 1 - 2 - 3
            // |       |
            // 4 - 5 - 6
            "path-through" => Self::new(
                name,
                from_adjacency_list(&[
                    (1, &[2, 4]),
                    (2, &[1, 3]),
                    (3, &[2, 6]),
                    (4, &[1, 5]),
                    (5, &[4, 6]),
                    (6, &[3, 5]),
                ])?,
                3,
            )
            .with_drops([1]),

            "active-links" => Self::new(
                name,
                from_adjacency_list(&[
                    (1, &[2, 4, 6]),
                    (2, &[1, 3, 4, 5]),
                    (3, &[2, 5, 8]),
                    (4, &[1, 2, 6, 7]),
                    (5, &[2, 3, 7, 8]),
                    (6, &[1, 4, 7]),
                    (7, &[4, 5, 6, 8]),
                    (8, &[3, 5, 7]),
                ])?,
                3,
            )
            .with_drops([2]),

            "active-to-inactive" => Self::new(
                name,
                from_adjacency_list(&[
                    (1, &[2, 3]),
                    (2, &[1, 3, 4, 5]),
                    (3, &[1, 2, 4, 6]),
                    (4, &[2, 3, 5, 6]),
                    (5, &[2, 4, 6]),
                    (6, &[3, 4, 5]),
                ])?,
                2,
            )
            .with_drops([1, 3]),

            "multiple-paths" => Self::new(
                name,
                from_adjacency_list(&[
                    (1, &[2, 3, 4]),
                    (2, &[1, 3, 5]),
                    (3, &[1, 2, 4, 5]),
                    (4, &[1, 3, 5, 6, 7]),
                    (5, &[2, 3, 4, 6, 8]),
                    (6, &[4, 5, 7, 8]),
                    (7, &[4, 6]),
                    (8, &[5, 6]),
                ])?,
                4,
            )
            .with_drops([3]),

            other => return Err(ScenarioError::UnknownBuiltin(other.to_string())),
        };
        Ok(scenario)
    }
}

/// Run a scenario phase by phase, printing progress as it goes
pub fn run_narrated(scenario: &Scenario, config: SimConfig) -> Result<Simulation, ScenarioError> {
    info!(scenario = %scenario.name, "=== Running scenario ===");
    println!("{}", scenario.topology.visualize());
    println!("TTL: {}  Drops: {:?}", scenario.ttl, scenario.drops);

    let mut sim = Simulation::from_scenario(scenario, config)?;

    println!("\n--- Phase 0: every switch claims root ---");
    sim.seed();
    sim.run_until_quiescent();
    print_phase(&sim);

    for drop in &scenario.drops {
        println!("\n--- Phase {}: switch {} drops ---", sim.phase() + 1, drop);
        let notified = sim.drop_switch(*drop)?;
        println!("  Notified former neighbors: {:?}", notified);
        sim.run_until_quiescent();
        print_phase(&sim);
    }

    println!("\n=== Final Statistics ===");
    println!("  Messages sent: {}", sim.stats.messages_sent);
    println!("  Messages delivered: {}", sim.stats.messages_delivered);
    println!("  Messages discarded: {}", sim.stats.messages_discarded);
    println!("  Improvements: {}", sim.stats.improvements);
    println!("  Resets: {}", sim.stats.resets);
    println!("  Replies: {}", sim.stats.replies);

    println!("\n=== Log Lines ===");
    for line in sim.log_lines() {
        println!("  {}", line);
    }

    Ok(sim)
}

fn print_phase(sim: &Simulation) {
    let changes = sim
        .events_in_phase(sim.phase())
        .filter(|e| matches!(e, SimEvent::ViewChanged { .. }))
        .count();
    println!("  {}", sim.state_summary());
    println!("  View changes this phase: {}", changes);
    for switch in sim.switches() {
        println!(
            "    {}: root {} distance {} via {}",
            switch.id(),
            switch.root(),
            switch.distance(),
            switch.next_hop()
        );
    }
}
