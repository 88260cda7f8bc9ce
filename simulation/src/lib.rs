//! # Arbor Simulation
//!
//! Drives networks of [`arbor_switch::Switch`]es to a spanning tree and
//! through scripted switch failures.
//!
//! ## Overview
//!
//! Every switch starts out claiming to be root. Configuration messages
//! spread the lowest ID, and each switch settles on a shortest path
//! toward it. Dropping a switch forces its neighbours to repair the
//! tree. The outcome of a run is one log line per surviving switch
//! listing its active links.
//!
//! ## Architecture
//!
//! - **Topology** (`topology.rs`): Validated adjacency maps and generators
//! - **Scenarios** (`scenarios.rs`): Scenario files and the built-in suite
//! - **Simulation** (`simulation.rs`): Deterministic FIFO driver
//! - **Actor** (`actor.rs`): One tokio task per switch
//! - **Analysis** (`analysis.rs`): Convergence verification
//! - **Types** (`types.rs`): Events and statistics
//!
//! ## Example: Root Drop in a Y
//!
//! ```rust
//! use arbor_simulation::{Scenario, SimConfig, run_scenario};
//!
//! let scenario = Scenario::builtin("bidirectional").unwrap();
//! let sim = run_scenario(&scenario, SimConfig::default()).unwrap();
//!
//! assert_eq!(
//!     sim.log_lines(),
//!     vec!["2 - 3, 2 - 4", "3 - 2, 3 - 5", "4 - 2, 4 - 6", "5 - 3", "6 - 4"]
//! );
//! ```

pub mod actor;
pub mod analysis;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod types;

// Re-export main types
pub use actor::{ActorError, ActorNetwork};
pub use analysis::{ConvergenceReport, Violation, verify};
pub use scenarios::{Scenario, run_narrated};
pub use simulation::{SimConfig, Simulation, SimulationReport, run_scenario};
pub use topology::{Topology, TopologyBuilder, from_adjacency_list};
pub use types::{SimEvent, SimStats};

// Re-export core types for integration
pub use arbor_core::{ScenarioError, SwitchId, TopologyError};
