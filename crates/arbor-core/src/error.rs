//! Error types for Arbor
//!
//! The protocol engine itself never returns errors: a message that does
//! not improve the local view is a normal outcome, and a message that
//! breaks the engine's contract (wrong destination, unknown origin,
//! exhausted TTL) is a driver bug and panics. The errors here cover the
//! driver boundary, where topologies and scenarios come from user input.

use thiserror::Error;

use crate::identity::SwitchId;

/// Top-level error type for Arbor
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
}

/// Errors related to switch identities
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid switch id: {0:?}")]
    InvalidFormat(String),
}

/// Errors found while validating an adjacency description
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Topology has no switches")]
    Empty,

    #[error("Switch {0} lists itself as a neighbor")]
    SelfLoop(SwitchId),

    #[error("Switch {switch} lists neighbor {neighbor} more than once")]
    DuplicateNeighbor { switch: SwitchId, neighbor: SwitchId },

    #[error("Switch {switch} lists unknown neighbor {neighbor}")]
    UnknownNeighbor { switch: SwitchId, neighbor: SwitchId },

    #[error("Link {from} -> {to} has no matching {to} -> {from}")]
    AsymmetricLink { from: SwitchId, to: SwitchId },

    #[error("Unknown switch: {0}")]
    UnknownSwitch(SwitchId),
}

/// Errors related to scenario descriptions
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid TTL {0}: scenarios need at least one hop")]
    InvalidTtl(u32),

    #[error("Drop list names unknown switch {0}")]
    UnknownDrop(SwitchId),

    #[error("Switch {0} is dropped more than once")]
    DuplicateDrop(SwitchId),

    #[error("Unknown built-in scenario: {0}")]
    UnknownBuiltin(String),

    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Scenario parse error: {0}")]
    Parse(String),

    #[error("Scenario I/O error: {0}")]
    Io(String),
}

/// Result type alias using ArborError
pub type ArborResult<T> = Result<T, ArborError>;
