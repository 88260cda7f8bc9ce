//! # Arbor Core
//!
//! Core types, traits, and errors shared by the Arbor spanning tree stack.
//!
//! The protocol engine (`arbor-switch`) and the drivers
//! (`arbor-simulation`) only agree on what is defined here, so either
//! side can be replaced without touching the other.
//!
//! ## Key Types
//!
//! - [`SwitchId`]: Ordered identity of a switch; lower IDs win root elections
//! - [`ConfigMessage`]: A configuration message exchanged between neighbours
//!
//! ## Key Traits
//!
//! - [`Outbox`]: Capability a switch uses to hand messages to its driver

pub mod error;
pub mod identity;
pub mod message;
pub mod traits;

// Re-export main types
pub use error::*;
pub use identity::*;
pub use message::*;
pub use traits::*;
