//! # Arbor Switch
//!
//! The per-switch spanning tree protocol engine.
//!
//! Every switch starts out believing it is the root. Neighbours exchange
//! [`ConfigMessage`]s carrying their current view, and each switch keeps
//! the best view it has heard until the whole network agrees on the
//! lowest ID as root and on a loop-free set of active links.
//!
//! ## Core Components
//!
//! - [`Switch`]: The protocol state machine for one switch
//! - [`RootView`]: Root, distance and next hop, plus the comparison rules
//! - [`ActiveLinks`]: Active links and the dependents that justify them
//! - [`SwitchSnapshot`]: Read-only copy of a switch's state
//!
//! Drivers restart every switch with [`Switch::restart`] and reseed after
//! a switch is dropped, so each phase converges from scratch on the
//! surviving topology.
//!
//! ## Message Handling
//!
//! On every delivered message a switch:
//!
//! 1. **COMPARE**: A lower root, a shorter path to the same root, or an
//!    equal path through a lower-ID neighbour is adopted
//! 2. **RESET**: If the next hop itself reports a different path, the
//!    switch claims root again instead of following it
//! 3. **LINKS**: `path_through = true` activates the link to the sender,
//!    `path_through = false` deactivates it unless it is the next hop
//! 4. **FORWARD**: With TTL left, a changed view is sent to every
//!    neighbour; an unchanged view is only sent back to a sender that
//!    would improve by hearing it
//!
//! ## Example
//!
//! ```rust
//! use std::collections::VecDeque;
//! use arbor_core::{ConfigMessage, SwitchId};
//! use arbor_switch::Switch;
//!
//! let mut a = Switch::new(SwitchId(1), [SwitchId(2)]);
//! let mut b = Switch::new(SwitchId(2), [SwitchId(1)]);
//!
//! let mut queue: VecDeque<ConfigMessage> = VecDeque::new();
//! a.announce(3, &mut queue);
//! b.announce(3, &mut queue);
//!
//! while let Some(msg) = queue.pop_front() {
//!     if msg.destination == a.id() {
//!         a.process_message(msg, &mut queue);
//!     } else {
//!         b.process_message(msg, &mut queue);
//!     }
//! }
//!
//! assert_eq!(a.log_string(), "1 - 2");
//! assert_eq!(b.log_string(), "2 - 1");
//! ```

pub mod links;
pub mod snapshot;
pub mod switch;
pub mod view;

// Re-export main types
pub use links::ActiveLinks;
pub use snapshot::SwitchSnapshot;
pub use switch::{ProcessOutcome, Switch, ViewChange};
pub use view::RootView;

// Re-export core types for convenience
pub use arbor_core::{ConfigMessage, Outbox, SwitchId};
