//! Switch context injection
//!
//! Thread-local storage for the identity of the switch currently being
//! driven, so that spans opened while a switch processes a message carry
//! its ID and the run it belongs to.

use std::cell::RefCell;

use arbor_core::SwitchId;
use uuid::Uuid;

/// Switch context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchContextData {
    /// The switch being driven
    pub switch_id: SwitchId,
    /// Unique ID of the simulation run
    pub instance_id: Uuid,
}

thread_local! {
    static SWITCH_CONTEXT: RefCell<Option<SwitchContextData>> = const { RefCell::new(None) };
}

/// RAII guard for switch context
///
/// Sets the switch context for the current thread on creation and
/// restores the previous context (if any) when dropped.
///
/// # Example
///
/// ```
/// use arbor_core::SwitchId;
/// use arbor_logging::context::SwitchContextGuard;
///
/// {
///     let _guard = SwitchContextGuard::new(SwitchId(3));
///     assert_eq!(SwitchContextGuard::current_switch_id(), Some(SwitchId(3)));
/// }
/// assert!(SwitchContextGuard::current_switch_id().is_none());
/// ```
pub struct SwitchContextGuard {
    previous: Option<SwitchContextData>,
}

impl SwitchContextGuard {
    /// Set the context for `switch_id` with a fresh instance ID
    pub fn new(switch_id: SwitchId) -> Self {
        Self::with_instance_id(switch_id, Uuid::new_v4())
    }

    /// Set the context for `switch_id` within an existing run
    pub fn with_instance_id(switch_id: SwitchId, instance_id: Uuid) -> Self {
        let previous = SWITCH_CONTEXT.with(|ctx| {
            ctx.borrow_mut().replace(SwitchContextData {
                switch_id,
                instance_id,
            })
        });
        Self { previous }
    }

    /// Get the current switch context (if any)
    pub fn current() -> Option<SwitchContextData> {
        SWITCH_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current switch ID (if set)
    pub fn current_switch_id() -> Option<SwitchId> {
        Self::current().map(|ctx| ctx.switch_id)
    }

    /// Get the current instance ID (if set)
    pub fn current_instance_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.instance_id)
    }
}

impl Drop for SwitchContextGuard {
    fn drop(&mut self) {
        SWITCH_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block with the switch context set and a `switch` span entered
///
/// ```ignore
/// with_switch_context!(switch_id, run_id, {
///     switch.process_message(msg, &mut queue)
/// })
/// ```
#[macro_export]
macro_rules! with_switch_context {
    ($switch:expr, $instance:expr, $body:block) => {{
        let _guard = $crate::context::SwitchContextGuard::with_instance_id($switch, $instance);
        let _span = $crate::tracing::debug_span!("switch", switch = %$switch).entered();
        $body
    }};
}
