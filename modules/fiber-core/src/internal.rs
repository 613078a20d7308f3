//! Internal implementation details.
//!
//! Nothing here is part of the public contract; the types are `pub(crate)`
//! and may change without notice.

/// Coroutine state machine: body storage, schedule fencing, step driver.
pub mod machine;
/// Logical resource-pool stacks keyed by coroutine or worker identity.
pub mod scope_registry;
