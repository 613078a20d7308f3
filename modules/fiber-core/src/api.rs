//! Public API surface.
//!
//! Modules are layered bottom-up: `dispatch` supplies the queue seam the rest
//! of the crate schedules onto, `coroutine` owns the execution engine,
//! `promise`/`mailbox`/`message` are the cross-coroutine data plane, and
//! `actor` ties them together into serialized message handling. `scope_pool`
//! and `sync` are orthogonal utilities used by the other layers.

/// Actor: a coroutine bound to one queue and one mailbox, with serialized handling
pub mod actor;
/// Coroutine engine: creation, suspend/resume, cancellation, error propagation
pub mod coroutine;
/// Execution-queue bindings, current-queue tracking and repeating timers
pub mod dispatch;
/// Ordered multi-producer single-consumer envelope queues
pub mod mailbox;
/// Tagged payload values and actor message envelopes
pub mod message;
/// Single-assignment promises settled at most once
pub mod promise;
/// Scoped resource pool frames keyed by coroutine identity
pub mod scope_pool;
/// Binary lock with scope-guaranteed release
pub mod sync;
/// Thread-backed dispatch queue for tests and runtime-free hosts
pub mod test_support;
