//! coru-fiber-core-rs core library
//!
//! Cooperative coroutine engine with an actor abstraction layered on top, so
//! asynchronous operations can be written as straight-line sequential code.
//! The core is runtime-agnostic: it drives coroutine bodies itself and only
//! requires a [`api::dispatch::DispatchQueue`] implementation from the host
//! (see `coru-fiber-std-rs` for the Tokio-backed queue).
//!
//! # Key Features
//! - Coroutines with explicit suspend/resume carrying values both directions
//! - Queue-bound resumption: a suspended coroutine resumes on the queue that
//!   was driving it when it suspended
//! - Single-assignment promises (`Promise<T>`) awaited from coroutine bodies
//! - FIFO mailboxes and serialized actors with an auto-settling reply promise
//! - A scoped resource pool whose frames follow coroutine identity instead of
//!   worker identity across suspension points
//!
//! # Example Usage
//! ```ignore
//! use coru_fiber_core_rs::api::actor::{Actor, Behaviors};
//!
//! let actor = Actor::spawn(&binding, Behaviors::receive(|_ctx, envelope| async move {
//!   Ok(Payload::Int(envelope.int() * 2))
//! }));
//! let reply = actor.send(5);
//! ```

#![deny(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::redundant_field_names)]
#![deny(clippy::redundant_pattern)]
#![deny(clippy::redundant_static_lifetimes)]
#![deny(clippy::unnecessary_to_owned)]
#![deny(clippy::unnecessary_struct_initialization)]
#![deny(clippy::needless_borrow)]
#![deny(clippy::manual_ok_or)]
#![deny(clippy::manual_map)]
#![deny(clippy::manual_let_else)]
#![deny(clippy::manual_strip)]
#![deny(clippy::unused_async)]
#![deny(clippy::unnecessary_wraps)]
#![deny(clippy::unreachable)]
#![deny(clippy::empty_enum)]
#![deny(clippy::no_effect)]
#![deny(dropping_copy_types)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::print_stdout)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::clone_on_copy)]
#![deny(clippy::len_without_is_empty)]
#![deny(clippy::wrong_self_convention)]
#![deny(clippy::from_over_into)]
#![deny(clippy::eq_op)]
#![deny(clippy::bool_comparison)]
#![deny(clippy::needless_bool)]
#![deny(clippy::match_like_matches_macro)]
#![deny(clippy::manual_assert)]
#![deny(clippy::if_same_then_else)]

/// Public API for coroutines, dispatch bindings, promises, mailboxes and actors
pub mod api;
/// Internal implementation details
pub mod internal;

pub use api::actor::{Actor, ActorBehavior, ActorContext, ActorState, Behaviors};
pub use api::coroutine::{
  current_coroutine_id, Coroutine, CoroutineContext, CoroutineError, CoroutineId, CoroutineState, CoroutineStep, Fiber,
  UsageViolation,
};
pub use api::dispatch::{CurrentQueueScope, DispatchQueue, DispatchTimer, Job, QueueBinding, QueueId};
pub use api::mailbox::{Mailbox, RecvError, SendError};
pub use api::message::{Envelope, Payload};
pub use api::promise::Promise;
pub use api::sync::{CoLock, CoLockGuard};
