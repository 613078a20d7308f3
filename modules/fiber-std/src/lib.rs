//! A crate that provides the Tokio-backed dispatch queue for the coru fiber
//! runtime.
//!
//! `coru-fiber-core-rs` drives coroutines, promises, mailboxes and actors
//! against an abstract [`DispatchQueue`](coru_fiber_core_rs::DispatchQueue)
//! seam; this crate implements that seam with a serial queue drained by a
//! Tokio task, making the core usable in standard asynchronous runtime
//! environments.

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

mod serial_queue;

pub use serial_queue::{serial_binding, SerialQueueBuilder, TokioSerialQueue};

/// A prelude module that provides commonly used re-exported types and traits.
pub mod prelude {
  pub use coru_fiber_core_rs::{
    current_coroutine_id, Actor, ActorBehavior, ActorContext, ActorState, Behaviors, CoLock, Coroutine,
    CoroutineContext, CoroutineError, CoroutineState, CoroutineStep, DispatchQueue, DispatchTimer, Envelope, Fiber,
    Mailbox, Payload, Promise, QueueBinding,
  };

  pub use super::{serial_binding, SerialQueueBuilder, TokioSerialQueue};
}
