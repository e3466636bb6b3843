//! Runtime observation hooks: the capability contract and its base implementation.
//!
//! This module groups the **observation surface** an [`Event`](crate::Event)
//! arms against and the reusable state behind it.
//!
//! ## Contents
//! - [`RuntimeHooks`], [`Action`] the capability contract and its boxed async callback type
//! - [`BaseHooks`] timers, byte counter, token set, fire chain, threshold bookkeeping
//!
//! ## Quick reference
//! - **Arming**: [`Event::arm`](crate::Event::arm) registers timers, thresholds,
//!   or polling loops against a hooks instance.
//! - **Observing**: the streaming pump reports relayed bytes through
//!   [`RuntimeHooks::record_bytes`], which fires exact byte thresholds inline.
//! - **Acting**: [`RuntimeHooks::fire`] runs the ordered action chain built by
//!   the orchestrator.

mod base;
mod contract;

pub use base::BaseHooks;
pub use contract::{action, Action, RuntimeHooks};
