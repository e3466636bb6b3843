//! Trigger events: when to kill or resurrect.
//!
//! This module holds the closed trigger vocabulary and the arming logic that
//! connects a trigger to a [`RuntimeHooks`](crate::RuntimeHooks) instance.
//!
//! ## Contents
//! - [`Trigger`] the four trigger conditions (time, delay, bytes, token)
//! - [`Event`] a trigger plus its polling interval, with the `arm()` entry point
//!
//! ## Quick reference
//! - **Producers**: the CLI builds events from `--event`/`--ms`/`--bytes`/`--token`,
//!   library callers use the `Event::delay`/`bytes`/`token`/`time` constructors.
//! - **Consumers**: [`Frac`](crate::Frac) arms an event against a hooks
//!   instance after installing the kill or resurrect action.

mod event;

pub use event::{Event, Trigger, DEFAULT_POLL_INTERVAL};
