//! Local realization: a child process as the fault-injection target.
//!
//! This module implements the [`Node`](crate::Node) and
//! [`RuntimeHooks`](crate::RuntimeHooks) contracts for a local subprocess
//! whose stdout is streamed through byte by byte, so a byte-count trigger
//! fires at an exact output offset.
//!
//! ## Contents
//! - [`LocalProcessNode`], [`FaultMode`] child-process lifecycle: spawn,
//!   terminate or suspend, resurrect, input backlog, best-effort stdout drain
//! - [`LocalStreamingHooks`] the byte source of truth: concurrent stdin
//!   feeder plus a one-byte-at-a-time stdout relay with exact threshold firing
//! - [`split_command`] quote-aware command-line splitting
//!
//! ## Wiring
//! ```text
//! input ──► feeder task ──► child stdin          (8 KiB chunks; backlog while suspended)
//!                             child stdout ──► pump loop ──► output sink
//!                                                │   (1 byte at a time)
//!                                                └─► record_bytes() ──► exact thresholds
//! ```

mod process;
mod streaming;

pub use process::{split_command, FaultMode, LocalProcessNode};
pub use streaming::LocalStreamingHooks;
