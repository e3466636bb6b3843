//! # frac
//!
//! **frac** is a lightweight fault-injection harness for controlled
//! experiments: declare *"when condition C holds, kill target T"* — and,
//! symmetrically, *"when condition C holds, bring T back"*.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//!     │    Event     │     │   RuntimeHooks   │     │     Node     │
//!     │ (when: time, │     │ (observe: bytes, │     │ (what: kill, │
//!     │  delay,      │────►│  tokens, clock;  │     │  resurrect)  │
//!     │  bytes,      │ arm │  act: fire chain)│     └──────▲───────┘
//!     │  token)      │     └────────▲─────────┘            │
//!     └──────────────┘              │                      │
//!                     ┌─────────────┴──────────────────────┴──┐
//!                     │  Frac (orchestrator)                  │
//!                     │  inject:    on_fire(kill) + arm       │
//!                     │  resurrect: on_fire(resurrect) + arm  │
//!                     └───────────────────────────────────────┘
//!
//! Local realization:
//!
//!   input ──► feeder task ──► LocalProcessNode stdin
//!                               LocalProcessNode stdout ──► pump (1 byte at
//!                               a time) ──► output sink
//!                                   │
//!                                   └─► record_bytes() ──► exact byte
//!                                       thresholds fire inline
//! ```
//!
//! ### Firing path
//! ```text
//! Event::arm(hooks)
//!   ├─ Time/Delay  ──► one-shot timer task ─────────────┐
//!   ├─ Bytes       ──► add_byte_threshold (exact)       ├──► fire-once latch
//!   │                   └─ fallback: poll bytes_sent()  │      └─► hooks.fire()
//!   └─ Token       ──► poll seen_token()  ──────────────┘            └─► action
//!                                                                        chain in
//!                                                                        order
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types / traits                           |
//! |-----------------|--------------------------------------------------------------|----------------------------------------------|
//! | **Triggers**    | Closed trigger vocabulary with at-most-once firing.          | [`Event`], [`Trigger`]                       |
//! | **Observation** | Scheduling, metrics, and the fire chain events arm against.  | [`RuntimeHooks`], [`BaseHooks`], [`Action`]  |
//! | **Targets**     | Killable/resurrectable targets with idempotent transitions.  | [`Node`], [`LocalProcessNode`], [`FaultMode`]|
//! | **Orchestration**| Binds a node, an event, and hooks into a kill or resurrect. | [`Frac`], [`LocalFrac`]                      |
//! | **Streaming**   | Exact byte-offset kills on a live stdout stream.             | [`LocalStreamingHooks`]                      |
//! | **Plugins**     | Factory contract for non-local backends.                     | [`Plugin`], [`PluginRegistry`]               |
//! | **Errors**      | Fatal configuration/spawn errors with stable labels.         | [`FracError`]                                |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use frac::{
//!     Event, FaultMode, Frac, FracConfig, LocalFrac, LocalProcessNode, LocalStreamingHooks,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = FracConfig::default();
//!     let node = Arc::new(LocalProcessNode::new(
//!         vec!["cat".into()],
//!         FaultMode::Terminate,
//!         &cfg,
//!     )?);
//!     node.start().await?;
//!
//!     let hooks = LocalStreamingHooks::new(node.clone(), &cfg);
//!
//!     // Kill the process the instant it has produced 5 bytes of output.
//!     LocalFrac.inject(node.clone(), &Event::bytes(5), hooks.clone()).await;
//!
//!     let forwarded = hooks
//!         .pump_data(tokio::io::stdin(), tokio::io::stdout())
//!         .await;
//!     eprintln!("forwarded {forwarded} bytes");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod frac;
mod hooks;
mod local;
mod node;
mod plugin;
mod signals;

// ---- Public re-exports ----

pub use config::FracConfig;
pub use error::FracError;
pub use events::{Event, Trigger, DEFAULT_POLL_INTERVAL};
pub use frac::{Frac, LocalFrac};
pub use hooks::{action, Action, BaseHooks, RuntimeHooks};
pub use local::{split_command, FaultMode, LocalProcessNode, LocalStreamingHooks};
pub use node::Node;
pub use plugin::{LocalPlugin, Plugin, PluginRegistry};
pub use signals::wait_for_shutdown_signal;
