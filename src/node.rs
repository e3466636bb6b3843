//! # Node abstraction: what fault injection can kill and resurrect.
//!
//! A [`Node`] is an opaque handle to a controllable target — a local child
//! process, or whatever a plugin backend wraps (a container, a remote
//! service, a VM). The trait deliberately says nothing about *how* the
//! target dies or comes back; that is the backend's business.
//!
//! ## Rules
//! - `kill` and `resurrect` are **idempotent**: calling either when the
//!   target is already in that state is a safe no-op, never a panic or
//!   corrupted state. Armed events have no cancellation, so a late firing
//!   against an already-dead target must be harmless.
//! - Expected races (target exited on its own, pipe already closed) are
//!   swallowed inside the implementation. Only genuine configuration or
//!   spawn failures surface as [`FracError`].
//!
//! ## Example
//! ```
//! use async_trait::async_trait;
//! use std::any::Any;
//! use std::sync::Arc;
//! use frac::{FracError, Node};
//!
//! struct ContainerNode { id: String }
//!
//! #[async_trait]
//! impl Node for ContainerNode {
//!     fn name(&self) -> &str { &self.id }
//!
//!     async fn kill(&self) -> Result<(), FracError> {
//!         // stop the container...
//!         Ok(())
//!     }
//!
//!     async fn resurrect(&self) -> Result<(), FracError> {
//!         // start it again...
//!         Ok(())
//!     }
//!
//!     fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FracError;

/// # A killable, resurrectable target.
///
/// See the module docs for the idempotence rules.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    /// Returns a stable, human-readable node name.
    fn name(&self) -> &str;

    /// Terminates or crashes this node. Safe no-op when already down.
    async fn kill(&self) -> Result<(), FracError>;

    /// Brings this node back online. Safe no-op or fresh start when not down.
    async fn resurrect(&self) -> Result<(), FracError>;

    /// Upcast for plugin boundaries: lets a backend validate it was handed
    /// its own concrete node type before wrapping it in hooks.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
