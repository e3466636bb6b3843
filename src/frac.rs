//! # Frac: the orchestrator binding nodes, events, and hooks.
//!
//! [`Frac`] wires a [`Node`], an [`Event`], and a [`RuntimeHooks`] triple
//! together: "when the condition holds, kill (or resurrect) the target".
//! It is stateless — each call composes the action onto the hooks' fire
//! chain and arms the event, then gets out of the way.
//!
//! ## Composition
//! ```text
//! inject(node, event, hooks):
//!   hooks.on_fire(kill(node))        ◄── appended, never replaces the chain
//!   event.arm(hooks)
//!
//! schedule_resurrection(node, event, hooks):
//!   hooks.on_fire(resurrect(node))   ◄── prior chain still runs first
//!   event.arm(hooks)
//! ```
//!
//! The fire chain is an ordered list of actions, so composing a resurrection
//! on top of an existing chain is explicit and inspectable: the original
//! actions run first, the resurrection runs after them, and a misbehaving
//! earlier action cannot prevent the resurrection (each action only logs its
//! own failure).
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use frac::{Event, Frac, LocalFrac, Node, RuntimeHooks};
//!
//! # async fn demo(node: Arc<dyn Node>, hooks: Arc<dyn RuntimeHooks>) {
//! LocalFrac.inject(node, &Event::delay(30_000), hooks).await;
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;

use crate::error::FracError;
use crate::events::Event;
use crate::hooks::{Action, RuntimeHooks};
use crate::node::Node;

/// # Stateless orchestrator: binds a trigger condition to a kill or resurrect.
///
/// The default methods implement the composition rules above; backends only
/// override them when they need extra coordination around arming.
#[async_trait]
pub trait Frac: Send + Sync + 'static {
    /// Arms `event` against `hooks` so that firing kills `target`.
    async fn inject(&self, target: Arc<dyn Node>, event: &Event, hooks: Arc<dyn RuntimeHooks>) {
        hooks.on_fire(kill_action(target));
        event.arm(hooks);
    }

    /// Arms `event` against `hooks` so that firing also resurrects `target`.
    ///
    /// The pre-existing fire chain is preserved and runs first; the
    /// resurrection is appended, so it runs even if an earlier action
    /// misbehaves.
    async fn schedule_resurrection(
        &self,
        target: Arc<dyn Node>,
        event: &Event,
        hooks: Arc<dyn RuntimeHooks>,
    ) {
        hooks.on_fire(resurrect_action(target));
        event.arm(hooks);
    }

    /// Resurrects `target` immediately, bypassing event arming.
    async fn resurrect(&self, target: Arc<dyn Node>) -> Result<(), FracError> {
        target.resurrect().await
    }
}

/// Orchestrator for local process nodes; the default composition is all it needs.
pub struct LocalFrac;

#[async_trait]
impl Frac for LocalFrac {}

fn kill_action(target: Arc<dyn Node>) -> Action {
    Arc::new(move || {
        let target = target.clone();
        Box::pin(async move {
            if let Err(err) = target.kill().await {
                warn!("kill of {} failed: {err}", target.name());
            }
        })
    })
}

fn resurrect_action(target: Arc<dyn Node>) -> Action {
    Arc::new(move || {
        let target = target.clone();
        Box::pin(async move {
            if let Err(err) = target.resurrect().await {
                warn!("resurrection of {} failed: {err}", target.name());
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{action, BaseHooks};
    use std::any::Any;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct StubNode {
        kills: AtomicU64,
        resurrections: AtomicU64,
    }

    #[async_trait]
    impl Node for StubNode {
        fn name(&self) -> &str {
            "stub"
        }

        async fn kill(&self) -> Result<(), FracError> {
            self.kills.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resurrect(&self) -> Result<(), FracError> {
            self.resurrections.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test]
    async fn test_inject_kills_exactly_once_on_fire() {
        let node = Arc::new(StubNode::default());
        let hooks: Arc<dyn RuntimeHooks> = Arc::new(BaseHooks::new());

        LocalFrac
            .inject(node.clone(), &Event::delay(20), hooks)
            .await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(node.kills.load(Ordering::SeqCst), 1);
        assert_eq!(node.resurrections.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delay_kill_respects_timing_window() {
        let node = Arc::new(StubNode::default());
        let hooks: Arc<dyn RuntimeHooks> = Arc::new(BaseHooks::new());

        let armed_at = Instant::now();
        LocalFrac
            .inject(node.clone(), &Event::delay(100), hooks)
            .await;

        while node.kills.load(Ordering::SeqCst) == 0 {
            assert!(armed_at.elapsed() < Duration::from_secs(2), "kill never fired");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let elapsed = armed_at.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "killed early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(800), "killed late: {elapsed:?}");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(node.kills.load(Ordering::SeqCst), 1, "exactly once");
    }

    #[tokio::test]
    async fn test_schedule_resurrection_preserves_existing_chain() {
        let node = Arc::new(StubNode::default());
        let hooks: Arc<dyn RuntimeHooks> = Arc::new(BaseHooks::new());

        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let order = order.clone();
            hooks.on_fire(action(move || {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push("original");
                }
            }));
        }

        LocalFrac
            .schedule_resurrection(node.clone(), &Event::delay(20), hooks)
            .await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(node.resurrections.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["original"], "prior chain ran first");
    }

    #[tokio::test]
    async fn test_direct_resurrect_bypasses_arming() {
        let node = Arc::new(StubNode::default());
        LocalFrac.resurrect(node.clone()).await.unwrap();
        assert_eq!(node.resurrections.load(Ordering::SeqCst), 1);
    }
}
