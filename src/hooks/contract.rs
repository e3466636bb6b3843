//! # The `RuntimeHooks` capability contract.
//!
//! [`RuntimeHooks`] is the per-node observation, scheduling, and action
//! surface an [`Event`](crate::Event) arms against. It exposes:
//! - **timers**: [`call_at`](RuntimeHooks::call_at) / [`call_later`](RuntimeHooks::call_later),
//!   one independent one-shot timer task per call;
//! - **metrics**: [`elapsed_ms`](RuntimeHooks::elapsed_ms),
//!   [`bytes_sent`](RuntimeHooks::bytes_sent), [`seen_token`](RuntimeHooks::seen_token);
//! - **action**: an ordered fire chain built with [`on_fire`](RuntimeHooks::on_fire)
//!   and run by [`fire`](RuntimeHooks::fire);
//! - **optional capability**: [`add_byte_threshold`](RuntimeHooks::add_byte_threshold)
//!   for exact, non-polling byte triggers. Implementations without it return
//!   `false` and armed byte events fall back to polling.
//!
//! ## Rules
//! - Actions are appended, never replaced: the chain runs in registration
//!   order and a misbehaving earlier action does not stop later ones.
//! - `record_bytes` is the single counting entry point; supporting
//!   implementations fire thresholds inline, before the call returns.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use frac::{action, BaseHooks, RuntimeHooks};
//!
//! # async fn demo() {
//! let hooks = Arc::new(BaseHooks::new());
//! hooks.on_fire(action(|| async { println!("condition met"); }));
//! hooks.record_bytes(1024).await; // fires any threshold in (0, 1024]
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::future::BoxFuture;

/// A boxed async callback, shareable across timer tasks and fire chains.
///
/// Each invocation produces a fresh future, so one action can be scheduled,
/// polled, and fired from several places without shared mutable state.
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into an [`Action`].
///
/// # Example
/// ```
/// use frac::action;
///
/// let hello = action(|| async { println!("fired"); });
/// # drop(hello);
/// ```
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// # Per-node observation, scheduling, and action surface.
///
/// Events arm their trigger conditions against this contract; orchestrators
/// bind kill/resurrect actions through it. See the module docs for the rules.
#[async_trait]
pub trait RuntimeHooks: Send + Sync + 'static {
    /// Schedules `act` to run once at or after the given wall-clock time.
    ///
    /// A timestamp in the past clamps the delay to zero (fires as soon as
    /// possible, never a negative delay). The caller is never blocked.
    fn call_at(&self, when: SystemTime, act: Action);

    /// Schedules `act` to run once after `delay`. The caller is never blocked.
    fn call_later(&self, delay: Duration, act: Action);

    /// Milliseconds since this hooks instance was constructed.
    ///
    /// Backed by a monotonic clock: never decreases.
    fn elapsed_ms(&self) -> u64;

    /// Cumulative bytes registered via [`record_bytes`](Self::record_bytes).
    fn bytes_sent(&self) -> u64;

    /// Registers `n` relayed bytes and fires every pending byte threshold
    /// whose value lies in `(before, before + n]`, exactly once each,
    /// removing it from the pending set.
    ///
    /// Comparing the counter before and after the addition keeps thresholds
    /// exact for multi-byte chunks: a threshold landing strictly between two
    /// counter values is never missed, and never double-fired.
    async fn record_bytes(&self, n: u64);

    /// Returns true iff `token` has been marked seen since construction.
    fn seen_token(&self, token: &str) -> bool;

    /// Marks `token` as seen. The token set is monotonic: once seen, always seen.
    fn add_token(&self, token: &str);

    /// Appends `act` to the fire chain. Actions run in registration order.
    fn on_fire(&self, act: Action);

    /// Runs the fire chain, awaiting each action in registration order.
    ///
    /// No-op when the chain is empty. "At most once per arming" is enforced
    /// by the armed event's latch, not here: firing twice from two
    /// independent armings runs the chain twice by design.
    async fn fire(&self);

    /// Registers an exact byte threshold, if this implementation supports it.
    ///
    /// Returns `false` when unsupported; callers then fall back to polling
    /// [`bytes_sent`](Self::bytes_sent). Supporting implementations must fire
    /// `act` the instant cumulative bytes cross `threshold`, exactly once,
    /// then deregister it.
    fn add_byte_threshold(&self, threshold: u64, act: Action) -> bool {
        let _ = (threshold, act);
        false
    }
}
