//! # Trigger events.
//!
//! An [`Event`] is an immutable trigger specification: *when* the bound
//! action should run. The four conditions form a closed vocabulary
//! ([`Trigger`]), so adding a condition is a compile-time change, not a
//! subclassing exercise.
//!
//! ## Arming
//! ```text
//! Trigger::Time   ──► hooks.call_at(at, fire)
//! Trigger::Delay  ──► hooks.call_later(ms, fire)
//! Trigger::Bytes  ──► hooks.add_byte_threshold(n, fire)     (exact, non-polling)
//!                       └─ unsupported? poll bytes_sent() >= n every poll_interval
//! Trigger::Token  ──► poll seen_token(tok) every poll_interval
//! ```
//!
//! Each arming installs a fresh fired-latch, so the bound action runs **at
//! most once per arming** on both the capability and the polling path.
//! Events carry no target reference: the target is bound through the hooks'
//! fire chain by the orchestrator.
//!
//! The polling interval is a per-event parameter (default 50 ms) so tests
//! can arm with a near-zero interval instead of waiting out a module-wide
//! constant. Polling trades firing granularity for universality: any hooks
//! implementation gets byte and token triggers with zero extra work.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use frac::{BaseHooks, Event, RuntimeHooks};
//!
//! let hooks: Arc<dyn RuntimeHooks> = Arc::new(BaseHooks::new());
//! Event::bytes(4096)
//!     .with_poll_interval(Duration::from_millis(5))
//!     .arm(hooks);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::hooks::{Action, RuntimeHooks};

/// Default interval for events on the polling fallback path.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The trigger condition of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Fire at an absolute wall-clock time (past times fire immediately).
    Time {
        /// The wall-clock deadline.
        at: SystemTime,
    },
    /// Fire after a relative delay.
    Delay {
        /// Delay in milliseconds.
        ms: u64,
    },
    /// Fire when cumulative output bytes reach a threshold.
    Bytes {
        /// The byte threshold.
        threshold: u64,
    },
    /// Fire when a literal token has been seen.
    Token {
        /// The token to watch for.
        token: String,
    },
}

/// An immutable trigger specification; fires its bound action at most once per arming.
#[derive(Debug, Clone)]
pub struct Event {
    trigger: Trigger,
    poll_interval: Duration,
}

impl Event {
    /// Event firing at an absolute wall-clock time.
    pub fn time(at: SystemTime) -> Self {
        Self::new(Trigger::Time { at })
    }

    /// Event firing after `ms` milliseconds.
    pub fn delay(ms: u64) -> Self {
        Self::new(Trigger::Delay { ms })
    }

    /// Event firing the instant cumulative output reaches `threshold` bytes.
    pub fn bytes(threshold: u64) -> Self {
        Self::new(Trigger::Bytes { threshold })
    }

    /// Event firing once `token` has been seen.
    pub fn token(token: impl Into<String>) -> Self {
        Self::new(Trigger::Token {
            token: token.into(),
        })
    }

    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the interval used when this event has to fall back to polling.
    #[inline]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the trigger condition.
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Arms this event against `hooks` so that satisfying the condition runs
    /// `hooks.fire()` at most once.
    pub fn arm(&self, hooks: Arc<dyn RuntimeHooks>) {
        let fire = fire_once(hooks.clone());
        match &self.trigger {
            Trigger::Time { at } => hooks.call_at(*at, fire),
            Trigger::Delay { ms } => hooks.call_later(Duration::from_millis(*ms), fire),
            Trigger::Bytes { threshold } => {
                let threshold = *threshold;
                if !hooks.add_byte_threshold(threshold, fire.clone()) {
                    poll_until(
                        hooks,
                        self.poll_interval,
                        move |h| h.bytes_sent() >= threshold,
                        fire,
                    );
                }
            }
            Trigger::Token { token } => {
                let token = token.clone();
                poll_until(
                    hooks,
                    self.poll_interval,
                    move |h| h.seen_token(&token),
                    fire,
                );
            }
        }
    }
}

/// Wraps `hooks.fire()` behind a fresh latch: at most one firing per arming.
fn fire_once(hooks: Arc<dyn RuntimeHooks>) -> Action {
    let fired = Arc::new(AtomicBool::new(false));
    Arc::new(move || {
        let hooks = hooks.clone();
        let fired = fired.clone();
        Box::pin(async move {
            if !fired.swap(true, Ordering::SeqCst) {
                hooks.fire().await;
            }
        })
    })
}

/// Re-checks `condition` every `interval` until it holds, then fires.
///
/// One spawned task per armed event; there is no cancellation — an armed
/// event polls until satisfied or until the runtime is torn down.
fn poll_until<F>(hooks: Arc<dyn RuntimeHooks>, interval: Duration, condition: F, fire: Action)
where
    F: Fn(&Arc<dyn RuntimeHooks>) -> bool + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            if condition(&hooks) {
                fire().await;
                return;
            }
            tokio::time::sleep(interval).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{action, BaseHooks};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU64;
    use std::time::Instant;

    /// Hooks without the immediate-threshold capability, to exercise the
    /// polling fallback path.
    struct PollingOnlyHooks {
        base: BaseHooks,
    }

    #[async_trait]
    impl RuntimeHooks for PollingOnlyHooks {
        fn call_at(&self, when: SystemTime, act: Action) {
            self.base.call_at(when, act)
        }
        fn call_later(&self, delay: Duration, act: Action) {
            self.base.call_later(delay, act)
        }
        fn elapsed_ms(&self) -> u64 {
            self.base.elapsed_ms()
        }
        fn bytes_sent(&self) -> u64 {
            self.base.bytes_sent()
        }
        async fn record_bytes(&self, n: u64) {
            self.base.record_bytes(n).await
        }
        fn seen_token(&self, token: &str) -> bool {
            self.base.seen_token(token)
        }
        fn add_token(&self, token: &str) {
            self.base.add_token(token)
        }
        fn on_fire(&self, act: Action) {
            self.base.on_fire(act)
        }
        async fn fire(&self) {
            self.base.fire().await
        }
        // No add_byte_threshold override: the default declines the capability.
    }

    fn counting_hooks(hits: &Arc<AtomicU64>) -> Arc<BaseHooks> {
        let hooks = Arc::new(BaseHooks::new());
        let hits = hits.clone();
        hooks.on_fire(action(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        }));
        hooks
    }

    #[tokio::test]
    async fn test_delay_event_fires_once_within_window() {
        let hits = Arc::new(AtomicU64::new(0));
        let hooks = counting_hooks(&hits);

        let armed_at = Instant::now();
        Event::delay(100).arm(hooks);

        while hits.load(Ordering::SeqCst) == 0 {
            assert!(armed_at.elapsed() < Duration::from_secs(2), "never fired");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let elapsed = armed_at.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "fired early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(800), "fired late: {elapsed:?}");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "exactly once");
    }

    #[tokio::test]
    async fn test_time_event_fires_once_at_deadline() {
        let hits = Arc::new(AtomicU64::new(0));
        let hooks = counting_hooks(&hits);

        let armed_at = Instant::now();
        Event::time(SystemTime::now() + Duration::from_millis(100)).arm(hooks);

        while hits.load(Ordering::SeqCst) == 0 {
            assert!(armed_at.elapsed() < Duration::from_secs(2), "never fired");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Wall-clock deadline converted to a delay at arm time; allow a
        // little slop between the two clocks.
        let elapsed = armed_at.elapsed();
        assert!(elapsed >= Duration::from_millis(80), "fired early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(800), "fired late: {elapsed:?}");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "exactly once");
    }

    #[tokio::test]
    async fn test_byte_event_prefers_immediate_threshold() {
        let hits = Arc::new(AtomicU64::new(0));
        let hooks = counting_hooks(&hits);

        Event::bytes(5).arm(hooks.clone());
        hooks.record_bytes(4).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        hooks.record_bytes(2).await; // crosses inline, no polling delay
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        hooks.record_bytes(50).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "latched after first firing");
    }

    #[tokio::test]
    async fn test_byte_event_polling_fallback_fires_once() {
        let hits = Arc::new(AtomicU64::new(0));
        let hooks: Arc<dyn RuntimeHooks> = Arc::new(PollingOnlyHooks {
            base: BaseHooks::new(),
        });
        {
            let hits = hits.clone();
            hooks.on_fire(action(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        Event::bytes(5)
            .with_poll_interval(Duration::from_millis(1))
            .arm(hooks.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0, "below threshold");

        hooks.record_bytes(9).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "poll loop exited after firing");
    }

    #[tokio::test]
    async fn test_token_event_polls_until_seen() {
        let hits = Arc::new(AtomicU64::new(0));
        let hooks = counting_hooks(&hits);

        Event::token("ready")
            .with_poll_interval(Duration::from_millis(1))
            .arm(hooks.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        hooks.add_token("ready");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
