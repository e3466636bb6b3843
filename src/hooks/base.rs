//! # Base `RuntimeHooks` implementation.
//!
//! [`BaseHooks`] provides the bookkeeping every backend needs: one-shot
//! timers (one spawned task per call), a lock-protected byte counter, a
//! monotonic token set, the ordered fire chain, and exact byte-threshold
//! tracking. Backend hooks embed it and delegate, overriding only the
//! metrics they can observe for real.
//!
//! ## Threshold exactness
//! ```text
//! record_bytes(n):
//!   before ──► counter += n ──► after
//!                    │
//!                    └─► every pending (threshold, action) with
//!                        before < threshold <= after fires once,
//!                        in ascending threshold order, then is removed
//! ```
//! The before/after comparison happens under the counter's lock, so a
//! threshold registered before an update observes it iff the update crosses
//! its value, even when bytes arrive in multi-byte chunks.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;

use crate::hooks::contract::{Action, RuntimeHooks};

/// Reusable hooks state: timers, byte counter, tokens, fire chain, thresholds.
pub struct BaseHooks {
    started: Instant,
    bytes: Mutex<u64>,
    tokens: Mutex<HashSet<String>>,
    chain: Mutex<Vec<Action>>,
    thresholds: Mutex<Vec<(u64, Action)>>,
}

impl BaseHooks {
    /// Creates hooks with a fresh timer baseline and zeroed counters.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            bytes: Mutex::new(0),
            tokens: Mutex::new(HashSet::new()),
            chain: Mutex::new(Vec::new()),
            thresholds: Mutex::new(Vec::new()),
        }
    }

    /// Resets the byte counter to zero. Pending thresholds are unaffected.
    pub fn reset_bytes(&self) {
        *lock(&self.bytes) = 0;
    }
}

impl Default for BaseHooks {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RuntimeHooks for BaseHooks {
    fn call_at(&self, when: SystemTime, act: Action) {
        // Past timestamps clamp to zero, never negative.
        let delay = when
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        self.call_later(delay, act);
    }

    fn call_later(&self, delay: Duration, act: Action) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            act().await;
        });
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn bytes_sent(&self) -> u64 {
        *lock(&self.bytes)
    }

    async fn record_bytes(&self, n: u64) {
        if n == 0 {
            return;
        }
        let (before, after) = {
            let mut bytes = lock(&self.bytes);
            let before = *bytes;
            *bytes += n;
            (before, *bytes)
        };
        // Detach crossed thresholds under the lock, run them outside it.
        let mut crossed: Vec<(u64, Action)> = Vec::new();
        {
            let mut pending = lock(&self.thresholds);
            pending.retain(|(threshold, act)| {
                if before < *threshold && *threshold <= after {
                    crossed.push((*threshold, act.clone()));
                    false
                } else {
                    true
                }
            });
        }
        crossed.sort_by_key(|(threshold, _)| *threshold);
        for (_, act) in crossed {
            act().await;
        }
    }

    fn seen_token(&self, token: &str) -> bool {
        lock(&self.tokens).contains(token)
    }

    fn add_token(&self, token: &str) {
        lock(&self.tokens).insert(token.to_string());
    }

    fn on_fire(&self, act: Action) {
        lock(&self.chain).push(act);
    }

    async fn fire(&self) {
        let chain: Vec<Action> = lock(&self.chain).clone();
        for act in chain {
            act().await;
        }
    }

    fn add_byte_threshold(&self, threshold: u64, act: Action) -> bool {
        lock(&self.thresholds).push((threshold, act));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::contract::action;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn counting_action(hits: &Arc<AtomicU64>) -> Action {
        let hits = hits.clone();
        action(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn test_threshold_fires_once_at_first_crossing() {
        let hooks = BaseHooks::new();
        let hits = Arc::new(AtomicU64::new(0));
        assert!(hooks.add_byte_threshold(5, counting_action(&hits)));

        hooks.record_bytes(3).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0, "not crossed yet");

        hooks.record_bytes(3).await; // total 6, crosses 5 inside this chunk
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        hooks.record_bytes(100).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "deregistered after firing");
    }

    #[tokio::test]
    async fn test_threshold_on_exact_boundary_fires() {
        let hooks = BaseHooks::new();
        let hits = Arc::new(AtomicU64::new(0));
        hooks.add_byte_threshold(5, counting_action(&hits));

        hooks.record_bytes(5).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_thresholds_in_one_chunk_fire_in_ascending_order() {
        let hooks = BaseHooks::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for threshold in [4u64, 2u64] {
            let order = order.clone();
            hooks.add_byte_threshold(
                threshold,
                action(move || {
                    let order = order.clone();
                    async move {
                        lock(&order).push(threshold);
                    }
                }),
            );
        }

        hooks.record_bytes(10).await;
        assert_eq!(*lock(&order), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_threshold_exact_for_arbitrary_chunkings() {
        for chunks in [vec![1u64; 9], vec![3, 3, 3], vec![2, 7], vec![9]] {
            let hooks = BaseHooks::new();
            let hits = Arc::new(AtomicU64::new(0));
            hooks.add_byte_threshold(7, counting_action(&hits));

            let mut total = 0;
            for chunk in chunks {
                total += chunk;
                hooks.record_bytes(chunk).await;
                let expected = u64::from(total >= 7);
                assert_eq!(hits.load(Ordering::SeqCst), expected, "after {total} bytes");
            }
        }
    }

    #[tokio::test]
    async fn test_fire_runs_chain_in_registration_order() {
        let hooks = BaseHooks::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            hooks.on_fire(action(move || {
                let order = order.clone();
                async move {
                    lock(&order).push(tag);
                }
            }));
        }

        hooks.fire().await;
        assert_eq!(*lock(&order), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_fire_with_empty_chain_is_noop() {
        let hooks = BaseHooks::new();
        hooks.fire().await;
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let hooks = BaseHooks::new();
        assert!(!hooks.seen_token("checkpoint"));
        hooks.add_token("checkpoint");
        assert!(hooks.seen_token("checkpoint"));
        assert!(hooks.seen_token("checkpoint"), "stays seen");
        assert!(!hooks.seen_token("other"));
    }

    #[tokio::test]
    async fn test_call_at_in_the_past_fires_promptly() {
        let hooks = BaseHooks::new();
        let notify = Arc::new(tokio::sync::Notify::new());
        let woken = notify.clone();
        hooks.call_at(
            SystemTime::now() - Duration::from_secs(60),
            action(move || {
                let woken = woken.clone();
                async move {
                    woken.notify_one();
                }
            }),
        );

        tokio::time::timeout(Duration::from_millis(500), notify.notified())
            .await
            .expect("past timestamp should fire immediately");
    }

    #[test]
    fn test_bytes_reset() {
        let hooks = BaseHooks::new();
        futures::executor::block_on(hooks.record_bytes(42));
        assert_eq!(hooks.bytes_sent(), 42);
        hooks.reset_bytes();
        assert_eq!(hooks.bytes_sent(), 0);
    }
}
