//! # Streaming hooks: the byte source of truth for a local process.
//!
//! [`LocalStreamingHooks`] wraps a [`LocalProcessNode`] and relays data
//! through it: a spawned feeder task copies the input source into the
//! child's stdin in fixed-size chunks, while the calling path reads the
//! child's stdout **one byte at a time**, forwards each byte to the output
//! sink, and reports it to the byte counter.
//!
//! Reading one byte at a time trades throughput for firing precision: a
//! byte threshold fires after the crossing byte has been forwarded and
//! before the next byte is read, so a `byte-kill` lands at an exact output
//! offset. Acceptable for a controlled fault-injection tool; this is not a
//! throughput-sensitive data path.
//!
//! ## Rules
//! - The stdout handle lives behind a shared lock, released between bytes;
//!   the suspend-time drain probes it with `try_lock` and backs off while
//!   the pump is active (the pump is already forwarding and counting).
//! - I/O failures mid-pump end the loop gracefully. A child killed at a
//!   threshold surfaces as a closed slot or EOF, not an error.
//! - The feeder observes suspension through the node, so input that arrives
//!   during an outage lands in the backlog instead of a dead pipe.

use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::FracConfig;
use crate::hooks::{Action, BaseHooks, RuntimeHooks};
use crate::local::process::{FeedOutcome, LocalProcessNode, SharedSink};

/// [`RuntimeHooks`] that observes a [`LocalProcessNode`]'s output stream.
///
/// Supports the immediate-threshold capability: armed byte events fire
/// inline from the pump, with exact-byte precision and no polling.
pub struct LocalStreamingHooks {
    node: Arc<LocalProcessNode>,
    base: BaseHooks,
    feed_chunk: usize,
}

impl LocalStreamingHooks {
    /// Creates hooks around `node` and registers itself for byte accounting
    /// during any suspend-time drain.
    pub fn new(node: Arc<LocalProcessNode>, cfg: &FracConfig) -> Arc<Self> {
        let hooks = Arc::new(Self {
            node,
            base: BaseHooks::new(),
            feed_chunk: cfg.feed_chunk.max(1),
        });
        let weak = Arc::downgrade(&hooks) as Weak<dyn RuntimeHooks>;
        hooks.node.set_hooks(weak);
        hooks
    }

    /// The node these hooks observe.
    pub fn node(&self) -> &Arc<LocalProcessNode> {
        &self.node
    }

    /// Streams `input` through the child process to `output`, counting every
    /// relayed output byte. Returns the number of bytes forwarded.
    ///
    /// Blocks the caller on output reads; input feeding runs concurrently.
    /// The loop ends at child EOF, when a kill closes the stdout slot, or on
    /// an I/O failure (graceful, logged).
    pub async fn pump_data<I, O>(&self, input: I, output: O) -> u64
    where
        I: AsyncRead + Send + Unpin + 'static,
        O: AsyncWrite + Send + Unpin + 'static,
    {
        let sink: SharedSink = Arc::new(tokio::sync::Mutex::new(Box::new(output)));
        self.node.set_output_sink(Arc::downgrade(&sink));

        let feeder = tokio::spawn(feed_input(self.node.clone(), input, self.feed_chunk));

        let slot = self.node.stdout_slot();
        let mut forwarded = 0u64;
        let mut byte = [0u8; 1];
        loop {
            // Hold the lock only for the read itself: a threshold firing
            // below may need to close or drain this handle.
            let read = {
                let mut guard = slot.lock().await;
                match guard.as_mut() {
                    None => None,
                    Some(stdout) => match stdout.read(&mut byte).await {
                        Ok(0) => None,
                        Ok(_) => Some(Ok(())),
                        Err(err) => Some(Err(err)),
                    },
                }
            };
            match read {
                None => break, // EOF, or the kill closed the pipe
                Some(Err(err)) => {
                    debug!("pump ended on read error: {err}");
                    break;
                }
                Some(Ok(())) => {
                    {
                        let mut out = sink.lock().await;
                        if out.write_all(&byte).await.is_err() {
                            break;
                        }
                        let _ = out.flush().await;
                    }
                    forwarded += 1;
                    // Counted after forwarding: a threshold of N fires with
                    // byte N already downstream and byte N+1 unread.
                    self.base.record_bytes(1).await;
                }
            }
        }

        feeder.abort();
        forwarded
    }
}

async fn feed_input<I>(node: Arc<LocalProcessNode>, mut input: I, chunk: usize)
where
    I: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk];
    loop {
        match input.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if node.feed_stdin(&buf[..n]).await == FeedOutcome::Closed {
                    return;
                }
            }
        }
    }
    node.close_stdin().await;
}

#[async_trait]
impl RuntimeHooks for LocalStreamingHooks {
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

    fn add_byte_threshold(&self, threshold: u64, act: Action) -> bool {
        self.base.add_byte_threshold(threshold, act)
    }
}
