//! # Local process node: lifecycle of a killable child process.
//!
//! [`LocalProcessNode`] owns a child process handle, the command line that
//! spawned it, and the buffering needed to survive an outage. Its state
//! machine:
//!
//! ```text
//! not-started ──start()──► alive ──kill()──► dead          (FaultMode::Terminate)
//!                            │ ▲
//!                   kill()   │ │  resurrect()              (FaultMode::Suspend)
//!                            ▼ │
//!                          suspended
//! ```
//!
//! ## Fault modes
//! - [`FaultMode::Terminate`]: `kill()` is permanent — SIGTERM, a bounded
//!   grace wait, SIGKILL escalation, then both pipe ends are closed so any
//!   downstream reader observes end-of-stream. `resurrect()` replaces the
//!   process: the old handle is reaped and a fresh child is spawned from the
//!   stored command line.
//! - [`FaultMode::Suspend`]: `kill()` sends SIGSTOP and best-effort drains
//!   output that raced the stop signal; `resurrect()` sends SIGCONT, then
//!   replays the input backlog in original order into the running child. If
//!   the process died anyway, resurrection falls back to a fresh spawn.
//!
//! ## Rules
//! - `kill()` and `resurrect()` are idempotent; racing an already-exited
//!   process is a swallowed no-op, not an error.
//! - The backlog is mutated only under the node's state lock, which also
//!   serializes suspension against resurrection.
//! - stdin writes never happen while holding the state lock: the feeder
//!   takes stdin out, writes, and puts it back, so a stopped child with a
//!   full pipe cannot wedge kill/resurrect.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use crate::config::FracConfig;
use crate::error::FracError;
use crate::hooks::RuntimeHooks;
use crate::node::Node;

/// Shared handle to the downstream output sink; the node holds it weakly.
pub(crate) type SharedSink = Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// What `kill()` means for a [`LocalProcessNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Kill is permanent; resurrection spawns a fresh process.
    Terminate,
    /// Kill is a stop signal; resurrection replays the backlog and resumes.
    Suspend,
}

/// Outcome of handing a chunk to [`LocalProcessNode::feed_stdin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeedOutcome {
    /// Written to the child's stdin.
    Delivered,
    /// Node is suspended; the chunk joined the backlog for replay on resume.
    Buffered,
    /// stdin is gone; the feeder should stop.
    Closed,
}

struct ProcState {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    suspended: bool,
    backlog: Vec<Vec<u8>>,
}

/// A [`Node`] backed by a local subprocess with piped stdin/stdout.
pub struct LocalProcessNode {
    name: String,
    cmd: Vec<String>,
    mode: FaultMode,
    grace: Duration,
    drain_window: Duration,
    state: tokio::sync::Mutex<ProcState>,
    // Own lock: shared with the pump loop, probed with try_lock by the drain.
    stdout: Arc<tokio::sync::Mutex<Option<ChildStdout>>>,
    sink: Mutex<Option<Weak<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>>>,
    hooks: Mutex<Option<Weak<dyn RuntimeHooks>>>,
}

impl LocalProcessNode {
    /// Creates a node for `cmd` without starting it.
    pub fn new(cmd: Vec<String>, mode: FaultMode, cfg: &FracConfig) -> Result<Self, FracError> {
        if cmd.is_empty() {
            return Err(FracError::InvalidCommand {
                reason: "empty command".into(),
            });
        }
        Ok(Self {
            name: cmd[0].clone(),
            cmd,
            mode,
            grace: cfg.kill_grace,
            drain_window: cfg.drain_window,
            state: tokio::sync::Mutex::new(ProcState {
                child: None,
                stdin: None,
                suspended: false,
                backlog: Vec::new(),
            }),
            stdout: Arc::new(tokio::sync::Mutex::new(None)),
            sink: Mutex::new(None),
            hooks: Mutex::new(None),
        })
    }

    /// Spawns the child process with piped stdin/stdout. No-op when already started.
    pub async fn start(&self) -> Result<(), FracError> {
        let mut st = self.state.lock().await;
        if st.child.is_some() {
            return Ok(());
        }
        self.spawn_into(&mut st).await
    }

    /// The command line this node spawns.
    pub fn command(&self) -> &[String] {
        &self.cmd
    }

    /// True while the process is stopped by a suspend-mode kill.
    pub async fn is_suspended(&self) -> bool {
        self.state.lock().await.suspended
    }

    /// True when the process is running and not suspended.
    pub async fn is_alive(&self) -> bool {
        let mut st = self.state.lock().await;
        if st.suspended {
            return false;
        }
        match st.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Appends a chunk to the input backlog for replay on resurrection.
    pub async fn buffer_input(&self, chunk: &[u8]) {
        self.state.lock().await.backlog.push(chunk.to_vec());
    }

    /// Registers the hooks that account for bytes moved by the drain.
    pub fn set_hooks(&self, hooks: Weak<dyn RuntimeHooks>) {
        *lock_poisonless(&self.hooks) = Some(hooks);
    }

    pub(crate) fn set_output_sink(&self, sink: Weak<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>) {
        *lock_poisonless(&self.sink) = Some(sink);
    }

    pub(crate) fn stdout_slot(&self) -> Arc<tokio::sync::Mutex<Option<ChildStdout>>> {
        Arc::clone(&self.stdout)
    }

    /// Delivers a chunk to the child's stdin, buffering it instead while
    /// suspended. Writes happen outside the state lock; anything buffered
    /// during an in-flight write is replayed, in order, before returning.
    pub(crate) async fn feed_stdin(&self, chunk: &[u8]) -> FeedOutcome {
        let mut stdin = {
            let mut st = self.state.lock().await;
            if st.suspended {
                st.backlog.push(chunk.to_vec());
                return FeedOutcome::Buffered;
            }
            match st.stdin.take() {
                Some(stdin) => stdin,
                None => return FeedOutcome::Closed,
            }
        };

        let wrote = async {
            stdin.write_all(chunk).await?;
            stdin.flush().await
        }
        .await;

        let mut st = self.state.lock().await;
        match wrote {
            Ok(()) => {
                if !st.suspended && !st.backlog.is_empty() {
                    for pending in std::mem::take(&mut st.backlog) {
                        if stdin.write_all(&pending).await.is_err() {
                            return FeedOutcome::Closed;
                        }
                    }
                    let _ = stdin.flush().await;
                }
                // A concurrent respawn installed a new stdin: drop the stale one.
                if st.stdin.is_none() {
                    st.stdin = Some(stdin);
                }
                FeedOutcome::Delivered
            }
            Err(_) => FeedOutcome::Closed,
        }
    }

    /// Closes the child's stdin, propagating end-of-input.
    pub(crate) async fn close_stdin(&self) {
        self.state.lock().await.stdin = None;
    }

    /// Best-effort drain of stdout into the downstream sink, accounting the
    /// bytes with the owning hooks. Returns the number of bytes moved.
    ///
    /// Advisory only: skipped entirely when the pump loop holds the stdout
    /// lock (the pump is already forwarding and counting), when no sink is
    /// registered, or on any I/O failure.
    pub async fn drain_stdout_to_downstream(&self) -> u64 {
        let Ok(mut slot) = self.stdout.try_lock() else {
            return 0;
        };
        let Some(stdout) = slot.as_mut() else {
            return 0;
        };
        let sink = lock_poisonless(&self.sink)
            .as_ref()
            .and_then(|weak| weak.upgrade());
        let Some(sink) = sink else {
            return 0;
        };
        let hooks = lock_poisonless(&self.hooks)
            .as_ref()
            .and_then(|weak| weak.upgrade());

        let mut buf = [0u8; 1024];
        let mut drained = 0u64;
        loop {
            let n = match timeout(self.drain_window, stdout.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
                Ok(Ok(n)) => n,
            };
            {
                let mut out = sink.lock().await;
                if out.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                let _ = out.flush().await;
            }
            drained += n as u64;
            if let Some(hooks) = &hooks {
                hooks.record_bytes(n as u64).await;
            }
        }
        drained
    }

    async fn spawn_into(&self, st: &mut ProcState) -> Result<(), FracError> {
        let mut command = Command::new(&self.cmd[0]);
        command
            .args(&self.cmd[1..])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| FracError::Spawn {
            command: self.cmd.join(" "),
            source,
        })?;
        st.stdin = child.stdin.take();
        *self.stdout.lock().await = child.stdout.take();
        info!("started {:?} as pid {:?}", self.name, child.id());
        st.child = Some(child);
        st.suspended = false;
        Ok(())
    }

    /// Permanent kill: SIGTERM, bounded grace, SIGKILL, close both pipe ends.
    async fn terminate(&self) -> Result<(), FracError> {
        let mut st = self.state.lock().await;
        if let Some(child) = st.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                if let Some(pid) = child.id() {
                    info!("killing pid {pid}");
                    send_signal(pid, TERM_SIGNAL);
                }
                if timeout(self.grace, child.wait()).await.is_err() {
                    warn!("pid did not exit within {:?}, escalating to SIGKILL", self.grace);
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
            st.child = None;
        }
        st.stdin = None;
        st.suspended = false;
        // Close the read end so downstream sees EOF instead of draining
        // whatever the child managed to buffer before dying. The pump is
        // never mid-read here when the kill came from a byte threshold.
        if let Ok(mut slot) = self.stdout.try_lock() {
            *slot = None;
        }
        Ok(())
    }

    /// Suspend-mode kill: SIGSTOP, then a best-effort drain of the output
    /// that raced the stop signal.
    #[cfg(unix)]
    async fn suspend(&self) -> Result<(), FracError> {
        let pid = {
            let mut st = self.state.lock().await;
            if st.suspended {
                return Ok(());
            }
            let Some(child) = st.child.as_mut() else {
                return Ok(());
            };
            if !matches!(child.try_wait(), Ok(None)) {
                return Ok(());
            }
            let Some(pid) = child.id() else {
                return Ok(());
            };
            st.suspended = true;
            pid
        };
        info!("suspending pid {pid}");
        send_signal(pid, libc::SIGSTOP);
        let drained = self.drain_stdout_to_downstream().await;
        if drained > 0 {
            log::debug!("drained {drained} bytes around suspension");
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn suspend(&self) -> Result<(), FracError> {
        warn!("process suspension is unsupported on this platform; terminating instead");
        self.terminate().await
    }

    async fn bring_back(&self) -> Result<(), FracError> {
        let mut st = self.state.lock().await;
        let live = match st.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        if st.suspended && live {
            // Resume before replaying: a backlog larger than the pipe buffer
            // only drains once the child is running again. The suspended flag
            // stays set and the state lock serializes the feeder, so nothing
            // interleaves with the replay.
            #[cfg(unix)]
            if let Some(pid) = st.child.as_ref().and_then(|c| c.id()) {
                send_signal(pid, libc::SIGCONT);
                info!("resumed pid {pid}");
            }
            flush_backlog(&mut st).await;
            st.suspended = false;
            return Ok(());
        }

        // Permanently killed, crashed, or never started: replace the process.
        if let Some(mut old) = st.child.take() {
            let _ = old.start_kill();
            let _ = old.wait().await;
        }
        st.stdin = None;
        st.suspended = false;
        self.spawn_into(&mut st).await?;
        info!(
            "resurrected {:?} as pid {:?}",
            self.name,
            st.child.as_ref().and_then(|c| c.id())
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Node for LocalProcessNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn kill(&self) -> Result<(), FracError> {
        match self.mode {
            FaultMode::Terminate => self.terminate().await,
            FaultMode::Suspend => self.suspend().await,
        }
    }

    async fn resurrect(&self) -> Result<(), FracError> {
        self.bring_back().await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}

/// Replays the backlog into stdin in original receipt order, exactly once.
///
/// When stdin is out with the feeder (mid-write during suspension), the
/// backlog stays put: the feeder replays it right after its write completes.
async fn flush_backlog(st: &mut ProcState) {
    if st.backlog.is_empty() {
        return;
    }
    let Some(stdin) = st.stdin.as_mut() else {
        return;
    };
    for chunk in std::mem::take(&mut st.backlog) {
        if stdin.write_all(&chunk).await.is_err() {
            return;
        }
    }
    let _ = stdin.flush().await;
}

fn lock_poisonless<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
const TERM_SIGNAL: libc::c_int = libc::SIGTERM;
#[cfg(not(unix))]
const TERM_SIGNAL: i32 = 0;

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) {
    // Failure means the process is already gone; that race is fine.
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: i32) {}

/// Splits a command line into an argv, honoring single and double quotes.
///
/// # Example
/// ```
/// use frac::split_command;
///
/// let argv = split_command(r#"sh -c "echo hi""#).unwrap();
/// assert_eq!(argv, ["sh", "-c", "echo hi"]);
/// ```
pub fn split_command(line: &str) -> Result<Vec<String>, FracError> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut pending = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    pending = true;
                }
                c if c.is_whitespace() => {
                    if pending || !current.is_empty() {
                        argv.push(std::mem::take(&mut current));
                        pending = false;
                    }
                }
                c => current.push(c),
            },
        }
    }
    if quote.is_some() {
        return Err(FracError::InvalidCommand {
            reason: "unbalanced quote".into(),
        });
    }
    if pending || !current.is_empty() {
        argv.push(current);
    }
    if argv.is_empty() {
        return Err(FracError::InvalidCommand {
            reason: "empty command".into(),
        });
    }
    Ok(argv)
}
