//! Stdio transport for child-process MCP servers
//!
//! [`StdioTransport`] launches the process named by a resolved
//! [`ConnectionDescriptor::Process`](crate::transport::ConnectionDescriptor)
//! and exchanges newline-delimited JSON over its stdin/stdout pipes. This is
//! the standard transport for locally-installed servers and for the two uvx
//! variants, which resolve to a `uvx` process launch.
//!
//! # Framing
//!
//! - Outbound messages are written to the child's stdin as one JSON object
//!   followed by `\n`.
//! - Inbound messages are read from the child's stdout, one JSON object per
//!   line, newline stripped before delivery.
//! - The child's stderr is forwarded as diagnostics and logged at `DEBUG`.
//!
//! # Lifecycle
//!
//! [`StdioTransport::spawn`] starts the child and two background reader
//! tasks. The child inherits the parent environment with the configured
//! variables layered on top (server launchers such as `uvx` need `PATH` and
//! `HOME` to function). Dropping the transport sends a best-effort SIGTERM
//! (Unix) or `start_kill` (elsewhere) so teardown never blocks.

use std::collections::HashMap;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use futures::Stream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};

use crate::error::{McprobeError, Result};
use crate::transport::Transport;

/// Child-process transport speaking newline-delimited JSON over stdio.
#[derive(Debug)]
pub struct StdioTransport {
    /// Sender side of the stdin channel; `send()` writes here.
    stdin_tx: mpsc::UnboundedSender<String>,
    /// Shared receiver for stdout lines (one JSON message per line).
    stdout_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Shared receiver for stderr lines (diagnostics only).
    stderr_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Handle to the spawned child; used by `Drop`.
    child: Arc<Mutex<Child>>,
}

impl StdioTransport {
    /// Launch the server process and wire up its stdio pipes.
    ///
    /// # Arguments
    ///
    /// * `command` - Executable to launch
    /// * `args` - Fully-resolved argument vector
    /// * `env` - Variables layered over the inherited environment
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] if the process cannot be spawned
    /// or a stdio pipe is unavailable.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::collections::HashMap;
    /// use mcprobe::transport::stdio::StdioTransport;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let transport = StdioTransport::spawn(
    ///     "uvx".to_string(),
    ///     vec!["mcp-server-fetch".to_string()],
    ///     HashMap::new(),
    /// )?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(command: String, args: Vec<String>, env: HashMap<String, String>) -> Result<Self> {
        let mut cmd = Command::new(&command);
        cmd.args(&args)
            .envs(&env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            McprobeError::Transport(format!("failed to spawn MCP server `{command}`: {e}"))
        })?;

        // All three handles are Some because Stdio::piped() was set above.
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McprobeError::Transport("child stdin unavailable after spawn".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McprobeError::Transport("child stdout unavailable after spawn".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| McprobeError::Transport("child stderr unavailable after spawn".into()))?;

        let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<String>();
        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel::<String>();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel::<String>();

        // Writer: stdin_rx -> child stdin, newline framed.
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(msg) = stdin_rx.recv().await {
                let line = format!("{msg}\n");
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        // Reader: child stdout -> stdout_tx, one message per line.
        tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if stdout_tx.send(line).is_err() {
                    break;
                }
            }
        });

        // Reader: child stderr -> stderr_tx + tracing.
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "mcprobe::transport::stdio", "server stderr: {}", line);
                if stderr_tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            stdin_tx,
            stdout_rx: Arc::new(Mutex::new(stdout_rx)),
            stderr_rx: Arc::new(Mutex::new(stderr_rx)),
            child: Arc::new(Mutex::new(child)),
        })
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    /// Enqueue a message for the child's stdin.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] if the background writer has
    /// exited and closed the channel.
    async fn send(&self, message: String) -> Result<()> {
        self.stdin_tx.send(message).map_err(|e| {
            anyhow::anyhow!(McprobeError::Transport(format!("stdin channel closed: {e}")))
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.stdout_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.stderr_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }
}

impl Drop for StdioTransport {
    /// Best-effort child termination; never blocks.
    fn drop(&mut self) {
        // If the lock is held by another task, skip the kill; the OS reaps
        // the child when this process exits.
        if let Ok(child) = self.child.try_lock() {
            #[cfg(unix)]
            {
                if let Some(pid) = child.id() {
                    // SAFETY: pid comes from a live tokio::process::Child.
                    unsafe {
                        libc::kill(pid as libc::pid_t, libc::SIGTERM);
                    }
                }
            }
            #[cfg(not(unix))]
            {
                let _ = child.start_kill();
            }
        }
    }
}
