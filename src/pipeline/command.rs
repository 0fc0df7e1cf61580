//! Builder for renderer process invocations.
//!
//! Every external process graphsvg starts (Graphviz, PlantUML, a TeX engine,
//! `dvisvgm`) goes through [`RendererCommand`], so command-line logging,
//! timeouts and output capture behave the same for all of them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{DEFAULT_RENDER_TIMEOUT, SLOW_RENDER_THRESHOLD};
use crate::core::GraphError;

/// Fluent builder for one renderer invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use graphsvg::pipeline::command::RendererCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let output = RendererCommand::new("dot")
///     .args(["-T", "svg"])
///     .stdin(b"digraph { a -> b }".to_vec())
///     .with_context("dot")
///     .execute()
///     .await?;
/// assert!(output.success());
/// # Ok(())
/// # }
/// ```
///
/// # Default Configuration
///
/// - **Timeout**: [`DEFAULT_RENDER_TIMEOUT`]
/// - **Stdin**: closed (`/dev/null`) unless [`stdin`](Self::stdin) is called
/// - **Stdout/stderr**: always captured
/// - **Working directory**: current process directory
///
/// When the timeout expires the child is killed and [`GraphError::Timeout`]
/// is returned. A child that exits with a failure status is *not* an error
/// here; callers decide what a failure status means via
/// [`RendererOutput::success`].
#[derive(Debug)]
pub struct RendererCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
    timeout_duration: Option<Duration>,
    /// Included in log lines to tell concurrent renders apart
    context: Option<String>,
}

impl RendererCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            timeout_duration: Some(DEFAULT_RENDER_TIMEOUT),
            context: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Bytes written to the child's standard input, which is then closed.
    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context for logging (e.g. the renderer and digest prefix)
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Space-joined command line, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn log_prefix(&self) -> String {
        self.context.as_ref().map(|ctx| format!("({ctx}) ")).unwrap_or_default()
    }

    /// Run the command to completion and capture its output.
    ///
    /// # Errors
    ///
    /// - the program cannot be spawned
    /// - reading its output fails
    /// - it outlives the timeout ([`GraphError::Timeout`])
    pub async fn execute(self) -> Result<RendererOutput> {
        let start = Instant::now();
        let command_line = self.command_line();
        let prefix = self.log_prefix();

        tracing::debug!(target: "renderer", "{}Executing command: {}", prefix, command_line);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().with_context(|| format!("Failed to execute {command_line}"))?;

        // Feed stdin from its own task so a renderer that writes a lot before
        // it has read everything cannot deadlock against us.
        let writer = match (child.stdin.take(), self.stdin) {
            (Some(mut pipe), Some(input)) => Some(tokio::spawn(async move {
                let result = pipe.write_all(&input).await;
                drop(pipe);
                result
            })),
            _ => None,
        };

        let output_future = child.wait_with_output();
        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| format!("Failed to read output of {command_line}"))?
            } else {
                // Dropping the future drops the child, and kill_on_drop reaps it
                tracing::warn!(
                    target: "renderer",
                    "{}Command timed out after {:?}: {}",
                    prefix,
                    duration,
                    command_line
                );
                return Err(GraphError::Timeout {
                    program: self.program.display().to_string(),
                    limit: duration,
                }
                .into());
            }
        } else {
            output_future
                .await
                .with_context(|| format!("Failed to read output of {command_line}"))?
        };

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(target: "renderer", "{}Failed to write stdin: {}", prefix, e);
                }
                Err(e) => tracing::debug!(target: "renderer", "{}Stdin task failed: {}", prefix, e),
                _ => {}
            }
        }

        let result = RendererOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !result.success() {
            tracing::debug!(
                target: "renderer",
                "{}Command failed with exit code: {:?}",
                prefix,
                result.status.code()
            );
        }
        let stderr = result.stderr_text();
        if !stderr.trim().is_empty() {
            tracing::debug!(target: "renderer", "{}{}", prefix, stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed > SLOW_RENDER_THRESHOLD {
            tracing::info!(
                target: "renderer::perf",
                "{}{} took {:.2}s",
                prefix,
                self.program.display(),
                elapsed.as_secs_f64()
            );
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(
                target: "renderer::perf",
                "{}{} took {}ms",
                prefix,
                self.program.display(),
                elapsed.as_millis()
            );
        }

        Ok(result)
    }
}

/// Captured result of a finished renderer process.
#[derive(Debug)]
pub struct RendererOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RendererOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Short failure description: exit status plus the last stderr line.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr_text();
        match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(line) => format!("{} ({})", self.status, line.trim()),
            None => self.status.to_string(),
        }
    }
}
