//! Process management for the CLI subprocess

use super::lines::{LineEvent, LineReader};
use super::resolve::{CliResolver, DefaultCliResolver};
use crate::error::{Result, TransportError};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default limit for one inbound line (1 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Default capacity of the inbound line channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the error channel
pub const ERROR_CHANNEL_CAPACITY: usize = 10;

/// Environment variable telling the CLI which SDK launched it
pub const ENTRYPOINT_ENV: &str = "CLAUDE_CODE_ENTRYPOINT";

/// Value of [`ENTRYPOINT_ENV`] set for every spawned process
pub const ENTRYPOINT_VALUE: &str = "sdk-rust";

const STDERR_TAIL_LIMIT: usize = 64 * 1024;

/// Configuration for spawning a CLI process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Explicit path to the CLI executable; the resolver is used when unset
    pub cli_path: Option<PathBuf>,

    /// Arguments to pass to the CLI
    pub args: Vec<String>,

    /// Working directory
    pub cwd: Option<PathBuf>,

    /// Environment overrides, applied on top of the inherited environment
    pub env: HashMap<String, String>,

    /// Longest inbound line accepted
    pub max_buffer_size: usize,

    /// Capacity of the inbound line channel
    pub channel_capacity: usize,

    /// How to find the executable when `cli_path` is unset
    pub resolver: Arc<dyn CliResolver>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            resolver: Arc::new(DefaultCliResolver::new()),
        }
    }
}

impl ProcessConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CLI path
    pub fn with_cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli_path = Some(path.into());
        self
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable
    ///
    /// The child inherits the parent's environment; variables set here are
    /// applied last and may replace inherited ones, including [`ENTRYPOINT_ENV`].
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the longest inbound line accepted
    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Set the inbound channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the executable resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn CliResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The executable to spawn
    pub fn program(&self) -> Result<PathBuf> {
        match &self.cli_path {
            Some(path) => Ok(path.clone()),
            None => self.resolver.resolve(),
        }
    }
}

/// Handles the transport keeps for a running process
pub(crate) struct RunningProcess {
    pub(crate) stdin: ChildStdin,
    pub(crate) kill: oneshot::Sender<()>,
}

/// Where the background reader delivers its output
pub(crate) struct ProcessSinks {
    pub(crate) messages: mpsc::Sender<Vec<u8>>,
    pub(crate) errors: mpsc::Sender<TransportError>,
    pub(crate) closing: Arc<AtomicBool>,
}

/// Spawn the CLI and start its background tasks
///
/// Three tasks run per process: one drains stderr, one owns the child and
/// waits for it (or kills it on request), and one reads stdout into the
/// message channel. The stdout reader reports the exit status after stdout
/// closes, then drops the error sender.
pub(crate) fn spawn(
    config: &ProcessConfig,
    program: &Path,
    sinks: ProcessSinks,
) -> Result<RunningProcess> {
    let mut cmd = Command::new(program);
    cmd.args(&config.args)
        .env(ENTRYPOINT_ENV, ENTRYPOINT_VALUE)
        .envs(&config.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = &config.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn().map_err(TransportError::Spawn)?;
    let stdin = child.stdin.take().ok_or(TransportError::Pipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(TransportError::Pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(TransportError::Pipe("stderr"))?;

    debug!(
        program = %program.display(),
        args = config.args.len(),
        pid = ?child.id(),
        "spawned claude process"
    );

    let (kill_tx, kill_rx) = oneshot::channel();
    let stderr_task = tokio::spawn(drain_stderr(stderr));
    let exit_task = tokio::spawn(wait_for_exit(child, kill_rx));
    tokio::spawn(read_stdout(
        stdout,
        config.max_buffer_size,
        sinks,
        stderr_task,
        exit_task,
    ));

    Ok(RunningProcess {
        stdin,
        kill: kill_tx,
    })
}

async fn wait_for_exit(
    mut child: Child,
    kill: oneshot::Receiver<()>,
) -> std::io::Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        _ = kill => {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "kill failed; process already exited");
            }
            child.wait().await
        }
    }
}

async fn drain_stderr(stderr: ChildStderr) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::new();
    let mut tail_len = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(target: "claudewire::stderr", "{}", line);
                tail_len += line.len() + 1;
                tail.push_back(line);
                while tail_len > STDERR_TAIL_LIMIT {
                    match tail.pop_front() {
                        Some(old) => tail_len -= old.len() + 1,
                        None => break,
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stderr read failed");
                break;
            }
        }
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}

async fn read_stdout(
    stdout: ChildStdout,
    max_buffer_size: usize,
    sinks: ProcessSinks,
    stderr_task: JoinHandle<String>,
    exit_task: JoinHandle<std::io::Result<ExitStatus>>,
) {
    let ProcessSinks {
        messages,
        errors,
        closing,
    } = sinks;
    let mut reader = LineReader::new(stdout, max_buffer_size);

    loop {
        match reader.next_event().await {
            Ok(Some(LineEvent::Line(line))) => {
                trace!(bytes = line.len(), "read line from claude");
                match messages.try_send(line) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("inbound message channel full; dropping line");
                    }
                    // Nobody is listening; keep draining so the child never blocks on stdout.
                    Err(TrySendError::Closed(_)) => {}
                }
            }
            Ok(Some(LineEvent::TooLong(length))) => {
                report(
                    &errors,
                    TransportError::LineTooLong {
                        limit: max_buffer_size,
                        length,
                    },
                );
            }
            Ok(None) => break,
            Err(e) => {
                report(&errors, TransportError::Io(e));
                break;
            }
        }
    }

    drop(messages);

    let stderr = stderr_task.await.unwrap_or_default();
    match exit_task.await {
        Ok(Ok(status)) => {
            if !status.success() && !closing.load(Ordering::SeqCst) {
                report(
                    &errors,
                    TransportError::ProcessExited {
                        code: status.code(),
                        stderr,
                    },
                );
            } else {
                debug!(?status, "claude process exited");
            }
        }
        Ok(Err(e)) => report(&errors, TransportError::Io(e)),
        Err(e) => debug!(error = %e, "exit waiter task failed"),
    }
}

fn report(errors: &mpsc::Sender<TransportError>, error: TransportError) {
    debug!(error = %error, "transport error");
    if let Err(TrySendError::Full(dropped)) = errors.try_send(error) {
        warn!(error = %dropped, "error channel full; dropping error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::resolve::FixedCliResolver;

    #[test]
    fn test_process_config_default() {
        let config = ProcessConfig::default();
        assert!(config.cli_path.is_none());
        assert!(config.args.is_empty());
        assert_eq!(config.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_process_config_builder() {
        let config = ProcessConfig::new()
            .with_cli_path("/opt/claude")
            .with_args(["--output-format", "stream-json"])
            .with_arg("--verbose")
            .with_env("API_KEY", "sk-123")
            .with_cwd("/tmp")
            .with_max_buffer_size(64);

        assert_eq!(config.cli_path, Some(PathBuf::from("/opt/claude")));
        assert_eq!(config.args, vec!["--output-format", "stream-json", "--verbose"]);
        assert_eq!(config.env.get("API_KEY"), Some(&"sk-123".to_string()));
        assert_eq!(config.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(config.max_buffer_size, 64);
    }

    #[test]
    fn test_explicit_path_skips_resolver() {
        let config = ProcessConfig::new()
            .with_resolver(Arc::new(FixedCliResolver(PathBuf::from("/from/resolver"))))
            .with_cli_path("/explicit");
        assert_eq!(config.program().unwrap(), PathBuf::from("/explicit"));

        let config = ProcessConfig::new()
            .with_resolver(Arc::new(FixedCliResolver(PathBuf::from("/from/resolver"))));
        assert_eq!(config.program().unwrap(), PathBuf::from("/from/resolver"));
    }
}
