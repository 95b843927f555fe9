// src/exec/process.rs

//! External process invoker.
//!
//! Spawns a child with `tokio::process::Command`, forwards its stdout and
//! stderr to `tracing` line by line while it runs, captures both, and
//! returns a [`ProcessResult`]. Exit codes are not interpreted here; each
//! caller applies its own success predicate.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::anyhow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{BuildgraphError, Result};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, relative to the project root.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child only.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// A command line interpreted by the platform shell.
    pub fn shell(line: impl Into<String>) -> Self {
        if cfg!(windows) {
            Self::new("cmd").arg("/C").arg(line)
        } else {
            Self::new("sh").arg("-c").arg(line)
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How to run it.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Project root: working directory and base for relative program paths.
    pub root: PathBuf,
    /// Kill the child after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Bytes written to the child's stdin, which is then closed.
    pub stdin: Option<Vec<u8>>,
    /// Name attached to forwarded output lines.
    pub log_tag: String,
    /// Forward stdout lines at `info` (stderr always goes to `warn`).
    /// Disabled for commands whose stdout is data, such as pipeline filters.
    pub log_stdout: bool,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Resolve relative program paths such as `node_modules/.bin/ngc` against
/// the root. On Windows such scripts are `.cmd` shims.
pub fn resolve_program(program: &str, root: &Path) -> PathBuf {
    let path = Path::new(program);
    let has_separator = program.contains('/') || program.contains('\\');
    if !has_separator || path.is_absolute() {
        return path.to_path_buf();
    }

    let resolved = root.join(path);
    if cfg!(windows) && resolved.extension().is_none() {
        resolved.with_extension("cmd")
    } else {
        resolved
    }
}

/// Run a command to completion.
///
/// Fails with [`BuildgraphError::Spawn`] if the child cannot be started. A
/// non-zero exit is reported through the returned [`ProcessResult`].
pub async fn invoke(spec: &CommandSpec, opts: &ProcessOptions) -> Result<ProcessResult> {
    let program = resolve_program(&spec.program, &opts.root);

    let mut cmd = Command::new(&program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(if opts.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // A fresh process group lets a timeout reach grandchildren of `sh -c`.
    #[cfg(unix)]
    cmd.process_group(0);

    let cwd = match &spec.cwd {
        Some(dir) => opts.root.join(dir),
        None => opts.root.clone(),
    };
    if !cwd.as_os_str().is_empty() {
        cmd.current_dir(&cwd);
    }

    debug!(task = %opts.log_tag, command = %spec, cwd = ?cwd, "spawning process");

    let mut child = cmd.spawn().map_err(|source| BuildgraphError::Spawn {
        command: spec.to_string(),
        source,
    })?;
    let mut group = ProcessGroup::new(child.id());

    if let (Some(input), Some(mut stdin)) = (opts.stdin.clone(), child.stdin.take()) {
        let tag = opts.log_tag.clone();
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(&input).await {
                debug!(task = %tag, error = %err, "child closed stdin early");
            }
            // Dropping `stdin` closes the pipe.
        });
    }

    let stdout_task = child.stdout.take().map(|out| {
        let tag = opts.log_tag.clone();
        let forward = opts.log_stdout;
        tokio::spawn(async move {
            capture_lines(BufReader::new(out), |line| {
                if forward {
                    info!(task = %tag, "{line}");
                }
            })
            .await
        })
    });
    let stderr_task = child.stderr.take().map(|err| {
        let tag = opts.log_tag.clone();
        tokio::spawn(async move {
            capture_lines(BufReader::new(err), |line| warn!(task = %tag, "{line}")).await
        })
    });

    let (exit_code, timed_out) = match opts.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => (status?.code(), false),
            Err(_) => {
                warn!(task = %opts.log_tag, command = %spec, ?limit, "process timed out; killing");
                group.kill(&opts.log_tag);
                if let Err(err) = child.kill().await {
                    warn!(task = %opts.log_tag, error = %err, "failed to kill timed out process");
                }
                (None, true)
            }
        },
        None => (child.wait().await?.code(), false),
    };
    if !timed_out {
        group.release();
    }

    let (stdout, stderr) = if timed_out {
        (
            join_capture_within(stdout_task, READER_GRACE).await,
            join_capture_within(stderr_task, READER_GRACE).await,
        )
    } else {
        (
            join_capture(stdout_task).await?,
            join_capture(stderr_task).await?,
        )
    };

    debug!(task = %opts.log_tag, command = %spec, ?exit_code, timed_out, "process exited");

    Ok(ProcessResult {
        exit_code,
        stdout,
        stderr,
        timed_out,
    })
}

/// Read a stream to the end, calling `on_line` for every line as it arrives.
async fn capture_lines<R, F>(mut reader: R, mut on_line: F) -> std::io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str),
{
    let mut captured = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }
        captured.extend_from_slice(&line);
        let text = String::from_utf8_lossy(&line);
        on_line(text.trim_end_matches(['\r', '\n']));
    }

    Ok(captured)
}

/// How long output readers may keep draining after a timeout kill.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Process group of a spawned child. Killed on drop unless released, so an
/// aborted action does not leave grandchildren behind.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: if cfg!(unix) { pid } else { None },
        }
    }

    fn release(&mut self) {
        self.pgid = None;
    }

    #[cfg(unix)]
    fn kill(&mut self, tag: &str) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pgid) = self.pgid.take() {
            let Ok(raw) = i32::try_from(pgid) else {
                return;
            };
            if let Err(err) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                debug!(task = %tag, pgid, error = %err, "process group already gone");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self, _tag: &str) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill("");
    }
}

/// Like [`join_capture`], but gives up after `grace`. A reader that has not
/// reached EOF by then is aborted and its output dropped.
async fn join_capture_within(
    task: Option<tokio::task::JoinHandle<std::io::Result<Vec<u8>>>>,
    grace: Duration,
) -> Vec<u8> {
    let Some(mut handle) = task else {
        return Vec::new();
    };
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(Ok(bytes))) => bytes,
        Ok(_) => Vec::new(),
        Err(_) => {
            handle.abort();
            Vec::new()
        }
    }
}

async fn join_capture(
    task: Option<tokio::task::JoinHandle<std::io::Result<Vec<u8>>>>,
) -> Result<Vec<u8>> {
    match task {
        None => Ok(Vec::new()),
        Some(handle) => {
            let bytes = handle
                .await
                .map_err(|e| anyhow!("output reader task failed: {e}"))??;
            Ok(bytes)
        }
    }
}
