//! Helpers for running child processes with timeouts and bounded output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::types::StepOutput;

/// How long pipes are drained after the child exits or is killed. A leftover
/// process that inherited them could otherwise hold the run open forever.
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
    pub timeout: Duration,
    /// A pipe was still open when the drain grace period ran out.
    pub pipes_left_open: bool,
}

fn truncation_notice(label: &str, stream: &str, dropped: usize) -> String {
    if dropped == 0 {
        return String::new();
    }
    format!("\n[{label} {stream} truncated {dropped} bytes]\n")
}

impl CommandOutput {
    /// Decode to text, appending truncation and timeout notices.
    pub fn into_step_output(self, label: &str) -> StepOutput {
        let mut stdout = String::from_utf8_lossy(&self.stdout).into_owned();
        stdout.push_str(&truncation_notice(label, "stdout", self.stdout_truncated));
        let mut stderr = String::from_utf8_lossy(&self.stderr).into_owned();
        stderr.push_str(&truncation_notice(label, "stderr", self.stderr_truncated));
        if self.pipes_left_open {
            stderr.push_str(&format!(
                "\n[{label} output cut off: a leftover process kept its pipes open]\n"
            ));
        }
        if self.timed_out {
            stderr.push_str(&format!(
                "\n[{label} timed out after {}s]\n",
                self.timeout.as_secs()
            ));
        }
        StepOutput {
            exit_code: if self.timed_out {
                None
            } else {
                self.status.code()
            },
            stdout,
            stderr,
            timed_out: self.timed_out,
        }
    }
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
#[instrument(
    skip_all,
    fields(timeout_secs = timeout.as_secs(), output_limit_bytes = output_limit_bytes)
)]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    own_process_group(&mut cmd);

    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, program = ?cmd.get_program(), "failed to spawn command");
            return Err(e)
                .with_context(|| format!("spawn {}", cmd.get_program().to_string_lossy()));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_reader = StreamReader::spawn(stdout, output_limit_bytes);
    let stderr_reader = StreamReader::spawn(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_tree(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };

    let drain_deadline = Instant::now() + DRAIN_GRACE;
    let stdout = stdout_reader.finish(drain_deadline).context("drain stdout")?;
    let stderr = stderr_reader.finish(drain_deadline).context("drain stderr")?;
    let pipes_left_open = !(stdout.drained && stderr.drained);
    if pipes_left_open {
        warn!("pipes still open after drain grace period, keeping partial output");
    }
    let (stdout, stdout_truncated) = (stdout.buf, stdout.truncated);
    let (stderr, stderr_truncated) = (stderr.buf, stderr.truncated);

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
        timeout,
        pipes_left_open,
    })
}

/// Put the child in a process group of its own so a timeout can take down
/// everything it started.
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// Kill the child and, on unix, every process in its group.
fn kill_tree(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let status = Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => return Ok(()),
            Ok(status) => debug!(?status, "process group kill failed, killing child only"),
            Err(err) => debug!(err = %err, "kill unavailable, killing child only"),
        }
    }
    child.kill().context("kill command")
}

/// Run a command and fold every outcome, spawn failures included, into a [`StepOutput`].
pub fn capture(
    label: &str,
    cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> StepOutput {
    match run_command_with_timeout(cmd, timeout, output_limit_bytes) {
        Ok(output) => output.into_step_output(label),
        Err(err) => {
            warn!(label, err = %format!("{err:#}"), "command did not complete");
            StepOutput::not_started(format!("{label}: {err:#}"))
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    buf: Vec<u8>,
    truncated: usize,
    drained: bool,
}

/// Background reader for one pipe.
///
/// Bytes land in a shared buffer so whatever was read can be returned even
/// when the pipe never reaches EOF.
struct StreamReader {
    captured: Arc<Mutex<Captured>>,
    done: mpsc::Receiver<Result<()>>,
}

impl StreamReader {
    fn spawn<R: Read + Send + 'static>(reader: R, limit: usize) -> Self {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let sink = Arc::clone(&captured);
        let (tx, done) = mpsc::channel();
        thread::spawn(move || {
            // The receiver is gone once the caller stopped waiting.
            let _ = tx.send(read_stream_limited(reader, limit, &sink));
        });
        Self { captured, done }
    }

    /// Wait for EOF until `deadline`, then hand back what was read so far.
    fn finish(self, deadline: Instant) -> Result<Captured> {
        let wait = deadline.saturating_duration_since(Instant::now());
        let drained = match self.done.recv_timeout(wait) {
            Ok(result) => {
                result?;
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => false,
            Err(mpsc::RecvTimeoutError::Disconnected) => bail!("output reader thread panicked"),
        };
        let captured = self
            .captured
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        Ok(Captured {
            buf: captured.buf.clone(),
            truncated: captured.truncated,
            drained,
        })
    }
}

fn read_stream_limited<R: Read>(
    mut reader: R,
    limit: usize,
    sink: &Mutex<Captured>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = sink
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        let remaining = limit.saturating_sub(captured.buf.len());
        let keep = n.min(remaining);
        captured.buf.extend_from_slice(&chunk[..keep]);
        captured.truncated += n - keep;
    }
}
