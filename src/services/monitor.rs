use crate::state::ProgressHandle;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Benign NVML telemetry failures hashcat prints on stderr.
pub const HASHCAT_WARNINGS: &[&str] = &[
    "nvmlDeviceGetCurrPcieLinkWidth",
    "nvmlDeviceGetClockInfo",
    "nvmlDeviceGetTemperatureThreshold",
    "nvmlDeviceGetUtilizationRates",
    "nvmlDeviceGetPowerManagementLimit",
    "nvmlDeviceGetFanSpeed",
];

/// Errors raised while running an external process
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cancelled")]
    Cancelled,

    #[error("Timed out {} sec", .0.as_secs())]
    TimedOut(Duration),

    #[error("{program} failed with exit code {}: {stderr}", exit_code_text(.code))]
    ProcessFailure {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid command line: {0}")]
    InvalidCommand(String),

    #[error("Process error: {0}")]
    Io(#[from] io::Error),
}

fn exit_code_text(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string())
}

/// What is left of a finished process once its stdout has been consumed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    pub program: String,
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Split stderr into `(warnings, errors)`.
///
/// A line is a warning when it contains one of [`HASHCAT_WARNINGS`]; empty lines are dropped.
/// Both partitions keep the input order and are joined with `\n`.
pub fn split_warnings_errors(stderr: &str) -> (String, String) {
    let (warnings, errors): (Vec<&str>, Vec<&str>) = stderr
        .lines()
        .filter(|line| !line.is_empty())
        .partition(|line| is_warning(line));

    (warnings.join("\n"), errors.join("\n"))
}

fn is_warning(line: &str) -> bool {
    HASHCAT_WARNINGS.iter().any(|pattern| line.contains(pattern))
}

/// Completion percentage of a machine-readable `STATUS` record.
///
/// Returns `None` for anything else: non-status lines, a missing `PROGRESS` marker, fewer than
/// two tokens after it, non-numeric counts or a zero total.
pub fn parse_status_line(line: &str) -> Option<f64> {
    if !line.starts_with("STATUS") {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let index = parts.iter().position(|part| *part == "PROGRESS")?;
    let tried: u64 = parts.get(index + 1)?.parse().ok()?;
    let total: u64 = parts.get(index + 2)?.parse().ok()?;
    if total == 0 {
        return None;
    }

    Some(100.0 * tried as f64 / total as f64)
}

/// Turn built (shell-quoted) tokens back into a raw argv without going through a shell.
pub fn to_argv(command: &[String]) -> Result<Vec<String>, EngineError> {
    let argv = shell_words::split(&command.join(" "))
        .map_err(|e| EngineError::InvalidCommand(format!("{}: {}", command.join(" "), e)))?;

    if argv.is_empty() {
        return Err(EngineError::InvalidCommand("empty command".to_string()));
    }
    Ok(argv)
}

/// Spawn `argv` with piped stdout/stderr. The child is killed if its handle is dropped,
/// so aborting the owning task never leaves hashcat running.
pub(crate) fn spawn(argv: &[String], stdin: Stdio) -> Result<Child, EngineError> {
    Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EngineError::Spawn {
            program: argv[0].clone(),
            source,
        })
}

/// Drain a pipe in the background so the child never blocks on a full buffer.
pub(crate) fn collect<R>(pipe: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            // a broken pipe only truncates diagnostics
            let _ = pipe.read_to_string(&mut text).await;
        }
        text
    })
}

/// Best-effort kill; an already exited process is not an error.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!("terminate: process already gone ({})", e);
    }
    let _ = child.wait().await;
}

/// Run one hashcat invocation, streaming its status records into `progress`.
///
/// Before each stdout line the cancel flag is checked; after each line the elapsed time is
/// compared against `timeout` (`None` = unlimited). Either condition kills the process before
/// the error is returned. Returns once stdout closes and the process has exited; exit code
/// interpretation is left to the caller.
pub async fn run_with_status(
    command: &[String],
    progress: &ProgressHandle,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, EngineError> {
    let argv = to_argv(command)?;
    let start = Instant::now();

    tracing::debug!(">>> {}", command.join(" "));

    let mut child = spawn(&argv, Stdio::null())?;
    let stderr = collect(child.stderr.take());
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout not captured"))?;
    // split on raw bytes; invalid UTF-8 is decoded lossily
    let mut lines = BufReader::new(stdout).split(b'\n');

    while let Some(segment) = lines.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);

        if progress.is_cancelled() {
            tracing::warn!("Cancellation requested, terminating {}", argv[0]);
            terminate(&mut child).await;
            return Err(EngineError::Cancelled);
        }

        if let Some(percent) = parse_status_line(&line) {
            progress.record_progress(percent);
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                tracing::warn!("{} exceeded its {:?} budget, terminating", argv[0], limit);
                terminate(&mut child).await;
                return Err(EngineError::TimedOut(limit));
            }
        }
    }

    let status = child.wait().await?;
    let stderr = stderr.await.unwrap_or_default();

    tracing::debug!(
        "{} finished in {:.2}s with exit code {:?}",
        argv[0],
        start.elapsed().as_secs_f32(),
        status.code()
    );

    Ok(ProcessOutput {
        program: argv[0].clone(),
        code: status.code(),
        stdout: String::new(),
        stderr,
    })
}
