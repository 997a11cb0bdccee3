//! Process isolation: run a test in a child process and classify how it ended.

use std::{
    ffi::OsString,
    fs::File,
    io::{self, Read},
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use super::output::{demux, CapturedOutput};
use crate::test::Outcome;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long the pipe may stay open once the test process has ended.
#[cfg(pipe_transport)]
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum IsolationError {
    #[error("cannot locate the test executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error("cannot set up output capture: {0}")]
    Capture(#[source] io::Error),
    #[error("cannot start the test process: {0}")]
    Spawn(#[source] io::Error),
    #[error("cannot wait for the test process: {0}")]
    Wait(#[source] io::Error),
    #[error("cannot read the test output: {0}")]
    Read(#[source] io::Error),
}

/// How the child's output travels back to the parent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    /// One pipe shared by stdout and stderr.
    Pipe,
    /// Both streams redirected to a temporary file.
    TempFile,
}

impl Default for TransportKind {
    fn default() -> Self {
        if cfg!(pipe_transport) {
            TransportKind::Pipe
        } else {
            TransportKind::TempFile
        }
    }
}

/// Command line starting a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Re-invoke the current executable as the child running the test
    /// numbered `id`.
    pub fn for_test(id: u32) -> Result<Self, IsolationError> {
        let program = std::env::current_exe().map_err(IsolationError::CurrentExe)?;
        Ok(Self::new(program, ["--child".to_owned(), format!("-t{id}")]))
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        command
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(i32),
    TimedOut(Duration),
}

/// Result of one isolated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildReport {
    pub outcome: Outcome,
    pub error_message: Option<String>,
    pub output: CapturedOutput,
}

impl ChildReport {
    pub(crate) fn aborted(error: IsolationError) -> Self {
        Self {
            outcome: Outcome::Error,
            error_message: Some(error.to_string()),
            output: CapturedOutput::default(),
        }
    }

    fn classify(termination: Termination, raw: &[u8]) -> Self {
        let output = demux(raw);
        let captured = output.error_message().map(str::to_owned);
        let with_captured = |reason: String| match &captured {
            Some(messages) => format!("{messages}\n{reason}"),
            None => reason,
        };

        let (outcome, error_message) = match termination {
            Termination::Exited(0) => (Outcome::Pass, captured.clone()),
            Termination::Exited(code) => (
                Outcome::Fail,
                captured
                    .clone()
                    .or_else(|| Some(format!("test process exited with status {code}"))),
            ),
            Termination::Signaled(signal) => (
                Outcome::Error,
                Some(with_captured(format!("killed by signal {}", describe_signal(signal)))),
            ),
            Termination::TimedOut(after) => (
                Outcome::Error,
                Some(with_captured(format!(
                    "timed out after {} s",
                    after.as_secs_f64()
                ))),
            ),
        };

        Self {
            outcome,
            error_message,
            output,
        }
    }
}

#[cfg(unix)]
fn describe_signal(signal: i32) -> String {
    match nix::sys::signal::Signal::try_from(signal) {
        Ok(name) => format!("{signal} ({name})"),
        Err(_) => signal.to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal(signal: i32) -> String {
    signal.to_string()
}

/// Runs children with a given transport and capture limit.
#[derive(Debug, Clone, Copy)]
pub struct Isolation {
    pub transport: TransportKind,
    pub capture_limit: usize,
}

impl Isolation {
    /// Run `invocation` to completion, killing it after `timeout`.
    pub fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> ChildReport {
        debug!(program = %invocation.program.display(), args = ?invocation.args, "spawning test process");
        match self.execute(invocation, timeout) {
            Ok((termination, raw)) => {
                debug!(?termination, captured = raw.len(), "test process ended");
                ChildReport::classify(termination, &raw)
            }
            Err(e) => {
                warn!(error = %e, "test process could not be run");
                ChildReport::aborted(e)
            }
        }
    }

    fn execute(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<(Termination, Vec<u8>), IsolationError> {
        match self.transport {
            #[cfg(pipe_transport)]
            TransportKind::Pipe => self.execute_piped(invocation, timeout),
            #[cfg(not(pipe_transport))]
            TransportKind::Pipe => {
                warn!("pipe transport unavailable on this platform, using a temporary file");
                self.execute_with_file(invocation, timeout)
            }
            TransportKind::TempFile => self.execute_with_file(invocation, timeout),
        }
    }

    #[cfg(pipe_transport)]
    fn execute_piped(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<(Termination, Vec<u8>), IsolationError> {
        let (reader, writer) = capture_pipe().map_err(IsolationError::Capture)?;
        let stderr = writer.try_clone().map_err(IsolationError::Capture)?;

        let mut command = invocation.command();
        command.stdout(Stdio::from(writer)).stderr(Stdio::from(stderr));
        let child = command.spawn().map_err(IsolationError::Spawn)?;
        // The reader only sees EOF once the parent's write ends are gone.
        drop(command);

        let chunks = drain_pipe(File::from(reader), self.capture_limit);
        let termination = supervise(child, timeout)?;
        let raw = collect_output(&chunks, DRAIN_GRACE)?;

        Ok((termination, raw))
    }

    fn execute_with_file(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<(Termination, Vec<u8>), IsolationError> {
        let capture = NamedTempFile::new().map_err(IsolationError::Capture)?;
        let stdout = capture.as_file().try_clone().map_err(IsolationError::Capture)?;
        let stderr = stdout.try_clone().map_err(IsolationError::Capture)?;

        let mut command = invocation.command();
        command.stdout(stdout).stderr(stderr);
        let child = command.spawn().map_err(IsolationError::Spawn)?;
        drop(command);

        let termination = supervise(child, timeout)?;
        let file = capture.reopen().map_err(IsolationError::Read)?;
        let raw = read_capped(file, self.capture_limit).map_err(IsolationError::Read)?;

        Ok((termination, raw))
    }
}

#[cfg(all(pipe_transport, pipe2))]
fn capture_pipe() -> io::Result<(std::os::fd::OwnedFd, std::os::fd::OwnedFd)> {
    use nix::fcntl::OFlag;

    Ok(nix::unistd::pipe2(OFlag::O_CLOEXEC)?)
}

#[cfg(all(pipe_transport, not(pipe2)))]
fn capture_pipe() -> io::Result<(std::os::fd::OwnedFd, std::os::fd::OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use std::os::fd::AsRawFd;

    let (reader, writer) = nix::unistd::pipe()?;
    for fd in [&reader, &writer] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((reader, writer))
}

/// Read the pipe on a helper thread, sending up to `limit` bytes back and
/// dropping the rest.
#[cfg(pipe_transport)]
fn drain_pipe(mut reader: File, limit: usize) -> mpsc::Receiver<io::Result<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut remaining = limit;
        let mut buf = [0; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let kept = n.min(remaining);
                    remaining -= kept;
                    if kept > 0 && sender.send(Ok(buf[..kept].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    let _ = sender.send(Err(e));
                    break;
                }
            }
        }
    });
    receiver
}

/// Gather what `drain_pipe` read. Processes left behind by the test may keep
/// the pipe open, so waiting for the end of the output stops after `grace`.
#[cfg(pipe_transport)]
fn collect_output(
    chunks: &mpsc::Receiver<io::Result<Vec<u8>>>,
    grace: Duration,
) -> Result<Vec<u8>, IsolationError> {
    let deadline = Instant::now() + grace;
    let mut raw = Vec::new();
    loop {
        match chunks.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(chunk) => raw.extend(chunk.map_err(IsolationError::Read)?),
            Err(RecvTimeoutError::Disconnected) => return Ok(raw),
            Err(RecvTimeoutError::Timeout) => {
                warn!(?grace, "test output still open after the test process ended");
                return Ok(raw);
            }
        }
    }
}

/// Read at most `limit` bytes, then drain and drop the rest.
fn read_capped(mut reader: impl Read, limit: usize) -> io::Result<Vec<u8>> {
    let mut kept = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut kept)?;
    io::copy(&mut reader, &mut io::sink())?;
    Ok(kept)
}

/// Wait for `child`, killing it once `timeout` elapses.
fn supervise(mut child: Child, timeout: Option<Duration>) -> Result<Termination, IsolationError> {
    let Some(timeout) = timeout else {
        let status = child.wait().map_err(IsolationError::Wait)?;
        return Ok(termination_of(status));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(IsolationError::Wait)? {
            return Ok(termination_of(status));
        }
        if Instant::now() >= deadline {
            warn!(pid = child.id(), ?timeout, "test process timed out, killing it");
            if let Err(e) = child.kill() {
                debug!(error = %e, "test process ended before it could be killed");
            }
            child.wait().map_err(IsolationError::Wait)?;
            return Ok(Termination::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn termination_of(status: ExitStatus) -> Termination {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return Termination::Signaled(signal);
        }
    }

    Termination::Exited(status.code().unwrap_or(-1))
}
