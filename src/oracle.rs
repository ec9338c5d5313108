//! The test oracle: an external command judged by its exit status.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Minimum time left for draining pipes after a child exits near its deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Route Ctrl-C into a flag the oracle polls, so a running test child is
/// killed and the mutated file restored instead of the process dying mid-cycle.
pub fn install_interrupt_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
    })
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleOutcome {
    Passed { output: String },
    Failed { output: String },
    TimedOut { output: String },
    Interrupted { output: String },
    /// The command could not be started at all.
    SpawnFailed { message: String },
}

impl OracleOutcome {
    pub fn output(&self) -> &str {
        match self {
            OracleOutcome::Passed { output }
            | OracleOutcome::Failed { output }
            | OracleOutcome::TimedOut { output }
            | OracleOutcome::Interrupted { output } => output,
            OracleOutcome::SpawnFailed { message } => message,
        }
    }
}

/// Runs the test suite for a scope under a deadline.
pub trait TestOracle: Sync {
    fn run(&self, scope: &str, timeout: Duration) -> OracleOutcome;
}

/// Shell-free command oracle: `test_cmd` is split on whitespace and the scope
/// is appended as a final argument when non-empty.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandOracle {
    pub fn new(test_cmd: &str) -> Self {
        let (program, args) = parse_test_cmd(test_cmd);
        Self {
            program,
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl TestOracle for CommandOracle {
    fn run(&self, scope: &str, timeout: Duration) -> OracleOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if !scope.is_empty() {
            cmd.arg(scope);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        match run_with_deadline(cmd, timeout) {
            Ok(Completion::Exited { success: true, output }) => OracleOutcome::Passed { output },
            Ok(Completion::Exited { success: false, output }) => OracleOutcome::Failed { output },
            Ok(Completion::TimedOut { output }) => OracleOutcome::TimedOut { output },
            Ok(Completion::Interrupted { output }) => OracleOutcome::Interrupted { output },
            Err(e) => OracleOutcome::SpawnFailed {
                message: format!("failed to run {}: {}", self.program, e),
            },
        }
    }
}

pub fn parse_test_cmd(cmd: &str) -> (String, Vec<String>) {
    let mut parts = cmd.split_whitespace().map(String::from);
    let program = parts.next().unwrap_or_default();
    (program, parts.collect())
}

/// How a deadline-bounded child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Exited { success: bool, output: String },
    TimedOut { output: String },
    Interrupted { output: String },
}

/// Spawn `cmd` with piped output and poll it until it exits, the deadline
/// passes or Ctrl-C is seen. Overrunning children are killed.
///
/// Only a spawn failure is an `Err`; everything after that is a `Completion`.
pub fn run_with_deadline(mut cmd: Command, timeout: Duration) -> io::Result<Completion> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout = child.stdout.take().map(Capture::start);
    let stderr = child.stderr.take().map(Capture::start);

    let start = Instant::now();
    let exit = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status.success()),
            Ok(None) => {
                if is_interrupted() {
                    break Err(Stop::Interrupted);
                }
                if start.elapsed() > timeout {
                    break Err(Stop::Deadline);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill(&mut child);
                return Ok(Completion::Exited {
                    success: false,
                    output: format!("failed to wait for test process: {e}"),
                });
            }
        }
    };

    match exit {
        Ok(success) => {
            // A backgrounded grandchild can keep the pipes open past our exit.
            let drain_until = (start + timeout).max(Instant::now() + DRAIN_GRACE);
            let output = combine(
                stdout.map(|c| c.finish(drain_until)).unwrap_or_default(),
                stderr.map(|c| c.finish(drain_until)).unwrap_or_default(),
            );
            Ok(Completion::Exited { success, output })
        }
        Err(stop) => {
            kill(&mut child);
            // Grandchildren may still hold the pipes open; take what has been read so far.
            let output = combine(
                stdout.map(|c| c.snapshot()).unwrap_or_default(),
                stderr.map(|c| c.snapshot()).unwrap_or_default(),
            );
            Ok(match stop {
                Stop::Deadline => Completion::TimedOut { output },
                Stop::Interrupted => Completion::Interrupted { output },
            })
        }
    }
}

enum Stop {
    Deadline,
    Interrupted,
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Drains a pipe on its own thread so a chatty child never blocks on a full
/// pipe while we poll it.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl Capture {
    fn start(mut pipe: impl Read + Send + 'static) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let reader = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
        });
        Self { buffer, reader }
    }

    /// Wait for the pipe to close, but not past `deadline`. A reader still
    /// blocked by then is left detached and whatever it read is returned.
    fn finish(self, deadline: Instant) -> String {
        let Capture { buffer, reader } = self;
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if reader.is_finished() {
            let _ = reader.join();
        }
        read_buffer(&buffer)
    }

    fn snapshot(&self) -> String {
        read_buffer(&self.buffer)
    }
}

fn read_buffer(buffer: &Mutex<Vec<u8>>) -> String {
    match buffer.lock() {
        Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => String::new(),
    }
}

fn combine(stdout: String, stderr: String) -> String {
    if stderr.is_empty() {
        stdout
    } else if stdout.is_empty() {
        stderr
    } else {
        format!("{stdout}\n{stderr}")
    }
}

/// Cut `output` to at most `max_bytes` on a char boundary.
pub fn truncate_output(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut end = max_bytes;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &output[..end])
}
