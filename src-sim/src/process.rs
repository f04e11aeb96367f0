// ============================================================================
// External process supervision
// ============================================================================

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Minimum time given to output readers once the process is gone.
const READER_GRACE: Duration = Duration::from_millis(200);

/// A program invocation: no shell, explicit arguments, fixed working directory.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: None, timeout }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human readable command line, for logs only.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a supervised process ended.
#[derive(Debug)]
pub enum ProcessOutcome {
    Completed { status: ExitStatus, stdout: String, stderr: String, elapsed: Duration },
    /// Killed after exceeding its timeout. Output is whatever was read so far.
    TimedOut { stdout: String, stderr: String, elapsed: Duration },
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProcessOutcome::Completed { status, .. } if status.success())
    }

    pub fn stdout(&self) -> &str {
        match self {
            ProcessOutcome::Completed { stdout, .. } | ProcessOutcome::TimedOut { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ProcessOutcome::Completed { stderr, .. } | ProcessOutcome::TimedOut { stderr, .. } => stderr,
        }
    }
}

/// Run `spec` to completion or until its timeout, whichever comes first.
///
/// On unix the child leads its own process group, and the whole group is
/// killed on timeout. A process that exits while a background descendant still
/// holds its output pipes is reported as completed once the time left on its
/// timeout runs out; the stragglers are then killed. `Err` only when the
/// process cannot be spawned or waited on.
pub fn run(spec: &ProcessSpec) -> std::io::Result<ProcessOutcome> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    log::debug!("running `{}` (timeout {:?})", spec.command_line(), spec.timeout);
    let start = Instant::now();
    let deadline = start + spec.timeout;
    let mut child = cmd.spawn()?;

    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();
    let mut readers = 0;
    if let Some(pipe) = child.stdout.take() {
        drain(pipe, stdout_buf.clone(), done_tx.clone());
        readers += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        drain(pipe, stderr_buf.clone(), done_tx);
        readers += 1;
    }

    loop {
        if let Some(status) = child.try_wait()? {
            let grace = deadline.max(Instant::now() + READER_GRACE);
            if !wait_readers(&done_rx, readers, grace) {
                log::debug!("`{}` exited but its output is still held open; killing leftovers", spec.program);
                kill_tree(&mut child, &spec.program);
            }
            return Ok(ProcessOutcome::Completed {
                status,
                stdout: lossy(&stdout_buf),
                stderr: lossy(&stderr_buf),
                elapsed: start.elapsed(),
            });
        }
        if Instant::now() >= deadline {
            kill_tree(&mut child, &spec.program);
            let _ = child.wait();
            wait_readers(&done_rx, readers, Instant::now() + READER_GRACE);
            return Ok(ProcessOutcome::TimedOut {
                stdout: lossy(&stdout_buf),
                stderr: lossy(&stderr_buf),
                elapsed: start.elapsed(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and, on unix, every process in its group.
fn kill_tree(child: &mut Child, program: &str) {
    #[cfg(unix)]
    {
        // The child was spawned with process_group(0), so its pid is the group id.
        let pgid = child.id() as libc::pid_t;
        // SAFETY: killpg only sends a signal; it touches no memory of ours.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
            return;
        }
    }
    if let Err(e) = child.kill() {
        log::warn!("failed to kill `{}`: {}", program, e);
    }
}

/// Detached reader: copies the pipe into `sink` and signals `done` at EOF.
fn drain<R: Read + Send + 'static>(mut pipe: R, sink: Arc<Mutex<Vec<u8>>>, done: Sender<()>) {
    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
            }
        }
        let _ = done.send(());
    });
}

/// True when all `readers` reached EOF before `deadline`.
fn wait_readers(done: &Receiver<()>, readers: usize, deadline: Instant) -> bool {
    for _ in 0..readers {
        let left = deadline.saturating_duration_since(Instant::now());
        if done.recv_timeout(left).is_err() {
            return false;
        }
    }
    true
}

fn lossy(buf: &Mutex<Vec<u8>>) -> String {
    String::from_utf8_lossy(&buf.lock()).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> ProcessSpec {
        ProcessSpec::new("sh", timeout).args(["-c", script])
    }

    #[test]
    fn test_captures_output_and_status() {
        let out = run(&sh("echo 1.25; echo oops >&2; exit 0", Duration::from_secs(10))).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout(), "1.25\n");
        assert_eq!(out.stderr(), "oops\n");
    }

    #[test]
    fn test_nonzero_exit() {
        let out = run(&sh("exit 7", Duration::from_secs(10))).unwrap();
        match out {
            ProcessOutcome::Completed { status, .. } => assert_eq!(status.code(), Some(7)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let out = run(&sh("exec sleep 30", Duration::from_millis(200))).unwrap();
        assert!(matches!(out, ProcessOutcome::TimedOut { .. }));
        assert!(!out.success());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_background_output_holder_does_not_outlast_timeout() {
        let start = Instant::now();
        let out = run(&sh("sleep 8 & echo 1.0", Duration::from_secs(1))).unwrap();
        assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
        assert!(out.success());
        assert_eq!(out.stdout(), "1.0\n");
    }

    #[test]
    fn test_timeout_kills_background_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let spec = sh("(sleep 1; touch marker) & sleep 30", Duration::from_millis(200)).cwd(dir.path());
        let out = run(&spec).unwrap();
        assert!(matches!(out, ProcessOutcome::TimedOut { .. }));
        thread::sleep(Duration::from_secs(2));
        assert!(!dir.path().join("marker").exists());
    }

    #[test]
    fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let out = run(&sh("cat marker.txt", Duration::from_secs(10)).cwd(dir.path())).unwrap();
        assert_eq!(out.stdout(), "here");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let spec = ProcessSpec::new("/definitely/not/a/program", Duration::from_secs(1));
        assert!(run(&spec).is_err());
    }
}
