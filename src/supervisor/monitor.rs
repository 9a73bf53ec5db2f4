//! Per-child monitor task
//!
//! Owns the OS process: reads its output into the readiness detector and the
//! optional output log, carries out terminate/kill requests, and reports the
//! exit code once the process is reaped.

use super::state::Shared;
use crate::readiness::ReadinessDetector;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Weak;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::Child;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::time;

/// Lines still buffered in the pipes when the process exits are read for at most this long.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
enum Control {
    Terminate,
    Kill,
}

/// The supervisor's side of a running child.
///
/// Dropping the handle while the process is alive kills it.
pub(crate) struct ChildHandle {
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Control>,
    exit: watch::Receiver<Option<i32>>,
}

impl ChildHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        self.exit.borrow().is_none()
    }

    /// Asks the process to exit (SIGTERM on unix).
    pub fn terminate(&self) {
        let _ = self.control.send(Control::Terminate);
    }

    pub fn kill(&self) {
        let _ = self.control.send(Control::Kill);
    }

    /// Resolves to the exit code once the monitor has reaped the process.
    pub fn exit(&self) -> watch::Receiver<Option<i32>> {
        self.exit.clone()
    }
}

pub(crate) struct Monitor {
    child: Child,
    generation: u64,
    control: mpsc::UnboundedReceiver<Control>,
    exit_tx: watch::Sender<Option<i32>>,
    output_log: Option<PathBuf>,
}

pub(crate) fn attach(
    child: Child,
    generation: u64,
    output_log: Option<PathBuf>,
) -> (ChildHandle, Monitor) {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (exit_tx, exit_rx) = watch::channel(None);
    let handle = ChildHandle {
        pid: child.id(),
        control: control_tx,
        exit: exit_rx,
    };
    let monitor = Monitor {
        child,
        generation,
        control: control_rx,
        exit_tx,
        output_log,
    };
    (handle, monitor)
}

impl Monitor {
    pub(crate) async fn run(mut self, shared: Weak<Shared>) {
        let pid = self.child.id().unwrap_or(0);
        let generation = self.generation;
        let mut stdout = self.child.stdout.take().map(LineReader::new);
        let mut stderr = self.child.stderr.take().map(LineReader::new);
        let mut log = open_output_log(self.output_log.as_deref()).await;
        let mut detector = ReadinessDetector::new();
        let mut control_open = true;
        let mut log_flush_interval = time::interval(Duration::from_millis(500));

        let on_stdout = |line: &str, detector: &mut ReadinessDetector| {
            debug!("vboxwebsrv: {line}");
            if let Some(signal) = detector.observe(line)
                && let Some(shared) = shared.upgrade()
            {
                shared.on_signal(generation, signal);
            }
        };

        let status = loop {
            select! {
                line = next_line(&mut stdout), if stdout.is_some() => match line {
                    Some(line) => {
                        on_stdout(&line, &mut detector);
                        write_log(&mut log, &line).await;
                    }
                    None => stdout = None,
                },
                line = next_line(&mut stderr), if stderr.is_some() => match line {
                    Some(line) => {
                        debug!("vboxwebsrv (stderr): {line}");
                        write_log(&mut log, &line).await;
                    }
                    None => stderr = None,
                },
                cmd = self.control.recv(), if control_open => match cmd {
                    Some(Control::Terminate) => terminate(&mut self.child),
                    Some(Control::Kill) => {
                        if let Err(e) = self.child.start_kill() {
                            warn!("failed to kill web service pid {pid}: {e}");
                        }
                    }
                    None => {
                        // supervisor released the process without stopping it
                        control_open = false;
                        debug!("killing abandoned web service pid {pid}");
                        let _ = self.child.start_kill();
                    }
                },
                status = self.child.wait() => break status,
                _ = log_flush_interval.tick(), if log.is_some() => {
                    if let Some(log) = log.as_mut()
                        && let Err(e) = log.flush().await
                    {
                        error!("failed to flush web service output log: {e}");
                    }
                }
            }
        };

        let _ = time::timeout(DRAIN_TIMEOUT, async {
            loop {
                select! {
                    line = next_line(&mut stdout), if stdout.is_some() => match line {
                        Some(line) => {
                            on_stdout(&line, &mut detector);
                            write_log(&mut log, &line).await;
                        }
                        None => stdout = None,
                    },
                    line = next_line(&mut stderr), if stderr.is_some() => match line {
                        Some(line) => {
                            debug!("vboxwebsrv (stderr): {line}");
                            write_log(&mut log, &line).await;
                        }
                        None => stderr = None,
                    },
                    else => break,
                }
            }
        })
        .await;
        if let Some(log) = log.as_mut()
            && let Err(e) = log.flush().await
        {
            error!("failed to flush web service output log: {e}");
        }

        let code = match status {
            Ok(status) => exit_code(status),
            Err(e) => {
                error!("failed to wait for web service pid {pid}: {e}");
                -1
            }
        };
        info!("VirtualBox web service process has exited with rc {code}");
        if let Some(shared) = shared.upgrade() {
            shared.on_exit(generation, code);
        }
        self.exit_tx.send_replace(Some(code));
    }
}

/// Splits a pipe into lines without requiring UTF-8.
///
/// Invalid sequences are replaced, so only end of file or an I/O error
/// closes the stream. Partial lines survive a cancelled read.
struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let mut end = self.buf.len();
        if self.buf[..end].ends_with(b"\n") {
            end -= 1;
        }
        if self.buf[..end].ends_with(b"\r") {
            end -= 1;
        }
        let line = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}

async fn next_line<R: AsyncRead + Unpin>(lines: &mut Option<LineReader<R>>) -> Option<String> {
    let lines = lines.as_mut()?;
    match lines.next_line().await {
        Ok(line) => line,
        Err(e) => {
            warn!("failed to read web service output: {e}");
            None
        }
    }
}

async fn open_output_log(path: Option<&Path>) -> Option<BufWriter<File>> {
    let path = path?;
    if let Some(parent) = path.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        error!("failed to create {}: {e}", parent.display());
        return None;
    }
    match File::options().append(true).create(true).open(path).await {
        Ok(f) => Some(BufWriter::new(f)),
        Err(e) => {
            error!("failed to open web service output log {}: {e}", path.display());
            None
        }
    }
}

async fn write_log(log: &mut Option<BufWriter<File>>, line: &str) {
    if let Some(log) = log {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Err(e) = log.write_all(format!("{now} {line}\n").as_bytes()).await {
            error!("failed to write web service output log: {e}");
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    debug!("sending SIGTERM to web service pid {pid}");
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!("failed to send SIGTERM to web service pid {pid}: {e}");
    }
}

#[cfg(windows)]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("failed to terminate web service process: {e}");
    }
}

/// Signal deaths map to `128 + signal`, as a shell reports them.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(-1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code(ExitStatus::from_raw(15)), 143);
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }

    #[tokio::test]
    async fn test_monitor_reports_exit_without_supervisor() {
        let child = tokio::process::Command::new("sh")
            .args(["-c", "echo hello; exit 4"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let (handle, monitor) = attach(child, 1, None);
        assert!(handle.is_alive());
        tokio::spawn(monitor.run(Weak::new()));

        let mut exit = handle.exit();
        let code = *exit.wait_for(Option::is_some).await.unwrap();
        assert_eq!(code, Some(4));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_line_reader_replaces_invalid_utf8() {
        let input: &[u8] = b"caf\xe9 locale\r\nsecond\nno newline";
        let mut lines = LineReader::new(input);
        assert_eq!(
            lines.next_line().await.unwrap().as_deref(),
            Some("caf\u{fffd} locale")
        );
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("no newline"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dropping_handle_kills_child() {
        let child = tokio::process::Command::new("sh")
            .args(["-c", "exec sleep 30"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let (handle, monitor) = attach(child, 1, None);
        let mut exit = handle.exit();
        tokio::spawn(monitor.run(Weak::new()));
        drop(handle);

        let code = time::timeout(Duration::from_secs(5), exit.wait_for(Option::is_some))
            .await
            .unwrap()
            .map(|c| *c)
            .unwrap();
        assert_eq!(code, Some(137));
    }
}
