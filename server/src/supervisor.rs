//! Spawning and supervising the server process.
//!
//! The server is a JVM application launched as
//! `<java> [runtime-options] -cp <archive> org.languagetool.server.HTTPServer
//! -p <port> [--config <file>] [extra-options...]`. It announces the bound
//! port on its output stream; startup is detected by scanning for that
//! line, bounded by a timeout so a wedged JVM cannot block forever.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::registry;

/// First port tried when searching for a free one.
pub const MIN_PORT: u16 = 8081;
/// Last port tried when searching for a free one.
pub const MAX_PORT: u16 = 8999;

const SERVER_ENTRY_CLASS: &str = "org.languagetool.server.HTTPServer";

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

const TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum StartupError {
    /// The server violated the startup contract by binding a different
    /// port than requested.
    #[error("requested port {requested}, but the server reported port {reported}")]
    PortMismatch { requested: u16, reported: u16 },
    /// The server exited before announcing a port.
    #[error("server failed to start: {stderr}")]
    Failed { stderr: String },
    /// The server never announced a port within the startup timeout.
    #[error("server did not report a port within {timeout:?}")]
    Timeout { timeout: Duration },
    /// Every port in `MIN_PORT..=MAX_PORT` failed.
    #[error("no free port in {MIN_PORT}..={MAX_PORT}")]
    PortsExhausted,
    #[error("spawning server process")]
    Spawn(#[source] io::Error),
    #[error("reading server output")]
    Io(#[source] io::Error),
}

/// The command line a server is spawned from.
///
/// Program and argument layout are kept as data so the supervisor can be
/// exercised against stand-in executables in tests.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    program: PathBuf,
    runtime_options: Vec<String>,
    archive: PathBuf,
    config_file: Option<PathBuf>,
    extra_options: Vec<String>,
}

impl ServerCommand {
    #[must_use]
    pub fn new(java: &Path, archive: &Path) -> Self {
        Self {
            program: java.to_path_buf(),
            runtime_options: Vec::new(),
            archive: archive.to_path_buf(),
            config_file: None,
            extra_options: Vec::new(),
        }
    }

    /// Options placed before `-cp` (JVM flags such as `-Xmx512m`).
    #[must_use]
    pub fn runtime_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_options
            .extend(options.into_iter().map(Into::into));
        self
    }

    /// Pass `--config <path>` through to the server. The file itself is
    /// the caller's business.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Options appended after the built-in arguments.
    #[must_use]
    pub fn extra_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_options
            .extend(options.into_iter().map(Into::into));
        self
    }

    fn build(&self, port: u16) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.runtime_options)
            .arg("-cp")
            .arg(&self.archive)
            .arg(SERVER_ENTRY_CLASS)
            .arg("-p")
            .arg(port.to_string());
        if let Some(config) = &self.config_file {
            cmd.arg("--config").arg(config);
        }
        cmd.args(&self.extra_options)
            // All three handles piped: stdout carries the startup signal,
            // stderr is collected on failure, and an inherited stdin would
            // let the JVM read ours.
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[derive(Debug)]
struct LocalServer {
    child: Child,
    port: u16,
    /// Retained so terminate can collect late error output.
    stderr: Option<BufReader<ChildStderr>>,
    drain: JoinHandle<()>,
}

/// Manages the lifecycle of one local server process.
///
/// Not meant to be shared for concurrent server management across threads;
/// one supervisor owns one server.
#[derive(Debug)]
pub struct Supervisor {
    command: ServerCommand,
    startup_timeout: Duration,
    server: Option<LocalServer>,
}

impl Supervisor {
    #[must_use]
    pub fn new(command: ServerCommand) -> Self {
        Self {
            command,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            server: None,
        }
    }

    /// Bound the wait for the server's port announcement.
    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Start a server on the first free port in `MIN_PORT..=MAX_PORT`.
    ///
    /// A startup failure (the port was taken, or the server reported the
    /// wrong one) advances to the next port; any other error is fatal.
    pub async fn start(&mut self) -> Result<u16, StartupError> {
        for port in MIN_PORT..=MAX_PORT {
            match self.start_on(port).await {
                Ok(()) => return Ok(port),
                Err(e @ (StartupError::PortMismatch { .. } | StartupError::Failed { .. })) => {
                    tracing::debug!(port, error = %e, "startup attempt failed; trying next port");
                }
                Err(other) => return Err(other),
            }
        }
        Err(StartupError::PortsExhausted)
    }

    /// Start a server on `port`, replacing any server this supervisor is
    /// already running.
    pub async fn start_on(&mut self, port: u16) -> Result<(), StartupError> {
        self.terminate().await;

        let mut child = self
            .command
            .build(port)
            .spawn()
            .map_err(StartupError::Spawn)?;
        let stderr = child.stderr.take().map(BufReader::new);
        let Some(stdout) = child.stdout.take() else {
            return Err(StartupError::Spawn(io::Error::other(
                "child stdout was not piped",
            )));
        };
        let mut lines = BufReader::new(stdout).lines();

        let reported =
            match tokio::time::timeout(self.startup_timeout, wait_for_port(&mut lines)).await {
                Ok(Ok(reported)) => reported,
                Ok(Err(source)) => {
                    shutdown_child(child, stderr).await;
                    return Err(StartupError::Io(source));
                }
                Err(_) => {
                    shutdown_child(child, stderr).await;
                    return Err(StartupError::Timeout {
                        timeout: self.startup_timeout,
                    });
                }
            };

        match reported {
            Some(reported) if reported != port => {
                shutdown_child(child, stderr).await;
                Err(StartupError::PortMismatch {
                    requested: port,
                    reported,
                })
            }
            Some(_) => {
                // Keep consuming stdout so the child never blocks on a
                // full pipe.
                let drain = tokio::spawn(async move {
                    while let Ok(Some(_)) = lines.next_line().await {}
                });
                if let Some(pid) = child.id() {
                    registry::register(pid);
                }
                tracing::info!(port, "server started");
                self.server = Some(LocalServer {
                    child,
                    port,
                    stderr,
                    drain,
                });
                Ok(())
            }
            None => {
                // Stream closed without a port line: whatever is on
                // stderr is the startup error.
                let stderr_text = shutdown_child(child, stderr).await;
                match parse_port_line(&stderr_text) {
                    Some(reported) if reported != port => Err(StartupError::PortMismatch {
                        requested: port,
                        reported,
                    }),
                    _ => Err(StartupError::Failed {
                        stderr: stderr_text,
                    }),
                }
            }
        }
    }

    /// Terminate the running server, returning any collected stderr.
    ///
    /// Idempotent; returns an empty string when nothing is running.
    pub async fn terminate(&mut self) -> String {
        let Some(server) = self.server.take() else {
            return String::new();
        };
        server.drain.abort();
        let pid = server.child.id();
        tracing::debug!(port = server.port, "terminating server");
        let stderr_text = shutdown_child(server.child, server.stderr).await;
        if let Some(pid) = pid {
            registry::unregister(pid);
        }
        stderr_text
    }

    /// Whether a server process exists and has not exited.
    pub fn is_alive(&mut self) -> bool {
        self.server
            .as_mut()
            .is_some_and(|s| matches!(s.child.try_wait(), Ok(None)))
    }

    /// The running server's port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.server.as_ref().map(|s| s.port)
    }
}

/// Scan stdout until the server announces a port or the stream closes.
async fn wait_for_port(
    lines: &mut Lines<BufReader<ChildStdout>>,
) -> Result<Option<u16>, io::Error> {
    while let Some(line) = lines.next_line().await? {
        tracing::trace!(%line, "server startup output");
        if let Some(port) = parse_port_line(&line) {
            return Ok(Some(port));
        }
    }
    Ok(None)
}

/// Extract the announced port from a line like
/// `Server started ... at http://localhost:8081` or `... on port 8081`.
fn parse_port_line(line: &str) -> Option<u16> {
    static PORT_RE: OnceLock<Regex> = OnceLock::new();
    let re = PORT_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://.*:|port\s+)(\d+)").expect("port pattern is valid")
    });
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

/// Terminate gracefully, then forcefully, and collect remaining stderr.
/// Secondary I/O errors are suppressed; this path is already failing or
/// shutting down.
async fn shutdown_child(mut child: Child, stderr: Option<BufReader<ChildStderr>>) -> String {
    signal_terminate(&child);
    if tokio::time::timeout(TERMINATE_TIMEOUT, child.wait())
        .await
        .is_err()
    {
        tracing::debug!("server did not exit in time; killing");
        let _ = child.kill().await;
    }

    let Some(mut reader) = stderr else {
        return String::new();
    };
    let mut text = String::new();
    let _ = tokio::time::timeout(TERMINATE_TIMEOUT, reader.read_to_string(&mut text)).await;
    text.trim().to_string()
}

#[cfg(unix)]
fn signal_terminate(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) with SIGTERM has no memory-safety preconditions.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn signal_terminate(_child: &Child) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_style_port_line() {
        let line = "2024-01-01 10:00:00 Server started at http://localhost:8081";
        assert_eq!(parse_port_line(line), Some(8081));
    }

    #[test]
    fn parses_plain_port_line_case_insensitively() {
        assert_eq!(parse_port_line("Starting server on PORT 8085"), Some(8085));
    }

    #[test]
    fn ignores_lines_without_a_port() {
        assert_eq!(parse_port_line("Loading dictionaries..."), None);
        assert_eq!(parse_port_line(""), None);
    }

    #[test]
    fn command_line_layout_matches_contract() {
        let cmd = ServerCommand::new(Path::new("/usr/bin/java"), Path::new("/opt/lt/server.jar"))
            .runtime_options(["-Xmx512m"])
            .with_config_file("/tmp/server.cfg")
            .extra_options(["--public"]);
        let built = cmd.build(8081);
        let args: Vec<String> = built
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-Xmx512m",
                "-cp",
                "/opt/lt/server.jar",
                "org.languagetool.server.HTTPServer",
                "-p",
                "8081",
                "--config",
                "/tmp/server.cfg",
                "--public",
            ]
        );
    }
}

#[cfg(all(test, unix))]
mod process_tests {
    use super::*;

    /// A stand-in server: `sh -c '<script>'` with the real argument tail
    /// appended, so the requested port is `$4`.
    fn fake_command(script: &str) -> ServerCommand {
        ServerCommand::new(Path::new("sh"), Path::new("fake.jar")).runtime_options(["-c", script])
    }

    #[tokio::test]
    async fn start_scans_stdout_for_the_port() {
        let mut sup = Supervisor::new(fake_command(
            r#"echo "Server started at http://localhost:$4"; sleep 2"#,
        ));
        let port = sup.start().await.unwrap();
        assert_eq!(port, MIN_PORT);
        assert_eq!(sup.port(), Some(MIN_PORT));
        assert!(sup.is_alive());
        sup.terminate().await;
        assert!(!sup.is_alive());
    }

    #[tokio::test]
    async fn port_mismatch_is_a_protocol_violation() {
        let mut sup = Supervisor::new(fake_command(
            r#"echo "Server started on port 9999"; sleep 2"#,
        ));
        let err = sup.start_on(MIN_PORT).await.unwrap_err();
        assert!(matches!(
            err,
            StartupError::PortMismatch {
                requested: MIN_PORT,
                reported: 9999,
            }
        ));
        assert!(!sup.is_alive());
    }

    #[tokio::test]
    async fn early_exit_surfaces_stderr() {
        let mut sup = Supervisor::new(fake_command(
            r#"echo "Address already in use" >&2; exit 1"#,
        ));
        let err = sup.start_on(MIN_PORT).await.unwrap_err();
        match err {
            StartupError::Failed { stderr } => {
                assert!(stderr.contains("Address already in use"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn port_search_advances_past_a_failed_port() {
        let mut sup = Supervisor::new(fake_command(
            r#"if [ "$4" = "8081" ]; then echo "Address already in use" >&2; exit 1; fi
               echo "Server started on port $4"; sleep 2"#,
        ));
        let port = sup.start().await.unwrap();
        assert_eq!(port, 8082);
        sup.terminate().await;
    }

    #[tokio::test]
    async fn silent_server_hits_the_startup_timeout() {
        let mut sup = Supervisor::new(fake_command("sleep 5"))
            .with_startup_timeout(Duration::from_millis(200));
        let err = sup.start_on(MIN_PORT).await.unwrap_err();
        assert!(matches!(err, StartupError::Timeout { .. }));
    }

    #[tokio::test]
    async fn terminate_is_idempotent() {
        let mut sup = Supervisor::new(fake_command(
            r#"echo "Server started on port $4"; echo "warming up" >&2; sleep 2"#,
        ));
        sup.start().await.unwrap();
        sup.terminate().await;
        assert_eq!(sup.terminate().await, "");
        assert_eq!(sup.port(), None);
    }

    #[tokio::test]
    async fn liveness_reflects_process_exit() {
        let mut sup = Supervisor::new(fake_command(r#"echo "Server started on port $4""#));
        sup.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!sup.is_alive());
    }
}
