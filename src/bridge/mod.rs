//! Invocation executor for the debugging bridge (`adb` by default).
//!
//! The bridge is always spawned with an explicit argument vector; no host
//! shell is involved. Each run:
//!   - stdin is closed, stdout/stderr are captured
//!   - the child is bounded by a timeout; on expiry it is killed and reaped
//!     before `run` returns
//!   - a non-zero exit status is a failure, stderr output alone is not

pub mod devices;

use anyhow::{Context, Result, bail};
use shell_words::split as shell_split;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

pub use devices::{DeviceEntry, device_unavailable_reason, parse_devices};

pub const DEFAULT_BRIDGE: &str = "adb";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the bridge is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

/// Outcome of one bridge invocation that actually started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { stdout: String, stderr: String },
    ExternalFailure { code: Option<i32>, stderr: String, stdout: String },
    Timeout { after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Failure to start the bridge at all.
#[derive(Debug)]
pub enum SpawnError {
    NotFound { program: String },
    Io { program: String, source: std::io::Error },
}

impl Bridge {
    pub fn new(program: impl Into<String>, base_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            base_args,
            timeout,
        }
    }

    /// Parse a bridge command line such as `adb` or `adb -P 5038`.
    ///
    /// The line is split with shell-word rules once, at configuration time;
    /// the resulting tokens are passed to the OS verbatim.
    pub fn from_command_line(raw: &str, timeout: Duration) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("bridge command is empty");
        }
        let parts = shell_split(trimmed).context("failed to parse bridge command line")?;
        let Some((program, rest)) = parts.split_first() else {
            bail!("no tokens produced when parsing bridge command");
        };
        if program.is_empty() {
            bail!("empty program name in bridge command");
        }
        Ok(Self::new(program.clone(), rest.to_vec(), timeout))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argv after the program: fixed args, optional `-s serial`, command args.
    pub fn argv(&self, device: Option<&str>, args: &[String]) -> Vec<String> {
        let mut argv = self.base_args.clone();
        if let Some(serial) = device {
            argv.push("-s".into());
            argv.push(serial.to_string());
        }
        argv.extend(args.iter().cloned());
        argv
    }

    /// Run `args` (after the fixed args and device selector) with the
    /// configured timeout.
    pub async fn run(
        &self,
        device: Option<&str>,
        args: &[String],
    ) -> Result<InvocationResult, SpawnError> {
        self.run_with_timeout(device, args, self.timeout).await
    }

    /// The deadline covers the child's exit *and* the end of its output, so a
    /// descendant holding the pipes open cannot stretch a request past it.
    pub async fn run_with_timeout(
        &self,
        device: Option<&str>,
        args: &[String],
        timeout: Duration,
    ) -> Result<InvocationResult, SpawnError> {
        let argv = self.argv(device, args);
        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SpawnError::NotFound {
                program: self.program.clone(),
            },
            _ => SpawnError::Io {
                program: self.program.clone(),
                source: e,
            },
        })?;
        // also the process group id
        let pid = child.id();
        trace!(?pid, program = %self.program, "bridge spawned");

        let mut stdout_task = tokio::spawn(drain(child.stdout.take(), "stdout"));
        let mut stderr_task = tokio::spawn(drain(child.stderr.take(), "stderr"));

        let finished = tokio::time::timeout(timeout, async {
            let status = child.wait().await;
            let stdout = join_output(&mut stdout_task).await;
            let stderr = join_output(&mut stderr_task).await;
            (status, stdout, stderr)
        })
        .await;

        let outcome = match finished {
            Ok((Ok(status), stdout, stderr)) => {
                if status.success() {
                    Outcome::Success { stdout, stderr }
                } else {
                    Outcome::ExternalFailure {
                        code: status.code(),
                        stderr,
                        stdout,
                    }
                }
            }
            Ok((Err(e), _, _)) => Outcome::ExternalFailure {
                code: None,
                stderr: format!("failed waiting for bridge: {e}"),
                stdout: String::new(),
            },
            Err(_) => {
                stdout_task.abort();
                stderr_task.abort();
                kill_group(pid);
                // kill() also reaps the direct child
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed-out bridge process");
                }
                Outcome::Timeout { after: timeout }
            }
        };

        let elapsed = started.elapsed();
        debug!(
            program = %self.program,
            elapsed_ms = elapsed.as_millis() as u64,
            outcome = outcome.tag(),
            "bridge finished"
        );
        Ok(InvocationResult { outcome, elapsed })
    }
}

/// SIGKILL every process still in the child's group.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "failed to kill bridge process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE, Vec::new(), DEFAULT_TIMEOUT)
    }
}

impl Outcome {
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::ExternalFailure { .. } => "external_failure",
            Outcome::Timeout { .. } => "timeout",
        }
    }
}

async fn drain<R>(pipe: Option<R>, stream: &'static str) -> Vec<u8>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut p) = pipe
        && let Err(e) = p.read_to_end(&mut buf).await
    {
        warn!(
            stream,
            error = %e,
            kept_bytes = buf.len(),
            "bridge output read failed; output may be partial"
        );
    }
    buf
}

async fn join_output(task: &mut JoinHandle<Vec<u8>>) -> String {
    let bytes = task.await.unwrap_or_default();
    String::from_utf8_lossy(&bytes).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_bridge() {
        let b = Bridge::from_command_line("adb", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(b.program(), "adb");
        assert_eq!(b.argv(None, &["devices".into()]), vec!["devices"]);
    }

    #[test]
    fn parse_bridge_with_fixed_args() {
        let b = Bridge::from_command_line(r#"adb -P 5038"#, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            b.argv(Some("emulator-5554"), &["shell".into(), "ls".into()]),
            vec!["-P", "5038", "-s", "emulator-5554", "shell", "ls"]
        );
    }

    #[test]
    fn empty_bridge_rejected() {
        let err = Bridge::from_command_line("  ", DEFAULT_TIMEOUT).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let b = Bridge::new(
            "adb-relay-definitely-missing-binary",
            Vec::new(),
            DEFAULT_TIMEOUT,
        );
        let err = b.run(None, &[]).await.unwrap_err();
        assert!(matches!(err, SpawnError::NotFound { .. }));
    }

    #[cfg(unix)]
    fn sh(timeout: Duration) -> Bridge {
        Bridge::new("sh", vec!["-c".into()], timeout)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fixed_args_precede_command_args() {
        let res = sh(DEFAULT_TIMEOUT)
            .run(None, &["echo ok; echo warn >&2".into()])
            .await
            .unwrap();
        assert_eq!(
            res.outcome,
            Outcome::Success {
                stdout: "ok".into(),
                stderr: "warn".into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_failure() {
        let res = sh(DEFAULT_TIMEOUT)
            .run(None, &["echo boom >&2; exit 3".into()])
            .await
            .unwrap();
        match res.outcome {
            Outcome::ExternalFailure { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hanging_child_times_out_and_is_reaped() {
        let b = Bridge::new("sleep", Vec::new(), Duration::from_millis(200));
        let started = Instant::now();
        let res = b.run(None, &["30".into()]).await.unwrap();
        assert!(matches!(res.outcome, Outcome::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn background_descendant_holding_pipes_times_out() {
        let started = Instant::now();
        let res = sh(Duration::from_millis(300))
            .run(None, &["sleep 6 & echo hi".into()])
            .await
            .unwrap();
        assert_eq!(
            res.outcome,
            Outcome::Timeout {
                after: Duration::from_millis(300)
            }
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    /// Running and not a zombie waiting for its new parent to reap it.
    #[cfg(target_os = "linux")]
    fn process_running(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_grandchildren() {
        let pid_file = std::env::temp_dir().join(format!(
            "adb_relay_grandchild_{}.pid",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&pid_file);
        let script = format!(
            "sleep 30 > /dev/null 2>&1 & echo $! > '{}'; wait",
            pid_file.display()
        );
        let res = sh(Duration::from_millis(500))
            .run(None, &[script])
            .await
            .unwrap();
        assert!(matches!(res.outcome, Outcome::Timeout { .. }));

        let grandchild: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let _ = std::fs::remove_file(&pid_file);

        let mut gone = false;
        for _ in 0..40 {
            if !process_running(grandchild) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(gone, "grandchild {grandchild} survived the timeout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn metacharacters_stay_one_argument() {
        let b = Bridge::new("printf", Vec::new(), DEFAULT_TIMEOUT);
        let payload = "; rm -rf / $(whoami)";
        let res = b
            .run(None, &["[%s]\n".into(), payload.into()])
            .await
            .unwrap();
        assert_eq!(
            res.outcome,
            Outcome::Success {
                stdout: format!("[{payload}]"),
                stderr: String::new()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn device_selector_reaches_the_bridge() {
        let b = Bridge::new("printf", vec!["%s,".into()], DEFAULT_TIMEOUT);
        let res = b
            .run(Some("emulator-5554"), &["shell".into()])
            .await
            .unwrap();
        assert_eq!(
            res.outcome,
            Outcome::Success {
                stdout: "-s,emulator-5554,shell,".into(),
                stderr: String::new()
            }
        );
    }
}
