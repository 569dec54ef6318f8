//! Docker sandbox: copies data into a running container and executes Python there.

use std::{path::Path, process::Stdio, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::{debug, warn};

use crate::config::Config;

/// Exit status of coreutils `timeout` when the deadline fires.
const TIMEOUT_STATUS: i32 = 124;
/// How long `timeout` waits after SIGTERM before sending SIGKILL.
const KILL_AFTER: Duration = Duration::from_secs(2);
const HOST_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Text handed back to the model as the tool result.
    pub fn render(&self) -> String {
        if self.timed_out {
            return format!("Execution timed out.\n{}", self.stderr);
        }
        let mut body = format!("Exit code: {}\n", self.exit_code);
        if !self.stdout.is_empty() {
            body.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
                body.push('\n');
            }
            body.push_str(&self.stderr);
        }
        body
    }
}

#[derive(Debug, Clone)]
pub struct DockerSandbox {
    docker: String,
    container: String,
    data_dir: String,
    python: String,
    exec_timeout: Duration,
}

impl DockerSandbox {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            docker: cfg.get("DOCKER_BIN").unwrap_or_else(|| "docker".into()),
            container: cfg.get("SANDBOX_CONTAINER").unwrap_or_else(|| "sandbox".into()),
            data_dir: cfg
                .get("SANDBOX_DATA_DIR")
                .unwrap_or_else(|| "/home/sandboxuser/data".into()),
            python: cfg.get("SANDBOX_PYTHON").unwrap_or_else(|| "python".into()),
            exec_timeout: Duration::from_secs(cfg.get_u64("EXEC_TIMEOUT").unwrap_or(60)),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    /// Path a host file will have once copied into the container.
    pub fn container_path_for(&self, host: &Path) -> Result<String> {
        let name = host
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("not a file path: {}", host.display()))?;
        Ok(format!("{}/{}", self.data_dir.trim_end_matches('/'), name))
    }

    /// Whether the configured container exists and is running.
    pub async fn is_running(&self) -> bool {
        let out = Command::new(&self.docker)
            .args(["inspect", "-f", "{{.State.Running}}", self.container.as_str()])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        match out {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim() == "true",
            _ => false,
        }
    }

    /// Copy a host file into the container's data directory and return its in-container path.
    pub async fn copy_in(&self, host: &Path) -> Result<String> {
        let target = self.container_path_for(host)?;

        self.run_docker(&self.mkdir_args(), "mkdir").await?;
        self.run_docker(&self.copy_args(host), "cp").await?;

        debug!(host = %host.display(), container = %self.container, %target, "copied file into sandbox");
        Ok(target)
    }

    /// Run a Python program inside the container, feeding it on stdin.
    ///
    /// The deadline is enforced by `timeout` inside the container so a runaway program is
    /// reclaimed there; the host-side deadline only guards against a wedged docker client.
    pub async fn run_python(&self, code: &str) -> Result<ExecutionResult> {
        let mut child = Command::new(&self.docker)
            .args(self.exec_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {} for sandbox exec", self.docker))?;

        debug!(container = %self.container, bytes = code.len(), "executing python in sandbox");
        let stdin = child.stdin.take();
        let exec = async move {
            if let Some(mut stdin) = stdin {
                stdin
                    .write_all(code.as_bytes())
                    .await
                    .context("failed to send code to sandbox")?;
                // dropping stdin closes the pipe so the interpreter sees EOF
            }
            child.wait_with_output().await.context("sandbox exec failed")
        };

        match timeout(self.exec_timeout + HOST_GRACE, exec).await {
            Ok(out) => {
                let out = out?;
                let exit_code = out.status.code().unwrap_or(-1);
                let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
                if exit_code == TIMEOUT_STATUS {
                    warn!(container = %self.container, timeout = ?self.exec_timeout, "sandbox execution timed out");
                    return Ok(self.timed_out(stdout));
                }
                Ok(ExecutionResult {
                    success: out.status.success(),
                    exit_code,
                    stdout,
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                    timed_out: false,
                })
            }
            Err(_) => {
                warn!(container = %self.container, timeout = ?self.exec_timeout, "sandbox client did not return; killed it");
                Ok(self.timed_out(String::new()))
            }
        }
    }

    fn timed_out(&self, stdout: String) -> ExecutionResult {
        ExecutionResult {
            success: false,
            exit_code: -1,
            stdout,
            stderr: format!("Execution timed out after {:?}", self.exec_timeout),
            timed_out: true,
        }
    }

    async fn run_docker(&self, args: &[String], what: &str) -> Result<()> {
        let out = Command::new(&self.docker)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {} {}", self.docker, what))?;
        if !out.status.success() {
            bail!(
                "{} {} failed ({}): {}",
                self.docker,
                what,
                out.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(())
    }

    fn exec_args(&self) -> Vec<String> {
        vec![
            "exec".into(),
            "-i".into(),
            self.container.clone(),
            "timeout".into(),
            "-k".into(),
            format!("{}", KILL_AFTER.as_secs()),
            format!("{}", self.exec_timeout.as_secs_f64()),
            self.python.clone(),
            "-".into(),
        ]
    }

    fn mkdir_args(&self) -> Vec<String> {
        vec![
            "exec".into(),
            self.container.clone(),
            "mkdir".into(),
            "-p".into(),
            self.data_dir.clone(),
        ]
    }

    fn copy_args(&self, host: &Path) -> Vec<String> {
        vec![
            "cp".into(),
            host.to_string_lossy().into_owned(),
            format!("{}:{}/", self.container, self.data_dir.trim_end_matches('/')),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sandbox() -> DockerSandbox {
        DockerSandbox::from_config(&Config::from_pairs([
            ("SANDBOX_CONTAINER", "analysis"),
            ("SANDBOX_DATA_DIR", "/data/"),
            ("SANDBOX_PYTHON", "python3"),
        ]))
    }

    #[cfg(unix)]
    fn fake_docker(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("docker");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn exec_bounds_the_program_inside_the_container() {
        assert_eq!(
            sandbox().exec_args(),
            vec!["exec", "-i", "analysis", "timeout", "-k", "2", "60", "python3", "-"]
        );
        let short = DockerSandbox { exec_timeout: Duration::from_millis(1500), ..sandbox() };
        assert_eq!(short.exec_args()[6], "1.5");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn in_container_timeout_status_is_reported_as_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let sb = DockerSandbox {
            docker: fake_docker(dir.path(), "cat >/dev/null\necho partial\nexit 124"),
            ..sandbox()
        };
        let r = sb.run_python("while True: pass").await.unwrap();
        assert!(r.timed_out);
        assert_eq!(r.stdout, "partial\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stalled_stdin_is_bounded_by_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let sb = DockerSandbox {
            docker: fake_docker(dir.path(), "exec sleep 30"),
            exec_timeout: Duration::from_millis(100),
            ..sandbox()
        };
        // larger than a pipe buffer, so the write blocks on a reader that never reads
        let code = "#".repeat(1 << 20);
        let started = std::time::Instant::now();
        let r = sb.run_python(&code).await.unwrap();
        assert!(r.timed_out);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn copy_targets_data_dir_in_container() {
        let sb = sandbox();
        let host = PathBuf::from("/tmp/x/traffic_accidents.csv");
        assert_eq!(
            sb.copy_args(&host),
            vec!["cp", "/tmp/x/traffic_accidents.csv", "analysis:/data/"]
        );
        assert_eq!(sb.container_path_for(&host).unwrap(), "/data/traffic_accidents.csv");
        assert_eq!(sb.mkdir_args(), vec!["exec", "analysis", "mkdir", "-p", "/data/"]);
    }

    #[test]
    fn render_includes_exit_code_and_both_streams() {
        let r = ExecutionResult {
            success: false,
            exit_code: 1,
            stdout: "partial".into(),
            stderr: "Traceback".into(),
            timed_out: false,
        };
        assert_eq!(r.render(), "Exit code: 1\npartial\nTraceback");
    }

    #[test]
    fn render_reports_timeouts() {
        let r = ExecutionResult {
            timed_out: true,
            exit_code: -1,
            stderr: "Execution timed out after 1s".into(),
            ..Default::default()
        };
        assert!(r.render().starts_with("Execution timed out."));
    }

    #[tokio::test]
    async fn missing_docker_binary_is_an_error_not_a_panic() {
        let sb = DockerSandbox::from_config(&Config::from_pairs([(
            "DOCKER_BIN",
            "/nonexistent/docker-binary",
        )]));
        assert!(!sb.is_running().await);
        assert!(sb.run_python("print(1)").await.is_err());
    }
}
