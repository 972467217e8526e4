//! 命令执行器
//!
//! 所有与容器运行时的交互都经过这里：
//! - stdout/stderr 由两个独立任务并发读取，避免管道写满阻塞子进程
//! - 两个读取任务都结束后才检查退出码
//! - 不做重试，也没有超时

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::configuration::is_sensitive_key;
use crate::error::{DeployError, DeployResult};

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) | CommandError::WaitFailed(e) => Some(e),
        }
    }
}

/// 子进程输出的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// 只捕获
    Capture,
    /// 捕获的同时逐行回显到终端
    Echo,
}

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// 外部进程执行策略
///
/// 生产环境使用 [`TokioProcessRunner`]，测试中替换为录制用的假实现
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// 执行命令，返回退出码与捕获的输出；非零退出码不视为错误
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        mode: OutputMode,
    ) -> Result<CommandOutput, CommandError>;

    /// 执行命令，非零退出码转换为 [`DeployError::ExternalCommand`]
    async fn run_or_fail(
        &self,
        program: &str,
        args: &[&str],
        mode: OutputMode,
    ) -> DeployResult<CommandOutput> {
        let output = self
            .run(program, args, mode)
            .await
            .map_err(|source| DeployError::Spawn {
                command: display_command(program, args),
                source,
            })?;

        if output.is_success() {
            Ok(output)
        } else {
            Err(DeployError::ExternalCommand {
                command: display_command(program, args),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

/// 基于 tokio::process 的执行器
pub struct TokioProcessRunner {
    work_dir: PathBuf,
}

impl TokioProcessRunner {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        mode: OutputMode,
    ) -> Result<CommandOutput, CommandError> {
        let command_line = display_command(program, args);
        debug!(command = %command_line, "Executing");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CommandError::SpawnFailed)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let echo = mode == OutputMode::Echo;
        let stdout_task = tokio::spawn(drain(stdout, echo.then_some(echo_stdout as fn(&str))));
        let stderr_task = tokio::spawn(drain(stderr, echo.then_some(echo_stderr as fn(&str))));

        let status = child.wait().await.map_err(CommandError::WaitFailed);

        // 等待日志读取完成
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let status = status?;
        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!(command = %command_line, exit_code, "Command exited with failure");
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// 逐行读取子进程输出直到 EOF；非 UTF-8 字节按替换字符处理，不中断读取
async fn drain<R>(stream: Option<R>, echo: Option<fn(&str)>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut captured = String::new();
    let Some(stream) = stream else {
        return captured;
    };

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let raw = String::from_utf8_lossy(&buf);
                let line = raw.trim_end_matches(['\r', '\n']);
                if let Some(echo) = echo {
                    echo(line);
                }
                captured.push_str(line);
                captured.push('\n');
            }
            Err(e) => {
                warn!(error = %e, "Failed to read command output");
                break;
            }
        }
    }
    captured
}

fn echo_stdout(line: &str) {
    println!("{}", line);
}

fn echo_stderr(line: &str) {
    eprintln!("{}", line);
}

/// 渲染命令行用于日志和错误信息，敏感的 `KEY=VALUE` 参数值会被屏蔽
pub fn display_command(program: &str, args: &[&str]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string());
    parts.extend(args.iter().map(|arg| redact_arg(arg)));
    parts.join(" ")
}

fn redact_arg(arg: &str) -> String {
    let body = arg.strip_prefix("-e=").unwrap_or(arg);
    match body.split_once('=') {
        Some((key, _)) if !key.starts_with('-') && is_sensitive_key(key) => {
            format!("{}=******", &arg[..arg.len() - body.len() + key.len()])
        }
        _ => arg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = TokioProcessRunner::new("/tmp");
        let output = runner
            .run("echo", &["hello"], OutputMode::Capture)
            .await
            .unwrap();

        assert!(output.is_success());
        assert_eq!(output.stdout, "hello\n");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_run_captures_both_streams() {
        let runner = TokioProcessRunner::new("/tmp");
        let output = runner
            .run("sh", &["-c", "echo out; echo err 1>&2; exit 3"], OutputMode::Capture)
            .await
            .unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_large_output_does_not_deadlock() {
        let runner = TokioProcessRunner::new("/tmp");
        let output = runner
            .run(
                "sh",
                &["-c", "i=0; while [ $i -lt 20000 ]; do echo line-$i; echo err-$i 1>&2; i=$((i+1)); done"],
                OutputMode::Capture,
            )
            .await
            .unwrap();

        assert!(output.is_success());
        assert_eq!(output.stdout.lines().count(), 20000);
        assert_eq!(output.stderr.lines().count(), 20000);
    }

    #[tokio::test]
    async fn test_invalid_utf8_output_is_fully_drained() {
        let runner = TokioProcessRunner::new("/tmp");
        let output = runner
            .run(
                "sh",
                &["-c", "printf 'ok\\n\\377bad\\n'; i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done; exit 0"],
                OutputMode::Capture,
            )
            .await
            .unwrap();

        assert!(output.is_success());
        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines.len(), 20002);
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[1], "\u{FFFD}bad");
        assert_eq!(lines[20001], "line-19999");
    }

    #[tokio::test]
    async fn test_run_not_found() {
        let runner = TokioProcessRunner::new("/tmp");
        let result = runner
            .run("nonexistent_command_12345", &[], OutputMode::Capture)
            .await;

        assert!(matches!(result, Err(CommandError::SpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_run_or_fail_reports_exit_code() {
        let runner = TokioProcessRunner::new("/tmp");
        let err = runner
            .run_or_fail("sh", &["-c", "exit 7"], OutputMode::Capture)
            .await
            .unwrap_err();

        match err {
            DeployError::ExternalCommand {
                command, exit_code, ..
            } => {
                assert_eq!(exit_code, 7);
                assert_eq!(command, "sh -c exit 7");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_command_redacts_secrets() {
        let line = display_command(
            "docker",
            &["run", "-e=PGPASSWORD=s3cret", "--network=net", "-e", "PGPASSWORD=s3cret"],
        );
        assert_eq!(
            line,
            "docker run -e=PGPASSWORD=****** --network=net -e PGPASSWORD=******"
        );
        assert!(!line.contains("s3cret"));
    }
}
