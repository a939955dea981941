//! Shell 任务监管：独立进程执行命令，捕获输出，支持前台等待、协作取消与后台放弃
//!
//! 每个任务拥有独立的捕获文件（uuid 命名，不使用进程级全局路径）。执行单元是一个 tokio 任务，
//! 等待子进程退出后通过 Handoff 交付结果；调用方若已放弃，执行单元自行删除捕获文件。
//! 取消只会向进程组发送中断信号，随后继续等待退出，从不强制 kill。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::Instant;

use crate::core::handoff::Handoff;
use crate::core::poll::PollHook;

/// 单个工具返回内容的最大字节数
pub const MAX_TOOL_OUTPUT: usize = 16 * 1024;

/// 监管器参数（来自配置 [tools] 段）
#[derive(Debug, Clone)]
pub struct ShellSettings {
    /// 后台模式等待快速失败的宽限期
    pub background_grace: Duration,
    /// 等待期间调用轮询钩子的间隔
    pub poll_interval: Duration,
    /// 捕获文件所在目录
    pub capture_dir: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub max_output: usize,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            background_grace: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            capture_dir: std::env::temp_dir(),
            working_dir: None,
            max_output: MAX_TOOL_OUTPUT,
        }
    }
}

/// 捕获文件：Drop 时删除
#[derive(Debug)]
struct Capture {
    path: PathBuf,
}

impl Capture {
    fn create(dir: &Path) -> std::io::Result<(Self, std::fs::File)> {
        let path = dir.join(format!("comrade-shell-{}.out", uuid::Uuid::new_v4()));
        let file = std::fs::File::create(&path)?;
        Ok((Self { path }, file))
    }

    async fn read_truncated(&self, limit: usize) -> std::io::Result<Vec<u8>> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut buf = Vec::new();
        file.take(limit as u64).read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %self.path.display(), error = %e, "capture cleanup failed");
            }
        }
    }
}

/// 执行单元交付给调用方的结果
struct Completion {
    code: i32,
    capture: Capture,
}

/// 运行中的任务（调用方视角）
struct ShellTask {
    pid: Option<u32>,
    handoff: Arc<Handoff<Completion>>,
}

/// Shell 任务监管器
#[derive(Debug, Clone, Default)]
pub struct ShellSupervisor {
    settings: ShellSettings,
}

impl ShellSupervisor {
    pub fn new(settings: ShellSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// 前台执行：等待完成，期间按间隔轮询钩子；请求中止时中断进程并继续等待其退出
    pub async fn run_foreground(
        &self,
        command: &str,
        poll: &dyn PollHook,
    ) -> Result<String, String> {
        tracing::info!(command = %command, "shell: foreground");
        let task = self.launch(command)?;

        let mut interrupted = false;
        let done = loop {
            if let Some(done) = task.handoff.try_take() {
                break done;
            }
            tokio::select! {
                _ = task.handoff.ready() => {}
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
            if !interrupted && poll.abort_requested() {
                tracing::info!(command = %command, pid = ?task.pid, "shell: stop requested, interrupting");
                interrupt(task.pid).await;
                interrupted = true;
            }
        };

        report(done, self.settings.max_output).await
    }

    /// 后台执行：只等待短暂宽限期；仍在运行则放弃，所有权交给执行单元
    pub async fn run_background(
        &self,
        command: &str,
        poll: &dyn PollHook,
    ) -> Result<String, String> {
        tracing::info!(command = %command, "shell: background");
        let task = self.launch(command)?;

        let deadline = Instant::now() + self.settings.background_grace;
        loop {
            if let Some(done) = task.handoff.try_take() {
                return report(done, self.settings.max_output).await;
            }
            let now = Instant::now();
            if now >= deadline || poll.abort_requested() {
                break;
            }
            let step = (deadline - now).min(self.settings.poll_interval);
            tokio::select! {
                _ = task.handoff.ready() => {}
                _ = tokio::time::sleep(step) => {}
            }
        }

        match task.handoff.abandon() {
            // 恰好在放弃前完成，照常报告
            Some(done) => report(done, self.settings.max_output).await,
            None => {
                tracing::info!(command = %command, pid = ?task.pid, "shell: left running in background");
                Ok("Program launched in background".to_string())
            }
        }
    }

    fn launch(&self, command: &str) -> Result<ShellTask, String> {
        let (capture, stdout) = Capture::create(&self.settings.capture_dir)
            .map_err(|e| format!("Cannot create output capture: {}", e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| format!("Cannot create output capture: {}", e))?;

        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        if let Some(dir) = &self.settings.working_dir {
            cmd.current_dir(dir);
        }

        // 失败时 capture 在此处被 drop，捕获文件随之删除
        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Cannot start command: {}", e))?;
        let pid = child.id();

        let handoff = Arc::new(Handoff::new());
        let unit = Arc::clone(&handoff);
        let command = command.to_string();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    tracing::warn!(command = %command, error = %e, "shell: wait failed");
                    -1
                }
            };
            if let Some(orphan) = unit.finish(Completion { code, capture }) {
                tracing::info!(command = %command, code, "shell: background command finished");
                drop(orphan);
            }
        });

        Ok(ShellTask { pid, handoff })
    }
}

fn shell_command(command: &str) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };
    // 独立进程组：中断可送达整棵进程树，终端 Ctrl+C 也不会直接波及子进程
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// 向任务的进程组发送中断信号（SIGINT）
async fn interrupt(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };

    #[cfg(unix)]
    {
        let group = format!("-{}", pid);
        let delivered = Command::new("kill")
            .args(["-INT", "--", &group])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        if !delivered {
            let _ = Command::new("kill")
                .args(["-INT", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
        }
    }

    #[cfg(not(unix))]
    tracing::warn!(pid, "shell: interrupt not supported on this platform, waiting for exit");
}

/// 读取捕获输出并按退出码生成结果；非 0 退出码映射为 Err
async fn report(done: Completion, max_output: usize) -> Result<String, String> {
    let Completion { code, capture } = done;
    let bytes = match capture.read_truncated(max_output.saturating_sub(1)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "shell: capture unreadable");
            let msg = format!("Command exited with code {} (no output)", code);
            return if code != 0 { Err(msg) } else { Ok(msg) };
        }
    };
    drop(capture);

    if bytes.is_empty() {
        return if code != 0 {
            Err(format!("Command failed with code {}", code))
        } else {
            Ok("(no output)".to_string())
        };
    }

    let text = String::from_utf8_lossy(&bytes).into_owned();
    if code != 0 {
        Err(text)
    } else {
        Ok(text)
    }
}
