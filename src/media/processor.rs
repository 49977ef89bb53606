use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, info};

use super::{CommandExecutor, MediaCommand, OutputChannels};
use crate::error::{MuxkitError, Result};
use crate::progress::Reporter;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Exit status and captured text of one finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// stdout, or both channels interleaved when merged.
    pub stdout: String,
    /// Empty when merged.
    pub stderr: String,
    pub channels: OutputChannels,
}

impl ExecutionResult {
    /// Text handed to the caller as the operation payload.
    pub fn primary(&self) -> &str {
        &self.stdout
    }

    /// Text inspected for warnings and quoted in failure messages.
    pub fn diagnostics(&self) -> &str {
        match self.channels {
            OutputChannels::Merged => &self.stdout,
            OutputChannels::Separate => &self.stderr,
        }
    }
}

/// Launches external tools and drains their output concurrently.
///
/// Admission is bounded by a semaphore sized to the worker count. Every
/// invocation holds one permit from launch until its result is built; its
/// drain tasks run on the tokio runtime.
pub struct ProcessRunner {
    permits: Arc<Semaphore>,
    workers: u32,
    closed: AtomicBool,
}

impl ProcessRunner {
    /// `workers == 0` sizes the pool to the number of CPU cores.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        let workers = u32::try_from(workers.max(1)).unwrap_or(u32::MAX);
        debug!("Process runner sized to {} workers", workers);

        Self {
            permits: Arc::new(Semaphore::new(workers as usize)),
            workers,
            closed: AtomicBool::new(false),
        }
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    /// Stop accepting invocations and wait for in-flight ones to finish.
    ///
    /// Only the first call does anything; it returns `true`.
    pub async fn shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        info!("Shutting down process runner");
        // Holding every permit means no invocation is still running.
        if let Ok(all) = self.permits.acquire_many(self.workers).await {
            all.forget();
        }
        self.permits.close();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandExecutor for ProcessRunner {
    async fn execute(&self, command: &MediaCommand, reporter: &Reporter) -> Result<ExecutionResult> {
        if self.is_closed() {
            return Err(MuxkitError::RunnerClosed);
        }
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| MuxkitError::RunnerClosed)?;

        let command_line = command.command_line();
        debug!("Executing {}: {}", command.description, command_line);
        reporter.progress(&format!("Executing command: {}", command_line));
        reporter.progress("");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MuxkitError::Launch {
                tool: command.tool.to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MuxkitError::Stream("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MuxkitError::Stream("stderr was not captured".to_string()))?;

        let stdout_buffer = Arc::new(Mutex::new(String::new()));
        let stderr_buffer = match command.channels {
            OutputChannels::Merged => Arc::clone(&stdout_buffer),
            OutputChannels::Separate => Arc::new(Mutex::new(String::new())),
        };

        let stdout_task = tokio::spawn(drain(stdout, Arc::clone(&stdout_buffer), reporter.clone()));
        let stderr_task = tokio::spawn(drain(stderr, Arc::clone(&stderr_buffer), reporter.clone()));

        // The exit status alone is not enough: output may still be buffered
        // in the pipes after the process is gone.
        let (status, stdout_drained, stderr_drained) = tokio::join!(child.wait(), stdout_task, stderr_task);

        check_drained(stdout_drained)?;
        check_drained(stderr_drained)?;
        let status = status.map_err(|e| MuxkitError::Stream(format!("waiting for {} failed: {}", command.tool, e)))?;

        let result = ExecutionResult {
            exit_code: status.code(),
            stdout: take_buffer(&stdout_buffer),
            stderr: match command.channels {
                OutputChannels::Merged => String::new(),
                OutputChannels::Separate => take_buffer(&stderr_buffer),
            },
            channels: command.channels,
        };

        debug!("{} exited with {:?}", command.tool, result.exit_code);
        Ok(result)
    }
}

fn check_drained(drained: std::result::Result<std::io::Result<()>, JoinError>) -> Result<()> {
    match drained {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(MuxkitError::Stream(e.to_string())),
        Err(e) => Err(MuxkitError::Stream(format!("output reader task failed: {}", e))),
    }
}

fn take_buffer(buffer: &Mutex<String>) -> String {
    std::mem::take(&mut *buffer.lock().unwrap_or_else(|e| e.into_inner()))
}

/// Read `reader` to EOF, appending each line (plus `\n`) to `sink` and
/// forwarding it to the reporter.
pub(crate) async fn drain<R>(mut reader: R, sink: Arc<Mutex<String>>, reporter: Reporter) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut splitter = LineSplitter::default();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    let emit = |line: String| {
        {
            let mut sink = sink.lock().unwrap_or_else(|e| e.into_inner());
            sink.push_str(&line);
            sink.push('\n');
        }
        reporter.progress(&line);
    };

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        for line in splitter.push(&chunk[..read]) {
            emit(line);
        }
    }
    if let Some(line) = splitter.finish() {
        emit(line);
    }
    Ok(())
}

/// Incremental line framing over raw bytes.
///
/// Lines end at `\n`, `\r` or `\r\n`; ffmpeg redraws its status line with
/// bare carriage returns. Bytes are decoded lossily.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            match byte {
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' => lines.push(self.take_line()),
                b'\r' => {
                    lines.push(self.take_line());
                    self.after_cr = true;
                }
                _ => {
                    self.after_cr = false;
                    self.pending.push(byte);
                }
            }
        }
        lines
    }

    /// Flush an unterminated final line.
    pub(crate) fn finish(mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}
