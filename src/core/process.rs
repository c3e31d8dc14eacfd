//! Process execution utilities with timeout support
//!
//! Provides helpers for running external processes (ffmpeg, yt-dlp)
//! with configurable timeouts so a hung tool cannot stall a request forever.

use std::io::Read;
use std::process::{Child, Output};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::download::error::DownloadError;

/// Run an async Command with a timeout.
///
/// The child is killed when the future is dropped on timeout (`kill_on_drop`).
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, DownloadError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(DownloadError::Process(format!("Failed to spawn process: {}", e))),
        Err(_) => Err(DownloadError::Timeout(format!(
            "Process timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Wait for a blocking child process with a timeout. Kills the child on timeout.
///
/// stdout and stderr are drained on reader threads while waiting, so a child
/// that fills a pipe buffer keeps running instead of blocking on write.
/// Meant to be called from `spawn_blocking`.
pub fn wait_with_output_timeout(mut child: Child, timeout: Duration) -> Result<Output, DownloadError> {
    let deadline = Instant::now() + timeout;
    let stdout = child.stdout.take().map(drain_pipe);
    let stderr = child.stderr.take().map(drain_pipe);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(Output {
                    status,
                    stdout: join_pipe(stdout),
                    stderr: join_pipe(stderr),
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    log::error!("Process timed out after {}s, killing", timeout.as_secs());
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    // Readers are left detached: a grandchild may still hold the pipes
                    return Err(DownloadError::Timeout(format!(
                        "Process timed out after {}s",
                        timeout.as_secs()
                    )));
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DownloadError::Process(format!("Failed to poll process: {}", e)));
            }
        }
    }
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            log::warn!("⚠️ Failed to read process output: {}", e);
        }
        buf
    })
}

fn join_pipe(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader.and_then(|r| r.join().ok()).unwrap_or_default()
}

/// First line of `<bin> --version` (or `-version` for ffmpeg), if the binary runs.
pub async fn probe_version(bin: &str, flag: &str, timeout: Duration) -> Option<String> {
    let output = run_with_timeout(Command::new(bin).arg(flag), timeout).await.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}
