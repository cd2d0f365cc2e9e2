//! External process execution.
//!
//! Commands are spawned directly (no shell interpretation; arguments are
//! passed literally) with stdout and stderr captured incrementally while being
//! mirrored to the parent's own stdio for live observability. No timeout is
//! enforced at this layer; callers that need bounded duration must impose it
//! externally.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use padmin_core::{PadminError, Result};

/// Captured output of a finished command.
///
/// Created when the spawned process terminates; consumed once by the caller.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (always 0 here; nonzero exits become errors).
    pub code: i32,
    /// Captured standard output, chunks concatenated in arrival order.
    pub stdout: String,
    /// Captured standard error, chunks concatenated in arrival order.
    pub stderr: String,
}

/// Run an external command and capture its output.
///
/// # Errors
///
/// - [`PadminError::Spawn`] when the executable cannot be started.
/// - [`PadminError::CommandFailed`] on a nonzero exit, carrying the command,
///   its arguments, the exit code, and the captured stderr.
pub async fn run_command(
    command: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<CommandOutput> {
    debug!(command, ?args, ?cwd, "spawning command");

    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| PadminError::Spawn {
        command: command.to_string(),
        source: e,
    })?;

    // The pipes exist because stdout/stderr were set above.
    let child_stdout = child.stdout.take().ok_or_else(|| {
        PadminError::internal(format!("missing stdout pipe for {command}"))
    })?;
    let child_stderr = child.stderr.take().ok_or_else(|| {
        PadminError::internal(format!("missing stderr pipe for {command}"))
    })?;

    let (stdout_bytes, stderr_bytes, status) = tokio::join!(
        tee(child_stdout, tokio::io::stdout()),
        tee(child_stderr, tokio::io::stderr()),
        child.wait(),
    );

    let status = status.map_err(|e| PadminError::Spawn {
        command: command.to_string(),
        source: e,
    })?;

    let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
    // Killed-by-signal has no exit code; report it as -1.
    let code = status.code().unwrap_or(-1);

    if code == 0 {
        Ok(CommandOutput {
            code,
            stdout,
            stderr,
        })
    } else {
        Err(PadminError::CommandFailed {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            code,
            stderr,
        })
    }
}

/// Drain a child stream, accumulating the bytes while mirroring them to the
/// given writer. Mirror failures are ignored; capture continues.
async fn tee(
    mut reader: impl AsyncRead + Unpin,
    mut mirror: impl AsyncWrite + Unpin,
) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                captured.extend_from_slice(&buf[..n]);
                if mirror.write_all(&buf[..n]).await.is_ok() {
                    let _ = mirror.flush().await;
                }
            }
        }
    }
    captured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_exit_captures_stdout() {
        let output = run_command("echo", &["hello", "world"], None).await.unwrap();
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout.trim(), "hello world");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_with_code() {
        let err = run_command("sh", &["-c", "exit 3"], None).await.unwrap_err();
        match err {
            PadminError::CommandFailed {
                command,
                args,
                code,
                ..
            } => {
                assert_eq!(command, "sh");
                assert_eq!(args, vec!["-c".to_string(), "exit 3".to_string()]);
                assert_eq!(code, 3);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stderr_captured_on_failure() {
        let err = run_command("sh", &["-c", "echo bad >&2; exit 2"], None)
            .await
            .unwrap_err();
        match err {
            PadminError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, 2);
                assert_eq!(stderr.trim(), "bad");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let err = run_command("padmin-no-such-binary", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, PadminError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_working_directory_respected() {
        let tmp = tempfile::tempdir().unwrap();
        let canonical = tmp.path().canonicalize().unwrap();
        let output = run_command("pwd", &[], Some(tmp.path())).await.unwrap();
        assert_eq!(output.stdout.trim(), canonical.to_string_lossy());
    }

    #[tokio::test]
    async fn test_streamed_chunks_concatenated_in_order() {
        let output = run_command("sh", &["-c", "printf one; printf two; printf three"], None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "onetwothree");
    }
}
