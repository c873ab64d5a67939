use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubfuseError};

/// External extractor invocation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stderr: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Run the command, handing every stdout line to `on_line` as it arrives
    pub async fn execute_streaming<F>(&self, mut on_line: F) -> Result<CommandOutput>
    where
        F: FnMut(&str) + Send,
    {
        debug!("Executing: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SubfuseError::Acquisition(format!("Failed to start {}: {}", self.binary_path, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SubfuseError::Acquisition("Child stdout unavailable".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SubfuseError::Acquisition("Child stderr unavailable".to_string()))?;

        let read_stdout = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
            }
            Ok::<_, std::io::Error>(())
        };
        let read_stderr = async {
            let mut buf = String::new();
            stderr.read_to_string(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        };

        let (stdout_result, stderr_result) = tokio::join!(read_stdout, read_stderr);
        stdout_result?;
        let stderr = stderr_result?;
        let status = child.wait().await?;

        Ok(CommandOutput {
            success: status.success(),
            stderr,
        })
    }

    /// Check that the binary runs at all
    pub async fn check_binary(binary_path: &str) -> Result<String> {
        let output = Command::new(binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| SubfuseError::Acquisition(format!("{} not found: {}", binary_path, e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(SubfuseError::Acquisition(format!(
                "{} --version failed: {}",
                binary_path,
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args() {
        let cmd = MediaCommand::new("yt-dlp", "download")
            .arg("-x")
            .args(["--audio-format", "mp3"]);
        assert_eq!(cmd.args, vec!["-x", "--audio-format", "mp3"]);
        assert_eq!(cmd.binary_path, "yt-dlp");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streaming_lines_and_stderr() {
        let cmd = MediaCommand::new("sh", "echo test")
            .arg("-c")
            .arg("echo one; echo two; echo oops >&2; exit 3");

        let mut lines = Vec::new();
        let output = cmd.execute_streaming(|line| lines.push(line.to_string())).await.unwrap();
        assert_eq!(lines, vec!["one", "two"]);
        assert!(!output.success);
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_missing_binary_is_acquisition_error() {
        let cmd = MediaCommand::new("/nonexistent/subfuse-extractor", "missing");
        let err = cmd.execute_streaming(|_| {}).await.unwrap_err();
        assert!(matches!(err, SubfuseError::Acquisition(_)));
    }

    #[tokio::test]
    async fn test_check_binary_missing() {
        let err = MediaCommand::check_binary("/nonexistent/subfuse-extractor").await.unwrap_err();
        assert!(matches!(err, SubfuseError::Acquisition(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_binary_reports_version() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-extractor");
        std::fs::write(&script, "#!/bin/sh\necho \"2024.08.06\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let version = MediaCommand::check_binary(script.to_str().unwrap()).await.unwrap();
        assert_eq!(version, "2024.08.06");
    }
}
