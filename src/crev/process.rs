use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{CrevError, ExitStatusText, Result};

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// One external command line: program, arguments and environment overrides
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl Invocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// The command line as shown in logs and errors
    pub fn describe(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    // No kill_on_drop: dropping the future leaves the child running.
    fn command(&self, stdin: Stdio) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> CrevError {
        CrevError::Spawn {
            command: self.describe(),
            source,
        }
    }

    fn output_error(&self, source: std::io::Error) -> CrevError {
        CrevError::Output {
            command: self.describe(),
            source,
        }
    }

    /// Run to completion; any non-zero exit is an error carrying both streams
    pub async fn output(&self) -> Result<ToolOutput> {
        self.run()
            .await
            .inspect_err(|e| warn!(error = %e, "Command failed"))
    }

    async fn run(&self) -> Result<ToolOutput> {
        debug!(command = %self.describe(), "Running");

        let output = self
            .command(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        self.check(output.status, &output.stdout, &output.stderr)
    }

    /// Run, feeding `input` on stdin and then closing it
    pub async fn output_with_input(&self, input: &[u8]) -> Result<ToolOutput> {
        debug!(command = %self.describe(), "Running with input");

        let mut child = self
            .command(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit without reading; its exit status decides.
            if let Err(e) = stdin.write_all(input).await {
                debug!(error = %e, "Child closed stdin early");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.output_error(e))?;

        self.check(output.status, &output.stdout, &output.stderr)
            .inspect_err(|e| warn!(error = %e, "Command failed"))
    }

    /// Run, handing every stderr line to `on_line` as it arrives.
    ///
    /// Lines are split on raw bytes, so output that is not valid UTF-8 is
    /// forwarded lossily instead of ending the stream.
    pub async fn output_streaming<F>(&self, mut on_line: F) -> Result<ToolOutput>
    where
        F: FnMut(&str),
    {
        debug!(command = %self.describe(), "Running with progress");

        let mut child = self
            .command(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr) = tokio::join!(
            async {
                let mut buf = Vec::new();
                if let Some(mut stdout) = stdout {
                    stdout.read_to_end(&mut buf).await?;
                }
                Ok::<_, std::io::Error>(buf)
            },
            async {
                let mut buf = Vec::new();
                if let Some(stderr) = stderr {
                    let mut reader = BufReader::new(stderr);
                    let mut line = Vec::new();
                    loop {
                        line.clear();
                        if reader.read_until(b'\n', &mut line).await? == 0 {
                            break;
                        }
                        let text = String::from_utf8_lossy(&line);
                        on_line(text.trim_end_matches(['\n', '\r']));
                        buf.extend_from_slice(&line);
                    }
                }
                Ok::<_, std::io::Error>(buf)
            }
        );

        let status = child.wait().await.map_err(|e| self.output_error(e))?;
        let stdout = stdout.map_err(|e| self.output_error(e))?;
        let stderr = stderr.map_err(|e| self.output_error(e))?;

        self.check(status, &stdout, &stderr)
            .inspect_err(|e| warn!(error = %e, "Command failed"))
    }

    /// Run as a probe: `None` when the command cannot start or exits non-zero
    pub async fn probe(&self) -> Option<ToolOutput> {
        match self.run().await {
            Ok(output) => Some(output),
            Err(e) => {
                debug!(error = %e, "Probe failed");
                None
            }
        }
    }

    fn check(&self, status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Result<ToolOutput> {
        let stdout = String::from_utf8_lossy(stdout).into_owned();
        let stderr = String::from_utf8_lossy(stderr).into_owned();

        if status.success() {
            return Ok(ToolOutput { stdout, stderr });
        }

        let status = match status.code() {
            Some(code) => ExitStatusText::Code(code),
            None => ExitStatusText::Signal,
        };

        Err(CrevError::ToolFailed {
            command: self.describe(),
            status,
            stdout,
            stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::crev::tests::fake_tool;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_success_captures_both_streams() {
        let dir = tempdir().unwrap();
        let tool = fake_tool(dir.path(), "echo hello\necho warning >&2\n");

        let output = Invocation::new(&tool).output().await.unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "warning\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_code_and_streams() {
        let dir = tempdir().unwrap();
        let tool = fake_tool(dir.path(), "echo some-out\necho some-err >&2\nexit 3\n");

        let err = Invocation::new(&tool)
            .args(["crev", "repo", "publish"])
            .output()
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(3));
        let message = err.to_string();
        assert!(message.contains("code 3"));
        assert!(message.contains("crev repo publish"));
        assert!(message.contains("some-out"));
        assert!(message.contains("some-err"));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let dir = tempdir().unwrap();
        let err = Invocation::new(dir.path().join("no-such-cargo"))
            .output()
            .await
            .unwrap_err();
        assert!(matches!(err, CrevError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_failure_collapses_to_none() {
        let dir = tempdir().unwrap();
        let failing = fake_tool(dir.path(), "exit 1\n");
        assert!(Invocation::new(&failing).probe().await.is_none());
        assert!(Invocation::new(dir.path().join("missing")).probe().await.is_none());
    }

    #[tokio::test]
    async fn test_input_is_fed_on_stdin() {
        let dir = tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            "read first\nread second\necho \"got [$first] [$second]\"\n",
        );

        let output = Invocation::new(&tool)
            .output_with_input(b"\n\n")
            .await
            .unwrap();
        assert_eq!(output.stdout, "got [] []\n");
    }

    #[tokio::test]
    async fn test_streaming_forwards_stderr_lines() {
        let dir = tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            "echo '  Compiling a' >&2\necho '  Compiling b' >&2\necho done\n",
        );

        let mut seen = Vec::new();
        let output = Invocation::new(&tool)
            .output_streaming(|line| seen.push(line.trim().to_string()))
            .await
            .unwrap();

        assert_eq!(seen, vec!["Compiling a", "Compiling b"]);
        assert_eq!(output.stdout, "done\n");
    }

    #[tokio::test]
    async fn test_streaming_survives_invalid_utf8_on_stderr() {
        let dir = tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            "printf 'bad \\377\\n' >&2\necho 'error: real cause' >&2\nexit 101\n",
        );

        let mut seen = Vec::new();
        let err = Invocation::new(&tool)
            .output_streaming(|line| seen.push(line.to_string()))
            .await
            .unwrap_err();

        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("bad "));
        assert_eq!(seen[1], "error: real cause");
        assert_eq!(err.exit_code(), Some(101));
        assert!(err.to_string().contains("real cause"));
    }

    #[test]
    fn test_describe() {
        let invocation = Invocation::new("cargo")
            .args(["crev", "id", "current"])
            .env("EDITOR", "/tmp/shim.sh");
        assert_eq!(invocation.describe(), "cargo crev id current");
    }
}
