//! Subprocess plumbing: one-shot tool invocation with captured output, and
//! bounded capture of a long-lived server's stdout/stderr.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::{raise, InteropError, Result};

/// Wrapper struct rendering an [`Output`] for diagnostics
pub struct OutputWrapper<'a>(&'a Output);

impl fmt::Display for OutputWrapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stdout = String::from_utf8_lossy(&self.0.stdout);
        let stderr = String::from_utf8_lossy(&self.0.stderr);
        write!(
            f,
            "Status: {}\nStdout: {}\nStderr: {}",
            self.0.status, stdout, stderr
        )
    }
}

pub fn format_output(output: &Output) -> OutputWrapper<'_> {
    OutputWrapper(output)
}

/// Run a command to completion with captured stdout/stderr, optionally
/// feeding it stdin. Only failures to launch or wait are errors here; the
/// exit status is the caller's to judge.
pub(crate) fn run_captured(cmd: &mut Command, input: Option<&[u8]>) -> Result<Output> {
    tracing::debug!("running {cmd:?}");
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn()?;
    if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
        // The tool may exit without ever reading stdin; a broken pipe
        // here is not an error.
        let _ = stdin.write_all(bytes);
    }
    Ok(child.wait_with_output()?)
}

/// Run an external tool to completion, optionally feeding it stdin.
///
/// A non-zero exit status is fatal: credential generation failures are assumed
/// deterministic (bad config, bad binary), so there is no retry here. The
/// captured output travels with the error for diagnosis. On success the
/// captured stdout is returned.
pub fn run_tool(mut cmd: Command, input: Option<&[u8]>) -> Result<String> {
    let output = run_captured(&mut cmd, input)?;
    if !output.status.success() {
        return raise(InteropError::CommandFailed {
            command: format!("{cmd:?}"),
            status: output.status,
            output: format_output(&output).to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

const MAX_CAPTURED_LINES: usize = 256;

/// Bounded capture of a spawned server's output streams.
///
/// The server's stdout/stderr are drained on background threads into a ring of
/// the most recent lines, so the child can never block on a full pipe and the
/// tail of its output is still available when startup goes wrong. Every line
/// is also mirrored to the debug log as it arrives.
#[derive(Clone, Debug, Default)]
pub struct CapturedOutput {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl CapturedOutput {
    /// Spawn a thread draining `stream` until EOF.
    pub fn drain<R>(&self, label: &'static str, stream: R) -> JoinHandle<()>
    where
        R: Read + Send + 'static,
    {
        let lines = Arc::clone(&self.lines);
        std::thread::spawn(move || {
            for line in BufReader::new(stream).lines() {
                let line = match line {
                    Ok(line) => line,
                    // The pipe went away; the child is gone or being killed.
                    Err(_) => break,
                };
                tracing::debug!("[server {label}] {line}");
                let mut lines = lines.lock().unwrap();
                if lines.len() == MAX_CAPTURED_LINES {
                    lines.pop_front();
                }
                lines.push_back(line);
            }
        })
    }

    /// The retained tail of the server's output, oldest line first.
    pub fn snapshot(&self) -> String {
        let lines = self.lines.lock().unwrap();
        lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}
