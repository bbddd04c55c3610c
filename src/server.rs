//! Server bring-up: launch a TLS server subprocess, discover its dynamically
//! bound port through the process's socket table, and confirm liveness with
//! repeated client handshake attempts.
//!
//! The two implementations under test report their bound port differently
//! (one via banner text, one not at all reliably), so the common denominator
//! is used uniformly: reading the OS-level socket table of the spawned
//! process, at the cost of polling latency.

use std::collections::HashSet;
use std::io;
use std::process::{Child, Stdio};
use std::thread::{self, JoinHandle};

use procfs::net::TcpState;
use procfs::process::{FDTarget, Process};

use crate::conf::{InteropConf, RetryConf};
use crate::credentials::{generate_credentials, CredentialFiles};
use crate::error::{raise, InteropError, Result};
use crate::process::{format_output, run_captured, CapturedOutput};
use crate::tool::TlsTool;

/// Input written to each probe client; makes `s_client` terminate right
/// after the handshake completes.
const CLIENT_QUIT_INPUT: &[u8] = b"Q";

/// A confirmed-live server subprocess and its discovered port.
///
/// Owned by the caller after return, who is responsible for termination.
/// Dropping the handle does NOT kill the process.
#[derive(Debug)]
pub struct ServerHandle {
    pub child: Child,
    pub port: u16,
    output: CapturedOutput,
    drains: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Terminate the server and wait for its output drains to finish.
    pub fn kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        self.child.wait()?;
        for drain in self.drains.drain(..) {
            let _ = drain.join();
        }
        Ok(())
    }

    /// The retained tail of the server's merged stdout/stderr.
    pub fn recent_output(&self) -> String {
        self.output.snapshot()
    }
}

/// Provision credentials for `sig_alg`, then bring up `server_tool` and
/// probe it with `client_tool`.
///
/// This is the whole sequential flow: credential generation first (blocking),
/// then launch, port discovery and liveness probing. On success the caller
/// drives actual protocol exchanges against the returned handle and owns
/// teardown. On a fatal path no handle is returned and the server process, if
/// it was spawned, is left to the surrounding test runner's process-group
/// teardown.
pub fn start_server(
    server_tool: &dyn TlsTool,
    client_tool: &dyn TlsTool,
    conf: &InteropConf,
    sig_alg: &str,
    worker_id: &str,
) -> Result<ServerHandle> {
    let creds = generate_credentials(conf, sig_alg, &conf.artifacts_dir, worker_id)?;
    bring_up(server_tool, client_tool, &conf.retry, &creds)
}

/// Launch the server with existing credentials and confirm it accepts
/// connections.
pub fn bring_up(
    server_tool: &dyn TlsTool,
    client_tool: &dyn TlsTool,
    retry: &RetryConf,
    creds: &CredentialFiles,
) -> Result<ServerHandle> {
    let mut cmd = server_tool.server_command(creds);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    tracing::debug!("spawning {} server: {cmd:?}", server_tool.name());
    let mut child = cmd.spawn()?;

    // Drain both pipes in the background so the server can never block on a
    // full pipe buffer, keeping only the tail for error reports.
    let output = CapturedOutput::default();
    let mut drains = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        drains.push(output.drain("stdout", stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        drains.push(output.drain("stderr", stderr));
    }

    let port = match discover_port(&mut child, retry) {
        Ok(port) => port,
        Err(InteropError::ServerExited { pid, status, .. }) => {
            // The pipes are at EOF now; wait for the drains so the whole
            // tail of the output makes it into the error.
            for drain in drains {
                let _ = drain.join();
            }
            return raise(InteropError::ServerExited {
                pid,
                status,
                output: output.snapshot(),
            });
        }
        Err(err) => return Err(err),
    };
    tracing::info!(
        "{} server pid {} is listening on port {port}",
        server_tool.name(),
        child.id()
    );

    probe_liveness(client_tool, port, retry)?;
    Ok(ServerHandle {
        child,
        port,
        output,
        drains,
    })
}

/// Poll the socket table until the child exposes a listening socket.
///
/// A child that exits during the wait is reported as such instead of being
/// conflated with a slow startup; the caller attaches the captured output
/// once the drains have settled.
fn discover_port(child: &mut Child, retry: &RetryConf) -> Result<u16> {
    let pid = child.id();
    for attempt in 1..=retry.attempts {
        if let Some(status) = child.try_wait()? {
            return Err(InteropError::ServerExited {
                pid,
                status,
                output: String::new(),
            });
        }
        if let Some(port) = listening_port(pid)? {
            return Ok(port);
        }
        tracing::debug!(
            "server pid {pid} has no listening socket yet (attempt {attempt}/{})",
            retry.attempts
        );
        thread::sleep(retry.sleep());
    }
    raise(InteropError::PortDiscoveryTimeout {
        pid,
        attempts: retry.attempts,
    })
}

/// Look up the first TCP port `pid` is listening on, via `/proc`: the
/// process's socket fd inodes matched against the net tcp/tcp6 tables.
fn listening_port(pid: u32) -> Result<Option<u16>> {
    // A process that is mid-exit loses its /proc entries; report that as
    // "no socket yet" and let the caller's next iteration observe the exit.
    let process = match Process::new(pid as i32) {
        Ok(process) => process,
        Err(err) => {
            tracing::debug!("cannot inspect pid {pid}: {err}");
            return Ok(None);
        }
    };
    let socket_inodes: HashSet<u64> = match process.fd() {
        Ok(fds) => fds
            .filter_map(|fd| fd.ok())
            .filter_map(|fd| match fd.target {
                FDTarget::Socket(inode) => Some(inode),
                _ => None,
            })
            .collect(),
        Err(err) => {
            tracing::debug!("cannot inspect fds of pid {pid}: {err}");
            return Ok(None);
        }
    };
    if socket_inodes.is_empty() {
        return Ok(None);
    }

    let mut entries = procfs::net::tcp()?;
    entries.extend(procfs::net::tcp6()?);
    Ok(entries
        .into_iter()
        .find(|entry| entry.state == TcpState::Listen && socket_inodes.contains(&entry.inode))
        .map(|entry| entry.local_address.port()))
}

/// Repeatedly run the client tool against `port` until one invocation exits
/// zero, proving the server completes handshakes. Failed attempts are
/// expected while the server warms up, so they only log at debug level.
fn probe_liveness(client_tool: &dyn TlsTool, port: u16, retry: &RetryConf) -> Result<()> {
    for attempt in 1..=retry.attempts {
        let mut cmd = client_tool.client_command(port);
        let output = run_captured(&mut cmd, Some(CLIENT_QUIT_INPUT))?;
        if output.status.success() {
            tracing::info!(
                "{} client confirmed server liveness on port {port}",
                client_tool.name()
            );
            return Ok(());
        }
        tracing::debug!(
            "liveness probe {attempt}/{} against port {port} failed: {}",
            retry.attempts,
            format_output(&output)
        );
        thread::sleep(retry.sleep());
    }
    raise(InteropError::ProbeExhausted {
        port,
        attempts: retry.attempts,
    })
}
