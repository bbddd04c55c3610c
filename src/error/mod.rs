use std::panic::Location;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures surfaced by the interop orchestration.
///
/// Two classes exist: an invoked external command exiting non-zero (fatal,
/// immediate, with its captured output attached for diagnosis) and exhaustion
/// of a startup/liveness polling budget. A server that dies during startup is
/// reported separately from one that is merely slow, so test logs can tell a
/// broken binary apart from an overloaded machine.
#[derive(Debug, Error)]
pub enum InteropError {
    #[error("command {command} exited with {status}\n{output}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },
    #[error("server process {pid} exited during startup with {status}\nrecent output:\n{output}")]
    ServerExited {
        pid: u32,
        status: ExitStatus,
        output: String,
    },
    #[error("server process {pid} did not open a listening socket after {attempts} attempts")]
    PortDiscoveryTimeout { pid: u32, attempts: u32 },
    #[error("no liveness probe against port {port} succeeded after {attempts} attempts")]
    ProbeExhausted { port: u16, attempts: u32 },
    #[error("failed to read the system socket table: {0}")]
    SocketTable(#[from] procfs::ProcError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = InteropError> = std::result::Result<T, E>;

/// Log the error at its creation site and hand it back for propagation.
#[track_caller]
pub(crate) fn raise<T>(err: InteropError) -> Result<T> {
    tracing::error!("Error in {}: {}", Location::caller(), err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::{raise, InteropError, Result};

    #[tracing_test::traced_test]
    #[test]
    fn raise_logs_the_call_site() {
        let _err: Result<()> = raise(InteropError::PortDiscoveryTimeout {
            pid: 4242,
            attempts: 60,
        });
        assert!(logs_contain("src/error/mod.rs"));
        assert!(logs_contain("process 4242"));
        assert!(logs_contain("Error in"));
    }
}
