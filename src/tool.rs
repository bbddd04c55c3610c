//! The two interoperating TLS command-line tool families, behind a common
//! capability trait so the bring-up logic stays implementation-agnostic.

use std::path::PathBuf;
use std::process::Command;

use crate::conf::InteropConf;
use crate::credentials::CredentialFiles;

/// One TLS implementation under test.
///
/// A tool knows how to build its server invocation (binding an ephemeral
/// port) and its minimal client invocation against a given port. Adding a
/// third implementation means adding a type here, not touching bring-up.
pub trait TlsTool {
    fn name(&self) -> &'static str;

    /// Server accepting on an ephemeral port, using the given credentials.
    fn server_command(&self, creds: &CredentialFiles) -> Command;

    /// Minimal client whose zero exit status proves a completed
    /// handshake/connection against `port`.
    fn client_command(&self, port: u16) -> Command;
}

/// The OQS-enabled OpenSSL `s_server`/`s_client` pair.
pub struct OpenSsl {
    pub binary: PathBuf,
}

impl OpenSsl {
    pub fn from_conf(conf: &InteropConf) -> Self {
        Self {
            binary: conf.openssl.clone(),
        }
    }
}

impl TlsTool for OpenSsl {
    fn name(&self) -> &'static str {
        "OpenSSL"
    }

    fn server_command(&self, creds: &CredentialFiles) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("s_server")
            .arg("-cert")
            .arg(&creds.server_cert)
            .arg("-key")
            .arg(&creds.server_key)
            .arg("-CAfile")
            .arg(&creds.ca_cert)
            .arg("-tls1_3")
            .arg("-quiet")
            .args(["-accept", "0"]);
        cmd
    }

    fn client_command(&self, port: u16) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("s_client")
            .args(["-connect", &format!("localhost:{port}")]);
        cmd
    }
}

/// The BoringSSL `bssl server` / `bssl_shim` pair.
pub struct BoringSsl {
    pub tool: PathBuf,
    pub shim: PathBuf,
}

impl BoringSsl {
    pub fn from_conf(conf: &InteropConf) -> Self {
        Self {
            tool: conf.bssl.clone(),
            shim: conf.bssl_shim.clone(),
        }
    }
}

impl TlsTool for BoringSsl {
    fn name(&self) -> &'static str {
        "BoringSSL"
    }

    fn server_command(&self, creds: &CredentialFiles) -> Command {
        let mut cmd = Command::new(&self.tool);
        cmd.arg("server")
            .args(["-accept", "0"])
            .arg("-cert")
            .arg(&creds.server_cert)
            .arg("-key")
            .arg(&creds.server_key)
            .arg("-loop");
        cmd
    }

    fn client_command(&self, port: u16) -> Command {
        let mut cmd = Command::new(&self.shim);
        cmd.args(["-port", &port.to_string()])
            .arg("-shim-shuts-down");
        cmd
    }
}
