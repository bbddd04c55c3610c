//! Ephemeral X.509 test credentials, generated by driving the OQS-enabled
//! `openssl` binary.
//!
//! All artifacts are named by the (prefix, algorithm) pair so repeated calls
//! with different algorithms or different worker prefixes never collide, and
//! callers can re-locate files by convention instead of keeping handles.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::conf::InteropConf;
use crate::error::Result;
use crate::process::run_tool;

const CA_SUBJECT: &str = "/CN=oqstest_CA";
const SERVER_SUBJECT: &str = "/CN=oqstest_server";
const VALIDITY_DAYS: &str = "365";

/// The six on-disk artifacts produced for one (prefix, signature algorithm)
/// pair. Purely a naming convention; constructing this performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFiles {
    pub ca_key: PathBuf,
    pub ca_cert: PathBuf,
    pub server_key: PathBuf,
    pub server_csr: PathBuf,
    pub server_cert: PathBuf,
    /// Server certificate followed immediately by the CA certificate
    pub chain: PathBuf,
}

impl CredentialFiles {
    pub fn new(artifacts_dir: &Path, prefix: &str, sig_alg: &str) -> Self {
        let name = |suffix: &str| artifacts_dir.join(format!("{prefix}_{sig_alg}_{suffix}"));
        Self {
            ca_key: name("CA.key"),
            ca_cert: name("CA.crt"),
            server_key: name("srv.key"),
            server_csr: name("srv.csr"),
            server_cert: name("srv.crt"),
            chain: name("cert_chain"),
        }
    }

    pub fn all(&self) -> [&Path; 6] {
        [
            &self.ca_key,
            &self.ca_cert,
            &self.server_key,
            &self.server_csr,
            &self.server_cert,
            &self.chain,
        ]
    }
}

/// Generate a full credential set for `sig_alg` under `artifacts_dir`.
///
/// Produces a self-signed CA, a server key and CSR, the server certificate
/// signed by the CA, and the concatenated chain file. The directory is
/// created if absent. Any tool failure is fatal and carries the captured
/// output; see [`run_tool`].
pub fn generate_credentials(
    conf: &InteropConf,
    sig_alg: &str,
    artifacts_dir: &Path,
    prefix: &str,
) -> Result<CredentialFiles> {
    fs::create_dir_all(artifacts_dir)?;
    let files = CredentialFiles::new(artifacts_dir, prefix, sig_alg);

    // self-signed CA with the requested signature algorithm as the key type
    let mut ca_req = Command::new(&conf.openssl);
    ca_req
        .arg("req")
        .args(["-x509", "-new"])
        .args(["-newkey", sig_alg])
        .arg("-keyout")
        .arg(&files.ca_key)
        .arg("-out")
        .arg(&files.ca_cert)
        .arg("-nodes")
        .args(["-subj", CA_SUBJECT])
        .args(["-days", VALIDITY_DAYS]);
    if let Some(ossl_config) = &conf.openssl_config {
        ca_req.arg("-config").arg(ossl_config);
    }
    run_tool(ca_req, None)?;

    // server key and certificate signing request
    let mut srv_req = Command::new(&conf.openssl);
    srv_req
        .arg("req")
        .arg("-new")
        .args(["-newkey", sig_alg])
        .arg("-keyout")
        .arg(&files.server_key)
        .arg("-out")
        .arg(&files.server_csr)
        .arg("-nodes")
        .args(["-subj", SERVER_SUBJECT]);
    if let Some(ossl_config) = &conf.openssl_config {
        srv_req.arg("-config").arg(ossl_config);
    }
    run_tool(srv_req, None)?;

    // sign the server certificate with the CA
    let mut sign = Command::new(&conf.openssl);
    sign.args(["x509", "-req"])
        .arg("-in")
        .arg(&files.server_csr)
        .arg("-out")
        .arg(&files.server_cert)
        .arg("-CA")
        .arg(&files.ca_cert)
        .arg("-CAkey")
        .arg(&files.ca_key)
        .arg("-CAcreateserial")
        .args(["-days", VALIDITY_DAYS]);
    run_tool(sign, None)?;

    concat_files(&files.chain, &[&files.server_cert, &files.ca_cert])?;
    tracing::info!("generated credentials for {sig_alg} under {prefix} in {artifacts_dir:?}");
    Ok(files)
}

fn concat_files(out: &Path, parts: &[&Path]) -> io::Result<()> {
    let mut out_file = fs::File::create(out)?;
    for part in parts {
        let mut in_file = fs::File::open(part)?;
        io::copy(&mut in_file, &mut out_file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gw0", "dilithium2")]
    #[case("gw1", "falcon512")]
    fn file_names_are_deterministic(#[case] prefix: &str, #[case] sig_alg: &str) {
        let dir = Path::new("/artifacts");
        let files = CredentialFiles::new(dir, prefix, sig_alg);
        assert_eq!(files, CredentialFiles::new(dir, prefix, sig_alg));
        assert_eq!(
            files.ca_key,
            dir.join(format!("{prefix}_{sig_alg}_CA.key"))
        );
        assert_eq!(
            files.chain,
            dir.join(format!("{prefix}_{sig_alg}_cert_chain"))
        );
        assert_eq!(files.all().len(), 6);
    }

    #[test]
    fn distinct_prefixes_never_collide() {
        let dir = Path::new("/artifacts");
        let a = CredentialFiles::new(dir, "gw0", "dilithium2");
        let b = CredentialFiles::new(dir, "gw1", "dilithium2");
        for (left, right) in a.all().iter().zip(b.all().iter()) {
            assert_ne!(left, right);
        }
    }

    #[test]
    fn chain_is_server_cert_then_ca_cert() {
        let dir = tempfile::tempdir().unwrap();
        let server_cert = dir.path().join("srv.crt");
        let ca_cert = dir.path().join("CA.crt");
        let chain = dir.path().join("cert_chain");
        fs::write(&server_cert, b"SERVER CERT\n").unwrap();
        fs::write(&ca_cert, b"CA CERT\n").unwrap();

        concat_files(&chain, &[&server_cert, &ca_cert]).unwrap();
        assert_eq!(fs::read(&chain).unwrap(), b"SERVER CERT\nCA CERT\n");
    }
}
