//! Test orchestration for post-quantum TLS interoperability between an
//! OQS-enabled OpenSSL and BoringSSL.
//!
//! This crate is glue, not a protocol implementation: it generates ephemeral
//! X.509 test credentials by driving the `openssl` tool, spawns one of the
//! two implementations' server binaries, discovers the server's dynamically
//! bound port through the OS socket table, and confirms liveness with a
//! minimal client handshake, retrying under timing uncertainty. Test cases
//! then drive actual protocol exchanges against the confirmed-live server and
//! own its teardown.
//!
//! Everything is sequential and blocking; concurrent trials are an external
//! test-runner concern, coordinated only by distinct worker prefixes for the
//! shared artifact directory.

pub mod algorithms;
pub mod conf;
pub mod credentials;
pub mod error;
pub mod process;
pub mod server;
pub mod tool;

pub use conf::{init_conf, InteropConf, RetryConf};
pub use credentials::{generate_credentials, CredentialFiles};
pub use error::{InteropError, Result};
pub use server::{bring_up, start_server, ServerHandle};
pub use tool::{BoringSsl, OpenSsl, TlsTool};
