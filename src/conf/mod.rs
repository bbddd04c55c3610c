use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Environment variables prefixed with this (separator `__`) override file
/// settings, e.g. `PQTLS_INTEROP_RETRY__ATTEMPTS=5`.
const ENV_PREFIX: &str = "PQTLS_INTEROP";

/// Tool locations and polling policy for one interop run.
///
/// Everything the orchestration used to hardcode lives here so tests can pass
/// their own binaries and a much smaller retry budget.
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct InteropConf {
    /// The OQS-enabled `openssl` binary, also used for certificate management
    pub openssl: PathBuf,
    /// Optional `-config` file handed to `openssl req`
    pub openssl_config: Option<PathBuf>,
    /// The BoringSSL multi-tool binary
    pub bssl: PathBuf,
    /// The BoringSSL test shim used as a minimal client
    pub bssl_shim: PathBuf,
    /// Where generated keys and certificates land; created on demand,
    /// never cleaned up here
    pub artifacts_dir: PathBuf,
    #[validate(nested)]
    pub retry: RetryConf,
}

impl Default for InteropConf {
    fn default() -> Self {
        Self {
            openssl: PathBuf::from("apps/openssl"),
            openssl_config: None,
            bssl: PathBuf::from("boringssl/build/tool/bssl"),
            bssl_shim: PathBuf::from("boringssl/build/ssl/test/bssl_shim"),
            artifacts_dir: PathBuf::from("tmp"),
            retry: RetryConf::default(),
        }
    }
}

/// Fixed-interval polling budget shared by port discovery and the liveness
/// probe. No timeout wraps the individual subprocess calls; only these
/// discrete attempt counts bound the loops.
#[derive(Serialize, Deserialize, Validate, Clone, Debug, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConf {
    #[validate(range(min = 1))]
    pub attempts: u32,
    pub sleep_ms: u64,
}

impl Default for RetryConf {
    fn default() -> Self {
        Self {
            attempts: 60,
            sleep_ms: 2000,
        }
    }
}

impl RetryConf {
    pub fn sleep(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }
}

/// Initialize and validate the configuration, from the given file if any,
/// with environment overrides applied on top.
pub fn init_conf(config_file: Option<&Path>) -> anyhow::Result<InteropConf> {
    let mut builder = config::Config::builder();
    if let Some(path) = config_file {
        builder = builder.add_source(config::File::from(path));
    }
    let conf: InteropConf = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    conf.validate()?;
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_conf_is_valid() {
        let conf = InteropConf::default();
        conf.validate().unwrap();
        assert_eq!(conf.retry.attempts, 60);
        assert_eq!(conf.retry.sleep(), Duration::from_secs(2));
        assert!(conf.openssl_config.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let toml = r#"
            openssl = "/opt/oqs/bin/openssl"

            [retry]
            attempts = 3
            sleep_ms = 100
        "#;
        let conf: InteropConf = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        conf.validate().unwrap();
        assert_eq!(conf.openssl, PathBuf::from("/opt/oqs/bin/openssl"));
        assert_eq!(conf.retry.attempts, 3);
        // untouched fields keep the built-in defaults
        assert_eq!(conf.bssl, PathBuf::from("boringssl/build/tool/bssl"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let conf = InteropConf {
            retry: RetryConf {
                attempts: 0,
                sleep_ms: 0,
            },
            ..Default::default()
        };
        assert!(conf.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml = r#"bogus_field = 1"#;
        let res = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<InteropConf>();
        assert!(res.is_err());
    }
}
