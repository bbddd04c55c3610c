use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pqtls_interop::{
    algorithms, conf, credentials::generate_credentials, server::start_server,
    tool::{BoringSsl, OpenSsl, TlsTool},
};

#[derive(Parser, Debug)]
#[clap(name = "PQ TLS interop runner")]
#[clap(
    about = "A CLI for orchestrating post-quantum TLS interoperability checks \
between OQS-OpenSSL and BoringSSL. It generates ephemeral test credentials \
for a signature algorithm, brings up one implementation's server on an \
ephemeral port, and confirms with the other implementation's client that the \
server accepts connections. Example usage:
pqtls-interop gen-certs --sig-alg dilithium2
pqtls-interop check --server ossl --sig-alg dilithium2
pqtls-interop -c config/default.toml check --server bssl --sig-alg falcon512"
)]
struct Cli {
    /// Configuration file with tool paths and retry policy; environment
    /// variables prefixed PQTLS_INTEROP override it.
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum Implementation {
    /// OQS-enabled OpenSSL
    Ossl,
    /// BoringSSL
    Bssl,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate CA, server certificate and chain file for one signature
    /// algorithm, or for the whole catalog when none is given.
    GenCerts {
        #[clap(long)]
        sig_alg: Option<String>,
        /// Worker prefix disambiguating concurrent runs' files
        #[clap(long, default_value = "interop")]
        prefix: String,
    },
    /// Bring up a server, verify it accepts connections with the opposite
    /// implementation's client, then tear it down.
    Check {
        /// Which implementation serves; the other one probes.
        #[clap(long, value_enum)]
        server: Implementation,
        #[clap(long)]
        sig_alg: String,
        #[clap(long, default_value = "interop")]
        prefix: String,
    },
    /// Print the supported key-exchange and signature algorithm names.
    ListAlgorithms,
    /// Test plumbing: accept TCP connections on an ephemeral port forever.
    #[clap(hide = true)]
    Listen,
    /// Test plumbing: connect to a local TCP port once and exit.
    #[clap(hide = true)]
    Connect {
        #[clap(long)]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let conf = conf::init_conf(cli.config.as_deref())?;

    match cli.command {
        Commands::GenCerts { sig_alg, prefix } => {
            let sig_algs: Vec<String> = match sig_alg {
                Some(alg) => vec![alg],
                None => algorithms::SIGNATURES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            };
            for alg in &sig_algs {
                let files = generate_credentials(&conf, alg, &conf.artifacts_dir, &prefix)?;
                println!("{}", files.chain.display());
            }
        }
        Commands::Check {
            server,
            sig_alg,
            prefix,
        } => {
            let ossl = OpenSsl::from_conf(&conf);
            let bssl = BoringSsl::from_conf(&conf);
            let (server_tool, client_tool): (&dyn TlsTool, &dyn TlsTool) = match server {
                Implementation::Ossl => (&ossl, &bssl),
                Implementation::Bssl => (&bssl, &ossl),
            };
            let mut handle = start_server(server_tool, client_tool, &conf, &sig_alg, &prefix)?;
            println!(
                "{} server live on port {} with {sig_alg}",
                server_tool.name(),
                handle.port
            );
            handle.kill().context("failed to terminate the server")?;
        }
        Commands::ListAlgorithms => {
            println!("key exchanges:");
            for alg in algorithms::KEY_EXCHANGES {
                println!("  {alg}");
            }
            println!("signatures:");
            for alg in algorithms::SIGNATURES {
                println!("  {alg}");
            }
        }
        Commands::Listen => {
            let listener =
                TcpListener::bind("127.0.0.1:0").context("failed to bind a loopback port")?;
            loop {
                // accept and immediately drop; liveness probes only need
                // the connection to succeed
                let _ = listener.accept();
            }
        }
        Commands::Connect { port } => {
            TcpStream::connect(("127.0.0.1", port))
                .with_context(|| format!("failed to connect to port {port}"))?;
        }
    }
    Ok(())
}
