//! Algorithm names accepted by the OQS-enabled tools.
//!
//! Identifiers are opaque to this crate; they are passed straight through to
//! the external binaries, which do their own validation.

/// Post-quantum and hybrid (classical + post-quantum) key exchanges.
pub const KEY_EXCHANGES: &[&str] = &[
    // post-quantum key exchanges
    "frodo640aes",
    "frodo640shake",
    "frodo976aes",
    "frodo976shake",
    "frodo1344aes",
    "frodo1344shake",
    "kyber512",
    "kyber768",
    "kyber1024",
    "bikel1",
    "bikel3",
    "bikel5",
    "hqc128",
    "hqc192",
    "hqc256",
    "sntrup761",
    "nttru",
    "nttruref",
    // post-quantum + classical key exchanges
    "p256_frodo640aes",
    "p256_frodo640shake",
    "p384_frodo976aes",
    "p384_frodo976shake",
    "p521_frodo1344aes",
    "p521_frodo1344shake",
    "p256_kyber512",
    "p384_kyber768",
    "p521_kyber1024",
    "p256_bikel1",
    "p384_bikel3",
    "p521_bikel5",
    "p256_hqc128",
    "p384_hqc192",
    "p521_hqc256",
    "p256_sntrup761",
    "p384_nttru",
    "p384_nttruref",
];

/// Post-quantum signature algorithms usable as certificate key types.
pub const SIGNATURES: &[&str] = &[
    "dilithium2",
    "dilithium3",
    "dilithium5",
    "falcon512",
    "falcon1024",
    "sphincssha2128fsimple",
    "sphincssha2128ssimple",
    "sphincssha2192fsimple",
    "sphincsshake128fsimple",
];
