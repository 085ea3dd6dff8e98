//! cleat - synchronous crypto and TLS building blocks.
//!
//! Byte-oriented wrappers over aws-lc-rs, rustls, and the RustCrypto stack:
//! AEAD, HKDF, HMAC/CMAC, key agreement, classical and post-quantum
//! signatures, HPKE, DER and big-integer codecs, X.509 field access, and a
//! blocking TLS connection with interruptible socket waits.
//!
//! # Threading model
//!
//! The TLS surface is blocking and synchronous. A [`tls::TlsConnection`]
//! allows one thread to block in `read` while another blocks in `write`; a
//! third thread may call `interrupt`, which promptly unblocks both and
//! permanently poisons the connection. Timeouts are per call, with
//! `Duration::ZERO` meaning no limit.
//!
//! There is no global state: contexts and keys are plain values, shared
//! explicitly where sharing is wanted.

pub mod aead;
pub mod agreement;
pub mod asn1;
pub mod bigint;
pub mod error;
pub mod hkdf;
pub mod hpke;
pub mod mac;
pub mod provider;
pub mod signature;
pub mod tls;
pub mod x509;

mod util;

pub use error::{Error, Result};
pub use provider::fips_enabled;
