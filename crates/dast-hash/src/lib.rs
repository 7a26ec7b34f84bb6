//! Structural fingerprinting for dast.
//!
//! Provides domain-separated BLAKE3 hashing and the [`Fingerprinter`], which
//! reduces a subtree to a [`Fingerprint`](dast_types::Fingerprint) that
//! ignores volatile fields such as source positions.
//!
//! All hashing wraps `blake3`; nothing here is custom cryptography.

pub mod error;
pub mod fingerprinter;
pub mod hasher;

pub use error::{HashError, HashResult};
pub use fingerprinter::{fingerprint, FingerprintPolicy, Fingerprinter, DEFAULT_MAX_DEPTH};
pub use hasher::{DomainHasher, Encoder};
