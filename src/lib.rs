#![doc = include_str!("../README.md")]
#![no_std]
#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod error;
mod kdf;
pub mod xaes_256_gcm;

pub use aead;
pub use error::Error;
pub use kdf::DerivationCipher;
pub use xaes_256_gcm::{ShortNonceAead, XAes256Gcm, XAesGcm};

/// Long-term key size in bytes.
pub const KEY_SIZE: usize = 32;
/// Nonce size in bytes.
pub const NONCE_SIZE: usize = 24;
/// Authentication tag size in bytes; also the ciphertext expansion.
pub const TAG_SIZE: usize = 16;
