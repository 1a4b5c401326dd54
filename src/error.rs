use thiserror::Error;

use crate::{KEY_SIZE, NONCE_SIZE};

/// Errors returned by the slice-based XAES-256-GCM API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Key is not 32 bytes.
    #[error("invalid key length: expected {KEY_SIZE} bytes, got {len}")]
    InvalidKeyLength {
        /// Length of the rejected key.
        len: usize,
    },

    /// Nonce is not 24 bytes.
    #[error("invalid nonce length: expected {NONCE_SIZE} bytes, got {len}")]
    InvalidNonceLength {
        /// Length of the rejected nonce.
        len: usize,
    },

    /// Tag verification failed, including ciphertexts shorter than the tag.
    #[error("message authentication failed")]
    AuthenticationFailed,

    /// Input exceeds what the underlying AES-GCM mode can process.
    #[error("message too long for the underlying AEAD mode")]
    MessageTooLong,
}
