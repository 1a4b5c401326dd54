//! XAES-256-GCM: AES-256-GCM extended to a 192-bit nonce, as specified at
//! [c2sp.org/XAES-256-GCM][1].
//!
//! Externally, uses a 256-bit key and a 192-bit nonce.
//!
//! Internally, the first 96 bits of the nonce derive a fresh 256-bit AES key
//! (two AES-256 calls under the long-term key), and the last 96 bits are the
//! AES-256-GCM nonce under that derived key. Random nonces are therefore safe
//! for a practically unbounded number of messages per key.
//!
//! Nonces must still never repeat under the same key; this type does not
//! enforce that. Callers own the long-term key bytes and should zeroize them.
//!
//! [1]: https://c2sp.org/XAES-256-GCM
//!
//! ### Usage
//!
//! ```
//! use xaes_gcm::xaes_256_gcm::XAes256Gcm;
//!
//! let x = XAes256Gcm::try_new(&[0x01; 32]).unwrap();
//! let nonce = b"ABCDEFGHIJKLMNOPQRSTUVWX";
//!
//! let sealed = x.seal(nonce, b"XAES-256-GCM", b"").unwrap();
//! assert_eq!(sealed.len(), 12 + 16);
//!
//! let opened = x.open(nonce, &sealed, b"").unwrap();
//! assert_eq!(opened, b"XAES-256-GCM");
//! ```

use core::{fmt, marker::PhantomData};

use aead::{
    consts::{U0, U12, U16, U24, U32},
    generic_array::GenericArray,
    AeadCore, AeadInPlace, KeyInit, KeySizeUser,
};
use aes::Aes256;
use aes_gcm::AesGcm;
use zeroize::Zeroize;

use crate::{
    kdf::{DerivationCipher, NoncePrefix, SubkeyDerivation},
    Error, KEY_SIZE, NONCE_SIZE,
};

#[cfg(feature = "alloc")]
use aead::{Aead, Payload};
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// XAES-256-GCM key
pub type Key = GenericArray<u8, U32>;
/// XAES-256-GCM nonce
pub type Nonce = GenericArray<u8, U24>;
/// XAES-256-GCM tag
pub type Tag = GenericArray<u8, U16>;

/// 96-bit-nonce AEAD mode run under each derived subkey.
///
/// Built from the block cipher keyed with the subkey; the default is
/// [`AesGcm<C, U12>`](aes_gcm::AesGcm).
pub trait ShortNonceAead<C>:
    AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16, CiphertextOverhead = U0> + From<C>
{
}

impl<C, M> ShortNonceAead<C> for M where
    M: AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16, CiphertextOverhead = U0> + From<C>
{
}

/// Extended-nonce AEAD over block cipher `C` and 96-bit-nonce mode `M`.
pub struct XAesGcm<C = Aes256, M = AesGcm<C, U12>> {
    kdf: SubkeyDerivation<C>,
    mode: PhantomData<fn() -> M>,
}

/// XAES-256-GCM
pub type XAes256Gcm = XAesGcm<Aes256>;

impl<C, M> XAesGcm<C, M>
where
    C: DerivationCipher,
    M: ShortNonceAead<C>,
{
    /// Creates an instance from an untyped key, which must be 32 bytes.
    pub fn try_new(key: &[u8]) -> Result<Self, Error> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeyLength { len: key.len() });
        }
        Ok(<Self as KeyInit>::new(Key::from_slice(key)))
    }

    /// Encrypts `plaintext` and returns `ciphertext || tag`.
    #[cfg(feature = "alloc")]
    pub fn seal(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let nonce = checked_nonce(nonce)?;
        let payload = Payload {
            msg: plaintext,
            aad: associated_data,
        };
        self.encrypt(nonce, payload).map_err(|_| Error::MessageTooLong)
    }

    /// Verifies and decrypts `ciphertext || tag`. Nothing is returned unless
    /// the tag matches.
    #[cfg(feature = "alloc")]
    pub fn open(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let nonce = checked_nonce(nonce)?;
        let payload = Payload {
            msg: ciphertext,
            aad: associated_data,
        };
        self.decrypt(nonce, payload).map_err(|_| Error::AuthenticationFailed)
    }

    /// Derives the subkey for `nonce` and returns the inner mode keyed with
    /// it, plus the inner 96-bit nonce.
    fn inner<'n>(&self, nonce: &'n Nonce) -> (M, &'n aead::Nonce<M>) {
        let (prefix, suffix) = nonce.split_at(NONCE_SIZE / 2);
        let subkey = self.kdf.derive(NoncePrefix::from_slice(prefix));
        let block_cipher = <C as KeyInit>::new(cipher::Key::<C>::from_slice(&subkey[..]));
        (M::from(block_cipher), aead::Nonce::<M>::from_slice(suffix))
    }
}

#[cfg(feature = "getrandom")]
impl XAes256Gcm {
    /// Randomly generates a new key using the OsRng.
    pub fn generate_key() -> Key {
        use aead::{rand_core::RngCore, OsRng};

        let mut key = Key::default();
        OsRng.fill_bytes(&mut key);
        key
    }
}

#[cfg(feature = "alloc")]
fn checked_nonce(nonce: &[u8]) -> Result<&Nonce, Error> {
    if nonce.len() != NONCE_SIZE {
        return Err(Error::InvalidNonceLength { len: nonce.len() });
    }
    Ok(Nonce::from_slice(nonce))
}

impl<C: DerivationCipher, M> KeySizeUser for XAesGcm<C, M> {
    type KeySize = U32;
}

impl<C: DerivationCipher, M> KeyInit for XAesGcm<C, M> {
    fn new(key: &Key) -> Self {
        Self {
            kdf: SubkeyDerivation::new(key),
            mode: PhantomData,
        }
    }
}

impl<C, M> AeadCore for XAesGcm<C, M> {
    type NonceSize = U24;
    type TagSize = U16;
    type CiphertextOverhead = U0;
}

impl<C, M> AeadInPlace for XAesGcm<C, M>
where
    C: DerivationCipher,
    M: ShortNonceAead<C>,
{
    fn encrypt_in_place_detached(
        &self,
        nonce: &Nonce,
        associated_data: &[u8],
        buffer: &mut [u8],
    ) -> aead::Result<Tag> {
        let (mode, nonce) = self.inner(nonce);
        mode.encrypt_in_place_detached(nonce, associated_data, buffer)
    }

    fn decrypt_in_place_detached(
        &self,
        nonce: &Nonce,
        associated_data: &[u8],
        buffer: &mut [u8],
        tag: &Tag,
    ) -> aead::Result<()> {
        let (mode, nonce) = self.inner(nonce);
        mode.decrypt_in_place_detached(nonce, associated_data, buffer, tag)
            .map_err(|e| {
                // Never leave unauthenticated plaintext behind.
                buffer.zeroize();
                e
            })
    }
}

impl<C: Clone, M> Clone for XAesGcm<C, M> {
    fn clone(&self) -> Self {
        Self {
            kdf: self.kdf.clone(),
            mode: PhantomData,
        }
    }
}

impl<C, M> fmt::Debug for XAesGcm<C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XAesGcm").finish_non_exhaustive()
    }
}
