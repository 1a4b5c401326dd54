//! Per-message subkey derivation.
//!
//! This is NIST SP 800-108 KBKDF in counter mode with CMAC as the PRF, label
//! `"X"`, the first 96 bits of the nonce as context, and no length field. With
//! a single complete 16-byte message block, CMAC collapses to `E_K(M ^ K1)`,
//! so the whole derivation is two block encryptions plus the one-time `K1`.

use cipher::{
    consts::{U16, U32},
    generic_array::GenericArray,
    Block, BlockCipher, BlockEncrypt, BlockSizeUser, Key, KeyInit, KeySizeUser,
};
use subtle::{Choice, ConditionallySelectable};
use zeroize::{Zeroize, Zeroizing};

/// Block cipher usable for both the subkey derivation and the inner mode:
/// 128-bit blocks and a 256-bit key, so two output blocks form one key.
pub trait DerivationCipher:
    BlockCipher + BlockEncrypt + KeyInit + BlockSizeUser<BlockSize = U16> + KeySizeUser<KeySize = U32>
{
}

impl<C> DerivationCipher for C where
    C: BlockCipher
        + BlockEncrypt
        + KeyInit
        + BlockSizeUser<BlockSize = U16>
        + KeySizeUser<KeySize = U32>
{
}

/// First 96 bits of the extended nonce.
pub(crate) type NoncePrefix = GenericArray<u8, cipher::consts::U12>;

const BLOCK_SIZE: usize = 16;

/// Counter-mode labels: `[i]_2 || "X" || 0x00` for i = 1, 2.
const LABEL_LO: [u8; 4] = [0x00, 0x01, b'X', 0x00];
const LABEL_HI: [u8; 4] = [0x00, 0x02, b'X', 0x00];

/// Doubling in GF(2^128) mod x^128 + x^7 + x^2 + x + 1, big-endian.
pub(crate) fn dbl(block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let mut out = [0u8; BLOCK_SIZE];
    let mut carry = 0u8;
    for i in (0..BLOCK_SIZE).rev() {
        out[i] = (block[i] << 1) | carry;
        carry = block[i] >> 7;
    }
    out[BLOCK_SIZE - 1] ^= u8::conditional_select(&0x00, &0x87, Choice::from(carry));
    out
}

/// Long-term key schedule plus the cached CMAC subkey `K1`.
#[derive(Clone)]
pub(crate) struct SubkeyDerivation<C> {
    cipher: C,
    k1: [u8; BLOCK_SIZE],
}

impl<C: DerivationCipher> SubkeyDerivation<C> {
    pub(crate) fn new(key: &Key<C>) -> Self {
        let cipher = C::new(key);

        let mut l = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(Block::<C>::from_mut_slice(&mut l));
        let k1 = dbl(&l);
        l.zeroize();

        Self { cipher, k1 }
    }

    /// Derives the 256-bit subkey for one message from the nonce prefix.
    ///
    /// Equal prefixes always yield equal subkeys; uniqueness of the full
    /// nonce is what keeps (subkey, inner nonce) pairs distinct.
    pub(crate) fn derive(&self, prefix: &NoncePrefix) -> Zeroizing<[u8; 2 * BLOCK_SIZE]> {
        let mut subkey = Zeroizing::new([0u8; 2 * BLOCK_SIZE]);
        let (lo, hi) = subkey.split_at_mut(BLOCK_SIZE);
        self.prf(&LABEL_LO, prefix, lo);
        self.prf(&LABEL_HI, prefix, hi);
        subkey
    }

    /// `out = E_K((label || prefix) ^ K1)`
    fn prf(&self, label: &[u8; 4], prefix: &NoncePrefix, out: &mut [u8]) {
        out[..label.len()].copy_from_slice(label);
        out[label.len()..].copy_from_slice(prefix);
        for (b, k) in out.iter_mut().zip(self.k1.iter()) {
            *b ^= k;
        }
        self.cipher.encrypt_block(Block::<C>::from_mut_slice(out));
    }

    #[cfg(test)]
    pub(crate) fn k1(&self) -> &[u8; BLOCK_SIZE] {
        &self.k1
    }
}

impl<C> Drop for SubkeyDerivation<C> {
    fn drop(&mut self) {
        self.k1.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use aes::Aes256;

    use super::*;

    fn h<const N: usize>(s: &str) -> [u8; N] {
        let mut out = [0u8; N];
        hex::decode_to_slice(s, &mut out).unwrap();
        out
    }

    #[test]
    fn dbl_without_carry_is_a_shift() {
        let mut x = [0u8; 16];
        x[0] = 0x40;
        x[15] = 0x01;
        let mut want = [0u8; 16];
        want[0] = 0x80;
        want[15] = 0x02;
        assert_eq!(dbl(&x), want);
    }

    #[test]
    fn dbl_reduces_on_carry() {
        let mut x = [0u8; 16];
        x[0] = 0x80;
        let mut want = [0u8; 16];
        want[15] = 0x87;
        assert_eq!(dbl(&x), want);

        assert_eq!(dbl(&[0xff; 16]), h("ffffffffffffffffffffffffffffff79"));
    }

    #[test]
    fn dbl_carries_across_bytes() {
        let x = h::<16>("00ff00ff00ff00ff00ff00ff00ff00ff");
        assert_eq!(dbl(&x), h("01fe01fe01fe01fe01fe01fe01fe01fe"));
    }

    #[test]
    fn k1_matches_known_value() {
        let kdf = SubkeyDerivation::<Aes256>::new(&[0x01; 32].into());
        // E_K(0) = 7298caa565031eadc6ce23d23ea66378
        assert_eq!(kdf.k1(), &h("e531954aca063d5b8d9c47a47d4cc6f0"));
    }

    #[test]
    fn setup_is_idempotent() {
        let key = [0x5a; 32].into();
        let a = SubkeyDerivation::<Aes256>::new(&key);
        let b = SubkeyDerivation::<Aes256>::new(&key);
        assert_eq!(a.k1(), b.k1());
    }

    #[test]
    fn derive_matches_known_subkey() {
        let kdf = SubkeyDerivation::<Aes256>::new(&[0x01; 32].into());
        let prefix = NoncePrefix::clone_from_slice(b"ABCDEFGHIJKL");
        assert_eq!(
            *kdf.derive(&prefix),
            h::<32>("c8612c9ed53fe43e8e005b828a1631a0bbcb6ab2f46514ec4f439fcfd0fa969b")
        );
    }

    #[test]
    fn halves_are_domain_separated() {
        let kdf = SubkeyDerivation::<Aes256>::new(&[0x07; 32].into());
        let subkey = kdf.derive(&NoncePrefix::default());
        assert_ne!(subkey[..16], subkey[16..]);
    }

    #[test]
    fn distinct_prefixes_give_distinct_subkeys() {
        let kdf = SubkeyDerivation::<Aes256>::new(&[0x07; 32].into());
        let a = kdf.derive(&NoncePrefix::clone_from_slice(&[0u8; 12]));
        let mut p = [0u8; 12];
        p[11] = 1;
        let b = kdf.derive(&NoncePrefix::clone_from_slice(&p));
        assert_ne!(*a, *b);
    }
}
