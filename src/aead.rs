// One-shot AEAD seal/open.
//
// Thin facade over aws-lc-rs. Ciphertext layout is ciphertext || tag, matching
// the wire formats of every protocol this crate serves.

use aws_lc_rs::aead::{
    Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, CHACHA20_POLY1305,
};

use crate::error::{Error, Result};

pub const TAG_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    fn algorithm(&self) -> &'static aws_lc_rs::aead::Algorithm {
        match self {
            AeadAlgorithm::Aes128Gcm => &AES_128_GCM,
            AeadAlgorithm::Aes256Gcm => &AES_256_GCM,
            AeadAlgorithm::ChaCha20Poly1305 => &CHACHA20_POLY1305,
        }
    }

    pub fn key_len(&self) -> usize {
        self.algorithm().key_len()
    }

    pub fn nonce_len(&self) -> usize {
        NONCE_LEN
    }

    pub fn tag_len(&self) -> usize {
        TAG_LEN
    }
}

/// A bound AEAD key. Nonce uniqueness is the caller's responsibility.
pub struct Aead {
    algorithm: AeadAlgorithm,
    key: LessSafeKey,
}

impl Aead {
    pub fn new(algorithm: AeadAlgorithm, key: &[u8]) -> Result<Self> {
        if key.len() != algorithm.key_len() {
            return Err(Error::InvalidKey("wrong AEAD key length"));
        }
        let unbound = UnboundKey::new(algorithm.algorithm(), key)
            .map_err(|_| Error::InvalidKey("AEAD key rejected"))?;
        Ok(Aead {
            algorithm,
            key: LessSafeKey::new(unbound),
        })
    }

    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }

    /// Encrypt and authenticate; returns ciphertext with the tag appended.
    pub fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = self.make_nonce(nonce)?;
        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| Error::Crypto("AEAD seal failed"))?;
        Ok(in_out)
    }

    /// Authenticate and decrypt ciphertext produced by `seal`.
    pub fn open(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_LEN {
            return Err(Error::format("AEAD input shorter than tag"));
        }
        let nonce = self.make_nonce(nonce)?;
        let mut in_out = ciphertext.to_vec();
        let plaintext_len = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| Error::Crypto("AEAD tag mismatch"))?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }

    fn make_nonce(&self, nonce: &[u8]) -> Result<Nonce> {
        if nonce.len() != NONCE_LEN {
            return Err(Error::InvalidArgument("wrong AEAD nonce length"));
        }
        Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| Error::InvalidArgument("wrong AEAD nonce length"))
    }
}
