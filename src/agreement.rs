// Key agreement: X25519 (RFC 7748) and ECDH over P-256.
//
// X25519 keys are raw 32-byte arrays; P-256 public keys are uncompressed SEC1
// points. Wrong-length inputs are format errors, never panics.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{Error, Result};

pub const X25519_KEY_LEN: usize = 32;
pub const X25519_SHARED_SECRET_LEN: usize = 32;
pub const P256_PRIVATE_KEY_LEN: usize = 32;
pub const P256_PUBLIC_KEY_SEC1_LEN: usize = 65;
pub const P256_SHARED_SECRET_LEN: usize = 32;

pub struct X25519PrivateKey {
    secret: StaticSecret,
}

impl X25519PrivateKey {
    pub fn generate() -> Self {
        X25519PrivateKey {
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; X25519_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::format("X25519 private key must be 32 bytes"))?;
        Ok(X25519PrivateKey {
            secret: StaticSecret::from(bytes),
        })
    }

    pub fn to_bytes(&self) -> [u8; X25519_KEY_LEN] {
        self.secret.to_bytes()
    }

    pub fn public_key(&self) -> [u8; X25519_KEY_LEN] {
        PublicKey::from(&self.secret).to_bytes()
    }

    /// X25519 scalar multiplication with a peer public key.
    ///
    /// A non-contributory (all-zero) shared secret is rejected.
    pub fn agree(&self, peer_public: &[u8]) -> Result<[u8; X25519_SHARED_SECRET_LEN]> {
        let peer: [u8; X25519_KEY_LEN] = peer_public
            .try_into()
            .map_err(|_| Error::format("X25519 public key must be 32 bytes"))?;
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(Error::InvalidKey("low-order X25519 public key"));
        }
        Ok(*shared.as_bytes())
    }
}

pub struct EcdhP256PrivateKey {
    secret: p256::SecretKey,
}

impl EcdhP256PrivateKey {
    pub fn generate() -> Self {
        EcdhP256PrivateKey {
            secret: p256::SecretKey::random(&mut OsRng),
        }
    }

    /// Construct from the raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != P256_PRIVATE_KEY_LEN {
            return Err(Error::format("P-256 private key must be 32 bytes"));
        }
        let secret = p256::SecretKey::from_slice(bytes)
            .map_err(|_| Error::InvalidKey("P-256 scalar out of range"))?;
        Ok(EcdhP256PrivateKey { secret })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.secret.to_bytes().to_vec()
    }

    /// Uncompressed SEC1 encoding of the public point (65 bytes).
    pub fn public_key_sec1(&self) -> Vec<u8> {
        self.secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// ECDH with a peer's SEC1-encoded public point; returns the x coordinate.
    pub fn agree(&self, peer_sec1: &[u8]) -> Result<Vec<u8>> {
        let peer = p256::PublicKey::from_sec1_bytes(peer_sec1)
            .map_err(|_| Error::format("malformed P-256 public point"))?;
        let shared =
            p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        Ok(shared.raw_secret_bytes().to_vec())
    }
}
