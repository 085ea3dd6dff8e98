// Ed25519 with raw RFC 8032 encodings: 32-byte keys, 64-byte signatures.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{Error, Result};

pub const ED25519_PRIVATE_KEY_LEN: usize = 32;
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;
pub const ED25519_SIGNATURE_LEN: usize = 64;

pub struct Ed25519PrivateKey {
    key: SigningKey,
}

impl Ed25519PrivateKey {
    pub fn generate() -> Self {
        Ed25519PrivateKey {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct from the 32-byte seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let seed: [u8; ED25519_PRIVATE_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::format("Ed25519 private key must be 32 bytes"))?;
        Ok(Ed25519PrivateKey {
            key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn to_bytes(&self) -> [u8; ED25519_PRIVATE_KEY_LEN] {
        self.key.to_bytes()
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey {
            key: self.key.verifying_key(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; ED25519_SIGNATURE_LEN] {
        self.key.sign(message).to_bytes()
    }
}

pub struct Ed25519PublicKey {
    key: VerifyingKey,
}

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; ED25519_PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::format("Ed25519 public key must be 32 bytes"))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| Error::InvalidKey("not a valid Ed25519 point"))?;
        Ok(Ed25519PublicKey { key })
    }

    pub fn to_bytes(&self) -> [u8; ED25519_PUBLIC_KEY_LEN] {
        self.key.to_bytes()
    }

    /// Verify a 64-byte signature. Wrong-length signatures are format errors;
    /// a well-formed signature that does not verify returns `Ok(false)`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        let bytes: [u8; ED25519_SIGNATURE_LEN] = signature
            .try_into()
            .map_err(|_| Error::format("Ed25519 signature must be 64 bytes"))?;
        let signature = ed25519_dalek::Signature::from_bytes(&bytes);
        Ok(self.key.verify(message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::decode_hex_fingerprint as hex;

    #[test]
    fn test_rfc8032_test_1() {
        let seed = hex("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60").unwrap();
        let key = Ed25519PrivateKey::from_bytes(&seed).unwrap();
        assert_eq!(
            key.public_key().to_bytes().to_vec(),
            hex("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a").unwrap()
        );
        let signature = key.sign(b"");
        assert_eq!(
            signature.to_vec(),
            hex(
                "e5564300c360ac729086e2cc806e828a\
                 84877f1eb8e5d974d873e06522490155\
                 5fb8821590a33bacc61e39701cf9b46b\
                 d25bf5f0595bbe24655141438e7a100b"
            )
            .unwrap()
        );
        assert!(key.public_key().verify(b"", &signature).unwrap());
        assert!(!key.public_key().verify(b"x", &signature).unwrap());
    }

    #[test]
    fn test_generate_distinct_keys() {
        let a = Ed25519PrivateKey::generate();
        let b = Ed25519PrivateKey::generate();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_fixed_lengths_enforced() {
        assert!(matches!(
            Ed25519PrivateKey::from_bytes(&[0u8; 33]),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            Ed25519PublicKey::from_bytes(&[0u8; 31]),
            Err(Error::Format(_))
        ));
        let key = Ed25519PrivateKey::generate();
        assert!(matches!(
            key.public_key().verify(b"m", &[0u8; 63]),
            Err(Error::Format(_))
        ));
    }
}
