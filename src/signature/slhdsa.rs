// SLH-DSA-SHA2-128s (FIPS 205).
//
// The small-signature parameter set: 32-byte public keys, 64-byte private
// keys, 7856-byte signatures. Signing is deterministic.

use rand::rngs::OsRng;
use signature::{Keypair, Signer, Verifier};
use slh_dsa::Sha2_128s;

use crate::error::{Error, Result};

pub const SLH_DSA_128S_PUBLIC_KEY_LEN: usize = 32;
pub const SLH_DSA_128S_PRIVATE_KEY_LEN: usize = 64;
pub const SLH_DSA_128S_SIGNATURE_LEN: usize = 7856;

pub struct SlhDsaPrivateKey {
    key: slh_dsa::SigningKey<Sha2_128s>,
}

pub struct SlhDsaPublicKey {
    key: slh_dsa::VerifyingKey<Sha2_128s>,
}

impl SlhDsaPrivateKey {
    pub fn generate() -> Self {
        SlhDsaPrivateKey {
            key: slh_dsa::SigningKey::new(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SLH_DSA_128S_PRIVATE_KEY_LEN {
            return Err(Error::format("SLH-DSA private key must be 64 bytes"));
        }
        let key = slh_dsa::SigningKey::try_from(bytes)
            .map_err(|_| Error::InvalidKey("SLH-DSA private key rejected"))?;
        Ok(SlhDsaPrivateKey { key })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.key.to_bytes().as_slice().to_vec()
    }

    pub fn public_key(&self) -> SlhDsaPublicKey {
        SlhDsaPublicKey {
            key: self.key.verifying_key(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature = self.key.sign(message);
        signature.to_bytes().as_slice().to_vec()
    }
}

impl SlhDsaPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SLH_DSA_128S_PUBLIC_KEY_LEN {
            return Err(Error::format("SLH-DSA public key must be 32 bytes"));
        }
        let key = slh_dsa::VerifyingKey::try_from(bytes)
            .map_err(|_| Error::InvalidKey("SLH-DSA public key rejected"))?;
        Ok(SlhDsaPublicKey { key })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.key.to_bytes().as_slice().to_vec()
    }

    /// Wrong-length signatures are format errors; a well-formed signature that
    /// does not verify returns `Ok(false)`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        if signature.len() != SLH_DSA_128S_SIGNATURE_LEN {
            return Err(Error::format("SLH-DSA signature must be 7856 bytes"));
        }
        let signature = slh_dsa::Signature::<Sha2_128s>::try_from(signature)
            .map_err(|_| Error::format("SLH-DSA signature must be 7856 bytes"))?;
        Ok(self.key.verify(message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let private = SlhDsaPrivateKey::generate();
        assert_eq!(private.to_bytes().len(), SLH_DSA_128S_PRIVATE_KEY_LEN);
        let public = private.public_key();
        assert_eq!(public.to_bytes().len(), SLH_DSA_128S_PUBLIC_KEY_LEN);

        let signature = private.sign(b"stateless hash payload");
        assert_eq!(signature.len(), SLH_DSA_128S_SIGNATURE_LEN);
        assert!(public.verify(b"stateless hash payload", &signature).unwrap());
        assert!(!public.verify(b"other payload", &signature).unwrap());
    }

    #[test]
    fn test_encoding_round_trip() {
        let private = SlhDsaPrivateKey::generate();
        let restored = SlhDsaPrivateKey::from_bytes(&private.to_bytes()).unwrap();
        let signature = restored.sign(b"m");
        let public = SlhDsaPublicKey::from_bytes(&private.public_key().to_bytes()).unwrap();
        assert!(public.verify(b"m", &signature).unwrap());
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        assert!(matches!(
            SlhDsaPrivateKey::from_bytes(&[0u8; 63]),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            SlhDsaPublicKey::from_bytes(&[0u8; 33]),
            Err(Error::Format(_))
        ));
        let public = SlhDsaPrivateKey::generate().public_key();
        assert!(matches!(
            public.verify(b"m", &[0u8; 100]),
            Err(Error::Format(_))
        ));
    }
}
