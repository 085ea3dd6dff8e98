// ML-DSA (FIPS 204) at security levels 65 and 87.
//
// Key generation is seeded from the OS RNG and expanded deterministically.
// A decoded private key cannot reproduce its verifying key (the FIPS 204
// private encoding does not carry it), so `generate` returns both halves.

use ml_dsa::{KeyGen, MlDsa65, MlDsa87};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlDsaVariant {
    MlDsa65,
    MlDsa87,
}

impl MlDsaVariant {
    pub fn public_key_len(&self) -> usize {
        match self {
            MlDsaVariant::MlDsa65 => 1952,
            MlDsaVariant::MlDsa87 => 2592,
        }
    }

    pub fn private_key_len(&self) -> usize {
        match self {
            MlDsaVariant::MlDsa65 => 4032,
            MlDsaVariant::MlDsa87 => 4896,
        }
    }

    pub fn signature_len(&self) -> usize {
        match self {
            MlDsaVariant::MlDsa65 => 3309,
            MlDsaVariant::MlDsa87 => 4627,
        }
    }
}

// Expanded keys are large; boxing keeps them off the stack.
enum PrivateInner {
    V65(Box<ml_dsa::SigningKey<MlDsa65>>),
    V87(Box<ml_dsa::SigningKey<MlDsa87>>),
}

enum PublicInner {
    V65(Box<ml_dsa::VerifyingKey<MlDsa65>>),
    V87(Box<ml_dsa::VerifyingKey<MlDsa87>>),
}

pub struct MlDsaPrivateKey {
    variant: MlDsaVariant,
    inner: PrivateInner,
}

pub struct MlDsaPublicKey {
    variant: MlDsaVariant,
    inner: PublicInner,
}

impl MlDsaPrivateKey {
    /// Generate a fresh key pair from a 32-byte OS-random seed.
    pub fn generate(variant: MlDsaVariant) -> (MlDsaPrivateKey, MlDsaPublicKey) {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        match variant {
            MlDsaVariant::MlDsa65 => {
                let kp = MlDsa65::key_gen_internal(&seed.into());
                (
                    MlDsaPrivateKey {
                        variant,
                        inner: PrivateInner::V65(Box::new(kp.signing_key().clone())),
                    },
                    MlDsaPublicKey {
                        variant,
                        inner: PublicInner::V65(Box::new(kp.verifying_key().clone())),
                    },
                )
            }
            MlDsaVariant::MlDsa87 => {
                let kp = MlDsa87::key_gen_internal(&seed.into());
                (
                    MlDsaPrivateKey {
                        variant,
                        inner: PrivateInner::V87(Box::new(kp.signing_key().clone())),
                    },
                    MlDsaPublicKey {
                        variant,
                        inner: PublicInner::V87(Box::new(kp.verifying_key().clone())),
                    },
                )
            }
        }
    }

    pub fn from_bytes(variant: MlDsaVariant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != variant.private_key_len() {
            return Err(Error::format("wrong ML-DSA private key length"));
        }
        let inner = match variant {
            MlDsaVariant::MlDsa65 => {
                let encoded = ml_dsa::EncodedSigningKey::<MlDsa65>::try_from(bytes)
                    .map_err(|_| Error::format("wrong ML-DSA private key length"))?;
                PrivateInner::V65(Box::new(ml_dsa::SigningKey::decode(&encoded)))
            }
            MlDsaVariant::MlDsa87 => {
                let encoded = ml_dsa::EncodedSigningKey::<MlDsa87>::try_from(bytes)
                    .map_err(|_| Error::format("wrong ML-DSA private key length"))?;
                PrivateInner::V87(Box::new(ml_dsa::SigningKey::decode(&encoded)))
            }
        };
        Ok(MlDsaPrivateKey { variant, inner })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.inner {
            PrivateInner::V65(key) => key.encode().as_slice().to_vec(),
            PrivateInner::V87(key) => key.encode().as_slice().to_vec(),
        }
    }

    pub fn variant(&self) -> MlDsaVariant {
        self.variant
    }

    /// Deterministic signing with an empty context string.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = match &self.inner {
            PrivateInner::V65(key) => key
                .sign_deterministic(message, b"")
                .map_err(|_| Error::Crypto("ML-DSA signing failed"))?
                .encode()
                .as_slice()
                .to_vec(),
            PrivateInner::V87(key) => key
                .sign_deterministic(message, b"")
                .map_err(|_| Error::Crypto("ML-DSA signing failed"))?
                .encode()
                .as_slice()
                .to_vec(),
        };
        debug_assert_eq!(signature.len(), self.variant.signature_len());
        Ok(signature)
    }
}

impl MlDsaPublicKey {
    pub fn from_bytes(variant: MlDsaVariant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != variant.public_key_len() {
            return Err(Error::format("wrong ML-DSA public key length"));
        }
        let inner = match variant {
            MlDsaVariant::MlDsa65 => {
                let encoded = ml_dsa::EncodedVerifyingKey::<MlDsa65>::try_from(bytes)
                    .map_err(|_| Error::format("wrong ML-DSA public key length"))?;
                PublicInner::V65(Box::new(ml_dsa::VerifyingKey::decode(&encoded)))
            }
            MlDsaVariant::MlDsa87 => {
                let encoded = ml_dsa::EncodedVerifyingKey::<MlDsa87>::try_from(bytes)
                    .map_err(|_| Error::format("wrong ML-DSA public key length"))?;
                PublicInner::V87(Box::new(ml_dsa::VerifyingKey::decode(&encoded)))
            }
        };
        Ok(MlDsaPublicKey { variant, inner })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.inner {
            PublicInner::V65(key) => key.encode().as_slice().to_vec(),
            PublicInner::V87(key) => key.encode().as_slice().to_vec(),
        }
    }

    pub fn variant(&self) -> MlDsaVariant {
        self.variant
    }

    /// Verify a signature made with an empty context string. Wrong-length
    /// signatures are format errors.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        if signature.len() != self.variant.signature_len() {
            return Err(Error::format("wrong ML-DSA signature length"));
        }
        let verified = match &self.inner {
            PublicInner::V65(key) => {
                let encoded = ml_dsa::EncodedSignature::<MlDsa65>::try_from(signature)
                    .map_err(|_| Error::format("wrong ML-DSA signature length"))?;
                match ml_dsa::Signature::<MlDsa65>::decode(&encoded) {
                    Some(sig) => key.verify_with_context(message, b"", &sig),
                    None => false,
                }
            }
            PublicInner::V87(key) => {
                let encoded = ml_dsa::EncodedSignature::<MlDsa87>::try_from(signature)
                    .map_err(|_| Error::format("wrong ML-DSA signature length"))?;
                match ml_dsa::Signature::<MlDsa87>::decode(&encoded) {
                    Some(sig) => key.verify_with_context(message, b"", &sig),
                    None => false,
                }
            }
        };
        Ok(verified)
    }
}
