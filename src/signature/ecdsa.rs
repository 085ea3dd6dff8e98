// ECDSA over P-256 and P-384 with ASN.1 DER signatures.
//
// Private keys travel as PKCS#8; public keys as uncompressed SEC1 points,
// matching the UnparsedPublicKey verification path.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1,
    ECDSA_P384_SHA384_ASN1_SIGNING, EcdsaKeyPair, EcdsaSigningAlgorithm,
    EcdsaVerificationAlgorithm, KeyPair, UnparsedPublicKey,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaCurve {
    P256,
    P384,
}

impl EcdsaCurve {
    fn signing(&self) -> &'static EcdsaSigningAlgorithm {
        match self {
            EcdsaCurve::P256 => &ECDSA_P256_SHA256_ASN1_SIGNING,
            EcdsaCurve::P384 => &ECDSA_P384_SHA384_ASN1_SIGNING,
        }
    }

    fn verification(&self) -> &'static EcdsaVerificationAlgorithm {
        match self {
            EcdsaCurve::P256 => &ECDSA_P256_SHA256_ASN1,
            EcdsaCurve::P384 => &ECDSA_P384_SHA384_ASN1,
        }
    }
}

pub struct EcdsaPrivateKey {
    curve: EcdsaCurve,
    keypair: EcdsaKeyPair,
}

impl EcdsaPrivateKey {
    pub fn generate(curve: EcdsaCurve) -> Result<Self> {
        let keypair = EcdsaKeyPair::generate(curve.signing())
            .map_err(|_| Error::Crypto("ECDSA key generation failed"))?;
        Ok(EcdsaPrivateKey { curve, keypair })
    }

    pub fn from_pkcs8(curve: EcdsaCurve, pkcs8: &[u8]) -> Result<Self> {
        let keypair = EcdsaKeyPair::from_pkcs8(curve.signing(), pkcs8)
            .map_err(|_| Error::InvalidKey("ECDSA PKCS#8 key rejected"))?;
        Ok(EcdsaPrivateKey { curve, keypair })
    }

    pub fn to_pkcs8(&self) -> Result<Vec<u8>> {
        let doc = self
            .keypair
            .to_pkcs8v1()
            .map_err(|_| Error::Crypto("ECDSA PKCS#8 export failed"))?;
        Ok(doc.as_ref().to_vec())
    }

    pub fn curve(&self) -> EcdsaCurve {
        self.curve
    }

    /// Uncompressed SEC1 encoding of the public point.
    pub fn public_key_sec1(&self) -> Vec<u8> {
        self.keypair.public_key().as_ref().to_vec()
    }

    /// ECDSA signature in ASN.1 DER form (variable length).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let signature = self
            .keypair
            .sign(&rng, message)
            .map_err(|_| Error::Crypto("ECDSA signing failed"))?;
        Ok(signature.as_ref().to_vec())
    }
}

/// Verify an ASN.1 DER signature against an uncompressed SEC1 public point.
pub fn ecdsa_verify(
    curve: EcdsaCurve,
    public_key_sec1: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool> {
    if public_key_sec1.is_empty() {
        return Err(Error::InvalidArgument("empty public key"));
    }
    if signature.is_empty() {
        return Err(Error::format("empty ECDSA signature"));
    }
    let key = UnparsedPublicKey::new(curve.verification(), public_key_sec1);
    Ok(key.verify(message, signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        for curve in [EcdsaCurve::P256, EcdsaCurve::P384] {
            let key = EcdsaPrivateKey::generate(curve).unwrap();
            let signature = key.sign(b"signed payload").unwrap();
            let public = key.public_key_sec1();
            assert!(ecdsa_verify(curve, &public, b"signed payload", &signature).unwrap());
            assert!(!ecdsa_verify(curve, &public, b"other payload", &signature).unwrap());
        }
    }

    #[test]
    fn test_pkcs8_round_trip() {
        let key = EcdsaPrivateKey::generate(EcdsaCurve::P256).unwrap();
        let pkcs8 = key.to_pkcs8().unwrap();
        let restored = EcdsaPrivateKey::from_pkcs8(EcdsaCurve::P256, &pkcs8).unwrap();
        assert_eq!(restored.public_key_sec1(), key.public_key_sec1());
    }

    #[test]
    fn test_bad_inputs() {
        assert!(matches!(
            EcdsaPrivateKey::from_pkcs8(EcdsaCurve::P256, b"not pkcs8"),
            Err(Error::InvalidKey(_))
        ));
        let key = EcdsaPrivateKey::generate(EcdsaCurve::P256).unwrap();
        let public = key.public_key_sec1();
        // Garbage signature fails verification rather than crashing.
        assert!(!ecdsa_verify(EcdsaCurve::P256, &public, b"m", &[0x30, 0x01, 0x00]).unwrap());
        assert!(matches!(
            ecdsa_verify(EcdsaCurve::P256, &public, b"m", &[]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_wrong_curve_rejects() {
        let key = EcdsaPrivateKey::generate(EcdsaCurve::P256).unwrap();
        let signature = key.sign(b"m").unwrap();
        assert!(!ecdsa_verify(EcdsaCurve::P384, &key.public_key_sec1(), b"m", &signature).unwrap());
    }
}
