// RSA signing (PKCS#1 v1.5 and PSS) and encryption (PKCS#1 v1.5 and OAEP).
//
// The padding-check failure on decrypt is surfaced as `BadPadding`, distinct
// from key errors, because callers branch on exactly that condition.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::rsa::{
    KeySize, OAEP_SHA256_MGF1SHA256, OaepPrivateDecryptingKey, OaepPublicEncryptingKey,
    Pkcs1PrivateDecryptingKey, Pkcs1PublicEncryptingKey, PrivateDecryptingKey,
    PublicEncryptingKey,
};
use aws_lc_rs::signature::{
    KeyPair, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_SHA256, RSA_PSS_2048_8192_SHA256,
    RSA_PSS_SHA256, RsaKeyPair, UnparsedPublicKey,
};

use crate::error::{Error, Result};
use crate::util::allocate_vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaKeySize {
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl RsaKeySize {
    fn key_size(&self) -> KeySize {
        match self {
            RsaKeySize::Rsa2048 => KeySize::Rsa2048,
            RsaKeySize::Rsa3072 => KeySize::Rsa3072,
            RsaKeySize::Rsa4096 => KeySize::Rsa4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaSignaturePadding {
    Pkcs1Sha256,
    PssSha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaEncryptionPadding {
    Pkcs1,
    OaepSha256,
}

pub struct RsaSigningKey {
    keypair: RsaKeyPair,
}

impl RsaSigningKey {
    pub fn generate(size: RsaKeySize) -> Result<Self> {
        let keypair = RsaKeyPair::generate(size.key_size())
            .map_err(|_| Error::Crypto("RSA key generation failed"))?;
        Ok(RsaSigningKey { keypair })
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let keypair = RsaKeyPair::from_pkcs8(pkcs8)
            .map_err(|_| Error::InvalidKey("RSA PKCS#8 key rejected"))?;
        Ok(RsaSigningKey { keypair })
    }

    /// DER-encoded RSAPublicKey (PKCS#1).
    pub fn public_key_pkcs1(&self) -> Vec<u8> {
        self.keypair.public_key().as_ref().to_vec()
    }

    /// Signature length in bytes (the modulus length).
    pub fn signature_len(&self) -> usize {
        self.keypair.public_modulus_len()
    }

    pub fn sign(&self, padding: RsaSignaturePadding, message: &[u8]) -> Result<Vec<u8>> {
        let encoding: &'static dyn aws_lc_rs::signature::RsaEncoding = match padding {
            RsaSignaturePadding::Pkcs1Sha256 => &RSA_PKCS1_SHA256,
            RsaSignaturePadding::PssSha256 => &RSA_PSS_SHA256,
        };
        let rng = SystemRandom::new();
        let mut signature = vec![0u8; self.signature_len()];
        self.keypair
            .sign(encoding, &rng, message, &mut signature)
            .map_err(|_| Error::Crypto("RSA signing failed"))?;
        Ok(signature)
    }
}

/// Verify against a DER-encoded RSAPublicKey (PKCS#1).
pub fn rsa_verify(
    padding: RsaSignaturePadding,
    public_key_pkcs1: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool> {
    if public_key_pkcs1.is_empty() {
        return Err(Error::InvalidArgument("empty public key"));
    }
    let algorithm = match padding {
        RsaSignaturePadding::Pkcs1Sha256 => &RSA_PKCS1_2048_8192_SHA256,
        RsaSignaturePadding::PssSha256 => &RSA_PSS_2048_8192_SHA256,
    };
    let key = UnparsedPublicKey::new(algorithm, public_key_pkcs1);
    Ok(key.verify(message, signature).is_ok())
}

pub struct RsaDecryptionKey {
    key: PrivateDecryptingKey,
}

impl RsaDecryptionKey {
    pub fn generate(size: RsaKeySize) -> Result<Self> {
        let key = PrivateDecryptingKey::generate(size.key_size())
            .map_err(|_| Error::Crypto("RSA key generation failed"))?;
        Ok(RsaDecryptionKey { key })
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let key = PrivateDecryptingKey::from_pkcs8(pkcs8)
            .map_err(|_| Error::InvalidKey("RSA PKCS#8 key rejected"))?;
        Ok(RsaDecryptionKey { key })
    }

    pub fn public_key(&self) -> PublicEncryptingKey {
        self.key.public_key()
    }

    pub fn key_len(&self) -> usize {
        self.key.key_size_bytes()
    }

    /// Decrypt; a padding-check failure is `BadPadding`.
    pub fn decrypt(&self, padding: RsaEncryptionPadding, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() != self.key_len() {
            return Err(Error::format("RSA ciphertext length mismatch"));
        }
        let mut output = allocate_vec(self.key_len());
        let plaintext_len = match padding {
            RsaEncryptionPadding::Pkcs1 => {
                let key = Pkcs1PrivateDecryptingKey::new(self.key.clone())
                    .map_err(|_| Error::InvalidKey("RSA key unusable for PKCS#1"))?;
                key.decrypt(ciphertext, &mut output)
                    .map_err(|_| Error::BadPadding)?
                    .len()
            }
            RsaEncryptionPadding::OaepSha256 => {
                let key = OaepPrivateDecryptingKey::new(self.key.clone())
                    .map_err(|_| Error::InvalidKey("RSA key unusable for OAEP"))?;
                key.decrypt(&OAEP_SHA256_MGF1SHA256, ciphertext, &mut output, None)
                    .map_err(|_| Error::BadPadding)?
                    .len()
            }
        };
        output.truncate(plaintext_len);
        Ok(output)
    }
}

/// Encrypt to an RSA public key.
pub fn rsa_encrypt(
    padding: RsaEncryptionPadding,
    public_key: &PublicEncryptingKey,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    match padding {
        RsaEncryptionPadding::Pkcs1 => {
            let key = Pkcs1PublicEncryptingKey::new(public_key.clone())
                .map_err(|_| Error::InvalidKey("RSA key unusable for PKCS#1"))?;
            let mut output = allocate_vec(key.ciphertext_size());
            let len = key
                .encrypt(plaintext, &mut output)
                .map_err(|_| Error::OutOfBounds("plaintext too long for RSA modulus"))?
                .len();
            output.truncate(len);
            Ok(output)
        }
        RsaEncryptionPadding::OaepSha256 => {
            let key = OaepPublicEncryptingKey::new(public_key.clone())
                .map_err(|_| Error::InvalidKey("RSA key unusable for OAEP"))?;
            let mut output = allocate_vec(key.ciphertext_size());
            let len = key
                .encrypt(&OAEP_SHA256_MGF1SHA256, plaintext, &mut output, None)
                .map_err(|_| Error::OutOfBounds("plaintext too long for RSA modulus"))?
                .len();
            output.truncate(len);
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_both_paddings() {
        let key = RsaSigningKey::generate(RsaKeySize::Rsa2048).unwrap();
        let public = key.public_key_pkcs1();
        for padding in [RsaSignaturePadding::Pkcs1Sha256, RsaSignaturePadding::PssSha256] {
            let signature = key.sign(padding, b"message").unwrap();
            assert_eq!(signature.len(), key.signature_len());
            assert!(rsa_verify(padding, &public, b"message", &signature).unwrap());
            assert!(!rsa_verify(padding, &public, b"other", &signature).unwrap());
        }
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = RsaDecryptionKey::generate(RsaKeySize::Rsa2048).unwrap();
        let public = key.public_key();
        for padding in [RsaEncryptionPadding::Pkcs1, RsaEncryptionPadding::OaepSha256] {
            let ciphertext = rsa_encrypt(padding, &public, b"secret").unwrap();
            assert_eq!(ciphertext.len(), key.key_len());
            assert_eq!(key.decrypt(padding, &ciphertext).unwrap(), b"secret");
        }
    }

    #[test]
    fn test_bad_padding_distinguished() {
        let key = RsaDecryptionKey::generate(RsaKeySize::Rsa2048).unwrap();
        // OAEP ciphertext fed to the PKCS#1 decrypt path: right length, wrong
        // padding. Must be BadPadding, not a generic failure.
        let ciphertext =
            rsa_encrypt(RsaEncryptionPadding::OaepSha256, &key.public_key(), b"x").unwrap();
        assert!(matches!(
            key.decrypt(RsaEncryptionPadding::Pkcs1, &ciphertext),
            Err(Error::BadPadding)
        ));
        // Wrong-length ciphertext is a format error, checked before decrypt.
        assert!(matches!(
            key.decrypt(RsaEncryptionPadding::Pkcs1, &[0u8; 13]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_invalid_pkcs8_rejected() {
        assert!(matches!(
            RsaSigningKey::from_pkcs8(b"garbage"),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            RsaDecryptionKey::from_pkcs8(b"garbage"),
            Err(Error::InvalidKey(_))
        ));
    }
}
