// HPKE (RFC 9180) seal/open over the rustls aws-lc-rs provider suites.
//
// Suite selection maps onto the provider's named suite statics, so only
// combinations the provider actually implements can be constructed. The
// provider pairs each KEM with the KDF of its own hash; any other KDF
// pairing is unsupported.

use rustls::crypto::aws_lc_rs::hpke as suites;
use rustls::crypto::hpke::{
    EncapsulatedSecret, Hpke as RustlsHpke, HpkeOpener, HpkePrivateKey, HpkePublicKey, HpkeSealer,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpkeKemAlgorithm {
    DhKemP256HkdfSha256,
    DhKemP384HkdfSha384,
    DhKemP521HkdfSha512,
    DhKemX25519HkdfSha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpkeKdfAlgorithm {
    HkdfSha256,
    HkdfSha384,
    HkdfSha512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpkeAeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// One HPKE cipher suite, base mode.
pub struct Hpke {
    suite: &'static dyn RustlsHpke,
}

impl Hpke {
    /// Look up a suite among the provider's supported combinations.
    pub fn new(
        kem: HpkeKemAlgorithm,
        kdf: HpkeKdfAlgorithm,
        aead: HpkeAeadAlgorithm,
    ) -> Result<Self> {
        use HpkeAeadAlgorithm::{Aes128Gcm, Aes256Gcm, ChaCha20Poly1305};
        use HpkeKdfAlgorithm::{HkdfSha256, HkdfSha384, HkdfSha512};
        use HpkeKemAlgorithm::{
            DhKemP256HkdfSha256, DhKemP384HkdfSha384, DhKemP521HkdfSha512, DhKemX25519HkdfSha256,
        };

        let suite: &'static dyn RustlsHpke = match (kem, kdf, aead) {
            (DhKemP256HkdfSha256, HkdfSha256, Aes128Gcm) => {
                suites::DH_KEM_P256_HKDF_SHA256_AES_128
            }
            (DhKemP256HkdfSha256, HkdfSha256, Aes256Gcm) => {
                suites::DH_KEM_P256_HKDF_SHA256_AES_256
            }
            (DhKemP256HkdfSha256, HkdfSha256, ChaCha20Poly1305) => {
                suites::DH_KEM_P256_HKDF_SHA256_CHACHA20_POLY1305
            }
            (DhKemP384HkdfSha384, HkdfSha384, Aes128Gcm) => {
                suites::DH_KEM_P384_HKDF_SHA384_AES_128
            }
            (DhKemP384HkdfSha384, HkdfSha384, Aes256Gcm) => {
                suites::DH_KEM_P384_HKDF_SHA384_AES_256
            }
            (DhKemP384HkdfSha384, HkdfSha384, ChaCha20Poly1305) => {
                suites::DH_KEM_P384_HKDF_SHA384_CHACHA20_POLY1305
            }
            (DhKemP521HkdfSha512, HkdfSha512, Aes128Gcm) => {
                suites::DH_KEM_P521_HKDF_SHA512_AES_128
            }
            (DhKemP521HkdfSha512, HkdfSha512, Aes256Gcm) => {
                suites::DH_KEM_P521_HKDF_SHA512_AES_256
            }
            (DhKemP521HkdfSha512, HkdfSha512, ChaCha20Poly1305) => {
                suites::DH_KEM_P521_HKDF_SHA512_CHACHA20_POLY1305
            }
            (DhKemX25519HkdfSha256, HkdfSha256, Aes128Gcm) => {
                suites::DH_KEM_X25519_HKDF_SHA256_AES_128
            }
            (DhKemX25519HkdfSha256, HkdfSha256, Aes256Gcm) => {
                suites::DH_KEM_X25519_HKDF_SHA256_AES_256
            }
            (DhKemX25519HkdfSha256, HkdfSha256, ChaCha20Poly1305) => {
                suites::DH_KEM_X25519_HKDF_SHA256_CHACHA20_POLY1305
            }
            _ => return Err(Error::InvalidArgument("unsupported HPKE suite")),
        };
        Ok(Hpke { suite })
    }

    /// Generate a recipient key pair, returned as raw encodings.
    pub fn generate_key_pair(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let (public_key, private_key) = self
            .suite
            .generate_key_pair()
            .map_err(|_| Error::Crypto("HPKE key generation failed"))?;
        Ok((public_key.0, private_key.secret_bytes().to_vec()))
    }

    /// One-shot seal: returns the encapsulated secret and ciphertext.
    pub fn seal(
        &self,
        recipient_public_key: &[u8],
        info: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let public_key = HpkePublicKey(recipient_public_key.to_vec());
        let (enc, ciphertext) = self
            .suite
            .seal(info, aad, plaintext, &public_key)
            .map_err(|_| Error::Crypto("HPKE seal failed"))?;
        Ok((enc.0, ciphertext))
    }

    /// One-shot open.
    pub fn open(
        &self,
        enc: &[u8],
        private_key: &[u8],
        info: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        if enc.is_empty() {
            return Err(Error::format("empty HPKE encapsulated key"));
        }
        let enc = EncapsulatedSecret(enc.to_vec());
        let private_key = HpkePrivateKey::from(private_key.to_vec());
        self.suite
            .open(&enc, info, aad, ciphertext, &private_key)
            .map_err(|_| Error::Crypto("HPKE open failed"))
    }

    /// Streaming sender context; messages are sealed in sequence.
    pub fn setup_sender(
        &self,
        recipient_public_key: &[u8],
        info: &[u8],
    ) -> Result<(Vec<u8>, HpkeSenderContext)> {
        let public_key = HpkePublicKey(recipient_public_key.to_vec());
        let (enc, sealer) = self
            .suite
            .setup_sealer(info, &public_key)
            .map_err(|_| Error::Crypto("HPKE sender setup failed"))?;
        Ok((enc.0, HpkeSenderContext { sealer }))
    }

    /// Streaming recipient context matching `setup_sender`.
    pub fn setup_recipient(
        &self,
        enc: &[u8],
        private_key: &[u8],
        info: &[u8],
    ) -> Result<HpkeRecipientContext> {
        if enc.is_empty() {
            return Err(Error::format("empty HPKE encapsulated key"));
        }
        let enc = EncapsulatedSecret(enc.to_vec());
        let private_key = HpkePrivateKey::from(private_key.to_vec());
        let opener = self
            .suite
            .setup_opener(&enc, info, &private_key)
            .map_err(|_| Error::Crypto("HPKE recipient setup failed"))?;
        Ok(HpkeRecipientContext { opener })
    }
}

pub struct HpkeSenderContext {
    sealer: Box<dyn HpkeSealer>,
}

impl HpkeSenderContext {
    pub fn seal(&mut self, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.sealer
            .seal(aad, plaintext)
            .map_err(|_| Error::Crypto("HPKE seal failed"))
    }
}

pub struct HpkeRecipientContext {
    opener: Box<dyn HpkeOpener>,
}

impl HpkeRecipientContext {
    pub fn open(&mut self, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.opener
            .open(aad, ciphertext)
            .map_err(|_| Error::Crypto("HPKE open failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x25519_suite() -> Hpke {
        Hpke::new(
            HpkeKemAlgorithm::DhKemX25519HkdfSha256,
            HpkeKdfAlgorithm::HkdfSha256,
            HpkeAeadAlgorithm::Aes128Gcm,
        )
        .unwrap()
    }

    #[test]
    fn test_one_shot_round_trip() {
        let hpke = x25519_suite();
        let (public_key, private_key) = hpke.generate_key_pair().unwrap();
        assert!(!public_key.is_empty());

        let (enc, ciphertext) = hpke.seal(&public_key, b"info", b"aad", b"hello hpke").unwrap();
        let plaintext = hpke
            .open(&enc, &private_key, b"info", b"aad", &ciphertext)
            .unwrap();
        assert_eq!(plaintext, b"hello hpke");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let hpke = x25519_suite();
        let (public_key, private_key) = hpke.generate_key_pair().unwrap();
        let (enc, ciphertext) = hpke.seal(&public_key, b"info", b"aad", b"msg").unwrap();
        assert!(matches!(
            hpke.open(&enc, &private_key, b"info", b"other", &ciphertext),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_streaming_contexts_sequence() {
        let hpke = x25519_suite();
        let (public_key, private_key) = hpke.generate_key_pair().unwrap();

        let (enc, mut sender) = hpke.setup_sender(&public_key, b"info").unwrap();
        let mut recipient = hpke.setup_recipient(&enc, &private_key, b"info").unwrap();

        for i in 0..3u8 {
            let message = vec![i; 16];
            let ciphertext = sender.seal(b"", &message).unwrap();
            assert_eq!(recipient.open(b"", &ciphertext).unwrap(), message);
        }
    }

    #[test]
    fn test_malformed_enc_rejected() {
        let hpke = x25519_suite();
        let (_, private_key) = hpke.generate_key_pair().unwrap();
        assert!(matches!(
            hpke.open(&[], &private_key, b"", b"", b""),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_all_provider_suites_construct() {
        let kems = [
            (HpkeKemAlgorithm::DhKemP256HkdfSha256, HpkeKdfAlgorithm::HkdfSha256),
            (HpkeKemAlgorithm::DhKemP384HkdfSha384, HpkeKdfAlgorithm::HkdfSha384),
            (HpkeKemAlgorithm::DhKemP521HkdfSha512, HpkeKdfAlgorithm::HkdfSha512),
            (HpkeKemAlgorithm::DhKemX25519HkdfSha256, HpkeKdfAlgorithm::HkdfSha256),
        ];
        let aeads = [
            HpkeAeadAlgorithm::Aes128Gcm,
            HpkeAeadAlgorithm::Aes256Gcm,
            HpkeAeadAlgorithm::ChaCha20Poly1305,
        ];
        for (kem, kdf) in kems {
            for aead in aeads {
                let hpke = Hpke::new(kem, kdf, aead).unwrap();
                let (public_key, private_key) = hpke.generate_key_pair().unwrap();
                let (enc, ciphertext) = hpke.seal(&public_key, b"i", b"a", b"m").unwrap();
                assert_eq!(hpke.open(&enc, &private_key, b"i", b"a", &ciphertext).unwrap(), b"m");
            }
        }
    }

    #[test]
    fn test_mismatched_kdf_rejected() {
        // Each KEM only pairs with the KDF of its own hash.
        assert!(matches!(
            Hpke::new(
                HpkeKemAlgorithm::DhKemP521HkdfSha512,
                HpkeKdfAlgorithm::HkdfSha256,
                HpkeAeadAlgorithm::ChaCha20Poly1305,
            ),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Hpke::new(
                HpkeKemAlgorithm::DhKemX25519HkdfSha256,
                HpkeKdfAlgorithm::HkdfSha512,
                HpkeAeadAlgorithm::Aes128Gcm,
            ),
            Err(Error::InvalidArgument(_))
        ));
    }
}
