// Incremental HMAC and CMAC contexts.
//
// HMAC rides on aws-lc-rs; CMAC uses the RustCrypto cmac/aes pair since
// aws-lc-rs does not expose a CMAC API. Both contexts reset on finish so a
// context can be reused for multiple messages with the same key.

use aws_lc_rs::hmac;
use cmac::{Cmac, Mac};
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HmacAlgorithm {
    fn algorithm(&self) -> hmac::Algorithm {
        match self {
            HmacAlgorithm::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            HmacAlgorithm::Sha256 => hmac::HMAC_SHA256,
            HmacAlgorithm::Sha384 => hmac::HMAC_SHA384,
            HmacAlgorithm::Sha512 => hmac::HMAC_SHA512,
        }
    }

    pub fn tag_len(&self) -> usize {
        match self {
            HmacAlgorithm::Sha1 => 20,
            HmacAlgorithm::Sha256 => 32,
            HmacAlgorithm::Sha384 => 48,
            HmacAlgorithm::Sha512 => 64,
        }
    }
}

pub struct HmacContext {
    key: hmac::Key,
    ctx: hmac::Context,
    tag_len: usize,
}

impl HmacContext {
    pub fn new(algorithm: HmacAlgorithm, key: &[u8]) -> Self {
        let key = hmac::Key::new(algorithm.algorithm(), key);
        let ctx = hmac::Context::with_key(&key);
        HmacContext {
            key,
            ctx,
            tag_len: algorithm.tag_len(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.ctx.update(data);
    }

    /// Produce the tag and reset the context for the next message.
    pub fn finish(&mut self) -> Vec<u8> {
        let ctx = std::mem::replace(&mut self.ctx, hmac::Context::with_key(&self.key));
        ctx.sign().as_ref().to_vec()
    }

    pub fn tag_len(&self) -> usize {
        self.tag_len
    }
}

/// One-shot HMAC.
pub fn hmac_sign(algorithm: HmacAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(algorithm.algorithm(), key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Constant-time HMAC verification.
pub fn hmac_verify(algorithm: HmacAlgorithm, key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let key = hmac::Key::new(algorithm.algorithm(), key);
    hmac::verify(&key, data, tag).is_ok()
}

pub const CMAC_TAG_LEN: usize = 16;

enum CmacInner {
    Aes128(Cmac<aes::Aes128>),
    Aes256(Cmac<aes::Aes256>),
}

/// AES-CMAC (RFC 4493). The AES variant is chosen by key length.
pub struct CmacContext {
    inner: CmacInner,
}

impl CmacContext {
    pub fn new(key: &[u8]) -> Result<Self> {
        let inner = match key.len() {
            16 => CmacInner::Aes128(
                Cmac::new_from_slice(key).map_err(|_| Error::InvalidKey("CMAC key rejected"))?,
            ),
            32 => CmacInner::Aes256(
                Cmac::new_from_slice(key).map_err(|_| Error::InvalidKey("CMAC key rejected"))?,
            ),
            _ => return Err(Error::InvalidKey("CMAC key must be 16 or 32 bytes")),
        };
        Ok(CmacContext { inner })
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            CmacInner::Aes128(mac) => mac.update(data),
            CmacInner::Aes256(mac) => mac.update(data),
        }
    }

    /// Produce the 16-byte tag and reset the context.
    pub fn finish(&mut self) -> Vec<u8> {
        match &mut self.inner {
            CmacInner::Aes128(mac) => mac.finalize_reset().into_bytes().to_vec(),
            CmacInner::Aes256(mac) => mac.finalize_reset().into_bytes().to_vec(),
        }
    }

    pub fn tag_len(&self) -> usize {
        CMAC_TAG_LEN
    }
}

/// One-shot AES-CMAC.
pub fn cmac_sign(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut ctx = CmacContext::new(key)?;
    ctx.update(data);
    Ok(ctx.finish())
}

/// Constant-time AES-CMAC verification.
pub fn cmac_verify(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    let computed = cmac_sign(key, data)?;
    Ok(computed.ct_eq(tag).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::decode_hex_fingerprint as hex;

    #[test]
    fn test_hmac_sha256_rfc4231_case_1() {
        let key = [0x0b; 20];
        let expected =
            hex("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7").unwrap();
        assert_eq!(hmac_sign(HmacAlgorithm::Sha256, &key, b"Hi There"), expected);
        assert!(hmac_verify(
            HmacAlgorithm::Sha256,
            &key,
            b"Hi There",
            &expected
        ));
        assert!(!hmac_verify(HmacAlgorithm::Sha256, &key, b"Hi Theri", &expected));
    }

    #[test]
    fn test_hmac_context_incremental_and_reset() {
        let mut ctx = HmacContext::new(HmacAlgorithm::Sha256, b"key");
        ctx.update(b"Hi ");
        ctx.update(b"There");
        let first = ctx.finish();
        assert_eq!(first, hmac_sign(HmacAlgorithm::Sha256, b"key", b"Hi There"));
        assert_eq!(first.len(), ctx.tag_len());

        // Context reuses cleanly after finish.
        ctx.update(b"again");
        assert_eq!(ctx.finish(), hmac_sign(HmacAlgorithm::Sha256, b"key", b"again"));
    }

    #[test]
    fn test_cmac_aes128_nist_vectors() {
        let key = hex("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        assert_eq!(
            cmac_sign(&key, b"").unwrap(),
            hex("bb1d6929e95937287fa37d129b756746").unwrap()
        );
        let msg = hex("6bc1bee22e409f96e93d7e117393172a").unwrap();
        assert_eq!(
            cmac_sign(&key, &msg).unwrap(),
            hex("070a16b46b4d4144f79bdd9dd04a287c").unwrap()
        );
    }

    #[test]
    fn test_cmac_key_length_enforced() {
        assert!(matches!(
            CmacContext::new(&[0u8; 24]),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_cmac_verify_constant_time() {
        let key = [0x11; 16];
        let tag = cmac_sign(&key, b"data").unwrap();
        assert!(cmac_verify(&key, b"data", &tag).unwrap());
        assert!(!cmac_verify(&key, b"data", &tag[..15]).unwrap());
    }
}
