// HKDF extract and expand (RFC 5869).

use aws_lc_rs::{hkdf, hmac};

use crate::error::{Error, Result};
use crate::util::allocate_vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HkdfAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HkdfAlgorithm {
    fn hkdf(&self) -> hkdf::Algorithm {
        match self {
            HkdfAlgorithm::Sha1 => hkdf::HKDF_SHA1_FOR_LEGACY_USE_ONLY,
            HkdfAlgorithm::Sha256 => hkdf::HKDF_SHA256,
            HkdfAlgorithm::Sha384 => hkdf::HKDF_SHA384,
            HkdfAlgorithm::Sha512 => hkdf::HKDF_SHA512,
        }
    }

    fn hmac(&self) -> hmac::Algorithm {
        match self {
            HkdfAlgorithm::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            HkdfAlgorithm::Sha256 => hmac::HMAC_SHA256,
            HkdfAlgorithm::Sha384 => hmac::HMAC_SHA384,
            HkdfAlgorithm::Sha512 => hmac::HMAC_SHA512,
        }
    }

    pub fn hash_len(&self) -> usize {
        match self {
            HkdfAlgorithm::Sha1 => 20,
            HkdfAlgorithm::Sha256 => 32,
            HkdfAlgorithm::Sha384 => 48,
            HkdfAlgorithm::Sha512 => 64,
        }
    }
}

struct SliceKeyType(usize);

impl hkdf::KeyType for SliceKeyType {
    fn len(&self) -> usize {
        self.0
    }
}

/// HKDF-Extract: returns the pseudorandom key (one HMAC block).
pub fn extract(algorithm: HkdfAlgorithm, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(algorithm.hmac(), salt);
    hmac::sign(&key, ikm).as_ref().to_vec()
}

/// HKDF-Expand from an existing pseudorandom key.
pub fn expand(
    algorithm: HkdfAlgorithm,
    prk: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Vec<u8>> {
    check_out_len(algorithm, out_len)?;
    let prk = hkdf::Prk::new_less_safe(algorithm.hkdf(), prk);
    let mut out = allocate_vec(out_len);
    prk.expand(&[info], SliceKeyType(out_len))
        .map_err(|_| Error::Crypto("HKDF expand failed"))?
        .fill(&mut out)
        .map_err(|_| Error::Crypto("HKDF fill failed"))?;
    Ok(out)
}

/// HKDF-Extract followed by HKDF-Expand.
pub fn extract_and_expand(
    algorithm: HkdfAlgorithm,
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Vec<u8>> {
    check_out_len(algorithm, out_len)?;
    let mut out = allocate_vec(out_len);
    hkdf::Salt::new(algorithm.hkdf(), salt)
        .extract(ikm)
        .expand(&[info], SliceKeyType(out_len))
        .map_err(|_| Error::Crypto("HKDF expand failed"))?
        .fill(&mut out)
        .map_err(|_| Error::Crypto("HKDF fill failed"))?;
    Ok(out)
}

fn check_out_len(algorithm: HkdfAlgorithm, out_len: usize) -> Result<()> {
    if out_len == 0 {
        return Err(Error::InvalidArgument("zero-length HKDF output"));
    }
    if out_len > 255 * algorithm.hash_len() {
        return Err(Error::OutOfBounds("HKDF output longer than 255 blocks"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::decode_hex_fingerprint as hex;

    #[test]
    fn test_rfc5869_case_1() {
        let ikm = [0x0b; 22];
        let salt = hex("000102030405060708090a0b0c").unwrap();
        let info = hex("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let expected = hex(
            "3cb25f25faacd57a90434f64d0362f2a\
             2d2d0a90cf1a5a4c5db02d56ecc4c5bf\
             34007208d5b887185865",
        )
        .unwrap();

        let okm = extract_and_expand(HkdfAlgorithm::Sha256, &salt, &ikm, &info, 42).unwrap();
        assert_eq!(okm, expected);

        // The same answer via separate extract and expand.
        let prk = extract(HkdfAlgorithm::Sha256, &salt, &ikm);
        assert_eq!(
            prk,
            hex("077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5").unwrap()
        );
        let okm = expand(HkdfAlgorithm::Sha256, &prk, &info, 42).unwrap();
        assert_eq!(okm, expected);
    }

    #[test]
    fn test_output_length_bounds() {
        assert!(matches!(
            extract_and_expand(HkdfAlgorithm::Sha256, b"s", b"k", b"", 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            extract_and_expand(HkdfAlgorithm::Sha256, b"s", b"k", b"", 255 * 32 + 1),
            Err(Error::OutOfBounds(_))
        ));
        assert!(extract_and_expand(HkdfAlgorithm::Sha256, b"s", b"k", b"", 255 * 32).is_ok());
    }
}
