use crate::error::{Error, Result};

#[inline]
pub fn allocate_vec(len: usize) -> Vec<u8> {
    vec![0u8; len]
}

/// Decode a hex fingerprint string, ignoring colons and whitespace.
pub(crate) fn decode_hex_fingerprint(fingerprint: &str) -> Result<Vec<u8>> {
    let clean = fingerprint.replace(':', "").replace(' ', "");

    if clean.is_empty() {
        return Err(Error::InvalidArgument("empty fingerprint"));
    }
    if clean.len() % 2 != 0 {
        return Err(Error::format(format!(
            "fingerprint has an odd number of hex chars: {fingerprint}"
        )));
    }

    (0..clean.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&clean[i..i + 2], 16))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|_| Error::format(format!("fingerprint is not valid hex: {fingerprint}")))
}
