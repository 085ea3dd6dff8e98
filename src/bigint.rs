// Two's-complement big-integer codec.
//
// RSA/EC parameters cross this crate's boundary as two's-complement big-endian
// byte arrays (the empty array encodes zero). This module converts between that
// encoding and a sign/magnitude representation without pulling in arbitrary-
// precision arithmetic, which nothing here needs.
//
// Invariant: for every minimal encoding, decode-then-encode reproduces the
// input bytes exactly, including sign byte conventions. Non-minimal encodings
// (redundant leading 0x00 or 0xFF bytes) normalize to the minimal form.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

/// Sign/magnitude big integer. The magnitude is big-endian with no leading
/// zero bytes, and is empty exactly when the sign is `Zero`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigInt {
    sign: Sign,
    magnitude: Vec<u8>,
}

impl BigInt {
    pub fn zero() -> Self {
        BigInt {
            sign: Sign::Zero,
            magnitude: Vec::new(),
        }
    }

    /// Decode a two's-complement big-endian byte array. The empty array is zero.
    pub fn from_twos_complement(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return BigInt::zero();
        }
        if bytes[0] < 0x80 {
            // Non-negative.
            let magnitude = strip_leading_zeros(bytes);
            if magnitude.is_empty() {
                BigInt::zero()
            } else {
                BigInt {
                    sign: Sign::Positive,
                    magnitude,
                }
            }
        } else {
            // Negative: magnitude is 2^(8n) - value.
            let magnitude = strip_leading_zeros(&negate(bytes));
            BigInt {
                sign: Sign::Negative,
                magnitude,
            }
        }
    }

    /// Interpret a big-endian byte array as an unsigned (non-negative) integer.
    pub fn from_unsigned_be(bytes: &[u8]) -> Self {
        let magnitude = strip_leading_zeros(bytes);
        if magnitude.is_empty() {
            BigInt::zero()
        } else {
            BigInt {
                sign: Sign::Positive,
                magnitude,
            }
        }
    }

    /// Minimal two's-complement big-endian encoding. Zero is the empty array.
    pub fn to_twos_complement(&self) -> Vec<u8> {
        match self.sign {
            Sign::Zero => Vec::new(),
            Sign::Positive => {
                let mut out = Vec::with_capacity(self.magnitude.len() + 1);
                if self.magnitude[0] >= 0x80 {
                    out.push(0x00);
                }
                out.extend_from_slice(&self.magnitude);
                out
            }
            Sign::Negative => {
                // -m fits in w bytes iff m <= 2^(8w - 1).
                let fits = self.magnitude[0] < 0x80
                    || (self.magnitude[0] == 0x80 && self.magnitude[1..].iter().all(|&b| b == 0));
                let width = if fits {
                    self.magnitude.len()
                } else {
                    self.magnitude.len() + 1
                };
                let mut padded = vec![0u8; width];
                padded[width - self.magnitude.len()..].copy_from_slice(&self.magnitude);
                negate(&padded)
            }
        }
    }

    /// Big-endian magnitude with no leading zeros; empty for zero.
    pub fn to_unsigned_be(&self) -> Vec<u8> {
        self.magnitude.clone()
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    pub fn is_zero(&self) -> bool {
        self.sign == Sign::Zero
    }

    /// Number of bits in the magnitude (0 for zero).
    pub fn bit_len(&self) -> usize {
        match self.magnitude.first() {
            None => 0,
            Some(&first) => (self.magnitude.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        }
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// Two's-complement negation over a fixed width: 2^(8n) - value.
fn negate(bytes: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = bytes.iter().map(|&b| !b).collect();
    for byte in out.iter_mut().rev() {
        let (v, overflow) = byte.overflowing_add(1);
        *byte = v;
        if !overflow {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(bytes: &[u8]) {
        let n = BigInt::from_twos_complement(bytes);
        assert_eq!(n.to_twos_complement(), bytes, "round trip of {bytes:02x?}");
    }

    #[test]
    fn test_zero_is_empty_array() {
        let zero = BigInt::from_twos_complement(&[]);
        assert!(zero.is_zero());
        assert_eq!(zero.to_twos_complement(), Vec::<u8>::new());
        assert_eq!(zero.bit_len(), 0);
    }

    #[test]
    fn test_minimal_encodings_round_trip() {
        round_trip(&[]);
        round_trip(&[0x01]);
        round_trip(&[0x7f]);
        round_trip(&[0x00, 0x80]); // 128 needs a sign byte
        round_trip(&[0x00, 0xff]); // 255
        round_trip(&[0x01, 0x00]); // 256
        round_trip(&[0xff]); // -1
        round_trip(&[0x80]); // -128
        round_trip(&[0xff, 0x7f]); // -129
        round_trip(&[0xff, 0x00]); // -256
        round_trip(&[0x80, 0x00]); // -32768
        round_trip(&[0x02, 0xca, 0xfe, 0xba, 0xbe]);
    }

    #[test]
    fn test_non_minimal_normalizes() {
        assert_eq!(
            BigInt::from_twos_complement(&[0x00, 0x00, 0x7f]).to_twos_complement(),
            vec![0x7f]
        );
        assert_eq!(
            BigInt::from_twos_complement(&[0xff, 0xff, 0x80]).to_twos_complement(),
            vec![0x80]
        );
        assert!(BigInt::from_twos_complement(&[0x00, 0x00]).is_zero());
    }

    #[test]
    fn test_signs() {
        assert_eq!(BigInt::from_twos_complement(&[0x01]).sign(), Sign::Positive);
        assert_eq!(BigInt::from_twos_complement(&[0xff]).sign(), Sign::Negative);
        assert_eq!(BigInt::from_twos_complement(&[0x00]).sign(), Sign::Zero);
    }

    #[test]
    fn test_negative_magnitude() {
        // -129 == ff 7f; magnitude 129 == 0x81.
        let n = BigInt::from_twos_complement(&[0xff, 0x7f]);
        assert_eq!(n.magnitude(), &[0x81]);
        // -256 == ff 00; magnitude 256 == 0x01 0x00.
        let n = BigInt::from_twos_complement(&[0xff, 0x00]);
        assert_eq!(n.magnitude(), &[0x01, 0x00]);
    }

    #[test]
    fn test_unsigned_round_trip() {
        let n = BigInt::from_unsigned_be(&[0x00, 0x80, 0x01]);
        assert_eq!(n.to_unsigned_be(), vec![0x80, 0x01]);
        assert_eq!(n.sign(), Sign::Positive);
        assert_eq!(n.to_twos_complement(), vec![0x00, 0x80, 0x01]);
        assert_eq!(n.bit_len(), 16);
    }
}
