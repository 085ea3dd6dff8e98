// Minimal DER cursor API.
//
// A borrowing reader and an owned writer over the subset of DER this crate's
// callers need: SEQUENCE, context/application tagged elements, INTEGER, NULL,
// OBJECT IDENTIFIER, and OCTET STRING. Definite lengths only; indefinite and
// non-minimal lengths are rejected as malformed, as are high-tag-number forms.

use crate::error::{Error, Result};

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

/// Borrowing cursor over a DER-encoded byte slice.
///
/// Reads consume elements left to right; nested structures hand out a child
/// reader over the element contents.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Tag byte of the next element without consuming it.
    pub fn peek_tag(&self) -> Result<u8> {
        match self.data.first() {
            Some(&tag) => Ok(tag),
            None => Err(Error::format("peek on empty reader")),
        }
    }

    /// True if another element is present and carries `tag`.
    pub fn next_tag_is(&self, tag: u8) -> bool {
        self.data.first() == Some(&tag)
    }

    fn read_element(&mut self, expected: u8) -> Result<&'a [u8]> {
        let (tag, contents, rest) = split_element(self.data)?;
        if tag != expected {
            return Err(Error::format(format!(
                "expected tag 0x{expected:02x}, found 0x{tag:02x}"
            )));
        }
        self.data = rest;
        Ok(contents)
    }

    /// Consume a SEQUENCE and return a reader over its contents.
    pub fn read_sequence(&mut self) -> Result<Reader<'a>> {
        Ok(Reader::new(self.read_element(TAG_SEQUENCE)?))
    }

    /// Consume an element with the given tag and return its raw contents.
    pub fn read_tagged(&mut self, tag: u8) -> Result<&'a [u8]> {
        self.read_element(tag)
    }

    /// Like `read_tagged`, but absence of the tag is not an error.
    pub fn read_optional_tagged(&mut self, tag: u8) -> Result<Option<&'a [u8]>> {
        if self.next_tag_is(tag) {
            Ok(Some(self.read_element(tag)?))
        } else {
            Ok(None)
        }
    }

    /// Consume an INTEGER that fits in a u64. Negative values are malformed
    /// here; values over 64 bits are out of bounds.
    pub fn read_uint64(&mut self) -> Result<u64> {
        let contents = self.read_integer_bytes()?;
        if contents[0] >= 0x80 {
            return Err(Error::format("negative INTEGER where unsigned expected"));
        }
        let magnitude = if contents[0] == 0x00 {
            &contents[1..]
        } else {
            contents
        };
        if magnitude.len() > 8 {
            return Err(Error::OutOfBounds("INTEGER does not fit in u64"));
        }
        let mut value = 0u64;
        for &b in magnitude {
            value = (value << 8) | b as u64;
        }
        Ok(value)
    }

    /// Consume an INTEGER and return its two's-complement contents unparsed.
    pub fn read_integer_bytes(&mut self) -> Result<&'a [u8]> {
        let contents = self.read_element(TAG_INTEGER)?;
        if contents.is_empty() {
            return Err(Error::format("empty INTEGER"));
        }
        // DER: the first nine bits may not all be equal.
        if contents.len() > 1 {
            let redundant = (contents[0] == 0x00 && contents[1] < 0x80)
                || (contents[0] == 0xff && contents[1] >= 0x80);
            if redundant {
                return Err(Error::format("non-minimal INTEGER"));
            }
        }
        Ok(contents)
    }

    pub fn read_null(&mut self) -> Result<()> {
        let contents = self.read_element(TAG_NULL)?;
        if !contents.is_empty() {
            return Err(Error::format("NULL with nonempty contents"));
        }
        Ok(())
    }

    /// Consume an OBJECT IDENTIFIER and return it in dotted-decimal form.
    pub fn read_oid(&mut self) -> Result<String> {
        let contents = self.read_element(TAG_OID)?;
        if contents.is_empty() {
            return Err(Error::format("empty OBJECT IDENTIFIER"));
        }

        let mut components: Vec<u64> = Vec::new();
        let mut value: u64 = 0;
        let mut in_subid = false;
        for (i, &b) in contents.iter().enumerate() {
            if !in_subid && b == 0x80 {
                return Err(Error::format("non-minimal OID subidentifier"));
            }
            in_subid = true;
            value = value
                .checked_mul(128)
                .and_then(|v| v.checked_add((b & 0x7f) as u64))
                .ok_or_else(|| Error::format("OID subidentifier overflow"))?;
            if b & 0x80 == 0 {
                if components.is_empty() {
                    // The first subidentifier packs the first two components.
                    let (first, second) = if value < 40 {
                        (0, value)
                    } else if value < 80 {
                        (1, value - 40)
                    } else {
                        (2, value - 80)
                    };
                    components.push(first);
                    components.push(second);
                } else {
                    components.push(value);
                }
                value = 0;
                in_subid = false;
            } else if i == contents.len() - 1 {
                return Err(Error::format("truncated OID subidentifier"));
            }
        }

        let parts: Vec<String> = components.iter().map(|c| c.to_string()).collect();
        Ok(parts.join("."))
    }

    pub fn read_octet_string(&mut self) -> Result<&'a [u8]> {
        self.read_element(TAG_OCTET_STRING)
    }
}

/// Split one TLV element off the front of `data`.
fn split_element(data: &[u8]) -> Result<(u8, &[u8], &[u8])> {
    if data.is_empty() {
        return Err(Error::format("read past end of DER input"));
    }
    let tag = data[0];
    if tag & 0x1f == 0x1f {
        return Err(Error::format("high-tag-number form not supported"));
    }
    if data.len() < 2 {
        return Err(Error::format("truncated DER element"));
    }

    let first_len = data[1];
    let (len, header) = if first_len < 0x80 {
        (first_len as usize, 2)
    } else if first_len == 0x80 {
        return Err(Error::format("indefinite length not allowed in DER"));
    } else {
        let num_bytes = (first_len & 0x7f) as usize;
        if num_bytes > 4 {
            return Err(Error::format("unreasonably long DER length"));
        }
        if data.len() < 2 + num_bytes {
            return Err(Error::format("truncated DER length"));
        }
        let mut len: usize = 0;
        for &b in &data[2..2 + num_bytes] {
            len = (len << 8) | b as usize;
        }
        if len < 0x80 || data[2] == 0x00 {
            return Err(Error::format("non-minimal DER length"));
        }
        (len, 2 + num_bytes)
    };

    if data.len() - header < len {
        return Err(Error::format("DER element overruns input"));
    }
    let contents = &data[header..header + len];
    let rest = &data[header + len..];
    Ok((tag, contents, rest))
}

/// Owned DER builder. Lengths are computed when each nested scope closes, so
/// output is always definite-length minimal DER.
#[derive(Debug, Default)]
pub struct Writer {
    out: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { out: Vec::new() }
    }

    /// Write a SEQUENCE whose contents are produced by `f`.
    pub fn write_sequence<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Writer) -> Result<()>,
    {
        let mut child = Writer::new();
        f(&mut child)?;
        self.write_tagged(TAG_SEQUENCE, &child.out);
        Ok(())
    }

    /// Write an element with an arbitrary tag and raw contents.
    pub fn write_tagged(&mut self, tag: u8, contents: &[u8]) {
        self.out.push(tag);
        self.write_len(contents.len());
        self.out.extend_from_slice(contents);
    }

    pub fn write_uint64(&mut self, value: u64) {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        let mut contents = Vec::with_capacity(9 - skip);
        // Prepend a zero byte if the top bit would read as a sign.
        if bytes[skip] >= 0x80 {
            contents.push(0x00);
        }
        contents.extend_from_slice(&bytes[skip..]);
        self.write_tagged(TAG_INTEGER, &contents);
    }

    /// Write an INTEGER from pre-encoded two's-complement contents.
    pub fn write_integer_bytes(&mut self, twos_complement: &[u8]) -> Result<()> {
        if twos_complement.is_empty() {
            return Err(Error::InvalidArgument("empty INTEGER contents"));
        }
        self.write_tagged(TAG_INTEGER, twos_complement);
        Ok(())
    }

    pub fn write_null(&mut self) {
        self.write_tagged(TAG_NULL, &[]);
    }

    pub fn write_octet_string(&mut self, contents: &[u8]) {
        self.write_tagged(TAG_OCTET_STRING, contents);
    }

    /// Write an OBJECT IDENTIFIER given in dotted-decimal form.
    pub fn write_oid(&mut self, oid: &str) -> Result<()> {
        let components: Vec<u64> = oid
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::format(format!("invalid OID: {oid}")))?;

        if components.len() < 2 {
            return Err(Error::format(format!("OID needs two components: {oid}")));
        }
        let (first, second) = (components[0], components[1]);
        if first > 2 || (first < 2 && second >= 40) {
            return Err(Error::format(format!("invalid OID prefix: {oid}")));
        }

        let mut contents = Vec::new();
        push_base128(&mut contents, first * 40 + second);
        for &c in &components[2..] {
            push_base128(&mut contents, c);
        }
        self.write_tagged(TAG_OID, &contents);
        Ok(())
    }

    fn write_len(&mut self, len: usize) {
        if len < 0x80 {
            self.out.push(len as u8);
        } else {
            let bytes = (len as u64).to_be_bytes();
            let skip = bytes.iter().position(|&b| b != 0).unwrap_or(7);
            self.out.push(0x80 | (8 - skip) as u8);
            self.out.extend_from_slice(&bytes[skip..]);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut stack = [0u8; 10];
    let mut i = 0;
    loop {
        stack[i] = (value & 0x7f) as u8;
        value >>= 7;
        i += 1;
        if value == 0 {
            break;
        }
    }
    while i > 1 {
        i -= 1;
        out.push(stack[i] | 0x80);
    }
    out.push(stack[0]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_round_trip() {
        let mut w = Writer::new();
        w.write_sequence(|w| {
            w.write_uint64(3);
            w.write_oid("1.2.840.113549.1.1.11").unwrap();
            w.write_null();
            w.write_octet_string(b"payload");
            Ok(())
        })
        .unwrap();
        let der = w.finish();

        let mut outer = Reader::new(&der);
        let mut seq = outer.read_sequence().unwrap();
        assert!(outer.is_empty());
        assert_eq!(seq.read_uint64().unwrap(), 3);
        assert_eq!(seq.read_oid().unwrap(), "1.2.840.113549.1.1.11");
        seq.read_null().unwrap();
        assert_eq!(seq.read_octet_string().unwrap(), b"payload");
        assert!(seq.is_empty());
    }

    #[test]
    fn test_known_oid_encoding() {
        // sha256WithRSAEncryption: 06 09 2a 86 48 86 f7 0d 01 01 0b
        let mut w = Writer::new();
        w.write_oid("1.2.840.113549.1.1.11").unwrap();
        assert_eq!(
            w.finish(),
            vec![0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b]
        );
    }

    #[test]
    fn test_uint64_sign_byte() {
        let mut w = Writer::new();
        w.write_uint64(128);
        let der = w.finish();
        assert_eq!(der, vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(Reader::new(&der).read_uint64().unwrap(), 128);

        let mut w = Writer::new();
        w.write_uint64(0);
        assert_eq!(w.finish(), vec![0x02, 0x01, 0x00]);

        let mut w = Writer::new();
        w.write_uint64(u64::MAX);
        let der = w.finish();
        assert_eq!(Reader::new(&der).read_uint64().unwrap(), u64::MAX);
    }

    #[test]
    fn test_long_form_length() {
        let contents = vec![0xaa; 200];
        let mut w = Writer::new();
        w.write_octet_string(&contents);
        let der = w.finish();
        assert_eq!(&der[..3], &[0x04, 0x81, 200]);
        assert_eq!(Reader::new(&der).read_octet_string().unwrap(), &contents[..]);
    }

    #[test]
    fn test_optional_tagged() {
        let mut w = Writer::new();
        w.write_tagged(0xa0, b"ctx");
        w.write_null();
        let der = w.finish();

        let mut r = Reader::new(&der);
        assert_eq!(r.read_optional_tagged(0xa1).unwrap(), None);
        assert_eq!(r.read_optional_tagged(0xa0).unwrap(), Some(&b"ctx"[..]));
        r.read_null().unwrap();
    }

    #[test]
    fn test_malformed_rejected() {
        // Truncated element.
        assert!(Reader::new(&[0x30, 0x03, 0x00]).read_sequence().is_err());
        // Indefinite length.
        assert!(Reader::new(&[0x30, 0x80, 0x00, 0x00]).read_sequence().is_err());
        // Non-minimal length (long form for a short value).
        assert!(Reader::new(&[0x04, 0x81, 0x01, 0xff])
            .read_octet_string()
            .is_err());
        // Non-minimal INTEGER.
        assert!(Reader::new(&[0x02, 0x02, 0x00, 0x01]).read_uint64().is_err());
        // Negative INTEGER where unsigned expected.
        assert!(Reader::new(&[0x02, 0x01, 0xff]).read_uint64().is_err());
        // Empty INTEGER.
        assert!(Reader::new(&[0x02, 0x00]).read_uint64().is_err());
        // INTEGER wider than u64.
        let mut wide = vec![0x02, 0x0a];
        wide.extend_from_slice(&[0x01; 10]);
        assert!(matches!(
            Reader::new(&wide).read_uint64(),
            Err(Error::OutOfBounds(_))
        ));
        // Wrong tag.
        assert!(Reader::new(&[0x02, 0x01, 0x05]).read_null().is_err());
        // Truncated OID subidentifier.
        assert!(Reader::new(&[0x06, 0x02, 0x2a, 0x86]).read_oid().is_err());
    }

    #[test]
    fn test_zero_length_reader() {
        let r = Reader::new(&[]);
        assert!(r.is_empty());
        assert!(r.peek_tag().is_err());
        assert!(!r.next_tag_is(TAG_SEQUENCE));
    }
}
