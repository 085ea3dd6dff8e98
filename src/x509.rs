// X.509 certificate and CRL field accessors.
//
// A `Certificate` retains the exact DER it was parsed from, so `to_der` is
// always byte-identical to the input. Accessors re-parse on demand and return
// owned values.
//
// Extension accessors use a tri-state: an absent extension and a malformed one
// are different answers, and callers can rely on the distinction.

use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension};
use x509_parser::prelude::{CertificateRevocationList, FromDer};

use crate::bigint::BigInt;
use crate::error::{Error, Result};

/// Outcome of looking up an optional certificate extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionStatus<T> {
    /// The extension is not present in the certificate.
    Absent,
    Present(T),
    /// The extension is present but its contents could not be parsed.
    Malformed,
}

impl<T> ExtensionStatus<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, ExtensionStatus::Present(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ExtensionStatus::Present(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len_constraint: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsage {
    pub digital_signature: bool,
    pub non_repudiation: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
    pub encipher_only: bool,
    pub decipher_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub any: bool,
    pub server_auth: bool,
    pub client_auth: bool,
    pub code_signing: bool,
    pub email_protection: bool,
    pub time_stamping: bool,
    pub ocsp_signing: bool,
    /// Dotted-decimal OIDs of purposes outside the named set.
    pub other: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectAltName {
    Dns(String),
    Ip(Vec<u8>),
    Email(String),
    Uri(String),
    Other,
}

/// A parsed certificate that keeps its original encoding.
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        if der.is_empty() {
            return Err(Error::InvalidArgument("empty certificate"));
        }
        let (rem, _) = X509Certificate::from_der(der)
            .map_err(|e| Error::format(format!("certificate parse failed: {e}")))?;
        if !rem.is_empty() {
            return Err(Error::format("trailing bytes after certificate"));
        }
        Ok(Certificate { der: der.to_vec() })
    }

    /// The exact bytes this certificate was parsed from.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    fn parse(&self) -> X509Certificate<'_> {
        // Validated in from_der.
        X509Certificate::from_der(&self.der).unwrap().1
    }

    /// X.509 version number (1, 2, or 3).
    pub fn version(&self) -> u32 {
        self.parse().version().0 + 1
    }

    /// Serial number in two's-complement big-endian form.
    pub fn serial(&self) -> Vec<u8> {
        BigInt::from_twos_complement(self.parse().raw_serial()).to_twos_complement()
    }

    pub fn issuer(&self) -> String {
        self.parse().issuer().to_string()
    }

    pub fn subject(&self) -> String {
        self.parse().subject().to_string()
    }

    /// notBefore as unix seconds.
    pub fn not_before(&self) -> i64 {
        self.parse().validity().not_before.timestamp()
    }

    /// notAfter as unix seconds.
    pub fn not_after(&self) -> i64 {
        self.parse().validity().not_after.timestamp()
    }

    pub fn signature_algorithm_oid(&self) -> String {
        self.parse().signature_algorithm.algorithm.to_id_string()
    }

    /// Raw DER of the to-be-signed portion.
    pub fn tbs_der(&self) -> Vec<u8> {
        self.parse().tbs_certificate.as_ref().to_vec()
    }

    /// SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> Vec<u8> {
        self.parse().public_key().raw.to_vec()
    }

    pub fn signature_value(&self) -> Vec<u8> {
        self.parse().signature_value.data.to_vec()
    }

    pub fn basic_constraints(&self) -> ExtensionStatus<BasicConstraints> {
        match self.parse().basic_constraints() {
            Err(_) => ExtensionStatus::Malformed,
            Ok(None) => ExtensionStatus::Absent,
            Ok(Some(ext)) => ExtensionStatus::Present(BasicConstraints {
                ca: ext.value.ca,
                path_len_constraint: ext.value.path_len_constraint,
            }),
        }
    }

    pub fn key_usage(&self) -> ExtensionStatus<KeyUsage> {
        match self.parse().key_usage() {
            Err(_) => ExtensionStatus::Malformed,
            Ok(None) => ExtensionStatus::Absent,
            Ok(Some(ext)) => {
                let ku = ext.value;
                ExtensionStatus::Present(KeyUsage {
                    digital_signature: ku.digital_signature(),
                    non_repudiation: ku.non_repudiation(),
                    key_encipherment: ku.key_encipherment(),
                    data_encipherment: ku.data_encipherment(),
                    key_agreement: ku.key_agreement(),
                    key_cert_sign: ku.key_cert_sign(),
                    crl_sign: ku.crl_sign(),
                    encipher_only: ku.encipher_only(),
                    decipher_only: ku.decipher_only(),
                })
            }
        }
    }

    pub fn extended_key_usage(&self) -> ExtensionStatus<ExtendedKeyUsage> {
        match self.parse().extended_key_usage() {
            Err(_) => ExtensionStatus::Malformed,
            Ok(None) => ExtensionStatus::Absent,
            Ok(Some(ext)) => {
                let eku = ext.value;
                ExtensionStatus::Present(ExtendedKeyUsage {
                    any: eku.any,
                    server_auth: eku.server_auth,
                    client_auth: eku.client_auth,
                    code_signing: eku.code_signing,
                    email_protection: eku.email_protection,
                    time_stamping: eku.time_stamping,
                    ocsp_signing: eku.ocsp_signing,
                    other: eku.other.iter().map(|oid| oid.to_id_string()).collect(),
                })
            }
        }
    }

    pub fn subject_alternative_names(&self) -> ExtensionStatus<Vec<SubjectAltName>> {
        match self.parse().subject_alternative_name() {
            Err(_) => ExtensionStatus::Malformed,
            Ok(None) => ExtensionStatus::Absent,
            Ok(Some(ext)) => {
                let names = ext
                    .value
                    .general_names
                    .iter()
                    .map(|name| match name {
                        GeneralName::DNSName(dns) => SubjectAltName::Dns(dns.to_string()),
                        GeneralName::IPAddress(ip) => SubjectAltName::Ip(ip.to_vec()),
                        GeneralName::RFC822Name(email) => {
                            SubjectAltName::Email(email.to_string())
                        }
                        GeneralName::URI(uri) => SubjectAltName::Uri(uri.to_string()),
                        _ => SubjectAltName::Other,
                    })
                    .collect();
                ExtensionStatus::Present(names)
            }
        }
    }

    /// URIs from the CRL distribution points extension.
    pub fn crl_distribution_uris(&self) -> ExtensionStatus<Vec<String>> {
        let cert = self.parse();
        let ext = cert
            .extensions()
            .iter()
            .find(|ext| ext.oid.to_id_string() == "2.5.29.31");
        let Some(ext) = ext else {
            return ExtensionStatus::Absent;
        };
        match ext.parsed_extension() {
            ParsedExtension::CRLDistributionPoints(points) => {
                let mut uris = Vec::new();
                for point in points.iter() {
                    if let Some(DistributionPointName::FullName(names)) = &point.distribution_point
                    {
                        for name in names {
                            if let GeneralName::URI(uri) = name {
                                uris.push(uri.to_string());
                            }
                        }
                    }
                }
                ExtensionStatus::Present(uris)
            }
            _ => ExtensionStatus::Malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    /// Serial in two's-complement big-endian form.
    pub serial: Vec<u8>,
    /// Revocation time as unix seconds.
    pub revocation_date: i64,
}

/// A parsed CRL that keeps its original encoding.
pub struct CertRevocationList {
    der: Vec<u8>,
}

impl CertRevocationList {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        if der.is_empty() {
            return Err(Error::InvalidArgument("empty CRL"));
        }
        let (rem, _) = CertificateRevocationList::from_der(der)
            .map_err(|e| Error::format(format!("CRL parse failed: {e}")))?;
        if !rem.is_empty() {
            return Err(Error::format("trailing bytes after CRL"));
        }
        Ok(CertRevocationList { der: der.to_vec() })
    }

    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    fn parse(&self) -> CertificateRevocationList<'_> {
        CertificateRevocationList::from_der(&self.der).unwrap().1
    }

    pub fn issuer(&self) -> String {
        self.parse().issuer().to_string()
    }

    pub fn this_update(&self) -> i64 {
        self.parse().last_update().timestamp()
    }

    pub fn next_update(&self) -> Option<i64> {
        self.parse().next_update().map(|t| t.timestamp())
    }

    pub fn revoked_entries(&self) -> Vec<RevokedEntry> {
        self.parse()
            .iter_revoked_certificates()
            .map(|revoked| RevokedEntry {
                serial: BigInt::from_twos_complement(revoked.raw_serial()).to_twos_complement(),
                revocation_date: revoked.revocation_date.timestamp(),
            })
            .collect()
    }

    /// Membership check against a two's-complement serial.
    pub fn is_revoked(&self, serial: &[u8]) -> bool {
        let serial = BigInt::from_twos_complement(serial).to_twos_complement();
        self.revoked_entries().iter().any(|e| e.serial == serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cert_der() -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(vec!["example.test".to_string()]).unwrap();
        params.serial_number = Some(rcgen::SerialNumber::from(0x01020304u64));
        let key = rcgen::KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }

    #[test]
    fn test_der_round_trip_byte_exact() {
        let der = test_cert_der();
        let cert = Certificate::from_der(&der).unwrap();
        assert_eq!(cert.to_der(), &der[..]);
    }

    #[test]
    fn test_basic_fields() {
        let cert = Certificate::from_der(&test_cert_der()).unwrap();
        assert_eq!(cert.version(), 3);
        assert_eq!(cert.serial(), vec![0x01, 0x02, 0x03, 0x04]);
        assert!(cert.not_before() < cert.not_after());
        assert!(!cert.signature_algorithm_oid().is_empty());
        assert!(!cert.public_key_der().is_empty());
        assert!(!cert.tbs_der().is_empty());
        assert!(!cert.signature_value().is_empty());
    }

    #[test]
    fn test_san_present() {
        let cert = Certificate::from_der(&test_cert_der()).unwrap();
        match cert.subject_alternative_names() {
            ExtensionStatus::Present(names) => {
                assert!(names.contains(&SubjectAltName::Dns("example.test".to_string())));
            }
            other => panic!("expected SAN present, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_extension_is_absent_not_malformed() {
        let cert = Certificate::from_der(&test_cert_der()).unwrap();
        // rcgen's default leaf carries no CRL distribution points.
        assert_eq!(cert.crl_distribution_uris(), ExtensionStatus::Absent);
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            Certificate::from_der(&[0x30, 0x03, 0x02, 0x01]),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            Certificate::from_der(&[]),
            Err(Error::InvalidArgument(_))
        ));

        // Trailing garbage after a valid certificate.
        let mut der = test_cert_der();
        der.push(0x00);
        assert!(matches!(Certificate::from_der(&der), Err(Error::Format(_))));
    }
}
