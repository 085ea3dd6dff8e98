// TLS configuration contexts.
//
// Builders validate everything eagerly, so a context that builds successfully
// never fails a handshake on configuration grounds.

use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::provider::{
    certified_key, crypto_provider, ApplicationProtocolSelector, CertificateProvider, Identity,
    LruSessionCache, ProviderCertResolver, SessionCache, SessionStore,
};
use crate::util::decode_hex_fingerprint;

const DEFAULT_SESSION_CACHE_CAPACITY: usize = 256;

/// Client-side configuration. Cheap to clone; safe to share across threads.
#[derive(Clone)]
pub struct ClientContext {
    pub(crate) config: Arc<rustls::ClientConfig>,
}

pub struct ClientContextBuilder {
    verify_webpki: bool,
    pinned_fingerprints: Vec<[u8; 32]>,
    alpn_protocols: Vec<Vec<u8>>,
    enable_sni: bool,
    identity: Option<Identity>,
    enable_resumption: bool,
}

impl ClientContext {
    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder {
            verify_webpki: true,
            pinned_fingerprints: Vec::new(),
            alpn_protocols: Vec::new(),
            enable_sni: true,
            identity: None,
            enable_resumption: true,
        }
    }
}

impl ClientContextBuilder {
    /// Validate server chains against the webpki root set. Defaults to on.
    /// With verification off and no pins, server certificates are accepted
    /// unchecked.
    pub fn verify_webpki(mut self, verify: bool) -> Self {
        self.verify_webpki = verify;
        self
    }

    /// Pin a server certificate by the SHA-256 of its DER encoding, given as
    /// hex (colons and spaces ignored). Pins are checked in constant time.
    pub fn pin_certificate_sha256(mut self, fingerprint: &str) -> Result<Self> {
        let bytes = decode_hex_fingerprint(fingerprint)?;
        let pin: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::format("certificate pin must be 32 bytes of hex"))?;
        self.pinned_fingerprints.push(pin);
        Ok(self)
    }

    /// ALPN protocols to offer, in preference order.
    pub fn alpn_protocols(mut self, protocols: Vec<Vec<u8>>) -> Self {
        self.alpn_protocols = protocols;
        self
    }

    pub fn enable_sni(mut self, enable: bool) -> Self {
        self.enable_sni = enable;
        self
    }

    /// Client certificate to present when the server requests one.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn enable_resumption(mut self, enable: bool) -> Self {
        self.enable_resumption = enable;
        self
    }

    pub fn build(self) -> Result<ClientContext> {
        let provider = crypto_provider();
        let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;
        let supported_algs = provider.signature_verification_algorithms;

        let builder = if self.verify_webpki {
            let roots = Arc::new(rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            });
            let webpki_verifier =
                rustls::client::WebPkiServerVerifier::builder_with_provider(roots, provider.clone())
                    .build()
                    .map_err(|e| Error::format(format!("webpki verifier: {e}")))?;
            if self.pinned_fingerprints.is_empty() {
                builder.with_webpki_verifier(webpki_verifier)
            } else {
                builder
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(PinnedCertVerifier {
                        supported_algs,
                        pins: self.pinned_fingerprints.clone(),
                        webpki_verifier: Some(webpki_verifier),
                    }))
            }
        } else if !self.pinned_fingerprints.is_empty() {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(PinnedCertVerifier {
                    supported_algs,
                    pins: self.pinned_fingerprints.clone(),
                    webpki_verifier: None,
                }))
        } else {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(DisabledVerifier { supported_algs }))
        };

        let mut config = match &self.identity {
            Some(identity) => {
                let key = certified_key(identity, &provider)?;
                builder.with_client_cert_resolver(Arc::new(StaticClientCertResolver {
                    key: Arc::new(key),
                }))
            }
            None => builder.with_no_client_auth(),
        };

        config.alpn_protocols = self.alpn_protocols;
        config.enable_sni = self.enable_sni;
        if !self.enable_resumption {
            config.resumption = rustls::client::Resumption::disabled();
        }

        Ok(ClientContext {
            config: Arc::new(config),
        })
    }
}

/// Server-side configuration. Cheap to clone; safe to share across threads.
#[derive(Clone)]
pub struct ServerContext {
    pub(crate) config: Arc<rustls::ServerConfig>,
    pub(crate) alpn_selector: Option<Arc<dyn ApplicationProtocolSelector>>,
}

enum ServerIdentitySource {
    Static(Identity),
    Provider(Arc<dyn CertificateProvider>),
}

pub struct ServerContextBuilder {
    identity: Option<ServerIdentitySource>,
    alpn_protocols: Vec<Vec<u8>>,
    alpn_selector: Option<Arc<dyn ApplicationProtocolSelector>>,
    client_auth_roots: Option<Vec<Vec<u8>>>,
    session_cache: Option<Arc<dyn SessionCache>>,
}

impl ServerContext {
    pub fn builder() -> ServerContextBuilder {
        ServerContextBuilder {
            identity: None,
            alpn_protocols: Vec::new(),
            alpn_selector: None,
            client_auth_roots: None,
            session_cache: None,
        }
    }

    /// Configuration for one accepted connection, after the ALPN selector
    /// (if any) has seen the client's offer.
    pub(crate) fn config_for_offer(&self, offered: &[Vec<u8>]) -> Arc<rustls::ServerConfig> {
        match &self.alpn_selector {
            None => self.config.clone(),
            Some(selector) => {
                let mut config = (*self.config).clone();
                config.alpn_protocols = selector.select(offered).into_iter().collect();
                Arc::new(config)
            }
        }
    }
}

impl ServerContextBuilder {
    /// Fixed certificate chain and key, used for every connection.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(ServerIdentitySource::Static(identity));
        self
    }

    /// Per-handshake certificate selection. Replaces a fixed identity.
    pub fn certificate_provider(mut self, provider: Arc<dyn CertificateProvider>) -> Self {
        self.identity = Some(ServerIdentitySource::Provider(provider));
        self
    }

    /// ALPN protocols to accept, in server preference order.
    pub fn alpn_protocols(mut self, protocols: Vec<Vec<u8>>) -> Self {
        self.alpn_protocols = protocols;
        self
    }

    /// Consult a selector per accepted connection instead of a fixed list.
    pub fn alpn_selector(mut self, selector: Arc<dyn ApplicationProtocolSelector>) -> Self {
        self.alpn_selector = Some(selector);
        self
    }

    /// Require client certificates, validated against `roots` (DER). An
    /// empty list means the webpki root set.
    pub fn require_client_certificates(mut self, roots: Vec<Vec<u8>>) -> Self {
        self.client_auth_roots = Some(roots);
        self
    }

    pub fn session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.session_cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<ServerContext> {
        let provider = crypto_provider();
        let builder = rustls::ServerConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;

        let builder = match &self.client_auth_roots {
            None => builder.with_no_client_auth(),
            Some(roots_der) => {
                let mut roots = rustls::RootCertStore::empty();
                if roots_der.is_empty() {
                    roots.roots = webpki_roots::TLS_SERVER_ROOTS.to_vec();
                } else {
                    for der in roots_der {
                        roots
                            .add(CertificateDer::from(der.clone()))
                            .map_err(|e| Error::format(format!("bad client auth root: {e}")))?;
                    }
                }
                let verifier = rustls::server::WebPkiClientVerifier::builder_with_provider(
                    Arc::new(roots),
                    provider.clone(),
                )
                .build()
                .map_err(|e| Error::format(format!("client verifier: {e}")))?;
                builder.with_client_cert_verifier(verifier)
            }
        };

        let resolver: Arc<dyn rustls::server::ResolvesServerCert> = match self.identity {
            Some(ServerIdentitySource::Static(identity)) => {
                let key = certified_key(&identity, &provider)?;
                Arc::new(StaticServerCertResolver { key: Arc::new(key) })
            }
            Some(ServerIdentitySource::Provider(cert_provider)) => {
                Arc::new(ProviderCertResolver::new(cert_provider, provider.clone()))
            }
            None => return Err(Error::InvalidArgument("server context requires an identity")),
        };

        let mut config = builder.with_cert_resolver(resolver);
        config.alpn_protocols = self.alpn_protocols;
        config.ignore_client_order = true;

        let cache = match self.session_cache {
            Some(cache) => cache,
            None => Arc::new(LruSessionCache::new(DEFAULT_SESSION_CACHE_CAPACITY)?),
        };
        config.session_storage = Arc::new(SessionStore::new(cache));

        Ok(ServerContext {
            config: Arc::new(config),
            alpn_selector: self.alpn_selector,
        })
    }
}

#[derive(Debug)]
struct PinnedCertVerifier {
    supported_algs: rustls::crypto::WebPkiSupportedAlgorithms,
    pins: Vec<[u8; 32]>,
    webpki_verifier: Option<Arc<rustls::client::WebPkiServerVerifier>>,
}

impl rustls::client::danger::ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &rustls::pki_types::ServerName<'_>,
        ocsp_response: &[u8],
        now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        if let Some(webpki_verifier) = &self.webpki_verifier {
            webpki_verifier.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            )?;
        }

        let fingerprint =
            aws_lc_rs::digest::digest(&aws_lc_rs::digest::SHA256, end_entity.as_ref());
        let mut matched = subtle::Choice::from(0u8);
        for pin in &self.pins {
            matched |= pin.as_slice().ct_eq(fingerprint.as_ref());
        }
        if bool::from(matched) {
            Ok(rustls::client::danger::ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General(
                "certificate does not match any pinned fingerprint".to_string(),
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}

#[derive(Debug)]
struct DisabledVerifier {
    supported_algs: rustls::crypto::WebPkiSupportedAlgorithms,
}

impl rustls::client::danger::ServerCertVerifier for DisabledVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}

#[derive(Debug)]
struct StaticServerCertResolver {
    key: Arc<rustls::sign::CertifiedKey>,
}

impl rustls::server::ResolvesServerCert for StaticServerCertResolver {
    fn resolve(
        &self,
        _client_hello: rustls::server::ClientHello<'_>,
    ) -> Option<Arc<rustls::sign::CertifiedKey>> {
        Some(self.key.clone())
    }
}

#[derive(Debug)]
struct StaticClientCertResolver {
    key: Arc<rustls::sign::CertifiedKey>,
}

impl rustls::client::ResolvesClientCert for StaticClientCertResolver {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        sigschemes: &[rustls::SignatureScheme],
    ) -> Option<Arc<rustls::sign::CertifiedKey>> {
        self.key
            .key
            .choose_scheme(sigschemes)
            .is_some()
            .then(|| self.key.clone())
    }

    fn has_certs(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::IdentityKey;

    fn test_identity() -> Identity {
        let key = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::new(vec!["ctx.test".to_string()]).unwrap();
        params.serial_number = Some(rcgen::SerialNumber::from(7u64));
        let cert = params.self_signed(&key).unwrap();
        Identity {
            chain: vec![cert.der().to_vec()],
            key: IdentityKey::Der(key.serialize_der()),
        }
    }

    #[test]
    fn test_client_builder_defaults() {
        assert!(ClientContext::builder().build().is_ok());
        assert!(ClientContext::builder().verify_webpki(false).build().is_ok());
    }

    #[test]
    fn test_bad_pin_rejected_eagerly() {
        assert!(ClientContext::builder()
            .pin_certificate_sha256("not hex")
            .is_err());
        // Valid hex but not 32 bytes.
        assert!(ClientContext::builder()
            .pin_certificate_sha256("aabb")
            .is_err());
        assert!(ClientContext::builder()
            .pin_certificate_sha256(&"ab".repeat(32))
            .is_ok());
    }

    #[test]
    fn test_client_identity_validated_eagerly() {
        let bad = Identity {
            chain: vec![vec![0x30, 0x00]],
            key: IdentityKey::Der(vec![1, 2, 3]),
        };
        assert!(ClientContext::builder().identity(bad).build().is_err());
        assert!(ClientContext::builder()
            .identity(test_identity())
            .build()
            .is_ok());
    }

    #[test]
    fn test_server_requires_identity() {
        assert!(matches!(
            ServerContext::builder().build(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ServerContext::builder()
            .identity(test_identity())
            .build()
            .is_ok());
    }

    #[test]
    fn test_alpn_selector_overrides_per_connection() {
        let context = ServerContext::builder()
            .identity(test_identity())
            .alpn_selector(Arc::new(|offered: &[Vec<u8>]| {
                offered.iter().find(|p| p.as_slice() == b"h2").cloned()
            }))
            .build()
            .unwrap();

        let config = context.config_for_offer(&[b"http/1.1".to_vec(), b"h2".to_vec()]);
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec()]);

        let config = context.config_for_offer(&[b"http/1.1".to_vec()]);
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn test_bad_client_auth_root_rejected() {
        let result = ServerContext::builder()
            .identity(test_identity())
            .require_client_certificates(vec![vec![0xde, 0xad]])
            .build();
        assert!(matches!(result, Err(Error::Format(_))));
    }
}
