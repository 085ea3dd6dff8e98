// Capability interfaces injected at context construction.
//
// Private-key operations, certificate selection, ALPN choice, and session
// storage are all supplied by the caller as trait objects. Each trait has an
// adapter onto the corresponding rustls extension point.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::ClientHello;
use rustls::{SignatureAlgorithm, SignatureScheme};

use crate::error::{Error, Result};

/// Reports whether the underlying crypto provider is running in FIPS mode.
pub fn fips_enabled() -> bool {
    aws_lc_rs::try_fips_mode().is_ok()
}

pub(crate) fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}

/// External private-key operations. The key material never crosses this
/// boundary; only signing requests do.
pub trait KeyProvider: Send + Sync + 'static {
    /// Signature schemes this key can produce, in preference order.
    fn schemes(&self) -> Vec<SignatureScheme>;

    /// Sign `message` with the given scheme. The scheme is always one
    /// returned by `schemes`.
    fn sign(&self, scheme: SignatureScheme, message: &[u8]) -> Result<Vec<u8>>;
}

fn scheme_algorithm(scheme: SignatureScheme) -> SignatureAlgorithm {
    match scheme {
        SignatureScheme::RSA_PKCS1_SHA256
        | SignatureScheme::RSA_PKCS1_SHA384
        | SignatureScheme::RSA_PKCS1_SHA512
        | SignatureScheme::RSA_PSS_SHA256
        | SignatureScheme::RSA_PSS_SHA384
        | SignatureScheme::RSA_PSS_SHA512 => SignatureAlgorithm::RSA,
        SignatureScheme::ECDSA_NISTP256_SHA256
        | SignatureScheme::ECDSA_NISTP384_SHA384
        | SignatureScheme::ECDSA_NISTP521_SHA512 => SignatureAlgorithm::ECDSA,
        SignatureScheme::ED25519 => SignatureAlgorithm::ED25519,
        _ => SignatureAlgorithm::Unknown(0),
    }
}

pub(crate) struct ProviderSigningKey {
    provider: Arc<dyn KeyProvider>,
}

impl ProviderSigningKey {
    pub(crate) fn new(provider: Arc<dyn KeyProvider>) -> Self {
        ProviderSigningKey { provider }
    }
}

impl fmt::Debug for ProviderSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSigningKey")
            .field("schemes", &self.provider.schemes())
            .finish()
    }
}

impl rustls::sign::SigningKey for ProviderSigningKey {
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn rustls::sign::Signer>> {
        let ours = self.provider.schemes();
        // Our preference order wins, as long as the peer offered it.
        let scheme = ours.into_iter().find(|s| offered.contains(s))?;
        Some(Box::new(ProviderSigner {
            provider: self.provider.clone(),
            scheme,
        }))
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.provider
            .schemes()
            .first()
            .map(|s| scheme_algorithm(*s))
            .unwrap_or(SignatureAlgorithm::Unknown(0))
    }
}

struct ProviderSigner {
    provider: Arc<dyn KeyProvider>,
    scheme: SignatureScheme,
}

impl fmt::Debug for ProviderSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSigner")
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl rustls::sign::Signer for ProviderSigner {
    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, rustls::Error> {
        self.provider
            .sign(self.scheme, message)
            .map_err(|e| rustls::Error::General(format!("external signer failed: {e}")))
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}

/// Private key for a selected identity: either raw DER key material, or an
/// external signer.
#[derive(Clone)]
pub enum IdentityKey {
    /// PKCS#8, SEC1, or PKCS#1 DER.
    Der(Vec<u8>),
    Provider(Arc<dyn KeyProvider>),
}

/// A certificate chain plus its private key.
#[derive(Clone)]
pub struct Identity {
    /// Leaf first, DER encoded.
    pub chain: Vec<Vec<u8>>,
    pub key: IdentityKey,
}

/// Per-handshake server certificate selection.
pub trait CertificateProvider: Send + Sync + 'static {
    /// Pick an identity for this handshake, or `None` to abort it.
    fn select(&self, server_name: Option<&str>, schemes: &[SignatureScheme]) -> Option<Identity>;
}

/// Builds a rustls `CertifiedKey` from an identity, validating eagerly.
pub(crate) fn certified_key(
    identity: &Identity,
    provider: &rustls::crypto::CryptoProvider,
) -> Result<rustls::sign::CertifiedKey> {
    if identity.chain.is_empty() {
        return Err(Error::InvalidArgument("empty certificate chain"));
    }
    let chain: Vec<CertificateDer<'static>> = identity
        .chain
        .iter()
        .map(|der| CertificateDer::from(der.clone()))
        .collect();
    let key: Arc<dyn rustls::sign::SigningKey> = match &identity.key {
        IdentityKey::Der(der) => {
            let key_der = PrivateKeyDer::try_from(der.clone())
                .map_err(|e| Error::format(format!("unparseable private key: {e}")))?;
            provider
                .key_provider
                .load_private_key(key_der)
                .map_err(|_| Error::InvalidKey("private key rejected by provider"))?
        }
        IdentityKey::Provider(key_provider) => {
            if key_provider.schemes().is_empty() {
                return Err(Error::InvalidKey("key provider advertises no schemes"));
            }
            Arc::new(ProviderSigningKey::new(key_provider.clone()))
        }
    };
    Ok(rustls::sign::CertifiedKey::new(chain, key))
}

pub(crate) struct ProviderCertResolver {
    provider: Arc<dyn CertificateProvider>,
    crypto: Arc<rustls::crypto::CryptoProvider>,
}

impl ProviderCertResolver {
    pub(crate) fn new(
        provider: Arc<dyn CertificateProvider>,
        crypto: Arc<rustls::crypto::CryptoProvider>,
    ) -> Self {
        ProviderCertResolver { provider, crypto }
    }
}

impl fmt::Debug for ProviderCertResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderCertResolver")
    }
}

impl rustls::server::ResolvesServerCert for ProviderCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<rustls::sign::CertifiedKey>> {
        let identity = self
            .provider
            .select(client_hello.server_name(), client_hello.signature_schemes())?;
        match certified_key(&identity, &self.crypto) {
            Ok(key) => Some(Arc::new(key)),
            Err(e) => {
                log::warn!("certificate provider returned unusable identity: {e}");
                None
            }
        }
    }
}

/// Server-side ALPN choice. Consulted once per accepted connection with the
/// client's offered protocols; returning `None` negotiates no protocol.
pub trait ApplicationProtocolSelector: Send + Sync + 'static {
    fn select(&self, offered: &[Vec<u8>]) -> Option<Vec<u8>>;
}

impl<F> ApplicationProtocolSelector for F
where
    F: Fn(&[Vec<u8>]) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    fn select(&self, offered: &[Vec<u8>]) -> Option<Vec<u8>> {
        self(offered)
    }
}

/// Server session store. Keys are session IDs or ticket identities.
pub trait SessionCache: Send + Sync + 'static {
    /// Store an entry, evicting as needed. Returns false if the entry was
    /// not stored.
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool;
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    /// Remove and return an entry (single-use tickets).
    fn take(&self, key: &[u8]) -> Option<Vec<u8>>;
}

/// Bounded LRU session cache, the default store for server contexts.
pub struct LruSessionCache {
    entries: parking_lot::Mutex<lru::LruCache<Vec<u8>, Vec<u8>>>,
}

impl LruSessionCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or(Error::InvalidArgument("session cache capacity must be nonzero"))?;
        Ok(LruSessionCache {
            entries: parking_lot::Mutex::new(lru::LruCache::new(capacity)),
        })
    }
}

impl SessionCache for LruSessionCache {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        self.entries.lock().put(key, value);
        true
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    fn take(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.lock().pop(key)
    }
}

pub(crate) struct SessionStore {
    cache: Arc<dyn SessionCache>,
}

impl SessionStore {
    pub(crate) fn new(cache: Arc<dyn SessionCache>) -> Self {
        SessionStore { cache }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionStore")
    }
}

impl rustls::server::StoresServerSessions for SessionStore {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        self.cache.put(key, value)
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.cache.get(key)
    }

    fn take(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.cache.take(key)
    }

    fn can_cache(&self) -> bool {
        true
    }
}
