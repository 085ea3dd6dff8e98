// Digital signature facades.
//
// Classical algorithms (Ed25519, ECDSA, RSA) and the FIPS 204/205 lattice and
// hash-based schemes. All key and signature encodings are fixed-length or
// standard DER; wrong-length inputs are rejected as format errors.

mod ecdsa;
mod ed25519;
mod mldsa;
mod rsa;
mod slhdsa;

pub use ecdsa::{EcdsaCurve, EcdsaPrivateKey, ecdsa_verify};
pub use ed25519::{
    ED25519_PRIVATE_KEY_LEN, ED25519_PUBLIC_KEY_LEN, ED25519_SIGNATURE_LEN, Ed25519PrivateKey,
    Ed25519PublicKey,
};
pub use mldsa::{MlDsaPrivateKey, MlDsaPublicKey, MlDsaVariant};
pub use rsa::{
    RsaDecryptionKey, RsaEncryptionPadding, RsaKeySize, RsaSignaturePadding, RsaSigningKey,
    rsa_encrypt, rsa_verify,
};
pub use slhdsa::{
    SLH_DSA_128S_PRIVATE_KEY_LEN, SLH_DSA_128S_PUBLIC_KEY_LEN, SLH_DSA_128S_SIGNATURE_LEN,
    SlhDsaPrivateKey, SlhDsaPublicKey,
};
