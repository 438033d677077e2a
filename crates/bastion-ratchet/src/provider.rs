//! Crypto provider: the only place chains reach cryptographic primitives.
//!
//! Chains hold a provider through their [`crate::ChainConfig`] and never
//! touch HMAC, HKDF or the curve directly. [`X25519Provider`] is the default
//! implementation:
//!
//! ```text
//! master key ──HMAC(0x02)──> next master key
//!      │
//!      └─────HMAC(0x01)──> message key
//!
//! root key + DH output ──HKDF──> root key ‖ master key ‖ header key
//! ```

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    config::KdfLabels,
    error::{CryptoError, KeyKind},
    keys::{
        HeaderKey, KEY_LEN, MessageKey, MessageMasterKey, PrivateKey, PublicKey, RootKey,
        SharedSecretKey,
    },
};

type HmacSha256 = Hmac<Sha256>;

/// Cryptographic capability consumed by the chains.
///
/// Implementations must be deterministic for the derivation operations:
/// both peers run the same derivations and must arrive at the same keys.
pub trait CryptoProvider: Send + Sync {
    /// One-way chain step.
    ///
    /// Returns `(next_master_key, message_key)`. Knowing the next master key
    /// must not reveal `master_key`, and the message key must be independent
    /// of the next master key.
    fn advance_chain(
        &self,
        master_key: &MessageMasterKey,
    ) -> Result<(MessageMasterKey, MessageKey), CryptoError>;

    /// Root chain step over a fresh DH output.
    ///
    /// Returns `(next_root_key, master_key, next_header_key)`.
    fn advance_root(
        &self,
        root_key: &RootKey,
        shared_secret: &SharedSecretKey,
    ) -> Result<(RootKey, MessageMasterKey, HeaderKey), CryptoError>;

    /// Generate an ephemeral private key from a secure random source.
    fn generate_private_key(&self) -> Result<PrivateKey, CryptoError>;

    /// Public key matching `private_key`.
    fn public_key(&self, private_key: &PrivateKey) -> PublicKey;

    /// Diffie-Hellman between a local private and a remote public key.
    fn compute_shared_secret(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
    ) -> Result<SharedSecretKey, CryptoError>;

    /// Import private key bytes received from outside the process.
    fn import_private_key(&self, bytes: &[u8]) -> Result<PrivateKey, CryptoError> {
        import_key_bytes(KeyKind::Private, bytes).map(PrivateKey::new)
    }

    /// Import public key bytes received from a peer.
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey, CryptoError> {
        import_key_bytes(KeyKind::Public, bytes).map(PublicKey::new)
    }
}

/// Default provider: X25519, HMAC-SHA256 chain steps, HKDF-SHA256 root steps.
#[derive(Debug, Clone, Default)]
pub struct X25519Provider {
    labels: KdfLabels,
}

impl X25519Provider {
    /// Provider using custom domain separation labels.
    pub fn with_labels(labels: KdfLabels) -> Self {
        Self { labels }
    }

    /// Labels this provider derives with.
    pub fn labels(&self) -> &KdfLabels {
        &self.labels
    }

    fn chain_mac(master_key: &MessageMasterKey, input: u8) -> Result<[u8; KEY_LEN], CryptoError> {
        let mut mac = HmacSha256::new_from_slice(master_key.as_bytes())
            .map_err(|_| CryptoError::Derivation { step: "chain" })?;
        mac.update(&[input]);
        let result = mac.finalize().into_bytes();

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&result);
        Ok(key)
    }
}

impl CryptoProvider for X25519Provider {
    fn advance_chain(
        &self,
        master_key: &MessageMasterKey,
    ) -> Result<(MessageMasterKey, MessageKey), CryptoError> {
        let next_master = Self::chain_mac(master_key, self.labels.chain_input)?;
        let message = Self::chain_mac(master_key, self.labels.message_input)?;

        Ok((MessageMasterKey::new(next_master), MessageKey::new(message)))
    }

    fn advance_root(
        &self,
        root_key: &RootKey,
        shared_secret: &SharedSecretKey,
    ) -> Result<(RootKey, MessageMasterKey, HeaderKey), CryptoError> {
        let mut okm = Zeroizing::new([0u8; 3 * KEY_LEN]);
        Hkdf::<Sha256>::new(Some(root_key.as_bytes()), shared_secret.as_bytes())
            .expand(self.labels.root_info, okm.as_mut_slice())
            .map_err(|_| CryptoError::Derivation { step: "root" })?;

        Ok((
            RootKey::new(split_key(&okm[..KEY_LEN])),
            MessageMasterKey::new(split_key(&okm[KEY_LEN..2 * KEY_LEN])),
            HeaderKey::new(split_key(&okm[2 * KEY_LEN..])),
        ))
    }

    fn generate_private_key(&self) -> Result<PrivateKey, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.try_fill_bytes(bytes.as_mut_slice())?;
        Ok(PrivateKey::new(*bytes))
    }

    fn public_key(&self, private_key: &PrivateKey) -> PublicKey {
        PublicKey::new(x25519_dalek::PublicKey::from(private_key.secret()).to_bytes())
    }

    fn compute_shared_secret(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
    ) -> Result<SharedSecretKey, CryptoError> {
        let public = x25519_dalek::PublicKey::from(*public_key.as_bytes());

        let shared = private_key.secret().diffie_hellman(&public);
        if !shared.was_contributory() {
            return Err(CryptoError::DiffieHellman);
        }

        Ok(SharedSecretKey::new(*shared.as_bytes()))
    }
}

/// Validate and copy foreign key bytes into a fixed-size key buffer.
fn import_key_bytes(kind: KeyKind, bytes: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    if bytes.is_empty() {
        return Err(CryptoError::InvalidValue {
            what: match kind {
                KeyKind::Private => "private key",
                KeyKind::Public => "public key",
            },
        });
    }

    <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| CryptoError::ForeignKeyImport {
        kind,
        expected: KEY_LEN,
        actual: bytes.len(),
    })
}

/// Copy one 32-byte window out of KDF output.
fn split_key(window: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(window);
    key
}
