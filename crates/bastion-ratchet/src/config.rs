//! Chain configuration.
//!
//! A [`ChainConfig`] binds a crypto provider to every chain at construction
//! time. Chains cannot exist without one, so a missing provider is a type
//! error rather than a runtime check.

use std::{fmt, sync::Arc};

use crate::provider::{CryptoProvider, X25519Provider};

/// Provider binding shared by the chains of one or more conversations.
///
/// Cloning is cheap: the provider sits behind an [`Arc`].
pub struct ChainConfig<P> {
    provider: Arc<P>,
}

impl<P: CryptoProvider> ChainConfig<P> {
    /// Bind `provider` to the chains built from this configuration.
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }

    /// Bind an already shared provider.
    pub fn from_shared(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// The bound provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> Clone for ChainConfig<P> {
    fn clone(&self) -> Self {
        Self { provider: Arc::clone(&self.provider) }
    }
}

impl<P> fmt::Debug for ChainConfig<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig").finish_non_exhaustive()
    }
}

impl Default for ChainConfig<X25519Provider> {
    fn default() -> Self {
        Self::new(X25519Provider::default())
    }
}

/// Domain separation labels used by [`X25519Provider`].
///
/// Both peers must use identical labels or their chains diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfLabels {
    /// HKDF info string for root chain advances
    pub root_info: &'static [u8],
    /// HMAC input deriving the message key from a master key
    pub message_input: u8,
    /// HMAC input deriving the next master key from a master key
    pub chain_input: u8,
}

impl Default for KdfLabels {
    fn default() -> Self {
        Self { root_info: b"root_evolve", message_input: 0x01, chain_input: 0x02 }
    }
}
