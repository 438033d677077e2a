//! Root chain.

use std::fmt;

use tracing::debug;

use crate::{
    config::ChainConfig,
    error::{ChainError, ChainOperation, ChainRole},
    keys::{HeaderKey, MessageMasterKey, RootKey, SharedSecretKey},
    provider::CryptoProvider,
};

/// Root chain feeding fresh keys into the message chains.
///
/// Each DH ratchet step advances it once per message chain, mixing the DH
/// output into the root key.
pub struct RootChain<P> {
    config: ChainConfig<P>,
    key: RootKey,
}

impl<P: CryptoProvider> RootChain<P> {
    /// Root chain starting from the secret agreed in the handshake.
    pub fn new(config: ChainConfig<P>, key: RootKey) -> Self {
        Self { config, key }
    }

    /// Mix `shared_secret` into the root key.
    ///
    /// Returns the master key and next header key for the message chain
    /// being upgraded. The root key is replaced only on success.
    pub fn advance(
        &mut self,
        shared_secret: &SharedSecretKey,
    ) -> Result<(MessageMasterKey, HeaderKey), ChainError> {
        let (root_key, master_key, next_header_key) = self
            .config
            .provider()
            .advance_root(&self.key, shared_secret)
            .map_err(ChainError::crypto(ChainRole::Root, ChainOperation::Advance))?;

        self.key = root_key;

        debug!("root chain advanced");
        Ok((master_key, next_header_key))
    }
}

impl<P> Clone for RootChain<P> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), key: self.key.clone() }
    }
}

#[cfg(test)]
impl<P> PartialEq for RootChain<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<P> fmt::Debug for RootChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootChain").finish_non_exhaustive()
    }
}
