//! Receiving chain.

use std::fmt;

use super::MessageChain;
use crate::{
    config::ChainConfig,
    error::{ChainError, ChainOperation, ChainRole},
    keys::{HeaderKey, MessageKey, MessageMasterKey},
    provider::CryptoProvider,
};

/// Upper bound on the keys [`ReceivingChain::skip_to`] reserves space for
/// up front.
const MAX_RESERVED_KEYS: usize = 1024;

/// Chain reconstructing the keys of incoming messages.
///
/// Mirrors the peer's [`crate::SendingChain`]. Callers advance it once per
/// message in message-number order; keys for messages that have not arrived
/// yet are handed out by [`Self::skip_to`] and cached by the caller.
pub struct ReceivingChain<P> {
    chain: MessageChain<P>,
}

impl<P: CryptoProvider> ReceivingChain<P> {
    /// Chain waiting for the peer's first DH ratchet step.
    pub fn new(config: ChainConfig<P>, next_header_key: HeaderKey) -> Self {
        Self {
            chain: MessageChain::new(ChainRole::Receiving, config, None, None, next_header_key),
        }
    }

    /// Chain seeded with all of its keys.
    pub fn with_keys(
        config: ChainConfig<P>,
        master_key: MessageMasterKey,
        header_key: HeaderKey,
        next_header_key: HeaderKey,
    ) -> Self {
        Self {
            chain: MessageChain::new(
                ChainRole::Receiving,
                config,
                Some(master_key),
                Some(header_key),
                next_header_key,
            ),
        }
    }

    /// Derive the key for the next incoming message.
    ///
    /// Same contract as [`crate::SendingChain::advance`].
    pub fn advance(&mut self) -> Result<MessageKey, ChainError> {
        self.chain.advance_as(ChainOperation::Advance)
    }

    /// Advance until the message number reaches `target`.
    ///
    /// Returns the `(message_number, key)` pairs that were passed over, in
    /// order. How many of them to keep is the caller's decision; `limit`
    /// bounds how many keys a single call may derive. Keys are derived on a
    /// duplicate that replaces this chain only when every step succeeded.
    ///
    /// `target` is the number of the message about to be received, so
    /// `u64::MAX` is rejected with [`ChainError::CounterExhausted`]: no key
    /// can be derived for it.
    pub fn skip_to(
        &mut self,
        target: u64,
        limit: u64,
    ) -> Result<Vec<(u64, MessageKey)>, ChainError> {
        let role = self.chain.role();
        let current = self.chain.message_number();
        if target < current {
            return Err(ChainError::SkipBackwards { role, current, target });
        }
        if target == u64::MAX {
            return Err(ChainError::CounterExhausted {
                role,
                operation: ChainOperation::SkipTo,
                current,
            });
        }
        if target - current > limit {
            return Err(ChainError::SkipLimit { role, current, target, limit });
        }

        // Reservation is capped: `target` comes from a peer-supplied header.
        let count = usize::try_from(target - current).unwrap_or(usize::MAX);
        let mut draft = self.chain.clone();
        let mut skipped = Vec::with_capacity(count.min(MAX_RESERVED_KEYS));
        while draft.message_number() < target {
            let number = draft.message_number();
            skipped.push((number, draft.advance_as(ChainOperation::SkipTo)?));
        }

        self.chain = draft;
        Ok(skipped)
    }

    /// DH ratchet step driven by a new header key from the peer.
    ///
    /// The next header key becomes the current one, `next_header_key` takes
    /// its place and the message number restarts at zero.
    pub fn upgrade(&mut self, master_key: MessageMasterKey, next_header_key: HeaderKey) {
        self.chain.upgrade(master_key, next_header_key);
    }
}

impl<P> ReceivingChain<P> {
    /// Key for decrypting headers of the current generation.
    pub fn header_key(&self) -> Option<&HeaderKey> {
        self.chain.header_key()
    }

    /// Header key of the peer's next generation.
    ///
    /// A header that decrypts under this key signals a DH ratchet step.
    pub fn next_header_key(&self) -> &HeaderKey {
        self.chain.next_header_key()
    }

    /// Number of the next message this chain will produce a key for.
    pub fn message_number(&self) -> u64 {
        self.chain.message_number()
    }

    /// Whether the chain can advance.
    pub fn has_master_key(&self) -> bool {
        self.chain.has_master_key()
    }
}

impl<P> Clone for ReceivingChain<P> {
    fn clone(&self) -> Self {
        Self { chain: self.chain.clone() }
    }
}

impl<P> fmt::Debug for ReceivingChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivingChain").field("chain", &self.chain).finish()
    }
}
