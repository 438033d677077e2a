//! Sending chain.

use std::fmt;

use super::MessageChain;
use crate::{
    config::ChainConfig,
    error::{ChainError, ChainOperation, ChainRole},
    keys::{HeaderKey, MessageKey, MessageMasterKey},
    provider::CryptoProvider,
};

/// Chain producing message keys for outgoing messages.
///
/// The peer's [`crate::ReceivingChain`] mirrors this chain: both derive the
/// same key sequence from the same master key.
pub struct SendingChain<P> {
    chain: MessageChain<P>,
    previous_chain_message_count: u64,
}

impl<P: CryptoProvider> SendingChain<P> {
    /// Chain that can send immediately (the initiator's first chain).
    pub fn new(
        config: ChainConfig<P>,
        master_key: MessageMasterKey,
        header_key: HeaderKey,
        next_header_key: HeaderKey,
    ) -> Self {
        Self {
            chain: MessageChain::new(
                ChainRole::Sending,
                config,
                Some(master_key),
                Some(header_key),
                next_header_key,
            ),
            previous_chain_message_count: 0,
        }
    }

    /// Chain waiting for its first DH ratchet step (the responder side).
    ///
    /// [`Self::advance`] fails with [`ChainError::InvalidValue`] until
    /// [`Self::upgrade`] installs a master key.
    pub fn pending(config: ChainConfig<P>, next_header_key: HeaderKey) -> Self {
        Self {
            chain: MessageChain::new(ChainRole::Sending, config, None, None, next_header_key),
            previous_chain_message_count: 0,
        }
    }

    /// Derive the key for the next outgoing message.
    ///
    /// The master key is replaced and the message number incremented only
    /// when derivation succeeds; on error the chain is unchanged.
    pub fn advance(&mut self) -> Result<MessageKey, ChainError> {
        self.chain.advance_as(ChainOperation::Advance)
    }

    /// DH ratchet step.
    ///
    /// The next header key becomes the current one, `next_header_key` takes
    /// its place, the finished generation's message count is recorded and
    /// the message number restarts at zero.
    pub fn upgrade(&mut self, master_key: MessageMasterKey, next_header_key: HeaderKey) {
        self.previous_chain_message_count = self.chain.upgrade(master_key, next_header_key);
    }
}

impl<P> SendingChain<P> {
    /// Key for encrypting outgoing headers, if a generation has started.
    pub fn header_key(&self) -> Option<&HeaderKey> {
        self.chain.header_key()
    }

    /// Header key that becomes current at the next upgrade.
    pub fn next_header_key(&self) -> &HeaderKey {
        self.chain.next_header_key()
    }

    /// Number of the next message this chain will produce a key for.
    pub fn message_number(&self) -> u64 {
        self.chain.message_number()
    }

    /// Message count of the previous generation.
    ///
    /// Sent in headers so the receiver can collect keys for messages of the
    /// old generation that are still in flight.
    pub fn previous_chain_message_count(&self) -> u64 {
        self.previous_chain_message_count
    }

    /// Whether the chain can advance.
    pub fn has_master_key(&self) -> bool {
        self.chain.has_master_key()
    }
}

impl<P> Clone for SendingChain<P> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            previous_chain_message_count: self.previous_chain_message_count,
        }
    }
}

impl<P> fmt::Debug for SendingChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendingChain")
            .field("chain", &self.chain)
            .field("previous_chain_message_count", &self.previous_chain_message_count)
            .finish()
    }
}
