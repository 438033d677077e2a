//! Diffie-Hellman ratchet.
//!
//! A DH ratchet step runs whenever the peer's header carries a public key we
//! have not seen yet. It re-keys both message chains from fresh DH outputs,
//! which restores secrecy after a chain key leaked (post-compromise
//! security).
//!
//! ```text
//! DH(local, remote) ──> root chain ──> receiving.upgrade(master, next header)
//! local := fresh key
//! DH(local, remote) ──> root chain ──> sending.upgrade(master, next header)
//! ```

use std::fmt;

use tracing::debug;

use crate::{
    chain::{ReceivingChain, RootChain, SendingChain},
    config::ChainConfig,
    error::{ChainError, ChainOperation, ChainRole},
    keys::{HeaderKey, PrivateKey, PublicKey, RootKey},
    provider::CryptoProvider,
};

/// The sending and receiving chain of one conversation.
pub struct ChainPair<P> {
    /// Chain for outgoing messages
    pub sending: SendingChain<P>,
    /// Chain for incoming messages
    pub receiving: ReceivingChain<P>,
}

impl<P> Clone for ChainPair<P> {
    fn clone(&self) -> Self {
        Self { sending: self.sending.clone(), receiving: self.receiving.clone() }
    }
}

impl<P> fmt::Debug for ChainPair<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainPair")
            .field("sending", &self.sending)
            .field("receiving", &self.receiving)
            .finish()
    }
}

/// DH half of the double ratchet.
///
/// Owns the local ratchet key pair, the last seen remote public key and the
/// root chain.
pub struct DhRatchet<P> {
    config: ChainConfig<P>,
    local_private_key: PrivateKey,
    remote_public_key: Option<PublicKey>,
    root_chain: RootChain<P>,
}

impl<P: CryptoProvider> DhRatchet<P> {
    /// State of the party that sends first.
    ///
    /// Performs the first DH step against the responder's public key, so the
    /// returned sending chain can advance immediately. The receiving chain
    /// starts once the responder's first reply triggers [`Self::step`].
    pub fn initiator(
        config: ChainConfig<P>,
        remote_public_key: PublicKey,
        root_key: RootKey,
        sending_header_key: HeaderKey,
        receiving_next_header_key: HeaderKey,
    ) -> Result<(Self, ChainPair<P>), ChainError> {
        let provider = config.provider();

        let local_private_key = provider
            .generate_private_key()
            .map_err(ChainError::crypto(ChainRole::Sending, ChainOperation::Upgrade))?;
        let shared_secret = provider
            .compute_shared_secret(&local_private_key, &remote_public_key)
            .map_err(ChainError::crypto(ChainRole::Sending, ChainOperation::Upgrade))?;

        let mut root_chain = RootChain::new(config.clone(), root_key);
        let (master_key, next_header_key) = root_chain.advance(&shared_secret)?;

        let chains = ChainPair {
            sending: SendingChain::new(
                config.clone(),
                master_key,
                sending_header_key,
                next_header_key,
            ),
            receiving: ReceivingChain::new(config.clone(), receiving_next_header_key),
        };

        debug!("initiator ratchet created");
        let ratchet = Self {
            config,
            local_private_key,
            remote_public_key: Some(remote_public_key),
            root_chain,
        };
        Ok((ratchet, chains))
    }

    /// State of the party that receives first.
    ///
    /// `local_private_key` is the key whose public half the initiator used.
    /// Both chains stay pending until the initiator's first message arrives
    /// and [`Self::step`] runs.
    pub fn responder(
        config: ChainConfig<P>,
        local_private_key: PrivateKey,
        root_key: RootKey,
        sending_next_header_key: HeaderKey,
        receiving_next_header_key: HeaderKey,
    ) -> (Self, ChainPair<P>) {
        let chains = ChainPair {
            sending: SendingChain::pending(config.clone(), sending_next_header_key),
            receiving: ReceivingChain::new(config.clone(), receiving_next_header_key),
        };
        let ratchet = Self {
            root_chain: RootChain::new(config.clone(), root_key),
            config,
            local_private_key,
            remote_public_key: None,
        };
        (ratchet, chains)
    }

    /// Public half of the current local ratchet key, sent in headers.
    pub fn local_public_key(&self) -> PublicKey {
        self.config.provider().public_key(&self.local_private_key)
    }

    /// Whether a header carrying `remote_public_key` requires a DH step.
    pub fn needs_step(&self, remote_public_key: &PublicKey) -> bool {
        self.remote_public_key.as_ref() != Some(remote_public_key)
    }

    /// Re-key both chains from a new remote public key.
    ///
    /// Every derivation runs before anything is committed: on error the
    /// ratchet and both chains are unchanged.
    pub fn step(
        &mut self,
        remote_public_key: PublicKey,
        chains: &mut ChainPair<P>,
    ) -> Result<(), ChainError> {
        let provider = self.config.provider();
        let mut root_chain = self.root_chain.clone();

        let receiving_secret = provider
            .compute_shared_secret(&self.local_private_key, &remote_public_key)
            .map_err(ChainError::crypto(ChainRole::Receiving, ChainOperation::Upgrade))?;
        let (receiving_master_key, receiving_next_header_key) =
            root_chain.advance(&receiving_secret)?;

        let local_private_key = provider
            .generate_private_key()
            .map_err(ChainError::crypto(ChainRole::Sending, ChainOperation::Upgrade))?;
        let sending_secret = provider
            .compute_shared_secret(&local_private_key, &remote_public_key)
            .map_err(ChainError::crypto(ChainRole::Sending, ChainOperation::Upgrade))?;
        let (sending_master_key, sending_next_header_key) = root_chain.advance(&sending_secret)?;

        chains.receiving.upgrade(receiving_master_key, receiving_next_header_key);
        chains.sending.upgrade(sending_master_key, sending_next_header_key);
        self.root_chain = root_chain;
        self.local_private_key = local_private_key;
        self.remote_public_key = Some(remote_public_key);

        debug!(
            previous_chain_message_count = chains.sending.previous_chain_message_count(),
            "dh ratchet step"
        );
        Ok(())
    }
}

impl<P> DhRatchet<P> {
    /// Last remote public key a step was performed with.
    pub fn remote_public_key(&self) -> Option<PublicKey> {
        self.remote_public_key
    }
}

impl<P> Clone for DhRatchet<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            local_private_key: self.local_private_key.clone(),
            remote_public_key: self.remote_public_key,
            root_chain: self.root_chain.clone(),
        }
    }
}

impl<P> fmt::Debug for DhRatchet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhRatchet")
            .field("remote_public_key", &self.remote_public_key)
            .finish_non_exhaustive()
    }
}
