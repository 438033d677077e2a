//! Sending, receiving and root chains.
//!
//! Sending and receiving chains share one state machine:
//!
//! ```text
//!   advance(): n → n+1              advance(): n → n+1
//!   ┌──────────────┐   upgrade()    ┌────────────────┐
//!   │ generation g │───────────────>│ generation g+1 │──> ...
//!   └──────────────┘   n := 0       └────────────────┘
//! ```
//!
//! Within a generation the message number grows by exactly one per advance.
//! An upgrade (DH ratchet step) is the only transition between generations.
//! There is no terminal state.

mod receiving;
mod root;
mod sending;

use std::{fmt, mem};

use tracing::{debug, trace};

pub use receiving::ReceivingChain;
pub use root::RootChain;
pub use sending::SendingChain;

use crate::{
    config::ChainConfig,
    error::{ChainError, ChainOperation, ChainRole},
    keys::{HeaderKey, MessageKey, MessageMasterKey},
    provider::CryptoProvider,
};

/// State shared by the sending and receiving chains.
pub(crate) struct MessageChain<P> {
    role: ChainRole,
    config: ChainConfig<P>,
    master_key: Option<MessageMasterKey>,
    header_key: Option<HeaderKey>,
    next_header_key: HeaderKey,
    message_number: u64,
}

impl<P: CryptoProvider> MessageChain<P> {
    pub(crate) fn new(
        role: ChainRole,
        config: ChainConfig<P>,
        master_key: Option<MessageMasterKey>,
        header_key: Option<HeaderKey>,
        next_header_key: HeaderKey,
    ) -> Self {
        Self { role, config, master_key, header_key, next_header_key, message_number: 0 }
    }

    /// Derive the next message key, labelling failures with `operation`.
    ///
    /// State is only replaced after the provider succeeds.
    pub(crate) fn advance_as(
        &mut self,
        operation: ChainOperation,
    ) -> Result<MessageKey, ChainError> {
        let Some(master_key) = self.master_key.as_ref() else {
            return Err(ChainError::InvalidValue {
                role: self.role,
                operation,
                what: "master key",
            });
        };

        let Some(next_number) = self.message_number.checked_add(1) else {
            return Err(ChainError::CounterExhausted {
                role: self.role,
                operation,
                current: self.message_number,
            });
        };

        let (next_master_key, message_key) = self
            .config
            .provider()
            .advance_chain(master_key)
            .map_err(ChainError::crypto(self.role, operation))?;

        // Dropping the replaced key wipes it.
        self.master_key = Some(next_master_key);
        self.message_number = next_number;

        trace!(role = %self.role, message_number = self.message_number, "chain advanced");
        Ok(message_key)
    }

    /// Install keys from a DH ratchet step.
    ///
    /// Returns the message count of the generation that was superseded.
    pub(crate) fn upgrade(
        &mut self,
        master_key: MessageMasterKey,
        next_header_key: HeaderKey,
    ) -> u64 {
        let previous_count = self.message_number;

        self.master_key = Some(master_key);
        self.header_key = Some(mem::replace(&mut self.next_header_key, next_header_key));
        self.message_number = 0;

        debug!(role = %self.role, previous_count, "chain upgraded");
        previous_count
    }
}

impl<P> MessageChain<P> {
    pub(crate) fn header_key(&self) -> Option<&HeaderKey> {
        self.header_key.as_ref()
    }

    pub(crate) fn next_header_key(&self) -> &HeaderKey {
        &self.next_header_key
    }

    pub(crate) fn message_number(&self) -> u64 {
        self.message_number
    }

    pub(crate) fn has_master_key(&self) -> bool {
        self.master_key.is_some()
    }

    pub(crate) fn role(&self) -> ChainRole {
        self.role
    }

    #[cfg(test)]
    pub(crate) fn master_key(&self) -> Option<&MessageMasterKey> {
        self.master_key.as_ref()
    }
}

impl<P> Clone for MessageChain<P> {
    fn clone(&self) -> Self {
        Self {
            role: self.role,
            config: self.config.clone(),
            master_key: self.master_key.clone(),
            header_key: self.header_key.clone(),
            next_header_key: self.next_header_key.clone(),
            message_number: self.message_number,
        }
    }
}

impl<P> fmt::Debug for MessageChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChain")
            .field("role", &self.role)
            .field("has_master_key", &self.master_key.is_some())
            .field("has_header_key", &self.header_key.is_some())
            .field("message_number", &self.message_number)
            .finish_non_exhaustive()
    }
}
