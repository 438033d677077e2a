//! Error types for the ratchet chains and the crypto provider.

use std::fmt;

use thiserror::Error;

/// Which kind of key an import or lookup concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// X25519 private key
    Private,
    /// X25519 public key
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// Errors raised by a [`crate::CryptoProvider`].
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A required input was absent or empty.
    #[error("invalid value: {what} is missing")]
    InvalidValue {
        /// Name of the missing input
        what: &'static str,
    },

    /// The key-derivation function failed internally.
    ///
    /// Deterministic: retrying with the same input fails again.
    #[error("key derivation failed during {step}")]
    Derivation {
        /// Derivation step that failed (`chain` or `root`)
        step: &'static str,
    },

    /// Key bytes could not be interpreted as a key for the curve.
    #[error("cannot import {kind} key: expected {expected} bytes, got {actual}")]
    ForeignKeyImport {
        /// Kind of key being imported
        kind: KeyKind,
        /// Required length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// The Diffie-Hellman computation rejected its inputs.
    ///
    /// Raised for non-contributory results, i.e. a low-order public key.
    #[error("diffie-hellman rejected the public key: shared secret is not contributory")]
    DiffieHellman,

    /// The system random source failed while generating a private key.
    #[error("random source failed: {0}")]
    Random(#[from] rand::Error),
}

/// Role of the chain an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainRole {
    /// Chain producing keys for outgoing messages
    Sending,
    /// Chain reconstructing keys for incoming messages
    Receiving,
    /// Root chain feeding both message chains
    Root,
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sending => f.write_str("sending"),
            Self::Receiving => f.write_str("receiving"),
            Self::Root => f.write_str("root"),
        }
    }
}

/// Chain operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOperation {
    /// Deriving the next message key
    Advance,
    /// DH ratchet step installing new keys
    Upgrade,
    /// Skipping forward to a message number
    SkipTo,
}

impl fmt::Display for ChainOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance => f.write_str("advance"),
            Self::Upgrade => f.write_str("upgrade"),
            Self::SkipTo => f.write_str("skip"),
        }
    }
}

/// Errors raised by the sending, receiving and root chains.
///
/// Every variant names the chain role, and where relevant the operation,
/// that failed. A chain is left untouched when it returns an error.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Required key material is absent.
    #[error("{role} chain {operation}: {what} is missing")]
    InvalidValue {
        /// Chain that failed
        role: ChainRole,
        /// Operation that failed
        operation: ChainOperation,
        /// Name of the missing value
        what: &'static str,
    },

    /// The crypto provider failed.
    #[error("{role} chain {operation}: crypto provider failed")]
    Crypto {
        /// Chain that failed
        role: ChainRole,
        /// Operation that failed
        operation: ChainOperation,
        /// Underlying provider error
        #[source]
        source: CryptoError,
    },

    /// The message counter cannot be incremented any further.
    #[error("{role} chain {operation}: message counter exhausted at {current}")]
    CounterExhausted {
        /// Chain that failed
        role: ChainRole,
        /// Operation that failed
        operation: ChainOperation,
        /// Current message number
        current: u64,
    },

    /// Skipping would derive more keys than the caller allows.
    #[error("{role} chain cannot skip from {current} to {target}: limit is {limit}")]
    SkipLimit {
        /// Chain that failed
        role: ChainRole,
        /// Current message number
        current: u64,
        /// Requested message number
        target: u64,
        /// Maximum number of keys the caller allows to skip
        limit: u64,
    },

    /// The requested message number is behind the chain.
    #[error("{role} chain cannot skip backwards from {current} to {target}")]
    SkipBackwards {
        /// Chain that failed
        role: ChainRole,
        /// Current message number
        current: u64,
        /// Requested message number
        target: u64,
    },
}

impl ChainError {
    /// Wrap a provider error with the chain role and operation.
    pub(crate) fn crypto(
        role: ChainRole,
        operation: ChainOperation,
    ) -> impl FnOnce(CryptoError) -> Self {
        move |source| Self::Crypto { role, operation, source }
    }

    /// Chain role the error originated from.
    pub fn role(&self) -> ChainRole {
        match self {
            Self::InvalidValue { role, .. }
            | Self::Crypto { role, .. }
            | Self::CounterExhausted { role, .. }
            | Self::SkipLimit { role, .. }
            | Self::SkipBackwards { role, .. } => *role,
        }
    }

    /// Provider error behind this failure, if any.
    ///
    /// Lets callers tell a malformed foreign key (drop the message) apart
    /// from a derivation failure (abort the conversation).
    pub fn crypto_error(&self) -> Option<&CryptoError> {
        match self {
            Self::Crypto { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn crypto_error_keeps_context() {
        let err = ChainError::crypto(ChainRole::Receiving, ChainOperation::Upgrade)(
            CryptoError::DiffieHellman,
        );

        assert_eq!(err.role(), ChainRole::Receiving);
        assert!(matches!(err.crypto_error(), Some(CryptoError::DiffieHellman)));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "receiving chain upgrade: crypto provider failed");
    }

    #[test]
    fn import_error_names_key_kind() {
        let err = CryptoError::ForeignKeyImport { kind: KeyKind::Public, expected: 32, actual: 31 };
        assert_eq!(err.to_string(), "cannot import public key: expected 32 bytes, got 31");
    }
}
