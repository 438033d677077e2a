//! Double Ratchet message chains for Bastion.
//!
//! Every conversation owns a sending and a receiving chain. Each message
//! advances one of them through a one-way KDF step, so a key exposed today
//! cannot decrypt yesterday's messages. Whenever the peer presents a new
//! ratchet public key, a Diffie-Hellman step re-keys both chains through the
//! root chain.
//!
//! ```text
//!              root key
//!                 │  DH output
//!                 ▼
//!           ┌────────────┐
//!           │ root chain │──> master key + next header key
//!           └────────────┘
//!                 │ upgrade()
//!                 ▼
//! master key ──advance()──> master key ──advance()──> ...
//!      │                         │
//!      └──> message key 0        └──> message key 1
//! ```
//!
//! All cryptography goes through a [`CryptoProvider`] bound at construction
//! via [`ChainConfig`]. [`X25519Provider`] is the default.
//!
//! # Security
//!
//! Secret key types wipe their bytes on drop and print as `Name(..)` in
//! `Debug` output. Chain operations are atomic: a failed derivation leaves
//! the chain exactly as it was. Logging never includes key material.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chain;
pub mod config;
pub mod error;
pub mod keys;
pub mod provider;
pub mod ratchet;

pub use chain::{ReceivingChain, RootChain, SendingChain};
pub use config::{ChainConfig, KdfLabels};
pub use error::{ChainError, ChainOperation, ChainRole, CryptoError, KeyKind};
pub use keys::{
    HeaderKey, KEY_LEN, MessageKey, MessageMasterKey, PrivateKey, PublicKey, RootKey,
    SharedSecretKey,
};
pub use provider::{CryptoProvider, X25519Provider};
pub use ratchet::{ChainPair, DhRatchet};
