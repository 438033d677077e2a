//! Key value types.
//!
//! Every key is a fixed 32-byte value that is zeroized when dropped. Secret
//! keys never implement `Copy`; duplication goes through `Clone`, which
//! produces an independent copy of the bytes. `Debug` output never contains
//! secret bytes.

use std::fmt;

use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length in bytes of every key handled by the ratchet.
pub const KEY_LEN: usize = 32;

/// Defines a 32-byte symmetric secret that zeroizes on drop.
macro_rules! secret_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; KEY_LEN]);

        impl $name {
            /// Wrap raw key bytes.
            pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
                Self(bytes)
            }

            /// Raw key bytes.
            pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
                &self.0
            }
        }

        impl From<[u8; KEY_LEN]> for $name {
            fn from(bytes: [u8; KEY_LEN]) -> Self {
                Self::new(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

secret_key! {
    /// Root chain key.
    ///
    /// Initially the secret agreed during the handshake, afterwards the root
    /// output of every DH ratchet step.
    RootKey
}

secret_key! {
    /// Message-master key ("chain key") of a sending or receiving chain.
    ///
    /// Replaced on every advance. A superseded value must be treated as
    /// compromised and is wiped when the chain drops it.
    MessageMasterKey
}

secret_key! {
    /// Key the transport layer uses to encrypt message headers.
    HeaderKey
}

secret_key! {
    /// Per-message key, the terminal output of a chain advance.
    ///
    /// Consumed exactly once by the AEAD layer and then dropped.
    MessageKey
}

secret_key! {
    /// Output of a Diffie-Hellman computation.
    ///
    /// Fed straight into a root chain advance and never stored.
    SharedSecretKey
}

/// X25519 private key.
///
/// Holds the curve scalar directly, so DH and public key derivation never
/// copy the secret out. Has no equality, hashing or `Debug` output of its
/// bytes.
#[derive(Clone)]
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Wrap raw private key bytes (e.g. taken from a handshake).
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.0
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

// `StaticSecret` wipes itself when dropped.
impl ZeroizeOnDrop for PrivateKey {}

impl From<[u8; KEY_LEN]> for PrivateKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// X25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    /// Wrap raw public key bytes.
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes, as sent in message headers.
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for PublicKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}
