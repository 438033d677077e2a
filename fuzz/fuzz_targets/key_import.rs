//! Fuzz target for importing foreign key bytes.
//!
//! Arbitrary input must either import cleanly or fail with a typed error.
//! Imported public keys are fed into a DH computation, which must reject
//! low-order points instead of producing a predictable secret.

#![no_main]

use bastion_ratchet::{CryptoError, CryptoProvider, KEY_LEN, X25519Provider};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let provider = X25519Provider::default();

    match provider.import_public_key(data) {
        Ok(public) => {
            assert_eq!(data.len(), KEY_LEN);

            let Ok(private) = provider.import_private_key(data) else {
                unreachable!("same length must import as a private key");
            };
            match provider.compute_shared_secret(&private, &public) {
                Ok(_) | Err(CryptoError::DiffieHellman) => {},
                Err(err) => unreachable!("unexpected DH error: {err}"),
            }
        },
        Err(CryptoError::InvalidValue { .. }) => assert!(data.is_empty()),
        Err(CryptoError::ForeignKeyImport { expected, actual, .. }) => {
            assert_eq!(expected, KEY_LEN);
            assert_eq!(actual, data.len());
        },
        Err(err) => unreachable!("unexpected import error: {err}"),
    }
});
