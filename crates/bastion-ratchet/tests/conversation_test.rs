//! Conversation tests
//!
//! Two parties drive the public API the way a messaging session would:
//! symmetric chains, DH ratchet steps, out-of-order delivery and failures.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bastion_ratchet::{
    ChainConfig, ChainError, ChainOperation, ChainPair, ChainRole, CryptoError, CryptoProvider,
    DhRatchet, HeaderKey, KEY_LEN, KeyKind, MessageKey, MessageMasterKey, PrivateKey, PublicKey,
    ReceivingChain, RootKey, SendingChain, SharedSecretKey, X25519Provider,
};

struct Party<P> {
    ratchet: DhRatchet<P>,
    chains: ChainPair<P>,
}

impl<P: CryptoProvider> Party<P> {
    /// Key for the next outgoing message plus the ratchet key for the header.
    fn send(&mut self) -> (PublicKey, u64, MessageKey) {
        let number = self.chains.sending.message_number();
        let key = self.chains.sending.advance().unwrap();
        (self.ratchet.local_public_key(), number, key)
    }

    /// Key for an in-order incoming message, stepping the ratchet if needed.
    fn receive(&mut self, ratchet_key: PublicKey, number: u64) -> MessageKey {
        if self.ratchet.needs_step(&ratchet_key) {
            self.ratchet.step(ratchet_key, &mut self.chains).unwrap();
        }
        assert_eq!(self.chains.receiving.message_number(), number);
        self.chains.receiving.advance().unwrap()
    }
}

fn handshake<P: CryptoProvider>(config: &ChainConfig<P>) -> (Party<P>, Party<P>) {
    let root_key = RootKey::new([0x42; KEY_LEN]);
    let alice_header = HeaderKey::new([0xa1; KEY_LEN]);
    let bob_next_header = HeaderKey::new([0xb2; KEY_LEN]);

    let bob_private = config.provider().generate_private_key().unwrap();
    let bob_public = config.provider().public_key(&bob_private);

    let (ratchet, chains) = DhRatchet::responder(
        config.clone(),
        bob_private,
        root_key.clone(),
        bob_next_header.clone(),
        alice_header.clone(),
    );
    let bob = Party { ratchet, chains };

    let (ratchet, chains) =
        DhRatchet::initiator(config.clone(), bob_public, root_key, alice_header, bob_next_header)
            .unwrap();
    let alice = Party { ratchet, chains };

    (alice, bob)
}

#[test]
fn sender_and_receiver_derive_identical_keys() {
    let config = ChainConfig::<X25519Provider>::default();
    let master = MessageMasterKey::new([3; KEY_LEN]);

    let mut sending = SendingChain::new(
        config.clone(),
        master.clone(),
        HeaderKey::new([1; KEY_LEN]),
        HeaderKey::new([2; KEY_LEN]),
    );
    let mut receiving = ReceivingChain::with_keys(
        config,
        master,
        HeaderKey::new([1; KEY_LEN]),
        HeaderKey::new([2; KEY_LEN]),
    );

    for expected_number in 1..=5 {
        assert_eq!(sending.advance().unwrap(), receiving.advance().unwrap());
        assert_eq!(sending.message_number(), expected_number);
        assert_eq!(receiving.message_number(), expected_number);
    }
}

#[test]
fn out_of_order_message_recovered_from_clone() {
    let config = ChainConfig::<X25519Provider>::default();
    let master = MessageMasterKey::new([9; KEY_LEN]);
    let mut receiving = ReceivingChain::with_keys(
        config.clone(),
        master.clone(),
        HeaderKey::new([1; KEY_LEN]),
        HeaderKey::new([2; KEY_LEN]),
    );

    for _ in 0..3 {
        receiving.advance().unwrap();
    }

    // Message 3 is late: keep a copy positioned at it and carry on.
    let mut late = receiving.clone();
    receiving.advance().unwrap();
    receiving.advance().unwrap();

    let mut fresh = ReceivingChain::with_keys(
        config,
        master,
        HeaderKey::new([1; KEY_LEN]),
        HeaderKey::new([2; KEY_LEN]),
    );
    let fourth = (0..4).map(|_| fresh.advance().unwrap()).last().unwrap();

    assert_eq!(late.advance().unwrap(), fourth);
    assert_eq!(receiving.message_number(), 5);
}

#[test]
fn skipped_keys_decrypt_delayed_messages() {
    let config = ChainConfig::<X25519Provider>::default();
    let (mut alice, mut bob) = handshake(&config);

    let sent: Vec<_> = (0..5).map(|_| alice.send()).collect();

    // Message 4 arrives first.
    let (ratchet_key, number, key) = sent[4].clone();
    bob.ratchet.step(ratchet_key, &mut bob.chains).unwrap();
    let skipped = bob.chains.receiving.skip_to(number, 10).unwrap();
    assert_eq!(bob.chains.receiving.advance().unwrap(), key);

    for (number, key) in skipped {
        assert_eq!(key, sent[number as usize].2);
    }
}

#[test]
fn multi_round_conversation() {
    let config = ChainConfig::<X25519Provider>::default();
    let (mut alice, mut bob) = handshake(&config);
    let mut ratchet_keys = Vec::new();

    for round in 0..5 {
        for _ in 0..=round {
            let (ratchet_key, number, key) = alice.send();
            assert_eq!(bob.receive(ratchet_key, number), key);
        }
        ratchet_keys.push(alice.ratchet.local_public_key());

        for _ in 0..2 {
            let (ratchet_key, number, key) = bob.send();
            assert_eq!(alice.receive(ratchet_key, number), key);
        }
        ratchet_keys.push(bob.ratchet.local_public_key());

        // Alice already moved to a generation Bob has not seen yet.
        assert_eq!(alice.chains.sending.header_key(), Some(bob.chains.receiving.next_header_key()));
        assert_eq!(bob.chains.sending.header_key(), alice.chains.receiving.header_key());
    }

    // Every round used fresh ratchet keys on both sides.
    let unique: std::collections::HashSet<_> = ratchet_keys.iter().collect();
    assert_eq!(unique.len(), ratchet_keys.len());
}

#[test]
fn header_announces_previous_chain_length() {
    let config = ChainConfig::<X25519Provider>::default();
    let (mut alice, mut bob) = handshake(&config);

    for _ in 0..3 {
        let (ratchet_key, number, key) = alice.send();
        assert_eq!(bob.receive(ratchet_key, number), key);
    }
    let (ratchet_key, number, key) = bob.send();
    assert_eq!(alice.receive(ratchet_key, number), key);

    assert_eq!(alice.chains.sending.previous_chain_message_count(), 3);
    assert_eq!(alice.chains.sending.message_number(), 0);
}

#[test]
fn responder_cannot_send_before_first_step() {
    let config = ChainConfig::<X25519Provider>::default();
    let (_alice, mut bob) = handshake(&config);

    let result = bob.chains.sending.advance();
    assert!(matches!(
        result,
        Err(ChainError::InvalidValue {
            role: ChainRole::Sending,
            operation: ChainOperation::Advance,
            ..
        })
    ));
}

/// Provider that refuses chain derivations once switched off.
#[derive(Default)]
struct SwitchableProvider {
    inner: X25519Provider,
    broken: AtomicBool,
}

impl CryptoProvider for SwitchableProvider {
    fn advance_chain(
        &self,
        master_key: &MessageMasterKey,
    ) -> Result<(MessageMasterKey, MessageKey), CryptoError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(CryptoError::Derivation { step: "chain" });
        }
        self.inner.advance_chain(master_key)
    }

    fn advance_root(
        &self,
        root_key: &RootKey,
        shared_secret: &SharedSecretKey,
    ) -> Result<(RootKey, MessageMasterKey, HeaderKey), CryptoError> {
        self.inner.advance_root(root_key, shared_secret)
    }

    fn generate_private_key(&self) -> Result<PrivateKey, CryptoError> {
        self.inner.generate_private_key()
    }

    fn public_key(&self, private_key: &PrivateKey) -> PublicKey {
        self.inner.public_key(private_key)
    }

    fn compute_shared_secret(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
    ) -> Result<SharedSecretKey, CryptoError> {
        self.inner.compute_shared_secret(private_key, public_key)
    }
}

#[test]
fn provider_failure_is_atomic_and_recoverable() {
    let provider = Arc::new(SwitchableProvider::default());
    let config = ChainConfig::from_shared(Arc::clone(&provider));
    let (mut alice, _bob) = handshake(&config);

    let mut reference = alice.chains.sending.clone();
    alice.chains.sending.advance().unwrap();
    reference.advance().unwrap();

    provider.broken.store(true, Ordering::SeqCst);
    let err = alice.chains.sending.advance().unwrap_err();
    assert_eq!(err.role(), ChainRole::Sending);
    assert!(matches!(err.crypto_error(), Some(CryptoError::Derivation { .. })));
    assert_eq!(alice.chains.sending.message_number(), 1);

    provider.broken.store(false, Ordering::SeqCst);
    assert_eq!(alice.chains.sending.advance().unwrap(), reference.advance().unwrap());
}

#[test]
fn malformed_ratchet_key_is_rejected_without_side_effects() {
    let config = ChainConfig::<X25519Provider>::default();
    let (mut alice, mut bob) = handshake(&config);

    let bad_key = PublicKey::new([0; KEY_LEN]);
    let err = bob.ratchet.step(bad_key, &mut bob.chains).unwrap_err();
    assert!(matches!(err.crypto_error(), Some(CryptoError::DiffieHellman)));

    // The genuine message still goes through.
    let (ratchet_key, number, key) = alice.send();
    assert_eq!(bob.receive(ratchet_key, number), key);
}

#[test]
fn foreign_key_import_errors() {
    let provider = X25519Provider::default();

    let err = provider.import_public_key(&[1; 16]).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::ForeignKeyImport { kind: KeyKind::Public, expected: KEY_LEN, actual: 16 }
    ));
    assert_eq!(err.to_string(), "cannot import public key: expected 32 bytes, got 16");

    assert!(matches!(provider.import_private_key(&[]), Err(CryptoError::InvalidValue { .. })));

    let private = provider.import_private_key(&[7; KEY_LEN]).unwrap();
    let public = provider.import_public_key(provider.public_key(&private).as_bytes()).unwrap();
    assert_eq!(public, provider.public_key(&private));
}
