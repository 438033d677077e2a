//! Fuzz target for chain operation sequences.
//!
//! Drives a sending chain and its peer's receiving chain with arbitrary
//! advance, skip and upgrade operations. Both sides must stay in lockstep:
//! same message numbers and identical keys, whatever the sequence.

#![no_main]

use bastion_ratchet::{
    ChainConfig, ChainError, HeaderKey, KEY_LEN, MessageMasterKey, ReceivingChain, SendingChain,
    X25519Provider,
};
use libfuzzer_sys::fuzz_target;

const MAX_SKIP: u64 = 32;

fuzz_target!(|data: &[u8]| {
    let config = ChainConfig::<X25519Provider>::default();
    let mut sending = SendingChain::new(
        config.clone(),
        MessageMasterKey::new([1; KEY_LEN]),
        HeaderKey::new([2; KEY_LEN]),
        HeaderKey::new([3; KEY_LEN]),
    );
    let mut receiving = ReceivingChain::with_keys(
        config,
        MessageMasterKey::new([1; KEY_LEN]),
        HeaderKey::new([2; KEY_LEN]),
        HeaderKey::new([3; KEY_LEN]),
    );

    for (index, byte) in data.iter().take(256).enumerate() {
        match byte % 4 {
            0 | 1 => {
                let (Ok(sent), Ok(received)) = (sending.advance(), receiving.advance()) else {
                    unreachable!("advance on a keyed chain cannot fail");
                };
                assert_eq!(sent, received);
            },
            2 => {
                let count = u64::from(byte >> 2);
                let target = receiving.message_number() + count;
                match receiving.skip_to(target, MAX_SKIP) {
                    Ok(skipped) => {
                        assert!(count <= MAX_SKIP);
                        for (number, key) in skipped {
                            assert_eq!(number, sending.message_number());
                            let Ok(sent) = sending.advance() else {
                                unreachable!("advance on a keyed chain cannot fail");
                            };
                            assert_eq!(sent, key);
                        }
                    },
                    Err(ChainError::SkipLimit { .. }) => assert!(count > MAX_SKIP),
                    Err(err) => unreachable!("unexpected skip error: {err}"),
                }
            },
            _ => {
                let seed = [*byte ^ index as u8; KEY_LEN];
                let count = sending.message_number();
                sending.upgrade(MessageMasterKey::new(seed), HeaderKey::new(seed));
                receiving.upgrade(MessageMasterKey::new(seed), HeaderKey::new(seed));
                assert_eq!(sending.previous_chain_message_count(), count);
                assert_eq!(sending.header_key(), receiving.header_key());
            },
        }

        assert_eq!(sending.message_number(), receiving.message_number());
    }
});
