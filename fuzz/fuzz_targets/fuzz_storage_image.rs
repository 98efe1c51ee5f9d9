//! Fuzz target: boot from an arbitrary byte image
//!
//! Treats the input as the persisted store (padded or truncated to the
//! image size) and runs the boot path plus a short stretch of lockout
//! ticks, verifying:
//! - No panics on any image
//! - A loaded credential is never longer than 16 symbols
//! - The lockout level always lands inside [base, max]
//! - Remaining time never exceeds the level ceiling
//!
//! cargo fuzz run fuzz_storage_image

#![no_main]

use keyguard::adapters::nvs::NvsAdapter;
use keyguard::config::AccessConfig;
use keyguard::credential::CredentialStore;
use keyguard::layout::{MAX_CREDENTIAL_LEN, STORE_SIZE};
use keyguard::lockout::LockoutEngine;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut image = [0xFFu8; STORE_SIZE];
    let n = data.len().min(STORE_SIZE);
    image[..n].copy_from_slice(&data[..n]);
    let mut nvs = NvsAdapter::from_image(image);

    let config = AccessConfig::default();

    let creds = CredentialStore::new(config.min_credential_len);
    if let Ok((record, _)) = creds.load(&mut nvs) {
        assert!(record.len() <= MAX_CREDENTIAL_LEN);
        assert!(!record.provisioned || !record.is_empty());
    }

    let mut engine = LockoutEngine::new(&config);
    let _ = engine.init(&mut nvs, 0);

    let base = config.base_lockout_ms();
    let max = config.max_lockout_ms();
    for step in 0..8u64 {
        let now = step * 1_000;
        let _ = engine.tick(&mut nvs, now);
        let total = engine.total_duration_ms();
        assert!((base..=max).contains(&total), "level {} out of range", total);
        assert!(engine.remaining_ms(now) <= max);
    }
});
