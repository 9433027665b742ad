//! Common test utilities for codebox-auth-core integration tests

use std::sync::Arc;

use codebox_auth_core::{AccessResolver, ManualClock, RuntimeSettings, TokenCodec};

/// Admin secret shared by the integration tests
pub const SECRET: &str = "FileCodeBox2023";

/// Fixed starting time for the manual clock
pub const NOW: i64 = 1_700_000_000;

/// Codec keyed with [`SECRET`] on a manual clock starting at [`NOW`]
pub fn codec_with_clock() -> (TokenCodec, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let codec = TokenCodec::from_secret(SECRET)
        .expect("non-empty secret")
        .with_clock(clock.clone());
    (codec, clock)
}

/// Resolver with a toggleable open-upload setting
#[allow(dead_code)]
pub fn resolver(open_upload: bool) -> (AccessResolver, Arc<RuntimeSettings>, Arc<ManualClock>) {
    let (codec, clock) = codec_with_clock();
    let settings = Arc::new(RuntimeSettings::new(open_upload));
    let resolver = AccessResolver::new(codec, SECRET, settings.clone());
    (resolver, settings, clock)
}
