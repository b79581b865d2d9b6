//! Diagnostic verbosity, raised through the `PROTOCOL_OPENID_DEBUG`
//! environment variable (an integer, `0` when unset).

use std::sync::OnceLock;

static VERBOSITY: OnceLock<u8> = OnceLock::new();

pub(crate) fn verbosity() -> u8 {
    *VERBOSITY.get_or_init(|| {
        std::env::var("PROTOCOL_OPENID_DEBUG")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    })
}

/// Dump a wire payload at `debug!` level when the operator asked for it.
/// Payloads carry key material, so this is strictly opt-in.
pub(crate) fn wire_dump(what: &str, url: &str, payload: &str) {
    if verbosity() >= 1 {
        log::debug!("{} `{}`: {:?}", what, url, payload);
    }
}
