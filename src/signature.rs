//! Assertion signature computation and checking.
//!
//! <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.6>

use std::collections::HashMap;

use anyhow::Context;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::association::AssocType;
use crate::constants::OPENID_FIELD_PREFIX;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Rebuild the key-value body the signature covers: the fields of
/// `openid.signed`, in exactly their given order, values taken from the
/// prefixed parameter map.
fn signed_body(signed: &str, params: &HashMap<String, String>) -> anyhow::Result<String> {
    let mut body = String::new();
    for name in signed.split(',') {
        let value = params
            .get(&format!("{}{}", OPENID_FIELD_PREFIX, name))
            .with_context(|| format!("signed field `{}` is missing from the response", name))?;
        body.push_str(name);
        body.push(':');
        body.push_str(value);
        body.push('\n');
    }
    Ok(body)
}

fn mac_bytes(assoc_type: AssocType, mac_key: &[u8], body: &str) -> anyhow::Result<Vec<u8>> {
    let tag = match assoc_type {
        AssocType::HmacSha1 => {
            let mut mac =
                HmacSha1::new_from_slice(mac_key).context("mac key has an invalid length")?;
            mac.update(body.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        AssocType::HmacSha256 => {
            let mut mac =
                HmacSha256::new_from_slice(mac_key).context("mac key has an invalid length")?;
            mac.update(body.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(tag)
}

/// Base 64 signature over the signed fields, as an OP would emit it.
pub fn compute_signature(
    assoc_type: AssocType,
    mac_key: &[u8],
    signed: &str,
    params: &HashMap<String, String>,
) -> anyhow::Result<String> {
    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine;

    let body = signed_body(signed, params)?;
    Ok(Base64.encode(mac_bytes(assoc_type, mac_key, &body)?))
}

/// Check an incoming `openid.sig`. The comparison is constant time.
pub fn verify_signature(
    assoc_type: AssocType,
    mac_key: &[u8],
    signed: &str,
    params: &HashMap<String, String>,
    sig: &str,
) -> anyhow::Result<bool> {
    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine;

    let body = signed_body(signed, params)?;
    let sig = Base64
        .decode(sig)
        .context("couldn't decode `openid.sig` as base 64")?;

    let matches = match assoc_type {
        AssocType::HmacSha1 => {
            let mut mac =
                HmacSha1::new_from_slice(mac_key).context("mac key has an invalid length")?;
            mac.update(body.as_bytes());
            mac.verify_slice(&sig).is_ok()
        }
        AssocType::HmacSha256 => {
            let mut mac =
                HmacSha256::new_from_slice(mac_key).context("mac key has an invalid length")?;
            mac.update(body.as_bytes());
            mac.verify_slice(&sig).is_ok()
        }
    };
    Ok(matches)
}

#[cfg(test)]
mod test {
    use super::*;

    const SIGNED: &str = "ns,mode,identity,return_to";

    fn assertion_map() -> HashMap<String, String> {
        HashMap::from([
            (
                "openid.ns".to_string(),
                "http://specs.openid.net/auth/2.0".to_string(),
            ),
            ("openid.mode".to_string(), "id_res".to_string()),
            (
                "openid.identity".to_string(),
                "http://user.example/".to_string(),
            ),
            (
                "openid.return_to".to_string(),
                "http://rp.example/cb".to_string(),
            ),
        ])
    }

    fn mac_key() -> Vec<u8> {
        hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4").unwrap()
    }

    #[test]
    fn signatures_are_deterministic() -> anyhow::Result<()> {
        let params = assertion_map();
        let a = compute_signature(AssocType::HmacSha256, &mac_key(), SIGNED, &params)?;
        let b = compute_signature(AssocType::HmacSha256, &mac_key(), SIGNED, &params)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn computed_signatures_verify() -> anyhow::Result<()> {
        let params = assertion_map();
        for assoc_type in [AssocType::HmacSha1, AssocType::HmacSha256] {
            let sig = compute_signature(assoc_type, &mac_key(), SIGNED, &params)?;
            assert!(verify_signature(assoc_type, &mac_key(), SIGNED, &params, &sig)?);
        }
        Ok(())
    }

    #[test]
    fn tampering_breaks_the_signature() -> anyhow::Result<()> {
        let params = assertion_map();
        let sig = compute_signature(AssocType::HmacSha256, &mac_key(), SIGNED, &params)?;

        let mut tampered = params.clone();
        tampered.insert(
            "openid.identity".to_string(),
            "http://mallory.example/".to_string(),
        );
        assert!(!verify_signature(
            AssocType::HmacSha256,
            &mac_key(),
            SIGNED,
            &tampered,
            &sig
        )?);

        // A different key fails too.
        assert!(!verify_signature(
            AssocType::HmacSha256,
            &[0x55; 32],
            SIGNED,
            &params,
            &sig
        )?);
        Ok(())
    }

    #[test]
    fn the_algorithms_differ() -> anyhow::Result<()> {
        let params = assertion_map();
        let sha1 = compute_signature(AssocType::HmacSha1, &mac_key(), SIGNED, &params)?;
        let sha256 = compute_signature(AssocType::HmacSha256, &mac_key(), SIGNED, &params)?;
        assert_ne!(sha1, sha256);
        Ok(())
    }

    #[test]
    fn a_missing_signed_field_is_an_error() {
        let params = assertion_map();
        let result = compute_signature(
            AssocType::HmacSha256,
            &mac_key(),
            "ns,mode,response_nonce",
            &params,
        );
        assert!(result.is_err());
    }

    #[test]
    fn garbage_incoming_signatures_are_an_error() {
        let params = assertion_map();
        let result = verify_signature(
            AssocType::HmacSha256,
            &mac_key(),
            SIGNED,
            &params,
            "not base 64 !!!",
        );
        assert!(result.is_err());
    }
}
