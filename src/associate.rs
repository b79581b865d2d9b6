//! Association negotiation with an OP.
//!
//! <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8>
//!
//! Associations are optional: every failure here is surfaced to the
//! exchange, logged, and the redirect proceeds without a handle.

use anyhow::Context;
use chrono::{Duration, Utc};
use lazy_regex::regex_is_match;

use crate::association::{validate_handle, AssocType, Association, SessionType};
use crate::constants::{
    OPENID_ASSOCIATION_TYPE, OPENID_AUTH_NAMESPACE, OPENID_DH_CONSUMER_PUBLIC,
    OPENID_ERROR_CODE_UNSUPPORTED_TYPE, OPENID_MODE, OPENID_MODE_ASSOCIATE, OPENID_NAMESPACE,
    OPENID_SESSION_TYPE,
};
use crate::dh::{self, DhKeyPair};
use crate::http::HttpFetch;
use crate::params::Parameters;
use crate::util::debug;

/// Negotiation parameters; renegotiated at most once per exchange when
/// the OP answers `unsupported-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Preferences {
    pub(crate) assoc_type: AssocType,
    pub(crate) session_type: SessionType,
}

impl Default for Preferences {
    fn default() -> Preferences {
        Preferences {
            assoc_type: AssocType::HmacSha256,
            session_type: SessionType::DhSha256,
        }
    }
}

enum Negotiated {
    Done(Association),
    /// The OP rejected our parameters and suggested these instead.
    Unsupported(Preferences),
}

/// Drive the negotiation, including the single renegotiation attempt.
/// `retry_used` belongs to the exchange so a second `unsupported-type`
/// answer fails instead of looping.
pub(crate) async fn associate(
    fetch: &dyn HttpFetch,
    op_endpoint: &str,
    mut prefs: Preferences,
    retry_used: &mut bool,
) -> anyhow::Result<Association> {
    loop {
        match associate_once(fetch, op_endpoint, prefs).await? {
            Negotiated::Done(association) => return Ok(association),
            Negotiated::Unsupported(suggested) => {
                if *retry_used {
                    anyhow::bail!("provider rejected the association parameters twice");
                }
                *retry_used = true;
                log::info!(
                    "provider wants {} over {}, renegotiating",
                    suggested.assoc_type.as_str(),
                    suggested.session_type.as_str()
                );
                prefs = suggested;
            }
        }
    }
}

async fn associate_once(
    fetch: &dyn HttpFetch,
    op_endpoint: &str,
    prefs: Preferences,
) -> anyhow::Result<Negotiated> {
    // A cleartext mac key must never cross an unprotected channel.
    if !prefs.session_type.is_encrypted() && !op_endpoint.starts_with("https://") {
        anyhow::bail!("refusing a no-encryption session over a plain http endpoint");
    }

    let keys = prefs.session_type.is_encrypted().then(DhKeyPair::generate);

    let mut request = Parameters::new();
    request.set(OPENID_NAMESPACE, OPENID_AUTH_NAMESPACE);
    request.set(OPENID_MODE, OPENID_MODE_ASSOCIATE);
    request.set(OPENID_ASSOCIATION_TYPE, prefs.assoc_type.as_str());
    request.set(OPENID_SESSION_TYPE, prefs.session_type.as_str());
    if let Some(keys) = &keys {
        // Default modulus and generator are implied when absent.
        request.set(OPENID_DH_CONSUMER_PUBLIC, &keys.public_base64());
    }

    let resp = fetch
        .post(op_endpoint, request.pairs())
        .await
        .context("couldn't post the association request")?;
    if resp.status != 200 {
        anyhow::bail!("association endpoint answered with status {}", resp.status);
    }
    debug::wire_dump("association response from", op_endpoint, &resp.body);

    let fields = Parameters::parse(&resp.body);
    if fields.get("ns") != Some(OPENID_AUTH_NAMESPACE) {
        anyhow::bail!("Wrong OpenID 2.0 response");
    }

    if let Some(error) = fields.get("error") {
        if fields.get("error_code") == Some(OPENID_ERROR_CODE_UNSUPPORTED_TYPE) {
            if let (Some(assoc_type), Some(session_type)) =
                (fields.get("assoc_type"), fields.get("session_type"))
            {
                return Ok(Negotiated::Unsupported(Preferences {
                    assoc_type: assoc_type.parse()?,
                    session_type: session_type.parse()?,
                }));
            }
        }
        anyhow::bail!("provider refused the association: {}", error);
    }

    let handle = fields
        .get("assoc_handle")
        .context("association response is missing `assoc_handle`")?;
    let session_type = fields
        .get("session_type")
        .context("association response is missing `session_type`")?;
    let assoc_type = fields
        .get("assoc_type")
        .context("association response is missing `assoc_type`")?;
    let expires_in = fields
        .get("expires_in")
        .context("association response is missing `expires_in`")?;

    // The OP must echo what it accepted, anything else smells like a
    // downgrade.
    if assoc_type != prefs.assoc_type.as_str() || session_type != prefs.session_type.as_str() {
        anyhow::bail!("provider echoed association parameters that differ from the request");
    }
    if !regex_is_match!(r"^\d+$", expires_in) {
        anyhow::bail!("association response field `expires_in` is not an unsigned integer");
    }
    let expires_in: i64 = expires_in.parse().context("couldn't parse `expires_in`")?;

    let secret = extract_mac_key(&fields, prefs.session_type, keys.as_ref())?;
    validate_handle(handle).context("association response carries a malformed handle")?;

    Ok(Negotiated::Done(Association {
        assoc_type: prefs.assoc_type,
        session_type: prefs.session_type,
        handle: handle.to_string(),
        secret,
        expires_at: Utc::now() + Duration::seconds(expires_in),
    }))
}

fn extract_mac_key(
    fields: &Parameters,
    session_type: SessionType,
    keys: Option<&DhKeyPair>,
) -> anyhow::Result<Vec<u8>> {
    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine;

    match keys {
        Some(keys) => {
            let server_public = fields
                .get("dh_server_public")
                .context("encrypted session response is missing `dh_server_public`")?;
            let enc_mac_key = fields
                .get("enc_mac_key")
                .context("encrypted session response is missing `enc_mac_key`")?;

            let server_public = Base64
                .decode(server_public)
                .context("couldn't decode `dh_server_public` as base 64")?;
            let enc_mac_key = Base64
                .decode(enc_mac_key)
                .context("couldn't decode `enc_mac_key` as base 64")?;

            let shared = keys.shared_secret(&dh::from_btwoc(&server_public));
            dh::decrypt_mac_key(session_type, &shared, &enc_mac_key)
        }
        None => {
            let mac_key = fields
                .get("mac_key")
                .context("plain session response is missing `mac_key`")?;
            Base64
                .decode(mac_key)
                .context("couldn't decode `mac_key` as base 64")
        }
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;

    use super::*;
    use crate::http::FetchResponse;

    /// Always answers 200 with the same body.
    struct StaticFetcher {
        body: String,
    }

    #[async_trait]
    impl HttpFetch for StaticFetcher {
        async fn get(&self, _url: &str) -> anyhow::Result<FetchResponse> {
            anyhow::bail!("association never fetches documents")
        }
        async fn post(
            &self,
            _url: &str,
            _form: &[(String, String)],
        ) -> anyhow::Result<FetchResponse> {
            Ok(FetchResponse {
                status: 200,
                body: self.body.clone(),
                headers: Default::default(),
            })
        }
    }

    fn kv(lines: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (k, v) in lines {
            body.push_str(k);
            body.push(':');
            body.push_str(v);
            body.push('\n');
        }
        body
    }

    fn mac_key_b64() -> String {
        use base64::engine::general_purpose::STANDARD as Base64;
        use base64::Engine;
        Base64.encode(b"a".repeat(32))
    }

    fn plain_prefs() -> Preferences {
        Preferences {
            assoc_type: AssocType::HmacSha256,
            session_type: SessionType::NoEncryption,
        }
    }

    #[tokio::test]
    async fn no_encryption_requires_tls() {
        let fetch = StaticFetcher { body: String::new() };
        let mut retry = false;
        let result = associate(&fetch, "http://op.example/srv", plain_prefs(), &mut retry).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn accepts_a_plain_session_over_tls() -> anyhow::Result<()> {
        let mac_key = mac_key_b64();
        let fetch = StaticFetcher {
            body: kv(&[
                ("ns", OPENID_AUTH_NAMESPACE),
                ("assoc_handle", "h1"),
                ("session_type", "no-encryption"),
                ("assoc_type", "HMAC-SHA256"),
                ("expires_in", "3600"),
                ("mac_key", &mac_key),
            ]),
        };

        let mut retry = false;
        let association =
            associate(&fetch, "https://op.example/srv", plain_prefs(), &mut retry).await?;
        assert_eq!(association.handle, "h1");
        assert_eq!(association.secret, b"a".repeat(32));
        assert!(!association.is_encrypted());
        assert!(!association.is_expired(Utc::now()));
        assert!(!retry);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_the_wrong_namespace() {
        let fetch = StaticFetcher {
            body: kv(&[("ns", "http://openid.net/signon/1.1")]),
        };
        let mut retry = false;
        let err = associate(&fetch, "https://op.example/srv", plain_prefs(), &mut retry)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Wrong OpenID 2.0 response"));
    }

    #[tokio::test]
    async fn rejects_an_echo_mismatch() {
        let fetch = StaticFetcher {
            body: kv(&[
                ("ns", OPENID_AUTH_NAMESPACE),
                ("assoc_handle", "h1"),
                ("session_type", "no-encryption"),
                ("assoc_type", "HMAC-SHA1"),
                ("expires_in", "3600"),
                ("mac_key", &mac_key_b64()),
            ]),
        };
        let mut retry = false;
        assert!(
            associate(&fetch, "https://op.example/srv", plain_prefs(), &mut retry)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn rejects_a_malformed_expiry() {
        for expires_in in ["-1", "soon", "3600.5", ""] {
            let fetch = StaticFetcher {
                body: kv(&[
                    ("ns", OPENID_AUTH_NAMESPACE),
                    ("assoc_handle", "h1"),
                    ("session_type", "no-encryption"),
                    ("assoc_type", "HMAC-SHA256"),
                    ("expires_in", expires_in),
                    ("mac_key", &mac_key_b64()),
                ]),
            };
            let mut retry = false;
            assert!(
                associate(&fetch, "https://op.example/srv", plain_prefs(), &mut retry)
                    .await
                    .is_err(),
                "expires_in `{}` should be rejected",
                expires_in
            );
        }
    }

    #[tokio::test]
    async fn rejects_a_malformed_handle() {
        let fetch = StaticFetcher {
            body: kv(&[
                ("ns", OPENID_AUTH_NAMESPACE),
                ("assoc_handle", "with space"),
                ("session_type", "no-encryption"),
                ("assoc_type", "HMAC-SHA256"),
                ("expires_in", "3600"),
                ("mac_key", &mac_key_b64()),
            ]),
        };
        let mut retry = false;
        assert!(
            associate(&fetch, "https://op.example/srv", plain_prefs(), &mut retry)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn a_plain_error_response_is_surfaced() {
        let fetch = StaticFetcher {
            body: kv(&[
                ("ns", OPENID_AUTH_NAMESPACE),
                ("error", "no associations today"),
            ]),
        };
        let mut retry = false;
        let err = associate(&fetch, "https://op.example/srv", plain_prefs(), &mut retry)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no associations today"));
        assert!(!retry);
    }
}
