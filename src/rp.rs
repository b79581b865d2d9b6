//! The relying party state machine.
//!
//! A [`RelyingParty`] drives one authentication exchange at a time:
//! the user-agent branch (normalize, discover, optionally associate,
//! redirect) and the OP-callback branch (classify `openid.mode`, verify
//! `id_res` assertions). It holds mutable state between the suspension
//! points and must not be shared across parallel exchanges; call
//! [`RelyingParty::clear`] to reuse it for the next one.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::associate::{associate, Preferences};
use crate::association::{AssocType, Association, SessionType};
use crate::constants::{
    OPENID_ASSOCIATION_HANDLE, OPENID_AUTH_NAMESPACE, OPENID_CLAIMED_ID, OPENID_IDENTITY,
    OPENID_INVALIDATE_HANDLE, OPENID_MODE, OPENID_MODE_CANCEL, OPENID_MODE_CHECKID_SETUP,
    OPENID_MODE_CHECK_AUTHENTICATION, OPENID_MODE_ERROR, OPENID_MODE_IDENTIFIER_RESPONSE,
    OPENID_MODE_SETUP_NEEDED, OPENID_NAMESPACE, OPENID_OP_ENDPOINT, OPENID_REALM,
    OPENID_RESPONSE_NONCE, OPENID_RETURN_TO, OPENID_SIGNATURE, OPENID_SIGNED_FIELDS,
    OPENID_TRUST_ROOT, OPENID_USER_SETUP_URL,
};
use crate::discovery::{Discoverer, Discovery};
use crate::http::HttpFetch;
use crate::identifier::Identifier;
use crate::nonce::Nonce;
use crate::params::Parameters;
use crate::signature;
use crate::store::AssociationStore;
use crate::util::debug;

/// Result of driving [`RelyingParty::authenticate`] one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the user agent to the OP; `params` is the prefixed map the
    /// `url` already carries in its query.
    Redirect {
        url: String,
        params: HashMap<String, String>,
    },
    /// The assertion checked out.
    Verified { claimed_identifier: String },
    /// The user declined at the OP.
    Cancel,
    /// A 2.0 OP needs user interaction before it can answer.
    SetupNeeded,
    /// A 1.1 OP wants the user sent here first.
    UserSetupUrl { url: String },
    /// The exchange failed; `reason` is for the host's logs, never for
    /// the OP.
    Error { reason: String },
    /// The request carried nothing addressed to us.
    Ignored,
}

pub struct RelyingParty {
    return_to: String,
    realm: Option<String>,
    fetch: Arc<dyn HttpFetch>,
    store: Option<Arc<dyn AssociationStore>>,
    discoverer: Discoverer,
    prefs: Preferences,
    discovery: Option<Discovery>,
    association: Option<Association>,
    last_error: Option<String>,
    associate_retry_used: bool,
}

impl RelyingParty {
    /// `return_to` is required up front; an exchange cannot even start
    /// without knowing where the OP should send the user back.
    pub fn new(return_to: impl Into<String>, fetch: Arc<dyn HttpFetch>) -> RelyingParty {
        RelyingParty {
            return_to: return_to.into(),
            realm: None,
            fetch,
            store: None,
            discoverer: Discoverer::new(),
            prefs: Preferences::default(),
            discovery: None,
            association: None,
            last_error: None,
            associate_retry_used: false,
        }
    }

    /// Without a store, association is skipped and every assertion is
    /// checked directly against the OP.
    pub fn with_store(mut self, store: Arc<dyn AssociationStore>) -> RelyingParty {
        self.store = Some(store);
        self
    }

    /// Trust realm presented to the user; defaults to `return_to`.
    pub fn with_realm(mut self, realm: impl Into<String>) -> RelyingParty {
        self.realm = Some(realm.into());
        self
    }

    pub fn with_discoverer(mut self, discoverer: Discoverer) -> RelyingParty {
        self.discoverer = discoverer;
        self
    }

    pub fn with_association_preferences(
        mut self,
        assoc_type: AssocType,
        session_type: SessionType,
    ) -> RelyingParty {
        self.prefs = Preferences {
            assoc_type,
            session_type,
        };
        self
    }

    pub fn return_to(&self) -> &str {
        &self.return_to
    }

    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }

    pub fn association(&self) -> Option<&Association> {
        self.association.as_ref()
    }

    /// Human readable reason for the last failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Reset the per-exchange state so the context can be reused.
    pub fn clear(&mut self) {
        self.discovery = None;
        self.association = None;
        self.last_error = None;
        self.associate_retry_used = false;
    }

    fn fail(&mut self, reason: impl Into<String>) -> Outcome {
        let reason = reason.into();
        log::warn!("authentication failed: {}", reason);
        self.last_error = Some(reason.clone());
        Outcome::Error { reason }
    }

    /// Drive one step of the exchange from the request parameters the
    /// host received.
    ///
    /// A request carrying `openid_identifier` starts an exchange; one
    /// carrying `openid.mode` finishes it; anything else is ignored.
    pub async fn authenticate(&mut self, request: &Parameters) -> Outcome {
        if request.contains("openid_identifier") {
            return self.begin(request).await;
        }
        if request.contains(OPENID_MODE) {
            return self.finish(request).await;
        }
        Outcome::Ignored
    }

    async fn begin(&mut self, request: &Parameters) -> Outcome {
        self.clear();

        let Some(raw) = request.get("openid_identifier") else {
            return Outcome::Ignored;
        };
        let identifier: Identifier = match raw.parse() {
            Ok(identifier) => identifier,
            Err(err) => {
                let err = err.context("couldn't normalize the supplied identifier");
                return self.fail(format!("{:#}", err));
            }
        };

        let discovery = match self
            .discoverer
            .discover(self.fetch.as_ref(), &identifier)
            .await
        {
            Ok(discovery) => discovery,
            Err(err) => return self.fail(format!("{:#}", err.context("discovery failed"))),
        };

        // Association is optional: a failed negotiation still redirects,
        // verification then falls back to the direct flavor.
        let mut association = None;
        if let Some(store) = &self.store {
            match associate(
                self.fetch.as_ref(),
                &discovery.op_endpoint,
                self.prefs,
                &mut self.associate_retry_used,
            )
            .await
            {
                Ok(negotiated) => {
                    if let Err(err) = store.store(&negotiated.handle, negotiated.to_fields()).await
                    {
                        log::warn!(
                            "couldn't persist association `{}`: {:#}",
                            negotiated.handle,
                            err
                        );
                    } else {
                        association = Some(negotiated);
                    }
                }
                Err(err) => {
                    log::warn!(
                        "association with `{}` failed: {:#}",
                        discovery.op_endpoint,
                        err
                    );
                    self.last_error = Some(format!("{:#}", err));
                }
            }
        }

        let realm = self.realm.as_deref().unwrap_or(&self.return_to);
        let params = redirect_params(&discovery, realm, &self.return_to, association.as_ref());
        let url = match redirect_url(&discovery.op_endpoint, &params) {
            Ok(url) => url,
            Err(err) => return self.fail(format!("{:#}", err)),
        };

        self.discovery = Some(discovery);
        self.association = association;
        Outcome::Redirect {
            url,
            params: params.to_map_prefixed(),
        }
    }

    async fn finish(&mut self, request: &Parameters) -> Outcome {
        let Some(mode) = request.get(OPENID_MODE) else {
            return Outcome::Ignored;
        };
        let mode = mode.to_string();
        let is_v2 = request.get(OPENID_NAMESPACE) == Some(OPENID_AUTH_NAMESPACE);

        match mode.as_str() {
            OPENID_MODE_CANCEL => Outcome::Cancel,
            OPENID_MODE_ERROR => {
                let reason = request
                    .get("error")
                    .unwrap_or("provider reported an error")
                    .to_string();
                self.last_error = Some(reason.clone());
                Outcome::Error { reason }
            }
            OPENID_MODE_SETUP_NEEDED if is_v2 => Outcome::SetupNeeded,
            OPENID_MODE_IDENTIFIER_RESPONSE => {
                if !is_v2 {
                    // A 1.1 negative assertion to checkid_immediate.
                    if let Some(url) = request.get(OPENID_USER_SETUP_URL) {
                        return Outcome::UserSetupUrl {
                            url: url.to_string(),
                        };
                    }
                }
                self.verify(request, is_v2).await
            }
            other => self.fail(format!("Unknown mode `{}`", other)),
        }
    }

    async fn verify(&mut self, request: &Parameters, is_v2: bool) -> Outcome {
        // The assertion must be addressed to exactly our callback.
        if request.get(OPENID_RETURN_TO) != Some(self.return_to.as_str()) {
            return self.fail("assertion return_to doesn't match the configured value");
        }

        let Some(identity) = request.get(OPENID_IDENTITY) else {
            return self.fail("assertion is missing `openid.identity`");
        };
        let identity = identity.to_string();
        let claimed = if is_v2 {
            request
                .get(OPENID_CLAIMED_ID)
                .unwrap_or(&identity)
                .to_string()
        } else {
            identity.clone()
        };

        if is_v2 {
            let Some(raw_nonce) = request.get(OPENID_RESPONSE_NONCE) else {
                return self.fail("assertion is missing `openid.response_nonce`");
            };
            let nonce: Nonce = match raw_nonce.parse() {
                Ok(nonce) => nonce,
                Err(err) => return self.fail(format!("{:#}", err)),
            };
            if !nonce.is_fresh(Utc::now()) {
                return self.fail("assertion response nonce is outside the freshness window");
            }
        }

        // The OP may flag a compromised handle for removal.
        if let (Some(handle), Some(store)) = (request.get(OPENID_INVALIDATE_HANDLE), &self.store) {
            log::info!("provider invalidated association `{}`", handle);
            store.remove(handle).await;
        }

        if let Some(association) = self.find_association(request).await {
            if association.is_expired(Utc::now()) {
                log::debug!("stored association `{}` has expired", association.handle);
                if let Some(store) = &self.store {
                    store.remove(&association.handle).await;
                }
            } else {
                match check_signature(&association, request) {
                    Ok(true) => {
                        return Outcome::Verified {
                            claimed_identifier: claimed,
                        }
                    }
                    Ok(false) => log::warn!(
                        "assertion signature mismatch, falling back to direct verification"
                    ),
                    Err(err) => return self.fail(format!("{:#}", err)),
                }
            }
        }

        self.verify_direct(request, &identity, claimed, is_v2).await
    }

    async fn find_association(&self, request: &Parameters) -> Option<Association> {
        let handle = request.get(OPENID_ASSOCIATION_HANDLE)?;
        let store = self.store.as_ref()?;
        let fields = store.find(handle).await?;
        match Association::from_fields(handle, &fields) {
            Ok(association) => Some(association),
            Err(err) => {
                log::warn!("stored association `{}` is unusable: {:#}", handle, err);
                None
            }
        }
    }

    /// Stateless fallback: ask the OP itself whether it issued the
    /// assertion.
    ///
    /// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.11.4.2>
    async fn verify_direct(
        &mut self,
        request: &Parameters,
        identity: &str,
        claimed: String,
        is_v2: bool,
    ) -> Outcome {
        let op_endpoint = if is_v2 {
            match request.get(OPENID_OP_ENDPOINT) {
                Some(endpoint) => endpoint.to_string(),
                None => return self.fail("assertion is missing `openid.op_endpoint`"),
            }
        } else {
            // 1.1 assertions don't carry the endpoint, rediscover it from
            // the asserted identity.
            let identifier: Identifier = match identity.parse() {
                Ok(identifier) => identifier,
                Err(err) => return self.fail(format!("{:#}", err)),
            };
            match self
                .discoverer
                .discover(self.fetch.as_ref(), &identifier)
                .await
            {
                Ok(discovery) => discovery.op_endpoint,
                Err(err) => {
                    let err = err.context("couldn't rediscover the op endpoint");
                    return self.fail(format!("{:#}", err));
                }
            }
        };

        let mut check = request.clone();
        check.set(OPENID_MODE, OPENID_MODE_CHECK_AUTHENTICATION);

        let resp = match self.fetch.post(&op_endpoint, check.pairs()).await {
            Ok(resp) => resp,
            Err(err) => {
                let err = err.context("couldn't reach the op for direct verification");
                return self.fail(format!("{:#}", err));
            }
        };
        if resp.status != 200 {
            return self.fail(format!(
                "direct verification answered with status {}",
                resp.status
            ));
        }
        debug::wire_dump("direct verification response from", &op_endpoint, &resp.body);

        let fields = Parameters::parse(&resp.body);
        if fields.get("is_valid") == Some("true") {
            return Outcome::Verified {
                claimed_identifier: claimed,
            };
        }

        if let Some(handle) = fields.get("invalidate_handle") {
            // Recoverable: drop the handle and have the host restart the
            // exchange, which will negotiate a fresh association.
            if let Some(store) = &self.store {
                store.remove(handle).await;
            }
            return self.fail(format!(
                "op invalidated association `{}` during direct verification, restart the exchange",
                handle
            ));
        }
        self.fail("the op rejected the assertion")
    }
}

/// Recompute the signature over the `openid.signed` fields with the
/// stored association's secret.
fn check_signature(association: &Association, request: &Parameters) -> anyhow::Result<bool> {
    let signed = request
        .get(OPENID_SIGNED_FIELDS)
        .context("assertion is missing `openid.signed`")?;
    let sig = request
        .get(OPENID_SIGNATURE)
        .context("assertion is missing `openid.sig`")?;
    signature::verify_signature(
        association.assoc_type,
        &association.secret,
        signed,
        &request.to_map_prefixed(),
        sig,
    )
}

/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.9.1>
fn redirect_params(
    discovery: &Discovery,
    realm: &str,
    return_to: &str,
    association: Option<&Association>,
) -> Parameters {
    let mut params = Parameters::new();
    params.set(OPENID_MODE, OPENID_MODE_CHECKID_SETUP);
    params.set(OPENID_IDENTITY, &discovery.op_local_identifier);
    params.set(OPENID_RETURN_TO, return_to);
    if discovery.version.is_v2() {
        params.set(OPENID_NAMESPACE, OPENID_AUTH_NAMESPACE);
        params.set(OPENID_CLAIMED_ID, &discovery.claimed_identifier);
        params.set(OPENID_REALM, realm);
    } else {
        params.set(OPENID_TRUST_ROOT, realm);
    }
    if let Some(association) = association {
        params.set(OPENID_ASSOCIATION_HANDLE, &association.handle);
    }
    params
}

fn redirect_url(op_endpoint: &str, params: &Parameters) -> anyhow::Result<String> {
    let pairs = params
        .pairs()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()));
    let url = reqwest::Url::parse_with_params(op_endpoint, pairs)
        .context("couldn't parse the op endpoint with query params into a url")?;
    Ok(url.into())
}
