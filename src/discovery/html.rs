//! HTML based discovery for identifiers whose page links the provider
//! with `<link rel>` markup.
//!
//! <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.7.3.3>

use anyhow::Context;
use async_trait::async_trait;
use lazy_regex::regex;

use crate::discovery::yadis::attribute;
use crate::discovery::{Discovery, DiscoveryHandler, ProtocolVersion};
use crate::http::HttpFetch;
use crate::identifier::Identifier;

const REL_PROVIDER_2_0: &str = "openid2.provider";
const REL_LOCAL_ID_2_0: &str = "openid2.local_id";
const REL_SERVER_1_1: &str = "openid.server";
const REL_DELEGATE_1_1: &str = "openid.delegate";

pub struct HtmlDiscovery;

impl Default for HtmlDiscovery {
    fn default() -> HtmlDiscovery {
        HtmlDiscovery::new()
    }
}

impl HtmlDiscovery {
    pub const fn new() -> HtmlDiscovery {
        HtmlDiscovery
    }
}

#[async_trait]
impl DiscoveryHandler for HtmlDiscovery {
    async fn attempt(
        &self,
        fetch: &dyn HttpFetch,
        identifier: &Identifier,
    ) -> anyhow::Result<Option<Discovery>> {
        if identifier.is_xri() {
            return Ok(None);
        }

        let resp = fetch
            .get(identifier.as_str())
            .await
            .context("couldn't fetch the claimed identifier")?;
        if resp.status != 200 {
            return Ok(None);
        }
        Ok(parse_links(identifier, &resp.body))
    }
}

fn parse_links(identifier: &Identifier, html: &str) -> Option<Discovery> {
    if let Some(endpoint) = link_href(html, REL_PROVIDER_2_0) {
        let local = link_href(html, REL_LOCAL_ID_2_0);
        return checked(identifier, &endpoint, local, ProtocolVersion::V2_0);
    }
    let endpoint = link_href(html, REL_SERVER_1_1)?;
    let delegate = link_href(html, REL_DELEGATE_1_1);
    checked(identifier, &endpoint, delegate, ProtocolVersion::V1_1)
}

fn checked(
    identifier: &Identifier,
    endpoint: &str,
    local: Option<String>,
    version: ProtocolVersion,
) -> Option<Discovery> {
    // The endpoint has to be an absolute url.
    reqwest::Url::parse(endpoint).ok()?;
    Some(Discovery::new(
        identifier.as_str(),
        endpoint,
        local.as_deref(),
        version,
    ))
}

/// `href` of the first `<link>` whose (possibly multi valued) `rel`
/// contains the wanted relation.
fn link_href(html: &str, rel: &str) -> Option<String> {
    for tag in regex!(r"(?i)<link\b[^>]*>").find_iter(html) {
        let tag = tag.as_str();
        let Some(rels) = attribute(tag, "rel") else {
            continue;
        };
        if !rels
            .split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case(rel))
        {
            continue;
        }
        if let Some(href) = attribute(tag, "href") {
            return Some(href);
        }
    }
    None
}
