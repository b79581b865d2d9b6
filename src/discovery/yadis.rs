//! Yadis (XRDS) based discovery.
//!
//! <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.7.3.2>
//!
//! The identifier URL is fetched and the XRDS document located either
//! directly, through the `X-XRDS-Location` header or through the
//! equivalent `<meta>` tag. Service elements are ranked: an OP Identifier
//! element beats a 2.0 Claimed Identifier element beats the 1.x signon
//! types, ties broken by the `priority` attribute.

use anyhow::Context;
use async_trait::async_trait;
use lazy_regex::regex;

use crate::constants::{
    OPENID_IDENTIFIER_SELECT, OPENID_PRIORITY_ATTRIBUTE, OPENID_PROVIDER_IDENTIFIER,
    OPENID_SIGNON_1_0, OPENID_SIGNON_1_1, OPENID_SIGNON_IDENTIFIER,
};
use crate::discovery::{Discovery, DiscoveryHandler, ProtocolVersion};
use crate::http::{FetchResponse, HttpFetch};
use crate::identifier::Identifier;

const XRDS_LOCATION_HEADER: &str = "x-xrds-location";
const XRDS_NAMESPACE_MARKER: &str = "xri://$xrds";

const TAG_NAME_SERVICE: &str = "Service";
const TAG_NAME_TYPE: &str = "Type";
const TAG_NAME_URI: &str = "URI";
const TAG_NAME_LOCAL_ID: &str = "LocalID";
const TAG_NAME_DELEGATE: &str = "Delegate";

pub struct YadisDiscovery;

impl Default for YadisDiscovery {
    fn default() -> YadisDiscovery {
        YadisDiscovery::new()
    }
}

impl YadisDiscovery {
    pub const fn new() -> YadisDiscovery {
        YadisDiscovery
    }
}

#[async_trait]
impl DiscoveryHandler for YadisDiscovery {
    async fn attempt(
        &self,
        fetch: &dyn HttpFetch,
        identifier: &Identifier,
    ) -> anyhow::Result<Option<Discovery>> {
        if identifier.is_xri() {
            // XRI resolution needs a proxy resolver, register a dedicated
            // handler for that.
            return Ok(None);
        }

        let resp = fetch
            .get(identifier.as_str())
            .await
            .context("couldn't fetch the claimed identifier")?;
        if resp.status != 200 {
            return Ok(None);
        }

        let Some(xrds) = locate_xrds(fetch, resp).await? else {
            return Ok(None);
        };
        parse_xrds(identifier, &xrds)
    }
}

/// The Yadis indirection dance: header, inline document, `<meta>` tag.
async fn locate_xrds(
    fetch: &dyn HttpFetch,
    resp: FetchResponse,
) -> anyhow::Result<Option<String>> {
    if let Some(location) = resp.header(XRDS_LOCATION_HEADER) {
        return fetch_xrds(fetch, location).await;
    }

    let is_xrds_content_type = resp
        .header("content-type")
        .map_or(false, |ct| ct.contains("xrds"));
    if is_xrds_content_type || resp.body.contains(XRDS_NAMESPACE_MARKER) {
        return Ok(Some(resp.body));
    }

    if let Some(location) = meta_xrds_location(&resp.body) {
        return fetch_xrds(fetch, &location).await;
    }
    Ok(None)
}

async fn fetch_xrds(fetch: &dyn HttpFetch, location: &str) -> anyhow::Result<Option<String>> {
    let resp = fetch
        .get(location)
        .await
        .context("couldn't fetch the advertised xrds document")?;
    if resp.status != 200 {
        return Ok(None);
    }
    Ok(Some(resp.body))
}

fn meta_xrds_location(html: &str) -> Option<String> {
    for tag in regex!(r"(?i)<meta\b[^>]*>").find_iter(html) {
        let tag = tag.as_str();
        let http_equiv = attribute(tag, "http-equiv");
        if http_equiv.map_or(true, |v| !v.eq_ignore_ascii_case(XRDS_LOCATION_HEADER)) {
            continue;
        }
        if let Some(content) = attribute(tag, "content") {
            return Some(content);
        }
    }
    None
}

/// Extract a quoted attribute value from a single tag, order independent.
pub(super) fn attribute(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let mut search = 0;
    while let Some(found) = lower[search..].find(name) {
        let at = search + found;
        let rest = &tag[at + name.len()..];
        let rest = rest.trim_start();
        if let Some(rest) = rest.strip_prefix('=') {
            let rest = rest.trim_start();
            let quote = rest.chars().next()?;
            if quote == '"' || quote == '\'' {
                let value = &rest[1..];
                return value.split(quote).next().map(str::to_string);
            }
        }
        search = at + name.len();
    }
    None
}

/// Rank of a service element, lower wins.
fn service_rank(types: &[&str]) -> Option<(u8, ProtocolVersion, bool)> {
    if types.contains(&OPENID_PROVIDER_IDENTIFIER) {
        // OP Identifier element, the user picks an identity at the OP.
        return Some((0, ProtocolVersion::V2_0, true));
    }
    if types.contains(&OPENID_SIGNON_IDENTIFIER) {
        return Some((1, ProtocolVersion::V2_0, false));
    }
    if types.contains(&OPENID_SIGNON_1_1) || types.contains(&OPENID_SIGNON_1_0) {
        return Some((2, ProtocolVersion::V1_1, false));
    }
    None
}

fn parse_xrds(identifier: &Identifier, xml: &str) -> anyhow::Result<Option<Discovery>> {
    let doc = roxmltree::Document::parse(xml).context("couldn't parse xrds document")?;

    let mut candidates: Vec<(u8, i32, Discovery)> = Vec::new();
    for service in doc
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == TAG_NAME_SERVICE)
    {
        let types: Vec<&str> = service
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == TAG_NAME_TYPE)
            .filter_map(|child| child.text())
            .map(str::trim)
            .collect();
        let Some((rank, version, op_identifier)) = service_rank(&types) else {
            continue;
        };

        let Some(endpoint) = element_text(service, TAG_NAME_URI) else {
            continue;
        };
        // The endpoint has to be an absolute url.
        if reqwest::Url::parse(endpoint).is_err() {
            continue;
        }

        let local = element_text(service, TAG_NAME_LOCAL_ID)
            .or_else(|| element_text(service, TAG_NAME_DELEGATE));
        let priority: i32 = service
            .attribute(OPENID_PRIORITY_ATTRIBUTE)
            .and_then(|priority| priority.parse().ok())
            .unwrap_or(i32::MAX);

        let discovery = if op_identifier {
            Discovery::new(OPENID_IDENTIFIER_SELECT, endpoint, None, version)
        } else {
            Discovery::new(identifier.as_str(), endpoint, local, version)
        };
        candidates.push((rank, priority, discovery));
    }

    // Stable sort, document order breaks remaining ties.
    candidates.sort_by_key(|(rank, priority, _)| (*rank, *priority));
    Ok(candidates.into_iter().next().map(|(_, _, discovery)| discovery))
}

fn element_text<'a>(service: roxmltree::Node<'a, '_>, tag_name: &str) -> Option<&'a str> {
    service
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == tag_name)
        .and_then(|child| child.text())
        .map(str::trim)
}
