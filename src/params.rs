use std::collections::HashMap;

use anyhow::Context;

use crate::constants::OPENID_FIELD_PREFIX;

/// Ordered bag of protocol fields.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.4.1.1>
///
/// Names are held in their canonical `openid.`-prefixed form and keep their
/// insertion order. Order matters: signatures cover fields in exactly the
/// order the OP listed them and redirect URLs must round-trip
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    pairs: Vec<(String, String)>,
}

fn canonical(name: &str) -> String {
    if name.starts_with(OPENID_FIELD_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", OPENID_FIELD_PREFIX, name)
    }
}

impl Parameters {
    pub fn new() -> Parameters {
        Parameters::default()
    }

    /// Parse the line based `key:value` format used in direct responses.
    ///
    /// Lines without a colon are dropped. Missing fields are caught later
    /// by whoever requires them.
    pub fn parse(body: &str) -> Parameters {
        let mut params = Parameters::new();
        for line in body.split_terminator('\n') {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            params.set(name, value);
        }
        params
    }

    /// Parse an `application/x-www-form-urlencoded` query string, e.g. the
    /// one the OP redirects the user agent back with.
    pub fn from_query(query: &str) -> anyhow::Result<Parameters> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query).context("couldn't parse query string")?;

        let mut params = Parameters::new();
        for (name, value) in &pairs {
            params.set(name, value);
        }
        Ok(params)
    }

    /// Insert, or overwrite in place keeping the original position.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = canonical(name);
        match self.pairs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.pairs.push((name, value.to_string())),
        }
    }

    /// Lookup through the canonical name, so `get("mode")` and
    /// `get("openid.mode")` are the same question.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = canonical(name);
        self.pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The ordered pairs in canonical prefixed form, ready for a form post
    /// or a redirect URL.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Projection with the `openid.` prefix stripped.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.pairs
            .iter()
            .map(|(k, v)| (strip_prefix(k).to_string(), v.clone()))
            .collect()
    }

    /// Projection with the `openid.` prefix retained.
    pub fn to_map_prefixed(&self) -> HashMap<String, String> {
        self.pairs.iter().cloned().collect()
    }
}

fn strip_prefix(name: &str) -> &str {
    name.strip_prefix(OPENID_FIELD_PREFIX).unwrap_or(name)
}

impl ToString for Parameters {
    /// The canonical wire body: prefix stripped, one `key:value` per line.
    ///
    /// The trailing newline is mandatory!
    fn to_string(&self) -> String {
        let len = self.pairs.iter().fold(0, |acc, (k, v)| {
            // key + value + (':' + '\n')
            acc + k.len() + v.len() + 2
        });

        let mut buffer = String::with_capacity(len);
        for (k, v) in &self.pairs {
            buffer.push_str(strip_prefix(k));
            buffer.push(':');
            buffer.push_str(v);
            buffer.push('\n');
        }
        buffer
    }
}
