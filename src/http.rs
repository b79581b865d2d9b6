use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;

/// What the engine needs to know about a finished HTTP exchange.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    /// Header names lower-cased.
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// The injected transport.
///
/// The engine never blocks on sockets itself; hosts decide timeouts,
/// proxies and TLS policy. `post` bodies are
/// `application/x-www-form-urlencoded`, `get` only serves discovery
/// document retrieval.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> anyhow::Result<FetchResponse>;

    async fn post(&self, url: &str, form: &[(String, String)]) -> anyhow::Result<FetchResponse>;
}

/// Default transport backed by a [`reqwest::Client`].
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<ReqwestFetcher> {
        let client = reqwest::Client::builder()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("couldn't build reqwest client")?;
        Ok(ReqwestFetcher { client })
    }

    /// Share an existing client, e.g. the host application's.
    pub const fn with_client(client: reqwest::Client) -> ReqwestFetcher {
        ReqwestFetcher { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &str) -> anyhow::Result<FetchResponse> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("couldn't fetch `{}`", url))?;
        convert(resp).await
    }

    async fn post(&self, url: &str, form: &[(String, String)]) -> anyhow::Result<FetchResponse> {
        let resp = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("couldn't post to `{}`", url))?;
        convert(resp).await
    }
}

async fn convert(resp: reqwest::Response) -> anyhow::Result<FetchResponse> {
    let status = resp.status().as_u16();
    let headers = resp
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = resp
        .text()
        .await
        .context("couldn't read response body as text")?;

    Ok(FetchResponse {
        status,
        body,
        headers,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = FetchResponse {
            status: 200,
            body: String::new(),
            headers: HashMap::from([(
                "x-xrds-location".to_string(),
                "http://op.example/xrds".to_string(),
            )]),
        };
        assert_eq!(resp.header("X-XRDS-Location"), Some("http://op.example/xrds"));
        assert_eq!(resp.header("content-type"), None);
    }
}
