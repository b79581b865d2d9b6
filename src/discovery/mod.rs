//! Resolving a user-supplied identifier to an OP endpoint.
//!
//! <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.7.3>
//!
//! Strategies are pluggable: the [`Discoverer`] walks its handlers in
//! registration order and the first one that completes wins. The default
//! chain tries Yadis first and HTML markup second.

mod html;
mod yadis;

pub use html::HtmlDiscovery;
pub use yadis::YadisDiscovery;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::HttpFetch;
use crate::identifier::Identifier;

/// Protocol revision spoken by a discovered endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V1_1,
    V2_0,
}

impl ProtocolVersion {
    pub const fn is_v2(&self) -> bool {
        matches!(self, ProtocolVersion::V2_0)
    }
}

/// A successful discovery.
///
/// Hosts usually stash this in their session between issuing the redirect
/// and receiving the callback, hence the serde round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub claimed_identifier: String,
    /// Absolute URL accepting protocol messages.
    pub op_endpoint: String,
    /// Defaults to the claimed identifier when the document names none.
    pub op_local_identifier: String,
    pub version: ProtocolVersion,
}

impl Discovery {
    pub fn new(
        claimed_identifier: &str,
        op_endpoint: &str,
        op_local_identifier: Option<&str>,
        version: ProtocolVersion,
    ) -> Discovery {
        Discovery {
            claimed_identifier: claimed_identifier.to_string(),
            op_endpoint: op_endpoint.to_string(),
            op_local_identifier: op_local_identifier
                .unwrap_or(claimed_identifier)
                .to_string(),
            version,
        }
    }
}

/// One strategy for resolving an identifier.
///
/// `Ok(None)` yields to the next handler in the chain; an error only
/// disqualifies this handler.
#[async_trait]
pub trait DiscoveryHandler: Send + Sync {
    async fn attempt(
        &self,
        fetch: &dyn HttpFetch,
        identifier: &Identifier,
    ) -> anyhow::Result<Option<Discovery>>;
}

/// Ordered handler chain with first-success-wins semantics.
pub struct Discoverer {
    handlers: Vec<Box<dyn DiscoveryHandler>>,
}

impl Default for Discoverer {
    fn default() -> Discoverer {
        Discoverer::new()
    }
}

impl Discoverer {
    /// The default chain: Yadis, then HTML markup.
    pub fn new() -> Discoverer {
        Discoverer {
            handlers: vec![
                Box::new(YadisDiscovery::new()),
                Box::new(HtmlDiscovery::new()),
            ],
        }
    }

    pub fn with_handlers(handlers: Vec<Box<dyn DiscoveryHandler>>) -> Discoverer {
        Discoverer { handlers }
    }

    pub fn push(&mut self, handler: Box<dyn DiscoveryHandler>) {
        self.handlers.push(handler);
    }

    /// Run handlers in registration order and short-circuit on the first
    /// completion.
    pub async fn discover(
        &self,
        fetch: &dyn HttpFetch,
        identifier: &Identifier,
    ) -> anyhow::Result<Discovery> {
        for handler in &self.handlers {
            match handler.attempt(fetch, identifier).await {
                Ok(Some(discovery)) => {
                    log::debug!(
                        "resolved `{}` to endpoint `{}`",
                        identifier.as_str(),
                        discovery.op_endpoint
                    );
                    return Ok(discovery);
                }
                Ok(None) => {}
                Err(err) => log::warn!("discovery handler failed: {:#}", err),
            }
        }
        anyhow::bail!("no discovery handler could resolve `{}`", identifier.as_str())
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::http::FetchResponse;

    struct NoFetch;

    #[async_trait]
    impl HttpFetch for NoFetch {
        async fn get(&self, _url: &str) -> anyhow::Result<FetchResponse> {
            anyhow::bail!("no network in this test")
        }
        async fn post(
            &self,
            _url: &str,
            _form: &[(String, String)],
        ) -> anyhow::Result<FetchResponse> {
            anyhow::bail!("no network in this test")
        }
    }

    /// Counts its invocations, then yields, fails or completes.
    struct Scripted {
        calls: Arc<AtomicUsize>,
        result: Option<Discovery>,
        fail: bool,
    }

    #[async_trait]
    impl DiscoveryHandler for Scripted {
        async fn attempt(
            &self,
            _fetch: &dyn HttpFetch,
            _identifier: &Identifier,
        ) -> anyhow::Result<Option<Discovery>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("scripted failure");
            }
            Ok(self.result.clone())
        }
    }

    fn endpoint() -> Discovery {
        Discovery::new(
            "http://user.example/",
            "https://op.example/srv",
            None,
            ProtocolVersion::V2_0,
        )
    }

    #[tokio::test]
    async fn first_completion_short_circuits() -> anyhow::Result<()> {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let discoverer = Discoverer::with_handlers(vec![
            Box::new(Scripted {
                calls: Arc::clone(&first),
                result: Some(endpoint()),
                fail: false,
            }),
            Box::new(Scripted {
                calls: Arc::clone(&second),
                result: Some(endpoint()),
                fail: false,
            }),
        ]);

        let identifier: Identifier = "http://user.example/".parse()?;
        let discovery = discoverer.discover(&NoFetch, &identifier).await?;
        assert_eq!(discovery.op_endpoint, "https://op.example/srv");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn yields_and_failures_move_down_the_chain() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let discoverer = Discoverer::with_handlers(vec![
            Box::new(Scripted {
                calls: Arc::clone(&calls),
                result: None,
                fail: false,
            }),
            Box::new(Scripted {
                calls: Arc::clone(&calls),
                result: None,
                fail: true,
            }),
            Box::new(Scripted {
                calls: Arc::clone(&calls),
                result: Some(endpoint()),
                fail: false,
            }),
        ]);

        let identifier: Identifier = "http://user.example/".parse()?;
        let discovery = discoverer.discover(&NoFetch, &identifier).await?;
        assert_eq!(discovery.version, ProtocolVersion::V2_0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn an_exhausted_chain_is_an_error() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let discoverer = Discoverer::with_handlers(vec![Box::new(Scripted {
            calls,
            result: None,
            fail: false,
        })]);

        let identifier: Identifier = "http://user.example/".parse()?;
        assert!(discoverer.discover(&NoFetch, &identifier).await.is_err());
        Ok(())
    }

    #[test]
    fn the_local_identifier_defaults_to_the_claimed_one() {
        let discovery = endpoint();
        assert_eq!(discovery.op_local_identifier, "http://user.example/");

        let delegated = Discovery::new(
            "http://user.example/",
            "https://op.example/srv",
            Some("https://op.example/u/1"),
            ProtocolVersion::V2_0,
        );
        assert_eq!(delegated.op_local_identifier, "https://op.example/u/1");
    }
}
