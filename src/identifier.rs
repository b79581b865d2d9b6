use std::str::FromStr;

use lazy_regex::regex_is_match;

/// XRIs start with one of the global context symbols, everything else is
/// treated as a URL.
const XRI_GLOBAL_CONTEXTS: [char; 6] = ['=', '@', '+', '$', '!', '('];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Url,
    Xri,
}

/// A normalized user-supplied identifier.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.7.2>
///
/// This is what discovery consumes and what becomes `openid.claimed_id`
/// in 2.0 messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    id: String,
    kind: IdentifierKind,
}

impl FromStr for Identifier {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Identifier, Self::Err> {
        let mut id = raw.trim();
        if let Some(stripped) = id.strip_prefix("xri://") {
            id = stripped;
        }
        if id.is_empty() {
            anyhow::bail!("identifier is empty");
        }

        if id.starts_with(XRI_GLOBAL_CONTEXTS) {
            return Ok(Identifier {
                id: id.to_string(),
                kind: IdentifierKind::Xri,
            });
        }

        let mut url = if regex_is_match!(r"(?i)^https?://", id) {
            id.to_string()
        } else {
            format!("http://{}", id)
        };
        if let Some(pos) = url.find('#') {
            url.truncate(pos);
        }

        Ok(Identifier {
            id: url,
            kind: IdentifierKind::Url,
        })
    }
}

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub const fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub const fn is_xri(&self) -> bool {
        matches!(self.kind, IdentifierKind::Xri)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trims_and_defaults_the_scheme() -> anyhow::Result<()> {
        let id: Identifier = "  user.example/  ".parse()?;
        assert_eq!(id.as_str(), "http://user.example/");
        assert_eq!(id.kind(), IdentifierKind::Url);
        Ok(())
    }

    #[test]
    fn keeps_an_explicit_scheme() -> anyhow::Result<()> {
        let id: Identifier = "HTTPS://user.example/".parse()?;
        assert_eq!(id.as_str(), "HTTPS://user.example/");
        Ok(())
    }

    #[test]
    fn removes_the_fragment() -> anyhow::Result<()> {
        let id: Identifier = "http://user.example/#profile".parse()?;
        assert_eq!(id.as_str(), "http://user.example/");
        Ok(())
    }

    #[test]
    fn classifies_xris_and_strips_the_scheme() -> anyhow::Result<()> {
        let id: Identifier = "xri://=example".parse()?;
        assert_eq!(id.as_str(), "=example");
        assert!(id.is_xri());

        let id: Identifier = "@example*unit".parse()?;
        assert_eq!(id.as_str(), "@example*unit");
        assert!(id.is_xri());
        Ok(())
    }

    #[test]
    fn rejects_empty_input() {
        assert!("   ".parse::<Identifier>().is_err());
        assert!("xri://".parse::<Identifier>().is_err());
    }
}
