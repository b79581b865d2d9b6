use std::collections::HashMap;
use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use lazy_regex::regex_is_match;
use thiserror::Error;

/// MAC algorithm of an association.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.3>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocType {
    HmacSha1,
    HmacSha256,
}

impl AssocType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AssocType::HmacSha1 => "HMAC-SHA1",
            AssocType::HmacSha256 => "HMAC-SHA256",
        }
    }

    /// Length of the raw MAC key in bytes.
    pub const fn key_len(&self) -> usize {
        match self {
            AssocType::HmacSha1 => 20,
            AssocType::HmacSha256 => 32,
        }
    }
}

impl FromStr for AssocType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HMAC-SHA1" => Ok(AssocType::HmacSha1),
            "HMAC-SHA256" => Ok(AssocType::HmacSha256),
            other => anyhow::bail!("unknown association type `{}`", other),
        }
    }
}

/// How the MAC key travels in the association response.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.4>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    NoEncryption,
    DhSha1,
    DhSha256,
}

impl SessionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionType::NoEncryption => "no-encryption",
            SessionType::DhSha1 => "DH-SHA1",
            SessionType::DhSha256 => "DH-SHA256",
        }
    }

    /// Whether the MAC key arrives xor-encrypted with a Diffie-Hellman
    /// derived digest.
    pub const fn is_encrypted(&self) -> bool {
        !matches!(self, SessionType::NoEncryption)
    }
}

impl FromStr for SessionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-encryption" => Ok(SessionType::NoEncryption),
            "DH-SHA1" => Ok(SessionType::DhSha1),
            "DH-SHA256" => Ok(SessionType::DhSha256),
            other => anyhow::bail!("unknown session type `{}`", other),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HandleError {
    #[error("association handle is empty or longer than 255 characters")]
    Length,
    #[error("association handle contains characters outside printable ascii")]
    Charset,
}

/// An association handle is 1 to 255 printable ASCII characters.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.2>
pub fn validate_handle(handle: &str) -> Result<(), HandleError> {
    if handle.is_empty() || handle.len() > 255 {
        return Err(HandleError::Length);
    }
    if !regex_is_match!(r"^[\x21-\x7E]+$", handle) {
        return Err(HandleError::Charset);
    }
    Ok(())
}

/// A negotiated shared secret, used to check assertion signatures without
/// a round-trip to the OP.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub assoc_type: AssocType,
    pub session_type: SessionType,
    pub handle: String,
    /// The raw MAC key, already decrypted for DH sessions.
    pub secret: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl Association {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub const fn is_encrypted(&self) -> bool {
        self.session_type.is_encrypted()
    }

    /// Flatten into the string fields the external store persists.
    pub fn to_fields(&self) -> HashMap<String, String> {
        use base64::engine::general_purpose::STANDARD as Base64;
        use base64::Engine;

        HashMap::from([
            ("assoc_type".to_string(), self.assoc_type.as_str().to_string()),
            (
                "session_type".to_string(),
                self.session_type.as_str().to_string(),
            ),
            ("assoc_handle".to_string(), self.handle.clone()),
            ("mac_key".to_string(), Base64.encode(&self.secret)),
            (
                "expires".to_string(),
                self.expires_at.timestamp().to_string(),
            ),
        ])
    }

    /// Inverse of [`Association::to_fields`].
    pub fn from_fields(handle: &str, fields: &HashMap<String, String>) -> anyhow::Result<Association> {
        use base64::engine::general_purpose::STANDARD as Base64;
        use base64::Engine;

        let assoc_type = fields
            .get("assoc_type")
            .context("association record is missing `assoc_type`")?
            .parse()?;
        let session_type = fields
            .get("session_type")
            .context("association record is missing `session_type`")?
            .parse()?;
        let secret = fields
            .get("mac_key")
            .context("association record is missing `mac_key`")?;
        let secret = Base64
            .decode(secret)
            .context("couldn't decode the stored mac key as base 64")?;
        let expires = fields
            .get("expires")
            .context("association record is missing `expires`")?;
        let expires_at = Utc
            .timestamp_opt(
                expires.parse().context("couldn't parse `expires`")?,
                0,
            )
            .single()
            .context("stored expiry is not a valid timestamp")?;

        Ok(Association {
            assoc_type,
            session_type,
            handle: handle.to_string(),
            secret,
            expires_at,
        })
    }
}
