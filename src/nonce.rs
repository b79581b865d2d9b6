use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use lazy_regex::regex_captures;

use crate::constants::OPENID_RESPONSE_NONCE_MAX_LEN;

/// Two hours of clock skew between us and the OP, in either direction.
const NONCE_MAX_SKEW_SECS: i64 = 7200;

/// An OP response nonce: an RFC 3339 UTC second timestamp followed by an
/// arbitrary unique suffix.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    time: DateTime<Utc>,
    salt: String,
}

impl FromStr for Nonce {
    type Err = anyhow::Error;

    fn from_str(nonce: &str) -> Result<Self, Self::Err> {
        if nonce.len() > OPENID_RESPONSE_NONCE_MAX_LEN {
            anyhow::bail!("response nonce is too long");
        }

        let Some((_, year, month, day, hour, min, sec, salt)) = regex_captures!(
            r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})Z(.*)$",
            nonce
        ) else {
            anyhow::bail!("response nonce doesn't adhere to spec");
        };

        let time = Utc
            .with_ymd_and_hms(
                year.parse().context("couldn't parse nonce year")?,
                month.parse().context("couldn't parse nonce month")?,
                day.parse().context("couldn't parse nonce day")?,
                hour.parse().context("couldn't parse nonce hour")?,
                min.parse().context("couldn't parse nonce minute")?,
                sec.parse().context("couldn't parse nonce second")?,
            )
            .single()
            .context("response nonce timestamp is not a valid utc time")?;

        Ok(Nonce {
            time,
            salt: salt.to_string(),
        })
    }
}

impl ToString for Nonce {
    fn to_string(&self) -> String {
        // Make sure it matches the expected format of
        // `2001-02-03T04:05:06Z`
        use chrono::SecondsFormat::Secs;
        let mut buffer = self.time.to_rfc3339_opts(Secs, true);
        buffer.push_str(&self.salt);
        buffer
    }
}

impl Nonce {
    /// Timestamps from OPs regularly sit a little in the future, the
    /// window is symmetric on purpose.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        (now.timestamp() - self.time.timestamp()).abs() <= NONCE_MAX_SKEW_SECS
    }

    /// The unique suffix, the replay-store key next to the timestamp and
    /// the endpoint.
    pub fn as_salt(&self) -> &str {
        &self.salt
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn parses_timestamp_and_salt() -> anyhow::Result<()> {
        let nonce: Nonce = "2005-05-15T17:11:51ZUNIQUE".parse()?;
        assert_eq!(nonce.as_salt(), "UNIQUE");
        assert_eq!(nonce.to_string(), "2005-05-15T17:11:51ZUNIQUE");
        Ok(())
    }

    #[test]
    fn an_empty_salt_is_allowed() -> anyhow::Result<()> {
        let nonce: Nonce = "2005-05-15T17:11:51Z".parse()?;
        assert_eq!(nonce.as_salt(), "");
        Ok(())
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!("2005-05-15 17:11:51ZUNIQUE".parse::<Nonce>().is_err());
        assert!("2005-05-15T17:11:51UNIQUE".parse::<Nonce>().is_err());
        assert!("2005-13-15T17:11:51ZUNIQUE".parse::<Nonce>().is_err());
        assert!("garbage".parse::<Nonce>().is_err());
    }

    #[test]
    fn rejects_overlong_nonces() {
        let nonce = format!("2005-05-15T17:11:51Z{}", "x".repeat(300));
        assert!(nonce.parse::<Nonce>().is_err());
    }

    #[test]
    fn freshness_window_is_two_hours_both_ways() -> anyhow::Result<()> {
        let now = Utc.with_ymd_and_hms(2005, 5, 15, 17, 11, 51).unwrap();
        let nonce: Nonce = "2005-05-15T17:11:51Zabc".parse()?;

        assert!(nonce.is_fresh(now));
        assert!(nonce.is_fresh(now + Duration::seconds(7200)));
        assert!(nonce.is_fresh(now - Duration::seconds(7200)));
        assert!(!nonce.is_fresh(now + Duration::seconds(7201)));
        assert!(!nonce.is_fresh(now - Duration::seconds(7201)));
        assert!(!nonce.is_fresh(now + Duration::hours(3)));
        Ok(())
    }
}
