//! Diffie-Hellman key agreement for encrypted association sessions.
//!
//! <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.1.2>

use num_bigint::{BigUint, RandBigInt};

use crate::association::SessionType;

/// The default 1024 bit modulus, base 64 over btwoc form.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.appendix.B>
const DEFAULT_MODULUS_BASE64: &str = "ANz5OguIOXLsDhmYmsWizjEOHTdxfo2Vcbt2I3MYZuYe91ouJ4mLBX+\
     YkcLiemOcPym2CBRYHNOyyjmG0mg3BVd9RcLn5S3IHHoXGHblzqdLFEi/368Ygo79JRnxTkXjgmY0rxlJ5bU1zIKaSDuKdiI+\
     XUkKJX8Fvf8W8vsixYOr";

const DEFAULT_GENERATOR: u32 = 2;

pub(crate) fn default_modulus() -> BigUint {
    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine;

    // The constant is valid base 64.
    let bytes = Base64.decode(DEFAULT_MODULUS_BASE64).unwrap();
    BigUint::from_bytes_be(&bytes)
}

/// Encode as big-endian two's complement: numbers whose top bit is set get
/// a leading zero byte so they stay positive.
pub(crate) fn btwoc(n: &BigUint) -> Vec<u8> {
    let mut bytes = n.to_bytes_be();
    if bytes.first().map_or(true, |b| b & 0x80 != 0) {
        bytes.insert(0, 0);
    }
    bytes
}

pub(crate) fn from_btwoc(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

#[derive(Debug, Clone)]
pub(crate) struct DhKeyPair {
    modulus: BigUint,
    private: BigUint,
    pub(crate) public: BigUint,
}

impl DhKeyPair {
    /// Fresh keypair over the default modulus and generator.
    pub(crate) fn generate() -> DhKeyPair {
        let modulus = default_modulus();
        let generator = BigUint::from(DEFAULT_GENERATOR);

        let mut rng = rand::thread_rng();
        let private = rng.gen_biguint_range(&BigUint::from(1u32), &(modulus.clone() - 1u32));
        let public = generator.modpow(&private, &modulus);

        DhKeyPair {
            modulus,
            private,
            public,
        }
    }

    /// `openid.dh_consumer_public` wire form.
    pub(crate) fn public_base64(&self) -> String {
        use base64::engine::general_purpose::STANDARD as Base64;
        use base64::Engine;

        Base64.encode(btwoc(&self.public))
    }

    pub(crate) fn shared_secret(&self, server_public: &BigUint) -> BigUint {
        server_public.modpow(&self.private, &self.modulus)
    }
}

/// Recover the MAC key from `enc_mac_key`: the OP xors it with the session
/// digest of the shared secret. Xor is its own inverse, so this doubles as
/// the encryption direction.
pub(crate) fn decrypt_mac_key(
    session_type: SessionType,
    shared: &BigUint,
    enc_mac_key: &[u8],
) -> anyhow::Result<Vec<u8>> {
    let digest = session_digest(session_type, &btwoc(shared))?;
    if digest.len() != enc_mac_key.len() {
        anyhow::bail!(
            "encrypted mac key is {} bytes, the session digest is {}",
            enc_mac_key.len(),
            digest.len()
        );
    }
    Ok(std::iter::zip(digest.iter(), enc_mac_key.iter())
        .map(|(d, e)| d ^ e)
        .collect())
}

fn session_digest(session_type: SessionType, input: &[u8]) -> anyhow::Result<Vec<u8>> {
    match session_type {
        SessionType::DhSha1 => {
            use sha1::{Digest, Sha1};
            Ok(Sha1::digest(input).to_vec())
        }
        SessionType::DhSha256 => {
            use sha2::{Digest, Sha256};
            Ok(Sha256::digest(input).to_vec())
        }
        SessionType::NoEncryption => {
            anyhow::bail!("no-encryption sessions don't derive a digest")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_modulus_is_1024_bits() {
        assert_eq!(default_modulus().bits(), 1024);
    }

    #[test]
    fn btwoc_pads_the_high_bit() {
        assert_eq!(btwoc(&BigUint::from(0x7Fu32)), vec![0x7F]);
        assert_eq!(btwoc(&BigUint::from(0x80u32)), vec![0x00, 0x80]);
        assert_eq!(btwoc(&BigUint::from(0u32)), vec![0x00]);
        assert_eq!(
            from_btwoc(&btwoc(&BigUint::from(0xDEADu32))),
            BigUint::from(0xDEADu32)
        );
    }

    #[test]
    fn both_sides_derive_the_same_secret() {
        let consumer = DhKeyPair::generate();
        let server = DhKeyPair::generate();

        let lhs = consumer.shared_secret(&server.public);
        let rhs = server.shared_secret(&consumer.public);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn mac_key_survives_the_xor_round_trip() -> anyhow::Result<()> {
        let consumer = DhKeyPair::generate();
        let server = DhKeyPair::generate();
        let shared = consumer.shared_secret(&server.public);

        let mac_key = hex::decode("000102030405060708090a0b0c0d0e0f10111213")?;
        let encrypted = decrypt_mac_key(SessionType::DhSha1, &shared, &mac_key)?;
        assert_ne!(encrypted, mac_key);

        let decrypted = decrypt_mac_key(SessionType::DhSha1, &shared, &encrypted)?;
        assert_eq!(decrypted, mac_key);
        Ok(())
    }

    #[test]
    fn digest_and_key_lengths_must_match() {
        let consumer = DhKeyPair::generate();
        let server = DhKeyPair::generate();
        let shared = consumer.shared_secret(&server.public);

        // A 20 byte key against the 32 byte SHA-256 digest.
        let mac_key = vec![0x42; 20];
        assert!(decrypt_mac_key(SessionType::DhSha256, &shared, &mac_key).is_err());
    }
}
