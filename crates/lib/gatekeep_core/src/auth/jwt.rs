//! JWT token signing and verification (RS256).
//!
//! Tokens are signed with an RSA private key and verified with the matching
//! public key, so the public key can be handed to separate verifying
//! services. Symmetric algorithms are rejected at verification time.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::AuthError;

/// The only accepted signing algorithm.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claim set as written to the wire: caller claims plus `iat`/`exp`.
#[derive(Serialize)]
struct SignedClaims<'a, C> {
    #[serde(flatten)]
    claims: &'a C,
    iat: i64,
    exp: i64,
}

/// Claim set as read from the wire. `iat`/`exp` are consumed here so the
/// caller type only sees its own fields.
#[derive(Deserialize)]
struct DecodedClaims<C> {
    #[serde(flatten)]
    claims: C,
    #[allow(dead_code)]
    #[serde(default)]
    iat: i64,
    #[allow(dead_code)]
    exp: i64,
}

/// Outcome of verifying a token. Exactly one holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verified<C> {
    /// Signature and expiry check out.
    Valid(C),
    /// Signature checks out but the token has expired.
    Expired,
    /// Malformed, bad signature, wrong algorithm, or missing claims.
    Invalid,
}

impl<C> Verified<C> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verified::Valid(_))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Verified::Expired)
    }

    /// The decoded claims, if valid.
    pub fn claims(self) -> Option<C> {
        match self {
            Verified::Valid(claims) => Some(claims),
            _ => None,
        }
    }

    /// Convert into a `Result`, keeping the expired/invalid distinction.
    pub fn into_result(self) -> Result<C, AuthError> {
        match self {
            Verified::Valid(claims) => Ok(claims),
            Verified::Expired => Err(AuthError::TokenExpired),
            Verified::Invalid => Err(AuthError::TokenInvalid),
        }
    }
}

/// Stateless token signer/verifier holding an RSA key pair.
///
/// Keys are loaded once and never mutated, so a codec can be shared freely
/// across tasks.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("alg", &self.header.alg)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from PEM-encoded keys (PKCS#1 or PKCS#8 private key,
    /// SPKI or PKCS#1 public key).
    ///
    /// Fails with [`AuthError::KeyConfig`] if either key cannot be parsed or
    /// the public key does not verify tokens signed by the private key.
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AuthError::KeyConfig(format!("invalid RSA private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AuthError::KeyConfig(format!("invalid RSA public key: {e}")))?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;

        let codec = Self {
            encoding_key,
            decoding_key,
            header: Header::new(SIGNING_ALGORITHM),
            validation,
        };

        let probe = codec
            .sign(&serde_json::json!({}), Duration::minutes(1))
            .map_err(|e| AuthError::KeyConfig(format!("signing probe failed: {e}")))?;
        if !codec.verify::<serde_json::Value>(&probe).is_valid() {
            return Err(AuthError::KeyConfig(
                "public key does not match private key".into(),
            ));
        }

        Ok(codec)
    }

    /// Sign `claims`, valid for `ttl` from now.
    pub fn sign<C: Serialize>(&self, claims: &C, ttl: Duration) -> Result<String, AuthError> {
        self.sign_at(claims, ttl, Utc::now())
    }

    /// Sign `claims` as if issued at `issued_at`. Deterministic for identical
    /// claims, timestamp and key.
    pub fn sign_at<C: Serialize>(
        &self,
        claims: &C,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal(format!("token expiry out of range: {ttl}")))?;
        let signed = SignedClaims {
            claims,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&self.header, &signed, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature, algorithm and expiry, returning the caller claims
    /// (without `iat`/`exp`) on success.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Verified<C> {
        match decode::<DecodedClaims<C>>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Verified::Valid(data.claims.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Verified::Expired,
            Err(e) => {
                debug!(error = %e, "token verification failed");
                Verified::Invalid
            }
        }
    }
}

/// Resolve a PEM key from the environment: `<VAR>` holding the PEM text
/// (literal `\n` sequences are unescaped), then `<VAR>_FILE` holding a path.
pub fn resolve_key_pem(var: &str) -> Option<String> {
    if let Ok(pem) = std::env::var(var)
        && !pem.trim().is_empty()
    {
        return Some(normalize_pem(&pem));
    }
    let file_var = format!("{var}_FILE");
    if let Ok(path) = std::env::var(&file_var)
        && !path.is_empty()
    {
        match std::fs::read_to_string(&path) {
            Ok(pem) => {
                info!(var = %file_var, path = %path, "loaded key from file");
                return Some(pem);
            }
            Err(e) => warn!(var = %file_var, path = %path, error = %e, "failed to read key file"),
        }
    }
    None
}

/// Unescape `\n` sequences, as found in single-line env values.
fn normalize_pem(pem: &str) -> String {
    pem.trim().replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::auth::TokenClaims;
    use crate::testutil::{OTHER_PRIVATE_PEM, OTHER_PUBLIC_PEM, PRIVATE_PEM, PUBLIC_PEM, codec};

    fn claims() -> TokenClaims {
        TokenClaims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            picture: Some("https://example.com/a.png".into()),
            session: Uuid::new_v4(),
        }
    }

    /// Replace one character in the middle of the signature segment.
    fn tamper(token: &str) -> String {
        let sig_start = token.rfind('.').unwrap() + 1;
        let pos = sig_start + (token.len() - sig_start) / 2;
        let mut bytes = token.as_bytes().to_vec();
        bytes[pos] = if bytes[pos] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn overflowing_expiry_is_an_error() {
        let err = codec()
            .sign(&claims(), Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[test]
    fn round_trip_returns_claims_without_timestamps() {
        let codec = codec();
        let c = claims();
        let token = codec.sign(&c, Duration::minutes(15)).unwrap();
        assert_eq!(codec.verify::<TokenClaims>(&token), Verified::Valid(c));

        let raw = codec.verify::<serde_json::Value>(&token).claims().unwrap();
        assert!(raw.get("iat").is_none());
        assert!(raw.get("exp").is_none());
    }

    #[test]
    fn token_is_three_segment_rs256() {
        let token = codec().sign(&claims(), Duration::minutes(15)).unwrap();
        assert_eq!(token.split('.').count(), 3);
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn signing_is_deterministic_for_fixed_timestamp() {
        let codec = codec();
        let c = claims();
        let at = Utc::now();
        let a = codec.sign_at(&c, Duration::minutes(15), at).unwrap();
        let b = codec.sign_at(&c, Duration::minutes(15), at).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn elapsed_ttl_is_expired() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(2);
        let token = codec.sign_at(&claims(), Duration::hours(1), issued).unwrap();
        let verified = codec.verify::<TokenClaims>(&token);
        assert!(verified.is_expired());
        assert!(!verified.is_valid());
        assert!(matches!(verified.into_result(), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn tampered_signature_is_invalid_not_expired() {
        let codec = codec();
        let token = codec.sign(&claims(), Duration::minutes(15)).unwrap();
        let verified = codec.verify::<TokenClaims>(&tamper(&token));
        assert_eq!(verified, Verified::Invalid);
    }

    #[test]
    fn tampered_expired_token_is_invalid() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(2);
        let token = codec.sign_at(&claims(), Duration::hours(1), issued).unwrap();
        assert_eq!(codec.verify::<TokenClaims>(&tamper(&token)), Verified::Invalid);
    }

    #[test]
    fn token_from_other_key_is_invalid() {
        let other = TokenCodec::from_rsa_pem(OTHER_PRIVATE_PEM, OTHER_PUBLIC_PEM).unwrap();
        let token = other.sign(&claims(), Duration::minutes(15)).unwrap();
        assert_eq!(codec().verify::<TokenClaims>(&token), Verified::Invalid);
    }

    #[test]
    fn symmetric_algorithm_is_rejected() {
        let now = Utc::now();
        let c = claims();
        let signed = SignedClaims {
            claims: &c,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(15)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &signed,
            &EncodingKey::from_secret(PUBLIC_PEM),
        )
        .unwrap();
        assert_eq!(codec().verify::<TokenClaims>(&token), Verified::Invalid);
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = codec();
        assert_eq!(codec.verify::<TokenClaims>(""), Verified::Invalid);
        assert_eq!(codec.verify::<TokenClaims>("not.a.jwt"), Verified::Invalid);
    }

    #[test]
    fn mismatched_key_pair_is_a_config_error() {
        let err = TokenCodec::from_rsa_pem(PRIVATE_PEM, OTHER_PUBLIC_PEM).unwrap_err();
        assert!(matches!(err, AuthError::KeyConfig(_)));
    }

    #[test]
    fn unparseable_key_is_a_config_error() {
        let err = TokenCodec::from_rsa_pem(b"nope", PUBLIC_PEM).unwrap_err();
        assert!(matches!(err, AuthError::KeyConfig(_)));
    }

    #[test]
    fn escaped_newlines_are_unescaped() {
        assert_eq!(normalize_pem("  a\\nb\\nc \n"), "a\nb\nc");
    }
}
