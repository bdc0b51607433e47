//! Auth token inspection. The server verifies signatures; the client only reads
//! `exp` so that expired sessions never hold real-time connections.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub sub: Option<String>,
}

/// Bearer token appended to channel URLs as `?token=`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    raw: String,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken").field("raw", &"<redacted>").finish()
    }
}

impl AuthToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into().trim().to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Claims of a JWT token, read without signature verification.
    /// `None` for opaque (non-JWT) tokens.
    pub fn claims(&self) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        decode::<TokenClaims>(&self.raw, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims()
            .and_then(|c| c.exp)
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }

    /// Non-empty and not past its `exp`.
    pub fn is_usable(&self) -> bool {
        !self.raw.is_empty() && !self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn jwt_with_exp(exp: i64) -> AuthToken {
        let claims = TokenClaims {
            exp: Some(exp),
            user_id: Some(serde_json::json!(7)),
            sub: None,
        };
        let raw = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap();
        AuthToken::new(raw)
    }

    #[test]
    fn opaque_token_never_expires() {
        let token = AuthToken::new("9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b");
        assert!(token.claims().is_none());
        assert!(token.is_usable());
    }

    #[test]
    fn jwt_claims_read_without_secret() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = jwt_with_exp(exp);
        let claims = token.claims().expect("jwt claims");
        assert_eq!(claims.exp, Some(exp));
        assert_eq!(claims.user_id, Some(serde_json::json!(7)));
        assert!(token.is_usable());
    }

    #[test]
    fn expired_jwt_is_not_usable() {
        let token = jwt_with_exp((Utc::now() - Duration::minutes(5)).timestamp());
        assert!(!token.is_usable());
    }

    #[test]
    fn empty_token_is_not_usable() {
        assert!(!AuthToken::new("   ").is_usable());
    }

    #[test]
    fn debug_redacts_token() {
        let token = AuthToken::new("secret-value");
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
