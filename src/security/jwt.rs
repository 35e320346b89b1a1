//! HS256 bearer tokens.
//!
//! Shared by the auth middleware, the built-in guards and the CLI token
//! helper, so all three agree on claims and secret handling.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims carried by page tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// User fields a token is issued for.
#[derive(Debug, Clone, Default)]
pub struct TokenSubject {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct JwtAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuthority {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `subject` valid for `ttl`.
    pub fn issue(&self, subject: &TokenSubject, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.id.clone(),
            email: subject.email.clone(),
            name: subject.name.clone(),
            roles: subject.roles.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(JwtError::Signing)
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        use jsonwebtoken::errors::ErrorKind;

        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(JwtError::Expired),
            Err(e) => Err(JwtError::Invalid(e)),
        }
    }
}

impl std::fmt::Debug for JwtAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthority").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            id: "42".into(),
            email: Some("ana@example.com".into()),
            name: None,
            roles: vec!["editor".into()],
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let authority = JwtAuthority::new("secret");
        let token = authority.issue(&subject(), Duration::hours(1)).unwrap();

        let claims = authority.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.has_role("editor"));
        assert!(!claims.has_role("admin"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtAuthority::new("one")
            .issue(&subject(), Duration::hours(1))
            .unwrap();
        let err = JwtAuthority::new("two").verify(&token).unwrap_err();
        assert!(matches!(err, JwtError::Invalid(_)));
    }

    #[test]
    fn test_expired_token() {
        let authority = JwtAuthority::new("secret");
        let token = authority.issue(&subject(), Duration::hours(-1)).unwrap();
        assert!(matches!(authority.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_garbage_token() {
        let authority = JwtAuthority::new("secret");
        assert!(matches!(
            authority.verify("invalid.token.here"),
            Err(JwtError::Invalid(_))
        ));
    }
}
