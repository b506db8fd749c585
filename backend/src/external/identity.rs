//! Identity provider: bearer token verification and issuance
//!
//! Tokens are JWTs whose audience is the identity project and whose issuer is
//! either the hosted provider (`https://securetoken.google.com/<project>`) or
//! the service account that minted them locally.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Identity provider misconfigured: {0}")]
    Configuration(String),
}

/// The subject a verified token speaks for
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    aud: String,
    iss: String,
    exp: i64,
    iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

/// Verifies RS256 tokens when a public key is configured, HS256 otherwise
pub struct JwtIdentityProvider {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: Option<EncodingKey>,
    audience: String,
    issuers: Vec<String>,
    token_ttl: i64,
}

impl JwtIdentityProvider {
    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let hosted_issuer = format!("https://securetoken.google.com/{}", config.project_id);
        let mut issuers = vec![hosted_issuer];
        if !config.client_email.is_empty() {
            issuers.push(config.client_email.clone());
        }

        let (algorithm, decoding_key, encoding_key) = match &config.public_key {
            Some(public_key) => {
                let decoding = DecodingKey::from_rsa_pem(public_key.as_bytes())
                    .map_err(|e| IdentityError::Configuration(format!("public key: {}", e)))?;
                let encoding = config
                    .private_key
                    .as_deref()
                    .map(|pem| EncodingKey::from_rsa_pem(pem.replace("\\n", "\n").as_bytes()))
                    .transpose()
                    .map_err(|e| IdentityError::Configuration(format!("private key: {}", e)))?;
                (Algorithm::RS256, decoding, encoding)
            }
            None => {
                if config.secret.is_empty() {
                    return Err(IdentityError::Configuration(
                        "either identity.public_key or identity.secret must be set".into(),
                    ));
                }
                (
                    Algorithm::HS256,
                    DecodingKey::from_secret(config.secret.as_bytes()),
                    Some(EncodingKey::from_secret(config.secret.as_bytes())),
                )
            }
        };

        Ok(Self {
            algorithm,
            decoding_key,
            encoding_key,
            audience: config.project_id.clone(),
            issuers,
            token_ttl: config.token_ttl,
        })
    }

    /// Mint a token for `uid`, issued by the last configured issuer
    pub fn issue(&self, uid: &str, email: Option<&str>) -> Result<String, IdentityError> {
        let key = self.encoding_key.as_ref().ok_or_else(|| {
            IdentityError::Configuration("no signing key configured".into())
        })?;
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: uid.to_string(),
            aud: self.audience.clone(),
            iss: self.issuers.last().cloned().unwrap_or_default(),
            exp: now + self.token_ttl,
            iat: now,
            email: email.map(str::to_string),
        };

        encode(&Header::new(self.algorithm), &claims, key)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&self.issuers);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(VerifiedIdentity {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> IdentityConfig {
        IdentityConfig {
            project_id: "plant-42".into(),
            client_email: "svc@plant-42.iam".into(),
            private_key: None,
            public_key: None,
            secret: secret.into(),
            token_ttl: 60,
        }
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let provider = JwtIdentityProvider::from_config(&config("s3cret")).unwrap();
        let token = provider.issue("uid-1", Some("a@b.c")).unwrap();
        let identity = provider.verify(&token).await.unwrap();
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_foreign_secret_rejected() {
        let ours = JwtIdentityProvider::from_config(&config("s3cret")).unwrap();
        let theirs = JwtIdentityProvider::from_config(&config("other")).unwrap();
        let token = theirs.issue("uid-1", None).unwrap();
        assert!(matches!(ours.verify(&token).await, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_wrong_audience_rejected() {
        let ours = JwtIdentityProvider::from_config(&config("s3cret")).unwrap();
        let mut other = config("s3cret");
        other.project_id = "someone-else".into();
        let token = JwtIdentityProvider::from_config(&other)
            .unwrap()
            .issue("uid-1", None)
            .unwrap();
        assert!(ours.verify(&token).await.is_err());
    }

    #[test]
    fn test_missing_keys_is_configuration_error() {
        assert!(matches!(
            JwtIdentityProvider::from_config(&config("")),
            Err(IdentityError::Configuration(_))
        ));
    }

    #[test]
    fn test_unconfigured_secret_is_not_defaulted() {
        let config = crate::Config::from_defaults().unwrap();
        assert!(matches!(
            JwtIdentityProvider::from_config(&config.identity),
            Err(IdentityError::Configuration(_))
        ));
    }
}
