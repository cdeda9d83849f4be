use anyhow::{anyhow, bail, Context};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DOCUMENT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentTokenClaims {
    document_id: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks tokens that unlock one PIN-protected document.
#[derive(Clone)]
pub struct DocumentTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl DocumentTokenService {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        if secret.len() < 32 {
            bail!("jwt secret must be at least 32 characters long");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, document_id: &str) -> anyhow::Result<String> {
        self.issue_at(document_id, current_unix_timestamp()?)
    }

    fn issue_at(&self, document_id: &str, issued_at: i64) -> anyhow::Result<String> {
        let claims = DocumentTokenClaims {
            document_id: document_id.to_string(),
            iat: issued_at,
            exp: issued_at + DOCUMENT_TOKEN_TTL_SECONDS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("failed to encode document token")
    }

    /// Returns the document id the token was issued for.
    pub fn validate(&self, token: &str) -> anyhow::Result<String> {
        let claims = decode::<DocumentTokenClaims>(token, &self.decoding_key, &self.validation)
            .context("failed to decode document token")?
            .claims;
        Ok(claims.document_id)
    }

    /// True when `token` is present, valid and bound to `document_id`.
    pub fn grants(&self, token: Option<&str>, document_id: &str) -> bool {
        token
            .and_then(|token| self.validate(token).ok())
            .is_some_and(|granted| granted == document_id)
    }
}

fn current_unix_timestamp() -> anyhow::Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| anyhow!("system clock is before unix epoch: {error}"))?;

    i64::try_from(duration.as_secs()).context("unix timestamp overflow")
}

#[cfg(test)]
mod tests {
    use super::{current_unix_timestamp, DocumentTokenService, DOCUMENT_TOKEN_TTL_SECONDS};

    const TEST_SECRET: &str = "dontpad_test_secret_that_is_definitely_long_enough";

    #[test]
    fn short_secrets_are_rejected() {
        assert!(DocumentTokenService::new("too-short").is_err());
    }

    #[test]
    fn token_grants_only_its_document() {
        let service = DocumentTokenService::new(TEST_SECRET).expect("service should initialize");
        let token = service.issue("receitas").expect("token should be issued");

        assert_eq!(service.validate(&token).expect("token should validate"), "receitas");
        assert!(service.grants(Some(&token), "receitas"));
        assert!(!service.grants(Some(&token), "financas"));
        assert!(!service.grants(None, "receitas"));
    }

    #[test]
    fn rejects_tampered_tokens() {
        let service = DocumentTokenService::new(TEST_SECRET).expect("service should initialize");
        let token = service.issue("receitas").expect("token should be issued");
        assert!(service.validate(&format!("{token}x")).is_err());
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let issuer = DocumentTokenService::new("another_secret_that_is_also_long_enough_ok")
            .expect("service should initialize");
        let service = DocumentTokenService::new(TEST_SECRET).expect("service should initialize");
        let token = issuer.issue("receitas").expect("token should be issued");
        assert!(!service.grants(Some(&token), "receitas"));
    }

    #[test]
    fn rejects_expired_tokens() {
        let service = DocumentTokenService::new(TEST_SECRET).expect("service should initialize");
        let issued_at = current_unix_timestamp().expect("current timestamp should resolve")
            - DOCUMENT_TOKEN_TTL_SECONDS
            - 1;
        let token = service.issue_at("receitas", issued_at).expect("token should be issued");

        assert!(service.validate(&token).is_err());
    }
}
