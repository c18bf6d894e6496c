//! OAuth2 access tokens for a Google service account.
//!
//! The service account signs an RS256 JWT assertion which the token endpoint exchanges for a
//! short-lived bearer token. Tokens are cached until a minute before they expire.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Client;
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::DriveError;

/// Read-only Drive scope requested for ingestion.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for Drive requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Return a currently valid access token.
    async fn access_token(&self) -> Result<String, DriveError>;
}

/// Fixed token, for pre-authorized environments and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, DriveError> {
        Ok(self.0.clone())
    }
}

struct CachedToken {
    access_token: String,
    refresh_after: Instant,
}

/// Service-account credentials exchanged for access tokens via the JWT bearer grant.
pub struct ServiceAccountAuth {
    client: Client,
    client_email: String,
    key_pair: RsaKeyPair,
    token_uri: String,
    scope: String,
    token: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Parse the PEM-encoded PKCS#8 private key and prepare the token exchange.
    pub fn new(
        client_email: impl Into<String>,
        private_key_pem: &str,
        token_uri: impl Into<String>,
    ) -> Result<Self, DriveError> {
        let pem = pem::parse(private_key_pem)
            .map_err(|err| DriveError::Auth(format!("failed to parse private key PEM: {err}")))?;
        let key_pair = RsaKeyPair::from_pkcs8(pem.contents())
            .map_err(|err| DriveError::Auth(format!("failed to load private key: {err}")))?;
        let client = Client::builder().user_agent("tgp-ingest/0.1").build()?;

        Ok(Self {
            client,
            client_email: client_email.into(),
            key_pair,
            token_uri: token_uri.into(),
            scope: DRIVE_READONLY_SCOPE.to_string(),
            token: Mutex::new(None),
        })
    }

    fn signed_assertion(&self) -> Result<String, DriveError> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| DriveError::Auth(err.to_string()))?
            .as_secs();
        let claims = assertion_claims(&self.client_email, &self.scope, &self.token_uri, issued_at);

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let signing_input = format!("{header}.{payload}");

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|err| DriveError::Auth(format!("failed to sign assertion: {err}")))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&signature)))
    }

    async fn exchange(&self) -> Result<CachedToken, DriveError> {
        let assertion = self.signed_assertion()?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Token exchange rejected");
            return Err(DriveError::Auth(format!(
                "token exchange failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        tracing::debug!(lifetime_secs = lifetime.as_secs(), "Obtained Drive access token");
        Ok(CachedToken {
            access_token: token.access_token,
            refresh_after: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_after
        {
            return Ok(token.access_token.clone());
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }
}

fn assertion_claims(client_email: &str, scope: &str, audience: &str, issued_at: u64) -> Value {
    json!({
        "iss": client_email,
        "scope": scope,
        "aud": audience,
        "iat": issued_at,
        "exp": issued_at + ASSERTION_LIFETIME_SECS,
    })
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_cover_one_hour_for_readonly_scope() {
        let claims = assertion_claims(
            "ingest@example.iam.gserviceaccount.com",
            DRIVE_READONLY_SCOPE,
            "https://oauth2.googleapis.com/token",
            1_000,
        );
        assert_eq!(claims["iss"], "ingest@example.iam.gserviceaccount.com");
        assert_eq!(claims["scope"], DRIVE_READONLY_SCOPE);
        assert_eq!(claims["aud"], "https://oauth2.googleapis.com/token");
        assert_eq!(claims["iat"], 1_000);
        assert_eq!(claims["exp"], 4_600);
    }

    #[test]
    fn malformed_key_is_an_auth_error() {
        let result = ServiceAccountAuth::new(
            "ingest@example.iam.gserviceaccount.com",
            "not a pem",
            "https://oauth2.googleapis.com/token",
        );
        assert!(matches!(result, Err(DriveError::Auth(_))));
    }

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let token = StaticToken("abc".into()).access_token().await.expect("token");
        assert_eq!(token, "abc");
    }
}
