//! Webhook identity and its authorization rules.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::credentials::{verify_secret, BasicAuth, CredentialHasher};

/// Malformed registration input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Registration request body.
///
/// Carries plaintext secrets only until the webhook is built from it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookInput {
    #[serde(default, rename = "displayName", alias = "username")]
    pub display_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "tokenName")]
    pub token_name: String,
    #[serde(default, rename = "tokenValue")]
    pub token_value: String,
}

/// Registration response body. Credentials are never echoed back.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookCreated {
    pub id: String,
}

/// A registered webhook endpoint.
///
/// Secrets are held only as Argon2id hashes. A webhook may require
/// Basic-Auth, a token header, both (Basic-Auth wins), or nothing.
#[derive(Debug, Clone, Default)]
pub struct Webhook {
    pub id: String,
    pub display_name: Option<String>,
    password_hash: Option<String>,
    pub token_name: Option<String>,
    token_hash: Option<String>,
}

impl Webhook {
    /// Build a webhook from raw credentials. The `id` is left empty for the
    /// store to assign.
    pub fn new(
        display_name: &str,
        password: &str,
        token_name: &str,
        token_value: &str,
        hasher: &CredentialHasher,
    ) -> Self {
        Self {
            id: String::new(),
            display_name: non_empty(display_name.trim()),
            password_hash: hash_if_present(hasher, password, "password"),
            token_name: non_empty(token_name.trim()),
            token_hash: hash_if_present(hasher, token_value, "token"),
        }
    }

    pub fn from_input(input: WebhookInput, hasher: &CredentialHasher) -> Self {
        Self::new(
            &input.display_name,
            &input.password,
            &input.token_name,
            &input.token_value,
            hasher,
        )
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn has_token(&self) -> bool {
        self.token_hash.is_some()
    }

    /// Check that each credential pair is either complete or absent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.display_name.is_some() != self.password_hash.is_some() {
            return Err(ValidationError(
                "username and password must be both set or both empty".to_string(),
            ));
        }
        if self.token_name.is_some() != self.token_hash.is_some() {
            return Err(ValidationError(
                "token name and value must be both set or both empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Decide whether a request may access this webhook.
    ///
    /// Only one mode is evaluated: Basic-Auth if a password is configured,
    /// otherwise the token header, otherwise the webhook is public.
    /// Runs a deliberately slow hash comparison; keep it off async workers
    /// and outside any store lock.
    pub fn validate_authorization(&self, basic: Option<&BasicAuth>, headers: &HeaderMap) -> bool {
        if let Some(password_hash) = &self.password_hash {
            let Some(basic) = basic else {
                return false;
            };
            if self.display_name.as_deref() != Some(basic.username.as_str()) {
                return false;
            }
            return verify_secret(&basic.password, password_hash);
        }

        if let Some(token_hash) = &self.token_hash {
            let presented = self
                .token_name
                .as_deref()
                .and_then(|name| headers.get(name))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if presented.is_empty() {
                return false;
            }
            return verify_secret(presented, token_hash);
        }

        true
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn hash_if_present(hasher: &CredentialHasher, secret: &str, kind: &'static str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    match hasher.hash(secret) {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!(error = %e, credential = kind, "credential_hash_failed");
            None
        }
    }
}
