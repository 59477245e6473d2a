// Copyright (c) 2025 - Cowboy AI, Inc.
//! Secret Resolver
//!
//! Fetches the combined management-plane secret and splits it into a
//! [`CredentialPair`]. Every failure here is fatal for the instance loop.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::CredentialPair;
use crate::errors::{ProvisionError, ProvisionResult};
use crate::ports::SecretsApi;

/// Vault-backed credential source
#[derive(Clone)]
pub struct SecretResolver {
    api: Arc<dyn SecretsApi>,
}

impl SecretResolver {
    pub fn new(api: Arc<dyn SecretsApi>) -> Self {
        Self { api }
    }

    /// Fetch the secret bundle and decode its base64 content
    pub async fn fetch_secret(&self, secret_id: &str) -> ProvisionResult<String> {
        let bundle = self.api.get_secret_bundle(secret_id).await.map_err(|source| {
            error!("Failed to retrieve secret: {}", source);
            ProvisionError::SecretRetrieval {
                secret_id: secret_id.to_string(),
                source,
            }
        })?;

        let decoded = decode_secret_content(&bundle.content)?;
        debug!(secret = %secret_id, "Decoded secret bundle");
        Ok(decoded)
    }

    /// Fetch the secret and split it into username and password
    pub async fn resolve_credentials(&self, secret_id: &str) -> ProvisionResult<CredentialPair> {
        let secret = self.fetch_secret(secret_id).await?;
        split_credentials(&secret)
    }
}

/// Base64 to UTF-8
pub fn decode_secret_content(content: &str) -> ProvisionResult<String> {
    let bytes = STANDARD.decode(content.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// Split `username/password` on the first `/`
pub fn split_credentials(secret: &str) -> ProvisionResult<CredentialPair> {
    CredentialPair::parse(secret).inspect_err(|_| {
        error!("Failed to parse secret value. Ensure it is in 'username/password' format");
    })
}
