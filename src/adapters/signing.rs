// Copyright (c) 2025 - Cowboy AI, Inc.

//! Control-Plane Request Signing
//!
//! The cloud control plane authenticates every call with an HTTP Signature
//! (draft-cavage, `rsa-sha256`). The signed headers are:
//!
//! ```text
//! date (request-target) host                                           GET, DELETE
//! date (request-target) host x-content-sha256 content-type content-length  POST, PUT, PATCH
//! ```
//!
//! and the result is sent as
//!
//! ```text
//! Authorization: Signature version="1",keyId="..",algorithm="rsa-sha256",headers="..",signature=".."
//! ```
//!
//! The key id is `ST$<session token>` for a resource principal and
//! `<tenancy>/<user>/<fingerprint>` for a user API key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Request, Url};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::oci::{BearerTokenAuth, OciAuth};
use crate::config::OciCredentials;
use crate::errors::{ConfigError, ProviderError, ProviderResult};

const CONTENT_SHA256: &str = "x-content-sha256";

/// Signs requests with an RSA key
pub struct RequestSigner {
    key_id: String,
    signing_key: SigningKey<Sha256>,
}

impl RequestSigner {
    pub fn new(key_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::<Sha256>::new(private_key),
        }
    }

    /// Signer for a resource principal session token
    pub fn resource_principal(session_token: &str, private_key: RsaPrivateKey) -> Self {
        Self::new(format!("ST${}", session_token.trim()), private_key)
    }

    /// Signer for a user API key
    pub fn api_key(
        tenancy_id: &str,
        user_id: &str,
        fingerprint: &str,
        private_key: RsaPrivateKey,
    ) -> Self {
        Self::new(format!("{}/{}/{}", tenancy_id, user_id, fingerprint), private_key)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Add the signed headers and `Authorization` to `request`, dated `date`
    pub fn sign_at(&self, request: &mut Request, date: DateTime<Utc>) -> ProviderResult<()> {
        let mut signed: Vec<(&'static str, String)> = vec![
            ("date", date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
            ("(request-target)", request_target(request.method(), request.url())),
            ("host", host(request.url())?),
        ];

        if carries_body(request.method()) {
            let body = request
                .body()
                .and_then(|body| body.as_bytes())
                .unwrap_or_default();
            let content_type = request
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            signed.push((CONTENT_SHA256, STANDARD.encode(Sha256::digest(body))));
            signed.push(("content-type", content_type));
            signed.push(("content-length", body.len().to_string()));
        }

        let signature = self
            .signing_key
            .try_sign(signing_string(&signed).as_bytes())
            .map_err(|e| ProviderError::Signing(e.to_string()))?;
        let names: Vec<&str> = signed.iter().map(|(name, _)| *name).collect();
        let authorization = format!(
            r#"Signature version="1",keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
            self.key_id,
            names.join(" "),
            STANDARD.encode(signature.to_bytes())
        );

        let headers = request.headers_mut();
        for (name, value) in signed.iter().filter(|(name, _)| *name != "(request-target)") {
            headers.insert(HeaderName::from_static(*name), header_value(value)?);
        }
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &redact_session(&self.key_id))
            .finish()
    }
}

impl OciAuth for RequestSigner {
    fn authorize(&self, request: &mut Request) -> ProviderResult<()> {
        self.sign_at(request, Utc::now())
    }
}

/// Build the request authorizer for the configured credentials
pub fn authorizer(credentials: &OciCredentials) -> Result<Arc<dyn OciAuth>, ConfigError> {
    match credentials {
        OciCredentials::ResourcePrincipal {
            session_token,
            private_key,
        } => {
            let token_source = session_token
                .as_deref()
                .ok_or(ConfigError::MissingKey("OCI_RESOURCE_PRINCIPAL_RPST"))?;
            let key_source = private_key
                .as_deref()
                .ok_or(ConfigError::MissingKey("OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM"))?;
            let token = read_literal_or_file("OCI_RESOURCE_PRINCIPAL_RPST", token_source)?;
            let pem = read_literal_or_file("OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM", key_source)?;
            let key = parse_private_key("OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM", &pem)?;
            info!("Signing control-plane requests as the resource principal");
            Ok(Arc::new(RequestSigner::resource_principal(&token, key)))
        }
        OciCredentials::ApiKey {
            tenancy_id,
            user_id,
            fingerprint,
            private_key_path,
        } => {
            let pem = read_file("OCI_PRIVATE_KEY_PATH", private_key_path)?;
            let key = parse_private_key("OCI_PRIVATE_KEY_PATH", &pem)?;
            info!("Signing control-plane requests with the API key of {}", user_id);
            Ok(Arc::new(RequestSigner::api_key(
                tenancy_id,
                user_id,
                fingerprint,
                key,
            )))
        }
        OciCredentials::BearerToken(token) => {
            info!("Using bearer token for the control-plane gateway");
            Ok(Arc::new(BearerTokenAuth::new(token.clone())))
        }
    }
}

/// Accept a PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`) PEM
pub fn parse_private_key(key: &'static str, pem: &str) -> Result<RsaPrivateKey, ConfigError> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: "<private key>".to_string(),
            reason: format!("not an unencrypted RSA private key: {}", e),
        })
}

fn read_literal_or_file(key: &'static str, source: &str) -> Result<String, ConfigError> {
    if Path::new(source).is_absolute() {
        read_file(key, source)
    } else {
        Ok(source.to_string())
    }
}

fn read_file(key: &'static str, path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
        key,
        value: path.to_string(),
        reason: e.to_string(),
    })
}

fn signing_string(signed: &[(&str, String)]) -> String {
    signed
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn request_target(method: &Method, url: &Url) -> String {
    let method = method.as_str().to_lowercase();
    match url.query() {
        Some(query) => format!("{} {}?{}", method, url.path(), query),
        None => format!("{} {}", method, url.path()),
    }
}

fn host(url: &Url) -> ProviderResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::Signing(format!("URL has no host: {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn header_value(value: &str) -> ProviderResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ProviderError::Signing(e.to_string()))
}

fn redact_session(key_id: &str) -> &str {
    if key_id.starts_with("ST$") {
        "ST$<redacted>"
    } else {
        key_id
    }
}
