// Copyright (c) 2025 - Cowboy AI, Inc.

//! Cloud Control-Plane Adapter
//!
//! Implements [`IdentityApi`], [`ComputeApi`], [`BlockStorageApi`] and
//! [`SecretsApi`] over the Oracle Cloud Infrastructure REST API.
//!
//! # Endpoints
//!
//! ```text
//! GET  {identity}/compartments?compartmentId=..&compartmentIdInSubtree=true
//! GET  {identity}/availabilityDomains?compartmentId=..
//! GET  {iaas}/instances?compartmentId=..
//! GET  {iaas}/volumes?compartmentId=..
//! POST {iaas}/volumeAttachments
//! GET  {iaas}/volumeAttachments/{id}
//! GET  {secrets}/secretbundles/{id}
//! ```
//!
//! List endpoints are paginated: the `opc-next-page` response header carries
//! the token for the following `page` query parameter.
//!
//! # Authentication
//!
//! Every built request passes through an [`OciAuth`] before it is sent. The
//! control plane itself needs [`RequestSigner`](super::signing::RequestSigner);
//! [`BearerTokenAuth`] is for a token-issuing gateway in front of it.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::OciConfig;
use crate::domain::{
    AttachVolumeRequest, AvailabilityDomain, BlockVolume, Compartment, ComputeInstance,
    VolumeAttachment,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::ports::{BlockStorageApi, ComputeApi, IdentityApi, SecretBundle, SecretsApi};

/// Response header carrying the next page token
pub const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// Request authorization hook, applied to the fully built request
pub trait OciAuth: Send + Sync {
    fn authorize(&self, request: &mut Request) -> ProviderResult<()>;
}

/// Static bearer token
#[derive(Clone)]
pub struct BearerTokenAuth {
    token: String,
}

impl BearerTokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerTokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenAuth")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl OciAuth for BearerTokenAuth {
    fn authorize(&self, request: &mut Request) -> ProviderResult<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| ProviderError::Signing(e.to_string()))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Error body returned by the control plane
#[derive(Debug, Default, Deserialize)]
struct OciErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretBundleContent {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretBundleResponse {
    secret_id: String,
    secret_bundle_content: SecretBundleContent,
}

/// REST client for the cloud control plane
pub struct OciClient {
    config: OciConfig,
    client: Client,
    auth: Arc<dyn OciAuth>,
}

impl OciClient {
    /// Create a new control-plane client
    pub fn new(config: OciConfig, auth: Arc<dyn OciAuth>) -> ProviderResult<Self> {
        info!("Creating OCI client for region {}", config.region);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            auth,
        })
    }

    pub fn config(&self) -> &OciConfig {
        &self.config
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<Response> {
        let mut request = request.build()?;
        self.auth.authorize(&mut request)?;
        let response = self.client.execute(request).await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ProviderResult<T> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> ProviderResult<(Vec<T>, Option<String>)> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let items = response.json::<Vec<T>>().await?;
        Ok((items, next_page))
    }

    async fn list_all<T>(&self, base_url: &str, params: &[(&str, &str)]) -> ProviderResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        paginate(|page| {
            let url = with_query(base_url, params, page.as_deref());
            async move { self.get_page::<T>(&url).await }
        })
        .await
    }
}

/// Collect every page produced by `fetch`, starting with no page token
pub async fn paginate<T, F, Fut>(mut fetch: F) -> ProviderResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ProviderResult<(Vec<T>, Option<String>)>>,
{
    let mut items = Vec::new();
    let mut page: Option<String> = None;

    loop {
        let (batch, next_page) = fetch(page.take()).await?;
        items.extend(batch);
        match next_page {
            Some(token) if !token.is_empty() => page = Some(token),
            _ => return Ok(items),
        }
    }
}

/// `base?k=v&...&page=token` with every value percent-encoded
pub fn with_query(base: &str, params: &[(&str, &str)], page: Option<&str>) -> String {
    let pairs: Vec<String> = params
        .iter()
        .copied()
        .chain(page.map(|token| ("page", token)))
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    if pairs.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, pairs.join("&"))
    }
}

async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed: OciErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(message),
        _ => ProviderError::Service {
            status: status.as_u16(),
            code: parsed
                .code
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
            message,
        },
    }
}

#[async_trait]
impl IdentityApi for OciClient {
    async fn list_compartments(
        &self,
        root_id: &str,
        in_subtree: bool,
    ) -> ProviderResult<Vec<Compartment>> {
        let url = format!("{}/compartments", self.config.identity_endpoint());
        let subtree = if in_subtree { "true" } else { "false" };
        self.list_all(
            &url,
            &[("compartmentId", root_id), ("compartmentIdInSubtree", subtree)],
        )
        .await
    }

    async fn list_availability_domains(
        &self,
        compartment_id: &str,
    ) -> ProviderResult<Vec<AvailabilityDomain>> {
        let url = with_query(
            &format!("{}/availabilityDomains", self.config.identity_endpoint()),
            &[("compartmentId", compartment_id)],
            None,
        );
        self.get_json(&url).await
    }
}

#[async_trait]
impl ComputeApi for OciClient {
    async fn list_instances(&self, compartment_id: &str) -> ProviderResult<Vec<ComputeInstance>> {
        let url = format!("{}/instances", self.config.iaas_endpoint());
        self.list_all(&url, &[("compartmentId", compartment_id)]).await
    }

    async fn attach_volume(
        &self,
        request: &AttachVolumeRequest,
    ) -> ProviderResult<VolumeAttachment> {
        let url = format!("{}/volumeAttachments", self.config.iaas_endpoint());
        debug!("POST {}", url);
        let response = self.send(self.client.post(&url).json(request)).await?;
        Ok(response.json::<VolumeAttachment>().await?)
    }

    async fn get_volume_attachment(
        &self,
        attachment_id: &str,
    ) -> ProviderResult<VolumeAttachment> {
        let url = format!(
            "{}/volumeAttachments/{}",
            self.config.iaas_endpoint(),
            urlencoding::encode(attachment_id)
        );
        self.get_json(&url).await
    }
}

#[async_trait]
impl BlockStorageApi for OciClient {
    async fn list_volumes(&self, compartment_id: &str) -> ProviderResult<Vec<BlockVolume>> {
        let url = format!("{}/volumes", self.config.iaas_endpoint());
        self.list_all(&url, &[("compartmentId", compartment_id)]).await
    }
}

#[async_trait]
impl SecretsApi for OciClient {
    async fn get_secret_bundle(&self, secret_id: &str) -> ProviderResult<SecretBundle> {
        let url = format!(
            "{}/secretbundles/{}",
            self.config.secrets_endpoint(),
            urlencoding::encode(secret_id)
        );
        let bundle: SecretBundleResponse = self.get_json(&url).await?;
        Ok(SecretBundle {
            secret_id: bundle.secret_id,
            content: bundle.secret_bundle_content.content,
        })
    }
}
