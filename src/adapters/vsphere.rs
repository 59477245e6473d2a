// Copyright (c) 2025 - Cowboy AI, Inc.

//! vSphere Management-Plane Adapter
//!
//! Implements [`VirtualizationApi`] over the vSphere VI/JSON API
//! (`{scheme}://{vcenter}/sdk/vim25/{release}`, scheme `https` unless configured).
//!
//! # Object Model
//!
//! ```text
//! ServiceInstance ──content──> { rootFolder, sessionManager, viewManager }
//! ViewManager.CreateContainerView(rootFolder, [HostSystem], recursive)
//!     └─> ContainerView.view ──> [HostSystem]
//! HostSystem.configManager.storageSystem ──> HostStorageSystem
//!     ├─ storageDeviceInfo.hostBusAdapter[]      (HostInternetScsiHba = iSCSI)
//!     ├─ AddInternetScsiSendTargets(device, [address:port])
//!     └─ RescanHba(device)
//! ```
//!
//! Login returns a `vmware-api-session-id` header which is sent with every
//! following request until `SessionManager.Logout`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{TlsPolicy, VsphereConfig};
use crate::domain::{
    AdapterKind, CredentialPair, HostBusAdapter, ManagedHost, TransportTarget,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::ports::{ManagementSession, VirtualizationApi};

/// Session token header
pub const SESSION_HEADER: &str = "vmware-api-session-id";

const MOREF_TYPE_NAME: &str = "ManagedObjectReference";

fn moref_type_name() -> String {
    MOREF_TYPE_NAME.to_string()
}

/// Reference to a managed object, e.g. `HostSystem:host-10`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "_typeName", default = "moref_type_name")]
    pub type_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: moref_type_name(),
            kind: kind.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceContent {
    root_folder: ManagedObjectReference,
    session_manager: Option<ManagedObjectReference>,
    view_manager: Option<ManagedObjectReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostConfigManager {
    storage_system: Option<ManagedObjectReference>,
}

#[derive(Debug, Deserialize)]
struct RawHostBusAdapter {
    #[serde(rename = "_typeName")]
    type_name: String,
    device: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostStorageDeviceInfo {
    #[serde(default)]
    host_bus_adapter: Vec<RawHostBusAdapter>,
}

impl HostStorageDeviceInfo {
    fn adapters(self) -> Vec<HostBusAdapter> {
        self.host_bus_adapter
            .into_iter()
            .map(|hba| HostBusAdapter::new(hba.device, AdapterKind::from_type_name(&hba.type_name)))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaultMessage {
    message: Option<String>,
}

/// Method fault body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodFault {
    #[serde(rename = "_typeName")]
    type_name: Option<String>,
    message: Option<String>,
    #[serde(default)]
    fault_message: Vec<FaultMessage>,
}

/// vSphere VI/JSON client
#[derive(Clone)]
pub struct VsphereClient {
    config: VsphereConfig,
    client: Client,
}

impl VsphereClient {
    /// Create a new client honouring the configured TLS policy
    pub fn new(config: VsphereConfig) -> ProviderResult<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if config.tls == TlsPolicy::InsecureSkipVerify {
            warn!("Certificate validation is disabled for vSphere connections");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// API root for `endpoint`
    pub fn base_url(&self, endpoint: &str) -> String {
        format!(
            "{}://{}/sdk/vim25/{}",
            self.config.scheme, endpoint, self.config.api_release
        )
    }
}

#[async_trait]
impl VirtualizationApi for VsphereClient {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &CredentialPair,
    ) -> ProviderResult<Box<dyn ManagementSession>> {
        let base = self.base_url(endpoint);

        let response = self
            .client
            .get(format!("{}/ServiceInstance/ServiceInstance/content", base))
            .send()
            .await?;
        let content: ServiceContent = check_fault(response).await?.json().await?;

        let session_manager = content.session_manager.clone().ok_or_else(|| {
            ProviderError::Decode("service content carries no sessionManager".to_string())
        })?;

        let response = self
            .client
            .post(format!("{}/SessionManager/{}/Login", base, session_manager.value))
            .json(&json!({
                "userName": credentials.username(),
                "password": credentials.password(),
            }))
            .send()
            .await?;
        let response = check_fault(response).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Unauthorized("login response carried no session id".to_string())
            })?;

        info!("Connected to vSphere at {}", endpoint);

        Ok(Box::new(VsphereSession {
            client: self.client.clone(),
            base,
            session_id,
            root_folder: content.root_folder,
            session_manager,
            view_manager: content.view_manager,
        }))
    }
}

/// Authenticated VI/JSON session
struct VsphereSession {
    client: Client,
    base: String,
    session_id: String,
    root_folder: ManagedObjectReference,
    session_manager: ManagedObjectReference,
    view_manager: Option<ManagedObjectReference>,
}

impl VsphereSession {
    fn url(&self, kind: &str, id: &str, member: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base,
            kind,
            urlencoding::encode(id),
            member
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(SESSION_HEADER, &self.session_id)
    }

    /// Read a property
    async fn get<T: DeserializeOwned>(&self, kind: &str, id: &str, property: &str) -> ProviderResult<T> {
        let url = self.url(kind, id, property);
        debug!("GET {}", url);
        let response = self.authorized(self.client.get(&url)).send().await?;
        Ok(check_fault(response).await?.json::<T>().await?)
    }

    /// Invoke a method that returns a value
    async fn invoke<T: DeserializeOwned>(
        &self,
        kind: &str,
        id: &str,
        method: &str,
        body: &Value,
    ) -> ProviderResult<T> {
        let url = self.url(kind, id, method);
        debug!("POST {}", url);
        let response = self
            .authorized(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        Ok(check_fault(response).await?.json::<T>().await?)
    }

    /// Invoke a method without a return value
    async fn invoke_void(
        &self,
        kind: &str,
        id: &str,
        method: &str,
        body: Option<&Value>,
    ) -> ProviderResult<()> {
        let url = self.url(kind, id, method);
        debug!("POST {}", url);
        let mut request = self.authorized(self.client.post(&url));
        if let Some(body) = body {
            request = request.json(body);
        }
        check_fault(request.send().await?).await?;
        Ok(())
    }

    /// Read name, storage system and bus adapters of one host
    ///
    /// Property read failures leave the field empty, which makes the host
    /// skippable rather than aborting enumeration of its siblings.
    async fn inspect_host(&self, host_ref: &ManagedObjectReference) -> ManagedHost {
        let name = match self.get::<String>("HostSystem", &host_ref.value, "name").await {
            Ok(name) => name,
            Err(e) => {
                warn!(host = %host_ref.value, "Failed to read host name: {}", e);
                host_ref.value.clone()
            }
        };

        let storage_system = match self
            .get::<HostConfigManager>("HostSystem", &host_ref.value, "configManager")
            .await
        {
            Ok(config_manager) => config_manager.storage_system,
            Err(e) => {
                warn!(host = %name, "Failed to read host config manager: {}", e);
                None
            }
        };

        let storage_adapters = match &storage_system {
            Some(storage_system) => match self
                .get::<HostStorageDeviceInfo>(
                    "HostStorageSystem",
                    &storage_system.value,
                    "storageDeviceInfo",
                )
                .await
            {
                Ok(info) => info.adapters(),
                Err(e) => {
                    warn!(host = %name, "Failed to read storage device info: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        ManagedHost {
            name,
            reference: host_ref.value.clone(),
            storage_system: storage_system.map(|s| s.value),
            storage_adapters,
        }
    }

    fn storage_system<'a>(&self, host: &'a ManagedHost) -> ProviderResult<&'a str> {
        host.storage_system.as_deref().ok_or_else(|| {
            ProviderError::NotFound(format!("host {} exposes no storage system", host.name))
        })
    }
}

#[async_trait]
impl ManagementSession for VsphereSession {
    async fn list_hosts(&self) -> ProviderResult<Vec<ManagedHost>> {
        let view_manager = self.view_manager.as_ref().ok_or_else(|| {
            ProviderError::Decode("service content carries no viewManager".to_string())
        })?;

        let view: ManagedObjectReference = self
            .invoke(
                "ViewManager",
                &view_manager.value,
                "CreateContainerView",
                &json!({
                    "container": self.root_folder,
                    "type": ["HostSystem"],
                    "recursive": true,
                }),
            )
            .await?;

        let host_refs = self
            .get::<Vec<ManagedObjectReference>>("ContainerView", &view.value, "view")
            .await;

        if let Err(e) = self
            .invoke_void("ContainerView", &view.value, "DestroyView", None)
            .await
        {
            warn!("Failed to destroy container view {}: {}", view.value, e);
        }

        let mut hosts = Vec::new();
        for host_ref in host_refs? {
            hosts.push(self.inspect_host(&host_ref).await);
        }
        Ok(hosts)
    }

    async fn add_send_target(
        &self,
        host: &ManagedHost,
        device: &str,
        target: &TransportTarget,
    ) -> ProviderResult<()> {
        let storage_system = self.storage_system(host)?;
        self.invoke_void(
            "HostStorageSystem",
            storage_system,
            "AddInternetScsiSendTargets",
            Some(&json!({
                "iScsiHbaDevice": device,
                "targets": [{
                    "_typeName": "HostInternetScsiHbaSendTarget",
                    "address": target.address,
                    "port": target.port,
                }],
            })),
        )
        .await
    }

    async fn rescan_adapter(&self, host: &ManagedHost, device: &str) -> ProviderResult<()> {
        let storage_system = self.storage_system(host)?;
        self.invoke_void(
            "HostStorageSystem",
            storage_system,
            "RescanHba",
            Some(&json!({ "hbaDevice": device })),
        )
        .await
    }

    async fn logout(&self) -> ProviderResult<()> {
        self.invoke_void("SessionManager", &self.session_manager.value, "Logout", None)
            .await?;
        debug!("Logged out of vSphere session");
        Ok(())
    }
}

async fn check_fault(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(fault_error(status, &body))
}

fn fault_error(status: StatusCode, body: &str) -> ProviderError {
    let fault: MethodFault = serde_json::from_str(body).unwrap_or_default();
    let message = fault
        .message
        .or_else(|| fault.fault_message.into_iter().find_map(|m| m.message))
        .unwrap_or_else(|| body.to_string());
    let type_name = fault.type_name.unwrap_or_default();

    match type_name.as_str() {
        "InvalidLogin" | "NotAuthenticated" | "NoPermission" => {
            ProviderError::Unauthorized(format!("{}: {}", type_name, message))
        }
        "ManagedObjectNotFound" => ProviderError::NotFound(message),
        _ if status == StatusCode::UNAUTHORIZED => ProviderError::Unauthorized(message),
        _ => ProviderError::Service {
            status: status.as_u16(),
            code: if type_name.is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                type_name
            },
            message,
        },
    }
}
