// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for iscsi-provisioner
//!
//! In-memory provider ports with scripted behaviour and call recording.
//!
//! # Design Principles
//! - All identifiers are fixed constants
//! - Attachment lifecycles are scripted per attachment, one state per poll
//! - Every port call is recorded so tests can assert ordering and counts

#![allow(dead_code)]

pub mod http;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use iscsi_provisioner::config::WorkflowSettings;
use iscsi_provisioner::domain::{
    AdapterKind, AttachVolumeRequest, AvailabilityDomain, BlockVolume, Compartment,
    ComputeInstance, CredentialPair, HostBusAdapter, LifecycleState, ManagedHost,
    TransportTarget, VolumeAttachment,
};
use iscsi_provisioner::errors::{ProviderError, ProviderResult};
use iscsi_provisioner::ports::{
    BlockStorageApi, ComputeApi, IdentityApi, ManagementSession, SecretBundle, SecretsApi,
    VirtualizationApi,
};
use iscsi_provisioner::ProviderSet;

pub const ROOT_COMPARTMENT_ID: &str = "ocid1.tenancy.oc1..root";
pub const COMPARTMENT_ID: &str = "ocid1.compartment.oc1..vmware";
pub const COMPARTMENT_NAME: &str = "vmware";
pub const AD_NAME: &str = "Uocm:PHX-AD-1";
pub const AD_ID: &str = "ocid1.availabilitydomain.oc1..ad1";
pub const VCENTER: &str = "10.0.0.10";
pub const SECRET_ID: &str = "ocid1.vaultsecret.oc1..combined";
pub const SHAPE: &str = "BM.DenseIO2.52";
pub const VOLUME_NAME: &str = "datastore-01";
pub const VOLUME_ID: &str = "ocid1.volume.oc1..datastore01";
pub const TARGET_IQN: &str = "iqn.2015-12.com.oracleiaas:datastore01";
pub const TARGET_ADDRESS: &str = "169.254.2.2";
pub const TARGET_PORT: u16 = 3260;

pub fn workflow_settings() -> WorkflowSettings {
    WorkflowSettings {
        root_compartment_id: ROOT_COMPARTMENT_ID.to_string(),
        compartment_name: COMPARTMENT_NAME.to_string(),
        availability_domain_name: AD_NAME.to_string(),
        management_endpoint: VCENTER.to_string(),
        combined_secret_id: SECRET_ID.to_string(),
    }
}

pub fn instance(id: &str, shape: &str) -> ComputeInstance {
    ComputeInstance {
        id: id.to_string(),
        shape: shape.to_string(),
        display_name: Some(format!("{}-name", id)),
        lifecycle_state: Some("RUNNING".to_string()),
    }
}

pub fn target() -> TransportTarget {
    TransportTarget {
        name: TARGET_IQN.to_string(),
        address: TARGET_ADDRESS.to_string(),
        port: TARGET_PORT,
    }
}

pub fn encode_secret(secret: &str) -> String {
    STANDARD.encode(secret)
}

/// Recorded cloud calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudCall {
    ListCompartments { root_id: String, in_subtree: bool },
    ListAvailabilityDomains(String),
    ListInstances(String),
    ListVolumes(String),
    Attach { instance_id: String, volume_id: String },
    GetAttachment(String),
    GetSecret(String),
}

#[derive(Default)]
struct CloudState {
    compartments: Vec<Compartment>,
    compartments_error: Option<ProviderError>,
    availability_domains: Vec<AvailabilityDomain>,
    availability_domains_error: Option<ProviderError>,
    instances: Vec<ComputeInstance>,
    volumes: Vec<BlockVolume>,
    /// Lifecycle script per instance id; the last state repeats once drained
    scripts: HashMap<String, VecDeque<LifecycleState>>,
    /// Attachment id -> (instance id, last observed state)
    attachments: HashMap<String, (String, LifecycleState)>,
    secret_content: Option<String>,
    secret_error: Option<ProviderError>,
    calls: Vec<CloudCall>,
}

/// Scripted cloud control plane
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compartment, availability domain, volume and secret all present
    pub fn provisioned() -> Self {
        let cloud = Self::new()
            .with_compartments(vec![
                Compartment {
                    id: "ocid1.compartment.oc1..other".into(),
                    name: "network".into(),
                },
                Compartment {
                    id: COMPARTMENT_ID.into(),
                    name: COMPARTMENT_NAME.into(),
                },
            ])
            .with_availability_domains(vec![AvailabilityDomain {
                id: AD_ID.into(),
                name: AD_NAME.into(),
            }])
            .with_volumes(vec![BlockVolume {
                id: VOLUME_ID.into(),
                display_name: VOLUME_NAME.into(),
            }]);
        cloud.set_secret(&encode_secret("administrator@vsphere.local/p@ss/w0rd"));
        cloud
    }

    pub fn with_compartments(self, compartments: Vec<Compartment>) -> Self {
        self.state.lock().unwrap().compartments = compartments;
        self
    }

    pub fn with_compartments_error(self, error: ProviderError) -> Self {
        self.state.lock().unwrap().compartments_error = Some(error);
        self
    }

    pub fn with_availability_domains(self, domains: Vec<AvailabilityDomain>) -> Self {
        self.state.lock().unwrap().availability_domains = domains;
        self
    }

    pub fn with_availability_domains_error(self, error: ProviderError) -> Self {
        self.state.lock().unwrap().availability_domains_error = Some(error);
        self
    }

    pub fn with_instances(self, instances: Vec<ComputeInstance>) -> Self {
        self.state.lock().unwrap().instances = instances;
        self
    }

    pub fn with_volumes(self, volumes: Vec<BlockVolume>) -> Self {
        self.state.lock().unwrap().volumes = volumes;
        self
    }

    /// Lifecycle states reported, one per poll, for attachments of `instance_id`
    pub fn script(self, instance_id: &str, states: Vec<LifecycleState>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(instance_id.to_string(), states.into());
        self
    }

    pub fn set_secret(&self, content: &str) {
        self.state.lock().unwrap().secret_content = Some(content.to_string());
    }

    pub fn with_secret_error(self, error: ProviderError) -> Self {
        self.state.lock().unwrap().secret_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<CloudCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CloudCall::GetAttachment(_)))
            .count()
    }

    pub fn attach_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CloudCall::Attach { .. }))
            .count()
    }

    pub fn secret_fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CloudCall::GetSecret(_)))
            .count()
    }

    fn record(&self, call: CloudCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn attachment_id_for(instance_id: &str) -> String {
    format!("ocid1.volumeattachment.oc1..{}", instance_id)
}

#[async_trait]
impl IdentityApi for FakeCloud {
    async fn list_compartments(
        &self,
        root_id: &str,
        in_subtree: bool,
    ) -> ProviderResult<Vec<Compartment>> {
        self.record(CloudCall::ListCompartments {
            root_id: root_id.to_string(),
            in_subtree,
        });
        let state = self.state.lock().unwrap();
        match &state.compartments_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.compartments.clone()),
        }
    }

    async fn list_availability_domains(
        &self,
        compartment_id: &str,
    ) -> ProviderResult<Vec<AvailabilityDomain>> {
        self.record(CloudCall::ListAvailabilityDomains(compartment_id.to_string()));
        let state = self.state.lock().unwrap();
        match &state.availability_domains_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.availability_domains.clone()),
        }
    }
}

#[async_trait]
impl ComputeApi for FakeCloud {
    async fn list_instances(&self, compartment_id: &str) -> ProviderResult<Vec<ComputeInstance>> {
        self.record(CloudCall::ListInstances(compartment_id.to_string()));
        Ok(self.state.lock().unwrap().instances.clone())
    }

    async fn attach_volume(
        &self,
        request: &AttachVolumeRequest,
    ) -> ProviderResult<VolumeAttachment> {
        self.record(CloudCall::Attach {
            instance_id: request.instance_id.clone(),
            volume_id: request.volume_id.clone(),
        });
        let id = attachment_id_for(&request.instance_id);
        self.state.lock().unwrap().attachments.insert(
            id.clone(),
            (request.instance_id.clone(), LifecycleState::Attaching),
        );
        Ok(VolumeAttachment {
            id,
            instance_id: request.instance_id.clone(),
            volume_id: request.volume_id.clone(),
            lifecycle_state: LifecycleState::Attaching,
            iqn: None,
            ipv4: None,
            port: None,
        })
    }

    async fn get_volume_attachment(
        &self,
        attachment_id: &str,
    ) -> ProviderResult<VolumeAttachment> {
        self.record(CloudCall::GetAttachment(attachment_id.to_string()));
        let mut state = self.state.lock().unwrap();

        let (instance_id, last) = state
            .attachments
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(attachment_id.to_string()))?;

        let next = state
            .scripts
            .get_mut(&instance_id)
            .and_then(|script| script.pop_front())
            .unwrap_or(last);
        state
            .attachments
            .insert(attachment_id.to_string(), (instance_id.clone(), next.clone()));

        let attached = next == LifecycleState::Attached;
        Ok(VolumeAttachment {
            id: attachment_id.to_string(),
            instance_id,
            volume_id: VOLUME_ID.to_string(),
            lifecycle_state: next,
            iqn: attached.then(|| TARGET_IQN.to_string()),
            ipv4: attached.then(|| TARGET_ADDRESS.to_string()),
            port: attached.then_some(TARGET_PORT),
        })
    }
}

#[async_trait]
impl BlockStorageApi for FakeCloud {
    async fn list_volumes(&self, compartment_id: &str) -> ProviderResult<Vec<BlockVolume>> {
        self.record(CloudCall::ListVolumes(compartment_id.to_string()));
        Ok(self.state.lock().unwrap().volumes.clone())
    }
}

#[async_trait]
impl SecretsApi for FakeCloud {
    async fn get_secret_bundle(&self, secret_id: &str) -> ProviderResult<SecretBundle> {
        self.record(CloudCall::GetSecret(secret_id.to_string()));
        let state = self.state.lock().unwrap();
        if let Some(e) = &state.secret_error {
            return Err(e.clone());
        }
        state
            .secret_content
            .clone()
            .map(|content| SecretBundle {
                secret_id: secret_id.to_string(),
                content,
            })
            .ok_or_else(|| ProviderError::NotFound(secret_id.to_string()))
    }
}

/// Recorded management-plane calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Connect { endpoint: String, username: String },
    ListHosts,
    AddSendTarget { host: String, device: String, portal: String },
    Rescan { host: String, device: String },
    Logout,
}

#[derive(Default)]
struct VirtualizationState {
    hosts: Vec<ManagedHost>,
    reject_login: bool,
    fail_enumeration: bool,
    fail_logout: bool,
    fail_add_target: Vec<String>,
    fail_rescan: Vec<String>,
    calls: Vec<HostCall>,
    open_sessions: usize,
}

/// Scripted vSphere management plane
#[derive(Clone, Default)]
pub struct FakeVirtualization {
    state: Arc<Mutex<VirtualizationState>>,
}

impl FakeVirtualization {
    pub fn new(hosts: Vec<ManagedHost>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().hosts = hosts;
        fake
    }

    pub fn reject_login(self) -> Self {
        self.state.lock().unwrap().reject_login = true;
        self
    }

    pub fn fail_enumeration(self) -> Self {
        self.state.lock().unwrap().fail_enumeration = true;
        self
    }

    pub fn fail_logout(self) -> Self {
        self.state.lock().unwrap().fail_logout = true;
        self
    }

    pub fn fail_add_target_on(self, host: &str) -> Self {
        self.state.lock().unwrap().fail_add_target.push(host.to_string());
        self
    }

    pub fn fail_rescan_on(self, host: &str) -> Self {
        self.state.lock().unwrap().fail_rescan.push(host.to_string());
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().open_sessions
    }

    pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls().iter().filter(|&c| predicate(c)).count()
    }
}

pub fn esxi_host(name: &str, adapters: Vec<HostBusAdapter>) -> ManagedHost {
    ManagedHost {
        name: name.to_string(),
        reference: format!("host-{}", name),
        storage_system: Some(format!("storageSystem-{}", name)),
        storage_adapters: adapters,
    }
}

pub fn iscsi_host(name: &str) -> ManagedHost {
    esxi_host(
        name,
        vec![
            HostBusAdapter::new("vmhba0", AdapterKind::Block),
            HostBusAdapter::new("vmhba64", AdapterKind::InternetScsi),
        ],
    )
}

pub fn host_without_iscsi(name: &str) -> ManagedHost {
    esxi_host(
        name,
        vec![HostBusAdapter::new("vmhba1", AdapterKind::FibreChannel)],
    )
}

#[async_trait]
impl VirtualizationApi for FakeVirtualization {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &CredentialPair,
    ) -> ProviderResult<Box<dyn ManagementSession>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::Connect {
            endpoint: endpoint.to_string(),
            username: credentials.username().to_string(),
        });
        if state.reject_login {
            return Err(ProviderError::Unauthorized("InvalidLogin".to_string()));
        }
        state.open_sessions += 1;
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<VirtualizationState>>,
}

#[async_trait]
impl ManagementSession for FakeSession {
    async fn list_hosts(&self) -> ProviderResult<Vec<ManagedHost>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::ListHosts);
        if state.fail_enumeration {
            return Err(ProviderError::Service {
                status: 500,
                code: "SystemError".to_string(),
                message: "inventory service unavailable".to_string(),
            });
        }
        Ok(state.hosts.clone())
    }

    async fn add_send_target(
        &self,
        host: &ManagedHost,
        device: &str,
        target: &TransportTarget,
    ) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::AddSendTarget {
            host: host.name.clone(),
            device: device.to_string(),
            portal: target.portal(),
        });
        if state.fail_add_target.contains(&host.name) {
            return Err(ProviderError::Service {
                status: 500,
                code: "HostConfigFault".to_string(),
                message: "send target rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn rescan_adapter(&self, host: &ManagedHost, device: &str) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::Rescan {
            host: host.name.clone(),
            device: device.to_string(),
        });
        if state.fail_rescan.contains(&host.name) {
            return Err(ProviderError::Service {
                status: 500,
                code: "HostConfigFault".to_string(),
                message: "rescan failed".to_string(),
            });
        }
        Ok(())
    }

    async fn logout(&self) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::Logout);
        state.open_sessions -= 1;
        if state.fail_logout {
            return Err(ProviderError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Provider set backed by the given fakes
pub fn providers(cloud: &FakeCloud, virtualization: &FakeVirtualization) -> ProviderSet {
    ProviderSet {
        identity: Arc::new(cloud.clone()),
        compute: Arc::new(cloud.clone()),
        block_storage: Arc::new(cloud.clone()),
        secrets: Arc::new(cloud.clone()),
        virtualization: Arc::new(virtualization.clone()),
    }
}
