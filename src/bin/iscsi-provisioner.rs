// Copyright (c) 2025 - Cowboy AI, Inc.
//! iSCSI Provisioner Service
//!
//! Serves the provisioning trigger over HTTP. Each request body
//! `{"shape": "...", "block_volume_name": "..."}` attaches the named volume to
//! every instance of that shape and registers the iSCSI target on every
//! vSphere host.
//!
//! Run with: cargo run --bin iscsi-provisioner
//!
//! Prerequisites:
//! 1. `ROOT_COMPARTMENT_OCID`, `Compartment_name`, `ad_name`, `vcenter_ip`
//!    and `combined_secret_ocid` set in the environment
//! 2. Control-plane credentials: the resource principal of the function
//!    runtime (`OCI_RESOURCE_PRINCIPAL_RPST`, `OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM`),
//!    or a user API key (`OCI_USER_OCID`, `OCI_TENANCY_OCID`, `OCI_FINGERPRINT`,
//!    `OCI_PRIVATE_KEY_PATH`)

use anyhow::{Context, Result};
use iscsi_provisioner::{
    adapters::{authorizer, OciClient, VsphereClient},
    server, ProviderSet, ProvisionerConfig, ProvisioningWorkflow,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting iSCSI provisioner");

    let config = ProvisionerConfig::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded:");
    info!("  - Compartment: {}", config.workflow.compartment_name);
    info!("  - Availability domain: {}", config.workflow.availability_domain_name);
    info!("  - vCenter: {}", config.workflow.management_endpoint);
    info!("  - Region: {}", config.oci.region);
    info!("  - Poll interval: {:?}", config.poll.interval);

    let auth = authorizer(&config.oci.credentials).context("Failed to load OCI credentials")?;
    let cloud = Arc::new(
        OciClient::new(config.oci.clone(), auth).context("Failed to create OCI client")?,
    );
    let vsphere = Arc::new(
        VsphereClient::new(config.vsphere.clone()).context("Failed to create vSphere client")?,
    );

    let providers = ProviderSet {
        identity: cloud.clone(),
        compute: cloud.clone(),
        block_storage: cloud.clone(),
        secrets: cloud,
        virtualization: vsphere,
    };

    let workflow = Arc::new(
        ProvisioningWorkflow::new(config.workflow.clone(), config.poll.clone(), providers)
            .with_report_in_response(config.server.include_report),
    );

    server::serve(&config.server, workflow)
        .await
        .context("Trigger endpoint failed")?;
    Ok(())
}
