// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identity Resolver
//!
//! Turns configured names into provider identifiers. Lookups never raise:
//! an absent name or a provider failure is logged and reported as `None`,
//! and the caller decides whether that ends the workflow.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{AvailabilityDomain, Compartment};
use crate::ports::IdentityApi;

/// Resolves compartment and availability-domain names
#[derive(Clone)]
pub struct IdentityResolver {
    api: Arc<dyn IdentityApi>,
}

impl IdentityResolver {
    pub fn new(api: Arc<dyn IdentityApi>) -> Self {
        Self { api }
    }

    /// First compartment named exactly `name` in the subtree under `root_id`
    pub async fn resolve_compartment(&self, name: &str, root_id: &str) -> Option<Compartment> {
        info!("Retrieving compartment ID for name {}", name);

        let compartments = match self.api.list_compartments(root_id, true).await {
            Ok(compartments) => compartments,
            Err(e) => {
                error!(root = %root_id, "Failed to list compartments: {}", e);
                return None;
            }
        };
        debug!("Listed {} compartments under {}", compartments.len(), root_id);

        match compartments.into_iter().find(|c| c.name == name) {
            Some(compartment) => {
                info!(
                    "Found compartment: {} with OCID: {}",
                    compartment.name, compartment.id
                );
                Some(compartment)
            }
            None => {
                warn!("No compartment found with name {}", name);
                None
            }
        }
    }

    /// Availability domain named exactly `name`, scoped to `compartment_id`
    pub async fn resolve_availability_domain(
        &self,
        compartment_id: &str,
        name: &str,
    ) -> Option<AvailabilityDomain> {
        let domains = match self.api.list_availability_domains(compartment_id).await {
            Ok(domains) => domains,
            Err(e) => {
                error!("Service error: {}", e);
                return None;
            }
        };

        let found = domains.into_iter().find(|ad| ad.name == name);
        if found.is_none() {
            warn!("Availability Domain with name '{}' not found", name);
        }
        found
    }
}
