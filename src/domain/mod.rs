// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Domain Models
//!
//! Read-only views of cloud inventory, the volume attachment lifecycle, the
//! credential pair used against the management plane, and the hosts that
//! receive the iSCSI target.
//!
//! # Cloud Inventory
//!
//! - [`Compartment`] - resolved once per invocation by exact name
//! - [`AvailabilityDomain`] - resolved once per invocation by exact name
//! - [`ComputeInstance`] - the unit of iteration for the workflow
//! - [`BlockVolume`] - the volume to attach, first display-name match wins
//!
//! # Attachment Lifecycle
//!
//! - [`VolumeAttachment`] - observed, never mutated, by the orchestrator
//! - [`LifecycleState`] - provider-driven state, ATTACHED/DETACHED are terminal
//! - [`TransportTarget`] - IQN, address and port of the exposed target
//!
//! # Management Plane
//!
//! - [`CredentialPair`] - `username/password` split on the first separator
//! - [`ManagedHost`] - a hypervisor host and its storage bus adapters

pub mod attachment;
pub mod credentials;
pub mod host;
pub mod inventory;

pub use attachment::{AttachVolumeRequest, LifecycleState, TransportTarget, VolumeAttachment};
pub use credentials::CredentialPair;
pub use host::{AdapterKind, HostBusAdapter, ManagedHost};
pub use inventory::{AvailabilityDomain, BlockVolume, Compartment, ComputeInstance};
