// Copyright (c) 2025 - Cowboy AI, Inc.

//! Provider adapter implementations
//!
//! Concrete REST implementations of the traits in [`crate::ports`].

pub mod oci;
pub mod signing;
pub mod vsphere;

pub use oci::{BearerTokenAuth, OciAuth, OciClient};
pub use signing::{authorizer, RequestSigner};
pub use vsphere::{ManagedObjectReference, VsphereClient};
