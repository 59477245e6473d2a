// Copyright (c) 2025 - Cowboy AI, Inc.
//! Management-Plane Credential Pair
//!
//! The combined secret stores `username/password`. Only the first `/`
//! separates the two fields, so passwords may themselves contain `/`.

use std::fmt;

use crate::errors::{ProvisionError, ProvisionResult};

/// Separator between username and password in the combined secret
pub const CREDENTIAL_SEPARATOR: char = '/';

/// Username and password held in memory for one fan-out cycle
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    username: String,
    password: String,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Split a combined secret on its first separator
    ///
    /// # Errors
    /// [`ProvisionError::CredentialFormat`] when no separator is present.
    pub fn parse(secret: &str) -> ProvisionResult<Self> {
        secret
            .split_once(CREDENTIAL_SEPARATOR)
            .map(|(username, password)| Self::new(username, password))
            .ok_or(ProvisionError::CredentialFormat)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
