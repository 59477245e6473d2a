// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioner configuration
//!
//! Everything is read from the environment. The five workflow keys are
//! required and the process refuses to start without them; the rest have
//! defaults.
//!
//! | Key | Default |
//! |-----|---------|
//! | `ROOT_COMPARTMENT_OCID` | required |
//! | `Compartment_name` | required |
//! | `ad_name` | required |
//! | `vcenter_ip` | required |
//! | `combined_secret_ocid` | required |
//! | `OCI_REGION` | `OCI_RESOURCE_PRINCIPAL_REGION`, then `us-ashburn-1` |
//! | `OCI_RESOURCE_PRINCIPAL_RPST` | unset (token or absolute path) |
//! | `OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM` | unset (PEM or absolute path) |
//! | `OCI_USER_OCID` | unset (selects API key signing) |
//! | `OCI_TENANCY_OCID` | required with `OCI_USER_OCID` |
//! | `OCI_FINGERPRINT` | required with `OCI_USER_OCID` |
//! | `OCI_PRIVATE_KEY_PATH` | required with `OCI_USER_OCID` |
//! | `OCI_AUTH_TOKEN` | unset (selects gateway bearer auth) |
//! | `OCI_ENDPOINT_OVERRIDE` | unset |
//! | `OCI_REQUEST_TIMEOUT_SECS` | `30` |
//! | `VSPHERE_SCHEME` | `https` |
//! | `VSPHERE_API_RELEASE` | `8.0.1.0` |
//! | `VSPHERE_INSECURE_SKIP_VERIFY` | `false` |
//! | `VSPHERE_REQUEST_TIMEOUT_SECS` | `30` |
//! | `ATTACH_POLL_INTERVAL_SECS` | `10` |
//! | `ATTACH_POLL_MAX_ATTEMPTS` | unbounded |
//! | `ATTACH_POLL_BACKOFF` | `1.0` |
//! | `ATTACH_POLL_MAX_INTERVAL_SECS` | `300` |
//! | `RESPONSE_INCLUDE_REPORT` | `false` |
//! | `LISTEN_ADDR` | `0.0.0.0:8080` |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

pub const ROOT_COMPARTMENT_KEY: &str = "ROOT_COMPARTMENT_OCID";
pub const COMPARTMENT_NAME_KEY: &str = "Compartment_name";
pub const AD_NAME_KEY: &str = "ad_name";
pub const VCENTER_KEY: &str = "vcenter_ip";
pub const COMBINED_SECRET_KEY: &str = "combined_secret_ocid";

/// Names and identifiers the workflow resolves against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Root of the compartment subtree searched by name
    pub root_compartment_id: String,
    pub compartment_name: String,
    pub availability_domain_name: String,
    /// vCenter host name or address
    pub management_endpoint: String,
    /// Secret holding `username/password` for the management plane
    pub combined_secret_id: String,
}

/// How control-plane requests are authenticated
///
/// Resource principal and API key credentials are used to sign every request.
/// A bearer token is only accepted by a gateway in front of the API.
#[derive(Clone, PartialEq, Eq)]
pub enum OciCredentials {
    /// Session token and key issued to the function runtime. Each value is
    /// either the literal content or an absolute path to a file holding it.
    ResourcePrincipal {
        session_token: Option<String>,
        private_key: Option<String>,
    },
    /// User API signing key
    ApiKey {
        tenancy_id: String,
        user_id: String,
        fingerprint: String,
        private_key_path: String,
    },
    BearerToken(String),
}

impl Default for OciCredentials {
    fn default() -> Self {
        OciCredentials::ResourcePrincipal {
            session_token: None,
            private_key: None,
        }
    }
}

impl fmt::Debug for OciCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OciCredentials::ResourcePrincipal {
                session_token,
                private_key,
            } => f
                .debug_struct("ResourcePrincipal")
                .field("session_token", &session_token.as_ref().map(|_| "<redacted>"))
                .field("private_key", &private_key.as_ref().map(|_| "<redacted>"))
                .finish(),
            OciCredentials::ApiKey {
                tenancy_id,
                user_id,
                fingerprint,
                private_key_path,
            } => f
                .debug_struct("ApiKey")
                .field("tenancy_id", tenancy_id)
                .field("user_id", user_id)
                .field("fingerprint", fingerprint)
                .field("private_key_path", private_key_path)
                .finish(),
            OciCredentials::BearerToken(_) => f.debug_tuple("BearerToken").field(&"<redacted>").finish(),
        }
    }
}

/// Cloud control-plane connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OciConfig {
    pub region: String,
    #[serde(skip)]
    pub credentials: OciCredentials,
    /// Base URL replacing every regional service host (gateways, local stubs)
    #[serde(default)]
    pub endpoint_override: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for OciConfig {
    fn default() -> Self {
        Self {
            region: "us-ashburn-1".to_string(),
            credentials: OciCredentials::default(),
            endpoint_override: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl OciConfig {
    pub fn iaas_endpoint(&self) -> String {
        self.service_endpoint(format!("https://iaas.{}.oraclecloud.com", self.region), "20160918")
    }

    pub fn identity_endpoint(&self) -> String {
        self.service_endpoint(
            format!("https://identity.{}.oraclecloud.com", self.region),
            "20160918",
        )
    }

    pub fn secrets_endpoint(&self) -> String {
        self.service_endpoint(
            format!("https://secrets.vaults.{}.oci.oraclecloud.com", self.region),
            "20190301",
        )
    }

    fn service_endpoint(&self, regional_host: String, version: &str) -> String {
        let base = match &self.endpoint_override {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => regional_host,
        };
        format!("{}/{}", base, version)
    }
}

/// Certificate trust policy for the management plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Validate the server certificate chain
    #[default]
    Verify,
    /// Accept any certificate (self-signed lab vCenters)
    InsecureSkipVerify,
}

/// vSphere VI/JSON connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsphereConfig {
    /// `https`, or `http` behind a TLS-terminating proxy
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// vim25 release segment of the API path
    pub api_release: String,
    pub tls: TlsPolicy,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_scheme() -> String {
    "https".to_string()
}

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            api_release: "8.0.1.0".to_string(),
            tls: TlsPolicy::Verify,
            timeout_secs: default_timeout(),
        }
    }
}

/// How the attachment orchestrator waits for a terminal lifecycle state
///
/// The default polls every 10 seconds with no bound on attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Interval multiplier applied after each non-terminal poll (>= 1.0)
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
    /// `None` polls until a terminal state
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(300),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Fixed interval, unbounded
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Delay to use after waiting `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return current;
        }
        let next = current.as_secs_f64() * self.backoff_multiplier;
        if next >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(next)
        }
    }
}

/// Trigger endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Embed the workflow report in the response body
    pub include_report: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            include_report: false,
        }
    }
}

/// Complete provisioner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionerConfig {
    pub workflow: WorkflowSettings,
    pub oci: OciConfig,
    pub vsphere: VsphereConfig,
    pub poll: PollPolicy,
    pub server: ServerConfig,
}

impl ProvisionerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| required_value(&lookup, key);
        let optional = |key: &str| optional_value(&lookup, key);

        let workflow = WorkflowSettings {
            root_compartment_id: required(ROOT_COMPARTMENT_KEY)?,
            compartment_name: required(COMPARTMENT_NAME_KEY)?,
            availability_domain_name: required(AD_NAME_KEY)?,
            management_endpoint: required(VCENTER_KEY)?,
            combined_secret_id: required(COMBINED_SECRET_KEY)?,
        };

        let oci = OciConfig {
            region: optional("OCI_REGION")
                .or_else(|| optional("OCI_RESOURCE_PRINCIPAL_REGION"))
                .unwrap_or_else(|| OciConfig::default().region),
            credentials: credentials_from_lookup(&lookup)?,
            endpoint_override: optional("OCI_ENDPOINT_OVERRIDE"),
            timeout_secs: parse_or(&lookup, "OCI_REQUEST_TIMEOUT_SECS", default_timeout())?,
        };

        let scheme = optional("VSPHERE_SCHEME").unwrap_or_else(default_scheme);
        if scheme != "https" && scheme != "http" {
            return Err(ConfigError::InvalidValue {
                key: "VSPHERE_SCHEME",
                value: scheme,
                reason: "must be https or http".to_string(),
            });
        }

        let insecure: bool = parse_or(&lookup, "VSPHERE_INSECURE_SKIP_VERIFY", false)?;
        let vsphere = VsphereConfig {
            scheme,
            api_release: lookup("VSPHERE_API_RELEASE")
                .unwrap_or_else(|| VsphereConfig::default().api_release),
            tls: if insecure {
                TlsPolicy::InsecureSkipVerify
            } else {
                TlsPolicy::Verify
            },
            timeout_secs: parse_or(&lookup, "VSPHERE_REQUEST_TIMEOUT_SECS", default_timeout())?,
        };

        let poll = PollPolicy {
            interval: Duration::from_secs(parse_or(&lookup, "ATTACH_POLL_INTERVAL_SECS", 10)?),
            backoff_multiplier: parse_or(&lookup, "ATTACH_POLL_BACKOFF", 1.0)?,
            max_interval: Duration::from_secs(parse_or(
                &lookup,
                "ATTACH_POLL_MAX_INTERVAL_SECS",
                300,
            )?),
            max_attempts: parse_optional(&lookup, "ATTACH_POLL_MAX_ATTEMPTS")?,
        };
        if !poll.backoff_multiplier.is_finite() || poll.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "ATTACH_POLL_BACKOFF",
                value: poll.backoff_multiplier.to_string(),
                reason: "must be a finite number >= 1.0".to_string(),
            });
        }
        if poll.interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "ATTACH_POLL_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        if poll.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "ATTACH_POLL_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "must allow at least one poll".to_string(),
            });
        }

        let server = ServerConfig {
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| ServerConfig::default().listen_addr),
            include_report: parse_or(&lookup, "RESPONSE_INCLUDE_REPORT", false)?,
        };

        Ok(Self {
            workflow,
            oci,
            vsphere,
            poll,
            server,
        })
    }
}

/// Pick the credential source: a bearer token, then an API key, then the
/// resource principal of the function runtime
fn credentials_from_lookup<F>(lookup: &F) -> Result<OciCredentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = optional_value(lookup, "OCI_AUTH_TOKEN") {
        return Ok(OciCredentials::BearerToken(token));
    }
    if let Some(user_id) = optional_value(lookup, "OCI_USER_OCID") {
        return Ok(OciCredentials::ApiKey {
            tenancy_id: required_value(lookup, "OCI_TENANCY_OCID")?,
            user_id,
            fingerprint: required_value(lookup, "OCI_FINGERPRINT")?,
            private_key_path: required_value(lookup, "OCI_PRIVATE_KEY_PATH")?,
        });
    }
    Ok(OciCredentials::ResourcePrincipal {
        session_token: optional_value(lookup, "OCI_RESOURCE_PRINCIPAL_RPST"),
        private_key: optional_value(lookup, "OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM"),
    })
}

fn optional_value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn required_value<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_value(lookup, key).ok_or(ConfigError::MissingKey(key))
}

fn parse_optional<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_value(lookup, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}
