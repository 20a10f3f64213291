//! Runtime configuration read from the Lambda environment.

use std::path::PathBuf;
use std::time::Duration;

use crm_proxy_core::normalize::{KeyPrefixPolicy, DEFAULT_KEY_PREFIXES};
use crm_proxy_core::CrmError;

pub const DEFAULT_SERVICE_NAMESPACE: &str = "http://service.proptech.crm.credifamilia.com";
pub const DEFAULT_TYPES_NAMESPACE: &str = "http://dto.proptech.crm.credifamilia.com/xsd";
pub const DEFAULT_ORIGIN: &str = "LQN";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Response elements the CRM schema declares as lists.
pub const DEFAULT_REPEATED_ELEMENTS: [&str; 2] = ["field", "proyectos"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    /// `PRD` selects production; anything else, including unset, is development.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("PRD") => Environment::Production,
            _ => Environment::Development,
        }
    }

    fn endpoint_variable(self) -> &'static str {
        match self {
            Environment::Production => "CRM_ENDPOINT_PRD",
            Environment::Development => "CRM_ENDPOINT_DEV",
        }
    }
}

/// What the WSDL would otherwise tell a SOAP client about the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub endpoint: String,
    pub service_namespace: String,
    pub types_namespace: String,
    /// Local names decoded as arrays even with a single occurrence.
    pub repeated_elements: Vec<String>,
}

impl ServiceDescriptor {
    /// Axis2 convention for the `SOAPAction` header.
    pub fn soap_action(&self, operation: &str) -> String {
        format!("urn:{operation}")
    }
}

/// Whether remote faults are rendered into envelopes or abort the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    #[default]
    Propagate,
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub verify_server: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConfig {
    pub environment: Environment,
    pub descriptor: ServiceDescriptor,
    pub tls: TlsConfig,
    pub origin: String,
    pub key_policy: KeyPrefixPolicy,
    pub fault_mode: FaultMode,
    pub timeout: Duration,
}

impl CrmConfig {
    pub fn from_env() -> Result<Self, CrmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CrmError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = Environment::from_flag(read("APP_ENV").as_deref());
        let endpoint_variable = environment.endpoint_variable();
        let endpoint = read(endpoint_variable)
            .ok_or_else(|| CrmError::Config(format!("{endpoint_variable} must be configured")))?;

        let descriptor = ServiceDescriptor {
            endpoint,
            service_namespace: read("CRM_SERVICE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAMESPACE.to_string()),
            types_namespace: read("CRM_TYPES_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_TYPES_NAMESPACE.to_string()),
            repeated_elements: match read("CRM_REPEATED_ELEMENTS") {
                Some(list) => split_list(&list),
                None => DEFAULT_REPEATED_ELEMENTS.iter().map(|name| name.to_string()).collect(),
            },
        };

        let tls = TlsConfig {
            cert_file: read("CRM_CERT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("certs/certificate.pem")),
            key_file: read("CRM_KEY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("certs/key.pem")),
            verify_server: parse_flag("CRM_VERIFY_TLS", read("CRM_VERIFY_TLS"), true)?,
        };

        let key_policy = parse_key_policy(
            read("CRM_KEY_PREFIX_MODE").as_deref(),
            read("CRM_KEY_PREFIXES").as_deref(),
        )?;

        let fault_mode = match read("CRM_FAULT_MODE").as_deref() {
            None | Some("propagate") => FaultMode::Propagate,
            Some("render") => FaultMode::Render,
            Some(other) => {
                return Err(CrmError::Config(format!(
                    "CRM_FAULT_MODE must be 'propagate' or 'render', got '{other}'"
                )))
            }
        };

        let timeout_secs = match read("CRM_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(value) => value.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                CrmError::Config(format!(
                    "CRM_TIMEOUT_SECS must be a positive integer, got '{value}'"
                ))
            })?,
        };

        Ok(Self {
            environment,
            descriptor,
            tls,
            origin: read("CRM_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            key_policy,
            fault_mode,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool, CrmError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(CrmError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_key_policy(mode: Option<&str>, prefixes: Option<&str>) -> Result<KeyPrefixPolicy, CrmError> {
    match mode {
        None | Some("namespaced") => {
            let prefixes: Vec<String> = match prefixes {
                Some(list) => split_list(list),
                None => DEFAULT_KEY_PREFIXES.iter().map(|p| p.to_string()).collect(),
            };
            Ok(KeyPrefixPolicy::Namespaced(prefixes))
        }
        Some("strip-all") => Ok(KeyPrefixPolicy::StripAll),
        Some(other) => Err(CrmError::Config(format!(
            "CRM_KEY_PREFIX_MODE must be 'namespaced' or 'strip-all', got '{other}'"
        ))),
    }
}
