//! Virtual host model

use serde::{Deserialize, Serialize};

use crate::errors::ProvisionError;
use crate::models::parameters::is_dns_label;

/// One proxied service exposed under its own subdomain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHostSpec {
    /// Subdomain label, joined with the base domain
    pub label: String,

    /// Local port the service listens on
    pub port: u16,

    /// URL prefix served straight from the static-asset directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_alias: Option<String>,

    /// Path appended to the upstream address, e.g. `/django/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_path: Option<String>,
}

impl VirtualHostSpec {
    pub fn new(label: impl Into<String>, port: u16) -> Self {
        Self {
            label: label.into(),
            port,
            static_alias: None,
            upstream_path: None,
        }
    }

    pub fn with_static_alias(mut self, alias: impl Into<String>) -> Self {
        self.static_alias = Some(alias.into());
        self
    }

    pub fn with_upstream_path(mut self, path: impl Into<String>) -> Self {
        self.upstream_path = Some(path.into());
        self
    }

    /// Fully-qualified name, `<label>.<base-domain>`
    pub fn fqdn(&self, base_domain: &str) -> String {
        format!("{}.{}", self.label, base_domain.trim_end_matches('.'))
    }

    /// Reject specs that would render an unusable or injectable server block
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if !is_dns_label(&self.label) {
            return Err(ProvisionError::TemplateError(format!(
                "Invalid virtual host label: {:?}",
                self.label
            )));
        }
        if self.port == 0 {
            return Err(ProvisionError::TemplateError(format!(
                "Virtual host {} has no upstream port",
                self.label
            )));
        }
        for (what, path) in [
            ("static alias", &self.static_alias),
            ("upstream path", &self.upstream_path),
        ] {
            if let Some(path) = path {
                if !is_location_path(path) {
                    return Err(ProvisionError::TemplateError(format!(
                        "Virtual host {} has an invalid {}: {:?}",
                        self.label, what, path
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `/`-delimited path made only of characters safe inside an nginx directive
fn is_location_path(path: &str) -> bool {
    path.len() >= 2
        && path.starts_with('/')
        && path.ends_with('/')
        && path
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/-_.".contains(&b))
}

/// Default service set: application API, container UI, metrics, task monitor
pub fn default_virtual_hosts() -> Vec<VirtualHostSpec> {
    vec![
        VirtualHostSpec::new("api", 8000).with_static_alias("/static/"),
        VirtualHostSpec::new("portainer", 9000),
        VirtualHostSpec::new("grafana", 3000),
        VirtualHostSpec::new("flower", 5555),
    ]
}
