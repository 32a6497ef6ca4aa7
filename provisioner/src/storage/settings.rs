//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::converge::plan::{default_packages, default_services, PlanOptions};
use crate::errors::ProvisionError;
use crate::logs::LogLevel;
use crate::models::host::{Credential, HostTarget};
use crate::models::layout::RemoteLayout;
use crate::models::vhost::{default_virtual_hosts, VirtualHostSpec};
use crate::remote::ssh::SshOptions;

/// Provisioner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for a rolling log file
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Target host
    pub host: HostSettings,

    /// Deployment layout and host policy
    #[serde(default)]
    pub deployment: DeploymentSettings,

    /// Proxied services, in proxy and certificate order
    #[serde(default = "default_virtual_hosts")]
    pub virtual_hosts: Vec<VirtualHostSpec>,
}

/// Target host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Host name or IP address
    pub address: String,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Remote login name
    pub user: String,

    /// Private key; the SSH agent is used when absent
    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    /// Connection establishment timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum wait for one remote command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_command_timeout() -> u64 {
    900
}

impl HostSettings {
    pub fn target(&self) -> HostTarget {
        let credential = match &self.identity_file {
            Some(path) => Credential::IdentityFile { path: path.clone() },
            None => Credential::Agent,
        };
        HostTarget {
            address: self.address.clone(),
            port: self.port,
            principal: self.user.clone(),
            credential,
        }
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            ..Default::default()
        }
    }
}

/// Deployment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Remote base directory; `/home/<user>/app` when absent
    #[serde(default)]
    pub base_dir: Option<String>,

    /// Reverse-proxy site name
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Local path of the stack definition to upload
    #[serde(default = "default_stack_file")]
    pub stack_file: PathBuf,

    /// Stack service that runs the application
    #[serde(default = "default_primary_service")]
    pub primary_service: String,

    /// Asset collection command run inside the primary service
    #[serde(default = "default_collect_static_command")]
    pub collect_static_command: String,

    /// System packages to install
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    /// Services to enable and start
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    /// Elevate system commands with sudo
    #[serde(default = "default_true")]
    pub privileged: bool,

    /// Registration address for certificate issuance
    #[serde(default)]
    pub certbot_email: Option<String>,
}

/// The site name becomes a file name under the nginx site directories.
fn validate_site_name(name: &str) -> Result<(), ProvisionError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ProvisionError::ConfigError(format!(
            "deployment.site_name {:?} is not a plain file name",
            name
        )))
    }
}

fn default_true() -> bool {
    true
}

fn default_site_name() -> String {
    "app".to_string()
}

fn default_stack_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_primary_service() -> String {
    "web".to_string()
}

fn default_collect_static_command() -> String {
    "python manage.py collectstatic --noinput".to_string()
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            site_name: default_site_name(),
            stack_file: default_stack_file(),
            primary_service: default_primary_service(),
            collect_static_command: default_collect_static_command(),
            packages: default_packages(),
            services: default_services(),
            privileged: true,
            certbot_email: None,
        }
    }
}

impl Settings {
    /// Reject values that would only fail once the host is contacted
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.host.address.trim().is_empty() {
            return Err(ProvisionError::ConfigError("host.address is empty".to_string()));
        }
        if self.host.user.trim().is_empty() {
            return Err(ProvisionError::ConfigError("host.user is empty".to_string()));
        }
        if self.host.connect_timeout_secs == 0 {
            return Err(ProvisionError::ConfigError(
                "host.connect_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.host.command_timeout_secs == 0 {
            return Err(ProvisionError::ConfigError(
                "host.command_timeout_secs must be at least 1".to_string(),
            ));
        }
        validate_site_name(&self.deployment.site_name)
    }

    /// Remote layout for this deployment
    pub fn layout(&self) -> RemoteLayout {
        let base_dir = self
            .deployment
            .base_dir
            .clone()
            .unwrap_or_else(|| format!("/home/{}/app", self.host.user));
        RemoteLayout::new(base_dir, self.deployment.site_name.clone())
    }

    /// Plan options derived from these settings
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            layout: self.layout(),
            principal: self.host.user.clone(),
            privileged: self.deployment.privileged,
            packages: self.deployment.packages.clone(),
            services: self.deployment.services.clone(),
            primary_service: self.deployment.primary_service.clone(),
            collect_static_command: self.deployment.collect_static_command.clone(),
            certbot_email: self.deployment.certbot_email.clone(),
        }
    }
}
