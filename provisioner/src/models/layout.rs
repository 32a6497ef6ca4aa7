//! Remote filesystem layout of a deployment

/// Where every artifact lives on the target host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    /// Base directory owned by the connecting principal
    pub base_dir: String,

    /// Site name of the reverse-proxy configuration
    pub site_name: String,
}

impl RemoteLayout {
    /// Create a new remote layout
    pub fn new(base_dir: impl Into<String>, site_name: impl Into<String>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = match base_dir.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            base_dir,
            site_name: site_name.into(),
        }
    }

    /// Directory served for static assets
    pub fn static_dir(&self) -> String {
        format!("{}/static", self.base_dir)
    }

    /// Generated environment file
    pub fn env_file(&self) -> String {
        format!("{}/.env", self.base_dir)
    }

    /// Uploaded stack definition
    pub fn stack_file(&self) -> String {
        format!("{}/docker-compose.yml", self.base_dir)
    }

    /// Proxy site definition
    pub fn proxy_available(&self) -> String {
        format!("/etc/nginx/sites-available/{}", self.site_name)
    }

    /// Enabled-sites reference to the proxy site definition
    pub fn proxy_enabled(&self) -> String {
        format!("/etc/nginx/sites-enabled/{}", self.site_name)
    }

    /// Install location of the pinned orchestration tool
    pub fn compose_binary(&self) -> &'static str {
        "/usr/local/bin/docker-compose"
    }
}
