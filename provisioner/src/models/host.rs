//! Target host model

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the connection authenticates against the target host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Credential {
    /// Use whatever the local SSH agent offers
    Agent,

    /// Use a private key file
    IdentityFile { path: PathBuf },
}

/// The one remote host a run targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTarget {
    /// Host name or IP address
    pub address: String,

    /// SSH port
    pub port: u16,

    /// Remote login name
    pub principal: String,

    /// Authentication material
    pub credential: Credential,
}

impl HostTarget {
    pub fn new(address: impl Into<String>, principal: impl Into<String>, credential: Credential) -> Self {
        Self {
            address: address.into(),
            port: 22,
            principal: principal.into(),
            credential,
        }
    }

    /// `user@host` form used as the ssh destination
    pub fn destination(&self) -> String {
        format!("{}@{}", self.principal, self.address)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == 22 {
            write!(f, "{}", self.destination())
        } else {
            write!(f, "{}:{}", self.destination(), self.port)
        }
    }
}
