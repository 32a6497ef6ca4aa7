//! Template rendering
//!
//! Pure functions from typed parameters to artifact bytes. Nothing here
//! touches the network, so every artifact can be checked without a host.

pub mod env;
pub mod proxy;

use std::fmt;

use crate::errors::ProvisionError;
use crate::models::parameters::DeploymentParameters;
use crate::models::vhost::VirtualHostSpec;

/// Artifacts the renderer knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    EnvFile,
    ProxyConfig,
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::EnvFile => f.write_str("environment file"),
            TemplateId::ProxyConfig => f.write_str("proxy configuration"),
        }
    }
}

/// Inputs shared by every template
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub params: &'a DeploymentParameters,
    pub virtual_hosts: &'a [VirtualHostSpec],
    pub static_root: &'a str,
}

/// Render `template` into bytes
pub fn render(template: TemplateId, ctx: &RenderContext<'_>) -> Result<Vec<u8>, ProvisionError> {
    let text = match template {
        TemplateId::EnvFile => env::render_env(ctx.params)?,
        TemplateId::ProxyConfig => {
            proxy::render_proxy(&ctx.params.base_domain, ctx.static_root, ctx.virtual_hosts)?
        }
    };
    Ok(text.into_bytes())
}
