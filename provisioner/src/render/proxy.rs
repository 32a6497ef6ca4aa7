//! Reverse-proxy (nginx) site configuration rendering

use std::fmt::Write;

use crate::errors::ProvisionError;
use crate::models::parameters::is_dns_label;
use crate::models::vhost::VirtualHostSpec;

/// Plaintext port every server block listens on
pub const LISTEN_PORT: u16 = 80;

/// Render one server block per virtual host, in list order.
///
/// `static_root` is the directory a static alias is served from.
pub fn render_proxy(
    base_domain: &str,
    static_root: &str,
    virtual_hosts: &[VirtualHostSpec],
) -> Result<String, ProvisionError> {
    let domain = base_domain.trim_end_matches('.');
    if domain.is_empty() || !domain.split('.').all(is_dns_label) {
        return Err(ProvisionError::TemplateError(format!(
            "Invalid base domain: {:?}",
            base_domain
        )));
    }
    if static_root.is_empty() || static_root.contains(|c: char| c.is_whitespace() || c == ';') {
        return Err(ProvisionError::TemplateError(format!(
            "Invalid static root: {:?}",
            static_root
        )));
    }

    let mut out = String::from("# Managed by provisioner. Local changes are overwritten.\n");
    for spec in virtual_hosts {
        spec.validate()?;
        out.push('\n');
        write_server_block(&mut out, domain, static_root, spec)
            .map_err(|e| ProvisionError::Internal(e.to_string()))?;
    }
    Ok(out)
}

fn write_server_block(
    out: &mut String,
    domain: &str,
    static_root: &str,
    spec: &VirtualHostSpec,
) -> std::fmt::Result {
    writeln!(out, "server {{")?;
    writeln!(out, "    listen {};", LISTEN_PORT)?;
    writeln!(out, "    server_name {};", spec.fqdn(domain))?;

    if let Some(alias) = &spec.static_alias {
        writeln!(out)?;
        writeln!(out, "    location {} {{", alias)?;
        writeln!(
            out,
            "        alias {}/;",
            static_root.trim_end_matches('/')
        )?;
        writeln!(out, "    }}")?;
    }

    writeln!(out)?;
    writeln!(out, "    location / {{")?;
    writeln!(
        out,
        "        proxy_pass http://127.0.0.1:{}{};",
        spec.port,
        spec.upstream_path.as_deref().unwrap_or("")
    )?;
    writeln!(out, "        proxy_set_header Host $host;")?;
    writeln!(out, "        proxy_set_header X-Real-IP $remote_addr;")?;
    writeln!(
        out,
        "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")
}
