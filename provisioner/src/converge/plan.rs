//! The fixed convergence plan for an application host

use crate::models::layout::RemoteLayout;
use crate::models::parameters::VersionTag;
use crate::remote::runner::RemoteFile;
use crate::render::TemplateId;
use crate::converge::step::{
    Action, Artifact, ConvergenceStep, Predicate, RemoteCommand, TargetCommand,
};
use crate::utils::shell_quote;

pub const ENSURE_BASE_DIR: &str = "ensure-base-directory";
pub const INSTALL_PACKAGES: &str = "install-base-packages";
pub const INSTALL_COMPOSE: &str = "install-compose";
pub const CREATE_WORK_DIRS: &str = "create-working-directories";
pub const WRITE_ENV_FILE: &str = "write-environment-file";
pub const TRANSFER_STACK: &str = "transfer-stack-definition";
pub const CONVERGE_STACK: &str = "converge-stack";
pub const WRITE_PROXY_CONFIG: &str = "write-proxy-config";
pub const ENABLE_SITE: &str = "enable-site";
pub const INSTALL_CERTBOT: &str = "install-certbot";
pub const ISSUE_CERTIFICATES: &str = "issue-certificates";

/// Every step name, in run order
pub const STEP_NAMES: [&str; 11] = [
    ENSURE_BASE_DIR,
    INSTALL_PACKAGES,
    INSTALL_COMPOSE,
    CREATE_WORK_DIRS,
    WRITE_ENV_FILE,
    TRANSFER_STACK,
    CONVERGE_STACK,
    WRITE_PROXY_CONFIG,
    ENABLE_SITE,
    INSTALL_CERTBOT,
    ISSUE_CERTIFICATES,
];

/// Host-level choices that shape the plan
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub layout: RemoteLayout,

    /// Remote login name; owns the base directory
    pub principal: String,

    /// Prefix system commands with `sudo`
    pub privileged: bool,

    pub packages: Vec<String>,
    pub services: Vec<String>,

    /// Stack service that runs the application
    pub primary_service: String,

    /// Asset collection command run inside the primary service
    pub collect_static_command: String,

    /// Registration address for the certificate client
    pub certbot_email: Option<String>,
}

impl PlanOptions {
    pub fn new(layout: RemoteLayout, principal: impl Into<String>) -> Self {
        Self {
            layout,
            principal: principal.into(),
            privileged: true,
            packages: default_packages(),
            services: default_services(),
            primary_service: "web".to_string(),
            collect_static_command: "python manage.py collectstatic --noinput".to_string(),
            certbot_email: None,
        }
    }

    fn sudo(&self) -> &'static str {
        if self.privileged {
            "sudo "
        } else {
            ""
        }
    }
}

pub fn default_packages() -> Vec<String> {
    ["docker.io", "git", "curl", "nginx", "software-properties-common"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_services() -> Vec<String> {
    vec!["docker".to_string(), "nginx".to_string()]
}

/// Build the ordered plan.
///
/// `fqdns` must list the virtual hosts in the same order the proxy
/// configuration renders them.
pub fn build_plan(options: &PlanOptions, compose_version: &VersionTag, fqdns: &[String]) -> Vec<ConvergenceStep> {
    let sudo = options.sudo();
    let layout = &options.layout;
    let base = shell_quote(&layout.base_dir);
    let user = shell_quote(&options.principal);
    let compose = layout.compose_binary();

    let packages = options
        .packages
        .iter()
        .map(|p| shell_quote(p))
        .collect::<Vec<_>>()
        .join(" ");
    let services = options
        .services
        .iter()
        .map(|s| shell_quote(s))
        .collect::<Vec<_>>()
        .join(" ");

    let mut install_packages = vec![
        RemoteCommand::new(format!("{}DEBIAN_FRONTEND=noninteractive apt-get update -y", sudo)),
        RemoteCommand::new(format!(
            "{}DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
            sudo, packages
        )),
    ];
    install_packages.extend(
        options
            .services
            .iter()
            .map(|s| RemoteCommand::new(format!("{}systemctl enable --now {}", sudo, shell_quote(s)))),
    );
    let mut packages_check = format!("dpkg -s {} >/dev/null 2>&1", packages);
    if !services.is_empty() {
        packages_check.push_str(&format!(" && systemctl is-active --quiet {}", services));
    }

    let in_base = |cmd: &str| RemoteCommand::new(format!("cd {} && {}{}", base, sudo, cmd));
    let available = shell_quote(&layout.proxy_available());
    let enabled = shell_quote(&layout.proxy_enabled());

    let registration = match &options.certbot_email {
        Some(email) => format!("-m {}", shell_quote(email)),
        None => "--register-unsafely-without-email".to_string(),
    };

    vec![
        ConvergenceStep::new(
            ENSURE_BASE_DIR,
            Action::Commands(vec![
                RemoteCommand::new(format!("{}mkdir -p {}", sudo, base)),
                // `user:` takes the login group of the user, whatever its name.
                RemoteCommand::new(format!("{}chown {}: {}", sudo, user, base)),
            ]),
        )
        .checked_by(Predicate::Succeeds(format!(
            "test -d {base} && [ \"$(stat -c %U {base})\" = {user} ]",
            base = base,
            user = user
        ))),
        ConvergenceStep::new(INSTALL_PACKAGES, Action::Commands(install_packages))
            .checked_by(Predicate::Succeeds(packages_check)),
        ConvergenceStep::new(
            INSTALL_COMPOSE,
            Action::Commands(vec![
                RemoteCommand::new(format!(
                    "{}curl -fsSL -o {} \"{}\"",
                    sudo,
                    compose,
                    compose_download_url(compose_version)
                )),
                RemoteCommand::new(format!("{}chmod 755 {}", sudo, compose)),
            ]),
        )
        .checked_by(Predicate::ReportsVersion {
            command: format!("{} version --short", compose),
            version: compose_version.clone(),
        }),
        ConvergenceStep::new(
            CREATE_WORK_DIRS,
            Action::Commands(vec![RemoteCommand::new(format!(
                "mkdir -p {}",
                shell_quote(&layout.static_dir())
            ))]),
        )
        .checked_by(Predicate::Succeeds(format!(
            "test -d {}",
            shell_quote(&layout.static_dir())
        ))),
        ConvergenceStep::new(
            WRITE_ENV_FILE,
            Action::Upload {
                artifact: Artifact::Template(TemplateId::EnvFile),
                target: RemoteFile::new(layout.env_file(), 0o600),
            },
        ),
        ConvergenceStep::new(
            TRANSFER_STACK,
            Action::Upload {
                artifact: Artifact::StackDefinition,
                target: RemoteFile::new(layout.stack_file(), 0o644),
            },
        ),
        ConvergenceStep::new(
            CONVERGE_STACK,
            Action::Commands(vec![
                in_base(&format!("{} pull", compose)),
                in_base(&format!("{} up -d --remove-orphans", compose)),
                in_base(&format!(
                    "{} exec -T {} {}",
                    compose,
                    shell_quote(&options.primary_service),
                    options.collect_static_command
                )),
            ]),
        ),
        ConvergenceStep::new(
            WRITE_PROXY_CONFIG,
            Action::Upload {
                artifact: Artifact::Template(TemplateId::ProxyConfig),
                target: RemoteFile::new(layout.proxy_available(), 0o644).elevated(options.privileged),
            },
        ),
        ConvergenceStep::new(
            ENABLE_SITE,
            Action::Commands(vec![
                RemoteCommand::new(format!("{}ln -s {} {}", sudo, available, enabled))
                    .accepting("File exists"),
                RemoteCommand::new(format!("{}nginx -t", sudo)),
                RemoteCommand::new(format!("{}systemctl reload nginx", sudo)),
            ]),
        ),
        ConvergenceStep::new(
            INSTALL_CERTBOT,
            Action::Commands(vec![RemoteCommand::new(format!(
                "{}DEBIAN_FRONTEND=noninteractive apt-get install -y certbot python3-certbot-nginx",
                sudo
            ))]),
        )
        .checked_by(Predicate::Succeeds(
            "command -v certbot >/dev/null 2>&1 && dpkg -s python3-certbot-nginx >/dev/null 2>&1".to_string(),
        )),
        ConvergenceStep::new(
            ISSUE_CERTIFICATES,
            Action::PerTarget {
                attempts: fqdns
                    .iter()
                    .map(|fqdn| TargetCommand {
                        target: fqdn.clone(),
                        command: RemoteCommand::new(format!(
                            "{}certbot --nginx --non-interactive --agree-tos --redirect {} -d {}",
                            sudo,
                            registration,
                            shell_quote(fqdn)
                        )),
                    })
                    .collect(),
                finally: vec![RemoteCommand::new(format!("{}systemctl reload nginx", sudo))],
            },
        )
        .tolerated(),
    ]
}

/// Release asset for the host's OS and architecture, resolved remotely.
///
/// Compose 1.x publishes capitalised OS names; 2.x uses lower case.
pub fn compose_download_url(version: &VersionTag) -> String {
    let os = if version.parts().first().copied().unwrap_or(0) >= 2 {
        "$(uname -s | tr '[:upper:]' '[:lower:]')"
    } else {
        "$(uname -s)"
    };
    let tag = if version.parts().first().copied().unwrap_or(0) >= 2 {
        format!("v{}", version)
    } else {
        version.to_string()
    };
    format!(
        "https://github.com/docker/compose/releases/download/{}/docker-compose-{}-$(uname -m)",
        tag, os
    )
}
