//! Main application run

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::options::{AppOptions, Mode, PARAMS_FILE_ENV};
use crate::app::report::{render_plan, render_report};
use crate::converge::orchestrator::{Orchestrator, RunInputs};
use crate::converge::plan::build_plan;
use crate::errors::ProvisionError;
use crate::filesys::file::File;
use crate::models::parameters::DeploymentParameters;
use crate::remote::ssh::SshRunner;
use crate::render::proxy::render_proxy;
use crate::storage::settings::Settings;
use crate::utils::version_info;

/// The run converged, possibly with tolerated gaps
pub const EXIT_OK: i32 = 0;

/// A fatal step failed or the host was unreachable
pub const EXIT_FAILED: i32 = 1;

/// Settings or parameters could not be loaded or validated
pub const EXIT_INVALID_INPUT: i32 = 2;

/// Process exit status for an error that ended the invocation
pub fn exit_code(err: &ProvisionError) -> i32 {
    match err {
        ProvisionError::IoError(_)
        | ProvisionError::JsonError(_)
        | ProvisionError::ConfigError(_)
        | ProvisionError::ValidationError(_)
        | ProvisionError::TemplateError(_) => EXIT_INVALID_INPUT,
        _ => EXIT_FAILED,
    }
}

/// Print build information as JSON
pub fn print_version() -> Result<(), ProvisionError> {
    println!("{}", serde_json::to_string_pretty(&version_info())?);
    Ok(())
}

/// Load and validate the settings file
pub async fn load_settings(path: &Path) -> Result<Settings, ProvisionError> {
    let settings = File::new(path).read_json::<Settings>().await?;
    settings.validate()?;
    Ok(settings)
}

/// Load and validate the deployment parameters file
pub async fn load_parameters(path: Option<&Path>) -> Result<DeploymentParameters, ProvisionError> {
    let path = path.ok_or_else(|| {
        ProvisionError::ConfigError(format!(
            "No parameters file; pass --params=<file> or set {}",
            PARAMS_FILE_ENV
        ))
    })?;
    let params = File::new(path).read_json::<DeploymentParameters>().await?;
    params.validate()?;
    Ok(params)
}

/// Run the invocation `options` selects and return the process exit status
pub async fn run(options: &AppOptions, settings: Settings) -> Result<i32, ProvisionError> {
    match options.mode {
        Mode::Version => {
            print_version()?;
            Ok(EXIT_OK)
        }
        Mode::Plan => {
            let params = load_parameters(options.params_path.as_deref()).await?;
            let mut fqdns = Vec::with_capacity(settings.virtual_hosts.len());
            for spec in &settings.virtual_hosts {
                spec.validate()?;
                fqdns.push(spec.fqdn(&params.base_domain));
            }
            let steps = build_plan(&settings.plan_options(), &params.compose_version, &fqdns);
            print!("{}", render_plan(&steps));
            Ok(EXIT_OK)
        }
        Mode::RenderProxy => {
            let params = load_parameters(options.params_path.as_deref()).await?;
            for spec in &settings.virtual_hosts {
                spec.validate()?;
            }
            let config = render_proxy(
                &params.base_domain,
                &settings.layout().static_dir(),
                &settings.virtual_hosts,
            )?;
            print!("{}", config);
            Ok(EXIT_OK)
        }
        Mode::Converge => converge(options, settings).await,
    }
}

async fn converge(options: &AppOptions, settings: Settings) -> Result<i32, ProvisionError> {
    let params = load_parameters(options.params_path.as_deref()).await?;
    let stack_definition = File::new(&settings.deployment.stack_file).read_bytes().await?;
    let plan_options = settings.plan_options();
    let inputs = RunInputs {
        params,
        virtual_hosts: settings.virtual_hosts,
        stack_definition,
    };

    // Inputs are validated before the host is contacted.
    for spec in &inputs.virtual_hosts {
        spec.validate()?;
    }
    let runner = match SshRunner::connect(settings.host.target(), settings.host.ssh_options()).await {
        Ok(runner) => runner,
        Err(e) => {
            error!("Unable to reach the host: {}", e);
            return Err(e);
        }
    };
    let orchestrator = Orchestrator::new(Arc::new(runner), inputs, plan_options)?;

    let outcome = orchestrator.run().await;
    print!("{}", render_report(&outcome));

    if outcome.is_acceptable() {
        info!("Run {} is acceptable", outcome.run_id);
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_FAILED)
    }
}
