//! Application configuration options

use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable naming the parameters file
pub const PARAMS_FILE_ENV: &str = "PROVISION_PARAMS_FILE";

/// What the invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the full plan against the host
    Converge,

    /// Print the proxy configuration and exit
    RenderProxy,

    /// Print the ordered plan and exit
    Plan,

    /// Print version information and exit
    Version,
}

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub mode: Mode,

    /// Settings file
    pub config_path: PathBuf,

    /// Deployment parameters file
    pub params_path: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Converge,
            config_path: PathBuf::from("provisioner.json"),
            params_path: None,
        }
    }
}

impl AppOptions {
    /// Build options from `--key=value` / `--flag` arguments.
    ///
    /// The parameters file falls back to `$PROVISION_PARAMS_FILE`.
    pub fn from_args(cli_args: &HashMap<String, String>) -> Self {
        Self::from_args_and_env(cli_args, std::env::var(PARAMS_FILE_ENV).ok())
    }

    fn from_args_and_env(cli_args: &HashMap<String, String>, params_env: Option<String>) -> Self {
        let mode = if cli_args.contains_key("version") {
            Mode::Version
        } else if cli_args.contains_key("plan") {
            Mode::Plan
        } else if cli_args.contains_key("render-proxy") {
            Mode::RenderProxy
        } else {
            Mode::Converge
        };

        let defaults = Self::default();
        Self {
            mode,
            config_path: cli_args
                .get("config")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            params_path: cli_args
                .get("params")
                .cloned()
                .or(params_env)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Parse `--key=value` and standalone `--flag` arguments
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> HashMap<String, String> {
    let mut cli_args = HashMap::new();
    for arg in args {
        if let Some((key, value)) = arg.split_once('=') {
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }
    cli_args
}
