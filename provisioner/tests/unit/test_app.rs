//! Settings and parameter loading tests

use std::path::PathBuf;

use uuid::Uuid;

use provisioner::app::report::render_plan;
use provisioner::app::run::{exit_code, load_parameters, load_settings, EXIT_INVALID_INPUT};
use provisioner::converge::plan::{build_plan, STEP_NAMES};

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    async fn with_contents(contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("provisioner-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, contents).await.unwrap();
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

const PARAMS: &str = r#"{
    "base_domain": "example.org",
    "compose_version": "2.21.0",
    "image_tag": "1.4.2",
    "secret_key": "s3cr3t-k3y",
    "database": {"name": "zanaka", "user": "zanaka", "password": "db-pass-123"},
    "broker": {"user": "queue", "password": "mq-pass-456"}
}"#;

#[tokio::test]
async fn test_load_settings_and_list_plan() {
    let settings = TempFile::with_contents(
        r#"{"host": {"address": "203.0.113.7", "user": "deploy"}, "deployment": {"site_name": "zanaka"}}"#,
    )
    .await;
    let params = TempFile::with_contents(PARAMS).await;

    let settings = load_settings(&settings.path).await.unwrap();
    let params = load_parameters(Some(params.path.as_path())).await.unwrap();
    assert_eq!(params.compose_version.as_str(), "2.21.0");

    let fqdns: Vec<String> = settings
        .virtual_hosts
        .iter()
        .map(|spec| spec.fqdn(&params.base_domain))
        .collect();
    let steps = build_plan(&settings.plan_options(), &params.compose_version, &fqdns);
    let listing = render_plan(&steps);

    assert_eq!(listing.lines().count(), STEP_NAMES.len());
    let first = listing.lines().next().unwrap();
    assert!(first.contains("ensure-base-directory"));
    assert!(first.contains("checked"));
    let last = listing.lines().last().unwrap();
    assert!(last.contains("issue-certificates"));
    assert!(last.contains("tolerated"));
    assert!(!listing.contains("s3cr3t-k3y"));
}

#[tokio::test]
async fn test_invalid_version_tag_is_an_input_error() {
    let params = TempFile::with_contents(&PARAMS.replace("2.21.0", "latest")).await;
    let err = load_parameters(Some(params.path.as_path())).await.unwrap_err();
    assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
}

#[tokio::test]
async fn test_invalid_base_domain_is_an_input_error() {
    let params = TempFile::with_contents(&PARAMS.replace("example.org", "example..org")).await;
    let err = load_parameters(Some(params.path.as_path())).await.unwrap_err();
    assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
}

#[tokio::test]
async fn test_missing_settings_file() {
    let missing = std::env::temp_dir().join(format!("provisioner-{}.json", Uuid::new_v4()));
    let err = load_settings(&missing).await.unwrap_err();
    assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
}

#[tokio::test]
async fn test_zero_command_timeout_is_an_input_error() {
    let settings = TempFile::with_contents(
        r#"{"host": {"address": "203.0.113.7", "user": "deploy", "command_timeout_secs": 0}}"#,
    )
    .await;
    let err = load_settings(&settings.path).await.unwrap_err();
    assert!(err.to_string().contains("command_timeout_secs"));
    assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
}

#[tokio::test]
async fn test_site_name_outside_site_directory_is_an_input_error() {
    let settings = TempFile::with_contents(
        r#"{"host": {"address": "203.0.113.7", "user": "deploy"}, "deployment": {"site_name": "../default"}}"#,
    )
    .await;
    let err = load_settings(&settings.path).await.unwrap_err();
    assert!(err.to_string().contains("site_name"));
    assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
}
