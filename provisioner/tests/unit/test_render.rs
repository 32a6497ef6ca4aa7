//! Template rendering tests

use serde_json::json;

use provisioner::errors::ProvisionError;
use provisioner::models::parameters::DeploymentParameters;
use provisioner::models::vhost::VirtualHostSpec;
use provisioner::render::env::{render_env, EnvKey};
use provisioner::render::proxy::render_proxy;
use provisioner::render::{render, RenderContext, TemplateId};

fn parameters(debug: bool, broker_vhost: &str) -> DeploymentParameters {
    serde_json::from_value(json!({
        "base_domain": "example.org",
        "compose_version": "v1.29.2",
        "image_tag": "2024.06.1",
        "secret_key": "k=v#not-a-comment",
        "debug": debug,
        "database": {"name": "zanaka", "user": "zanaka", "password": "p@ss word"},
        "broker": {"user": "queue", "password": "mq", "vhost": broker_vhost}
    }))
    .unwrap()
}

#[test]
fn test_env_file_is_deterministic() {
    let params = parameters(false, "/");
    let first = render_env(&params).unwrap();
    let second = render_env(&params).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.lines().count(), EnvKey::ALL.len());
}

#[test]
fn test_env_values_are_opaque() {
    let rendered = render_env(&parameters(true, "zanaka")).unwrap();
    assert!(rendered.contains("SECRET_KEY=k=v#not-a-comment\n"));
    assert!(rendered.contains("DB_PASSWORD=p@ss word\n"));
    assert!(rendered.contains("DEBUG=True\n"));
    assert!(rendered.contains("RABBITMQ_DEFAULT_VHOST=zanaka\n"));
    assert!(rendered.contains("CELERY_BROKER_URL=amqp://queue:mq@rabbitmq:5672/zanaka\n"));
    assert!(rendered.contains("IMAGE_TAG=2024.06.1\n"));
}

#[test]
fn test_carriage_return_is_rejected() {
    let mut params = parameters(false, "/");
    params.database.user = "zanaka\rDB_HOST=evil".to_string();
    match render_env(&params) {
        Err(ProvisionError::TemplateError(msg)) => {
            assert!(msg.contains("DB_USER"));
            assert!(!msg.contains("evil"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_static_alias_only_on_its_block() {
    let hosts = vec![
        VirtualHostSpec::new("portainer", 9000),
        VirtualHostSpec::new("api", 8000)
            .with_static_alias("/static/")
            .with_upstream_path("/django/"),
    ];
    let rendered = render_proxy("example.org", "/srv/zanaka/static", &hosts).unwrap();

    let blocks: Vec<&str> = rendered.split("server {").skip(1).collect();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].contains("server_name portainer.example.org;"));
    assert!(!blocks[0].contains("alias"));
    assert!(blocks[1].contains("location /static/ {"));
    assert!(blocks[1].contains("alias /srv/zanaka/static/;"));
    assert!(blocks[1].contains("proxy_pass http://127.0.0.1:8000/django/;"));
}

#[test]
fn test_empty_host_list_renders_no_blocks() {
    let rendered = render_proxy("example.org", "/srv/zanaka/static", &[]).unwrap();
    assert!(!rendered.contains("server {"));
}

#[test]
fn test_invalid_proxy_inputs() {
    let hosts = vec![VirtualHostSpec::new("api", 8000)];
    assert!(matches!(
        render_proxy("example.org;", "/srv/static", &hosts),
        Err(ProvisionError::TemplateError(_))
    ));
    assert!(matches!(
        render_proxy("example.org", "/srv/static; root /", &hosts),
        Err(ProvisionError::TemplateError(_))
    ));
    let zero_port = vec![VirtualHostSpec::new("api", 0)];
    assert!(matches!(
        render_proxy("example.org", "/srv/static", &zero_port),
        Err(ProvisionError::TemplateError(_))
    ));
}

#[test]
fn test_render_dispatch() {
    let params = parameters(false, "/");
    let hosts = vec![VirtualHostSpec::new("flower", 5555)];
    let ctx = RenderContext {
        params: &params,
        virtual_hosts: &hosts,
        static_root: "/home/deploy/app/static",
    };

    let env = render(TemplateId::EnvFile, &ctx).unwrap();
    assert_eq!(env, render_env(&params).unwrap().into_bytes());

    let proxy = String::from_utf8(render(TemplateId::ProxyConfig, &ctx).unwrap()).unwrap();
    assert!(proxy.contains("server_name flower.example.org;"));
    assert!(!proxy.contains("k=v#not-a-comment"));
}
