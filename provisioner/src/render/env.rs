//! Environment file rendering

use std::borrow::Cow;

use secrecy::ExposeSecret;

use crate::errors::ProvisionError;
use crate::models::parameters::DeploymentParameters;

/// Keys of the environment file, in the order they are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKey {
    SecretKey,
    Debug,
    DbEngine,
    DbName,
    DbUser,
    DbPassword,
    DbHost,
    DbPort,
    BrokerUser,
    BrokerPassword,
    BrokerHost,
    BrokerPort,
    BrokerVhost,
    ImageTag,
    BrokerUrl,
}

impl EnvKey {
    pub const ALL: [EnvKey; 15] = [
        EnvKey::SecretKey,
        EnvKey::Debug,
        EnvKey::DbEngine,
        EnvKey::DbName,
        EnvKey::DbUser,
        EnvKey::DbPassword,
        EnvKey::DbHost,
        EnvKey::DbPort,
        EnvKey::BrokerUser,
        EnvKey::BrokerPassword,
        EnvKey::BrokerHost,
        EnvKey::BrokerPort,
        EnvKey::BrokerVhost,
        EnvKey::ImageTag,
        EnvKey::BrokerUrl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EnvKey::SecretKey => "SECRET_KEY",
            EnvKey::Debug => "DEBUG",
            EnvKey::DbEngine => "DB_ENGINE",
            EnvKey::DbName => "DB_NAME",
            EnvKey::DbUser => "DB_USER",
            EnvKey::DbPassword => "DB_PASSWORD",
            EnvKey::DbHost => "DB_HOST",
            EnvKey::DbPort => "DB_PORT",
            EnvKey::BrokerUser => "RABBITMQ_DEFAULT_USER",
            EnvKey::BrokerPassword => "RABBITMQ_DEFAULT_PASS",
            EnvKey::BrokerHost => "RABBITMQ_HOST",
            EnvKey::BrokerPort => "RABBITMQ_PORT",
            EnvKey::BrokerVhost => "RABBITMQ_DEFAULT_VHOST",
            EnvKey::ImageTag => "IMAGE_TAG",
            EnvKey::BrokerUrl => "CELERY_BROKER_URL",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            EnvKey::SecretKey | EnvKey::DbPassword | EnvKey::BrokerPassword | EnvKey::BrokerUrl
        )
    }

    fn value<'a>(&self, params: &'a DeploymentParameters) -> Cow<'a, str> {
        match self {
            EnvKey::SecretKey => Cow::Borrowed(params.secret_key.expose_secret()),
            EnvKey::Debug => Cow::Borrowed(if params.debug { "True" } else { "False" }),
            EnvKey::DbEngine => Cow::Borrowed(&params.database.engine),
            EnvKey::DbName => Cow::Borrowed(&params.database.name),
            EnvKey::DbUser => Cow::Borrowed(&params.database.user),
            EnvKey::DbPassword => Cow::Borrowed(params.database.password.expose_secret()),
            EnvKey::DbHost => Cow::Borrowed(&params.database.host),
            EnvKey::DbPort => Cow::Owned(params.database.port.to_string()),
            EnvKey::BrokerUser => Cow::Borrowed(&params.broker.user),
            EnvKey::BrokerPassword => Cow::Borrowed(params.broker.password.expose_secret()),
            EnvKey::BrokerHost => Cow::Borrowed(&params.broker.host),
            EnvKey::BrokerPort => Cow::Owned(params.broker.port.to_string()),
            EnvKey::BrokerVhost => Cow::Borrowed(&params.broker.vhost),
            EnvKey::ImageTag => Cow::Borrowed(&params.image_tag),
            EnvKey::BrokerUrl => Cow::Owned(params.broker.connection_url().expose_secret().to_string()),
        }
    }
}

/// Render `KEY=value` lines for every key, in order.
///
/// Values are written verbatim; a value containing a line break is rejected.
pub fn render_env(params: &DeploymentParameters) -> Result<String, ProvisionError> {
    let mut out = String::new();
    for key in EnvKey::ALL {
        let value = key.value(params);
        if value.contains(['\n', '\r']) {
            return Err(ProvisionError::TemplateError(format!(
                "Value for {} contains a line break",
                key.name()
            )));
        }
        out.push_str(key.name());
        out.push('=');
        out.push_str(&value);
        out.push('\n');
    }
    Ok(out)
}
