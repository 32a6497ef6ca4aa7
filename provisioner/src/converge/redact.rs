//! Secret redaction for recorded output

use secrecy::{ExposeSecret, SecretString};

use crate::models::parameters::DeploymentParameters;

/// Replacement text for a secret value
pub const REDACTED: &str = "[REDACTED]";

/// Scrubs known secret values from text before it is logged or stored
pub struct Redactor {
    secrets: Vec<SecretString>,
}

impl Redactor {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| !v.is_empty())
            .collect();
        // Longest first, so a secret embedded in another is not half-replaced.
        values.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        values.dedup();
        Self {
            secrets: values.into_iter().map(SecretString::from).collect(),
        }
    }

    pub fn for_parameters(params: &DeploymentParameters) -> Self {
        Self::new(params.secret_values())
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            let secret = secret.expose_secret();
            if out.contains(secret) {
                out = out.replace(secret, REDACTED);
            }
        }
        out
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}
