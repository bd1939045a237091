use anyhow::{Result, anyhow};
use clap::ValueEnum;
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "rs_mail_tabulator";

/// The secrets a run may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretName {
    #[value(name = "openai-api-key")]
    OpenAiApiKey,
    UserEmail,
    AppPassword,
}

impl SecretName {
    /// Key used in the config file and as the keyring username.
    pub fn key(self) -> &'static str {
        match self {
            SecretName::OpenAiApiKey => "openai_api_key",
            SecretName::UserEmail => "user_email",
            SecretName::AppPassword => "app_password",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            SecretName::OpenAiApiKey => "OPENAI_API_KEY",
            SecretName::UserEmail => "MY_EMAIL",
            SecretName::AppPassword => "APP_PASSWORD",
        }
    }
}

/// Save a secret into the OS keyring
pub fn save_secret(name: SecretName, value: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, name.key());
    entry?
        .set_password(value)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load a secret from the keyring; `None` if it was never stored
pub fn load_secret(name: SecretName) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, name.key());
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}
