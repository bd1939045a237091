use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::token_store::{self, SecretName};
use crate::error::ConfigError;
use crate::llm::client::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::retry::RetryPolicy;

const APP_DIR: &str = "rs_mail_tabulator";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub user_email: Option<String>,
    pub app_password: Option<String>,

    pub imap_server: String,
    pub imap_port: u16,

    pub model: String,
    pub api_base: String,
    pub request_timeout_secs: u64,

    pub source_dir: PathBuf,
    pub results_dir: PathBuf,

    pub connect_attempts: u32,
    pub connect_delay_secs: u64,
    pub connect_error_delay_secs: u64,
    pub extraction_attempts: u32,
    pub extraction_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            user_email: None,
            app_password: None,
            imap_server: "imap.gmail.com".to_string(),
            imap_port: 993,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 120,
            source_dir: PathBuf::from("SOURCE"),
            results_dir: PathBuf::from("RESULT"),
            connect_attempts: 10,
            connect_delay_secs: 1,
            connect_error_delay_secs: 5,
            extraction_attempts: 5,
            extraction_delay_secs: 0,
        }
    }
}

impl Config {
    pub fn connect_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_secs(self.connect_delay_secs),
            Duration::from_secs(self.connect_error_delay_secs),
        )
    }

    pub fn extraction_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.extraction_attempts,
            Duration::from_secs(self.extraction_delay_secs),
            Duration::ZERO,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

/// Loads the default config file, writing a template first if it is missing.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit; secrets stay unset so
        // the environment and keyring still apply
        let sample = Config::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

/// Secrets needed by a run, resolved from the config file, the environment
/// and the keyring, in that order.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub mailbox: Option<MailboxCredentials>,
}

#[derive(Debug, Clone)]
pub struct MailboxCredentials {
    pub user_email: String,
    pub app_password: String,
}

impl Credentials {
    pub fn resolve(cfg: &Config, needs_mailbox: bool) -> Result<Self> {
        Self::resolve_with(cfg, needs_mailbox, |name| std::env::var(name).ok(), |name| {
            token_store::load_secret(name)
        })
    }

    pub fn resolve_with<E, K>(cfg: &Config, needs_mailbox: bool, env: E, keyring: K) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
        K: Fn(SecretName) -> Result<Option<String>>,
    {
        let lookup = |name: SecretName, configured: &Option<String>| -> Result<String> {
            if let Some(v) = configured.as_deref().filter(|v| !v.trim().is_empty()) {
                return Ok(v.to_string());
            }
            if let Some(v) = env(name.env_var()).filter(|v| !v.trim().is_empty()) {
                return Ok(v);
            }
            keyring(name)?
                .ok_or_else(|| anyhow::Error::from(ConfigError::MissingSecret(name.key())))
        };

        let api_key = lookup(SecretName::OpenAiApiKey, &cfg.openai_api_key)?;
        let mailbox = if needs_mailbox {
            Some(MailboxCredentials {
                user_email: lookup(SecretName::UserEmail, &cfg.user_email)?,
                app_password: lookup(SecretName::AppPassword, &cfg.app_password)?,
            })
        } else {
            None
        };

        Ok(Self { api_key, mailbox })
    }
}
