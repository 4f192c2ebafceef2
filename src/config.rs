// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fmt, fs};
use toml_edit::{DocumentMut, value};

use crate::compare::SentinelPolicy;
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Absent when notifications are only logged.
    #[serde(rename = "gmail_oauth", default)]
    pub gmail: Option<GmailConfig>,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub overlays: OverlayConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

#[derive(Debug, Deserialize)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Mailbox the messages are sent from, `me` for the authorised account.
    #[serde(default = "default_gmail_user")]
    pub user: String,
    pub tokens: Tokens,
    pub urls: AuthUrls,
}

fn default_gmail_user() -> String {
    "me".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Tokens {
    pub refresh_token: String,
    pub access_token: String,
    /// Unix seconds. Absent means unknown, which forces a refresh.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AuthUrls {
    pub token_url: String,
    pub auth_url: String,
}

/// A party to the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Buyer,
    Seller,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
        }
    }
}

/// Who receives which artifact after a successful reconciliation.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub sender: String,
    pub buyer: String,
    pub seller: String,
    #[serde(default)]
    pub routing: Routing,
    /// Log notifications instead of sending them.
    #[serde(default)]
    pub dry_run: bool,
}

impl DeliveryConfig {
    pub fn address(&self, party: Party) -> &str {
        match party {
            Party::Buyer => &self.buyer,
            Party::Seller => &self.seller,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, addr) in [
            ("sender", &self.sender),
            ("buyer", &self.buyer),
            ("seller", &self.seller),
        ] {
            if !addr.contains('@') {
                return Err(ConfigError::Invalid(format!(
                    "delivery.{name}: '{addr}' is not an e-mail address"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Routing {
    #[serde(default = "default_payment_instruction_to")]
    pub payment_instruction: Party,
    #[serde(default = "default_signed_copy_to")]
    pub signed_copy: Party,
}

fn default_payment_instruction_to() -> Party {
    Party::Buyer
}

fn default_signed_copy_to() -> Party {
    Party::Seller
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            payment_instruction: default_payment_instruction_to(),
            signed_copy: default_signed_copy_to(),
        }
    }
}

/// Seal and signature images stamped onto the signed copy.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_seal")]
    pub seal: PathBuf,
    #[serde(default = "default_signature")]
    pub signature: PathBuf,
}

fn default_seal() -> PathBuf {
    PathBuf::from("seal.png")
}

fn default_signature() -> PathBuf {
    PathBuf::from("sign.png")
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            seal: default_seal(),
            signature: default_signature(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareConfig {
    #[serde(default)]
    pub sentinel_policy: SentinelPolicy,
    /// Replaces the built-in rule table.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.delivery.validate()?;
        Ok(cfg)
    }

    pub fn update_access_token(
        path: impl AsRef<Path>,
        new_token: &str,
        expires_at: Option<i64>,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc = content.parse::<DocumentMut>()?;

        doc["gmail_oauth"]["tokens"]["access_token"] = value(new_token);
        if let Some(ts) = expires_at {
            doc["gmail_oauth"]["tokens"]["expires_at"] = value(ts);
        }

        fs::write(path, doc.to_string()).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
