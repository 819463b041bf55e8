//! Loading the TOML configuration file and resolving the API password.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use super::{Config, ConfigResult};

pub const DEFAULT_CONFIG_FILE: &str = "sia_allowance_manager.toml";
pub const API_PASSWORD_ENV: &str = "SIA_API_PASSWORD";

pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Allowance manager configuration

# Password for accessing the Sia API. When empty, the SIA_API_PASSWORD
# environment variable or ~/.sia/apipassword is used instead
sia_api_password = ""

# Address of the Sia daemon API
sia_api_address = "127.0.0.1:9980"

# Price ticker. The 24 hour low of this pair is used as the exchange rate
ticker_url = "https://api.kraken.com/0/public/Ticker"
ticker_pair = "SCEUR"

# Max storage price in euros per month per TB per host (without redundancy)
max_storage_price_tb_month = 1.80

# Max download price in euros per TB
max_download_price_tb = 2.50

# Max upload price in euros per TB
max_upload_price_tb = 2.00

# Max contract formation fee in euros per contract
max_contract_formation_price = 0.10

# Max collateral price in euros per month per TB per host (without redundancy)
max_collateral_tb_month = 8.00

# How redundancy applies to the storage and collateral ceilings:
#   conservative    - hosts are held to ceiling / redundancy and the budget
#                     assumes ceiling * redundancy per TB of data
#   per_host        - hosts are held to the ceiling, budget ceiling * redundancy
#   per_stored_data - hosts are held to ceiling / redundancy, budget ceiling
ceiling_basis = "conservative"

# Data redundancy value to use in calculations
redundancy = 3.00

# Number of hosts to use when creating contracts
hosts = 50

# Contract length and renew window in blocks. The defaults are 3 months and one
# month, respectively, counting a month as 30 days
contract_length = 12960
renew_window = 4320

# Allowances below this many siacoins are raised to it before adjusting
min_funds = 1000

# Timeout in seconds for each HTTP request
request_timeout_secs = 60

# The allowance is increased when unallocated funds fall to `low` of the
# allowance, decreased when they reach `high`, and moved by `margin` each time
[hysteresis]
low = 0.125
high = 0.5
margin = 0.2
"#;

impl Config {
    /// Reads the configuration at `path`, writing the commented default
    /// template there first if the file does not exist.
    pub async fn load_or_create(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path).await? {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, DEFAULT_CONFIG_TEMPLATE).await?;
            tracing::info!(path = %path.display(), "wrote default configuration");
        }

        let content = tokio::fs::read_to_string(path).await?;
        let mut config = Self::from_toml(&content)?;
        config.sia_api_password = resolve_password(
            std::env::var(API_PASSWORD_ENV).ok(),
            &config.sia_api_password,
            default_password_file(),
        )
        .await;
        Ok(config)
    }
}

/// Location of the password file the Sia daemon generates on first start.
pub fn default_password_file() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".sia").join("apipassword"))
}

/// Environment first, then the configured value, then the daemon's file.
async fn resolve_password(
    env: Option<String>,
    configured: &SecretString,
    password_file: Option<PathBuf>,
) -> SecretString {
    if let Some(value) = env.filter(|v| !v.is_empty()) {
        return SecretString::from(value);
    }
    if !configured.expose_secret().is_empty() {
        return configured.clone();
    }
    if let Some(path) = password_file
        && let Ok(content) = tokio::fs::read_to_string(&path).await
    {
        tracing::debug!(path = %path.display(), "using API password file");
        return SecretString::from(content.trim().to_string());
    }
    configured.clone()
}
