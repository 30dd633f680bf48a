//! # App Configuration
//!
//! Where state is stored and how checkout charges are computed.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FEAST_DB_PATH=/data/feast.db                                       │
//! │     FEAST_TAX_RATE=8.25                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/feast/feast.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.feast.app/feast.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     $2.99 delivery, 8% tax, foodMarketplace:* keys                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! database_path = "feast.db"
//! cart_key = "foodMarketplace:cart"
//! user_key = "foodMarketplace:user"
//!
//! [pricing]
//! delivery_fee_cents = 299
//! tax_rate_bps = 800
//! currency_symbol = "$"
//! currency_decimals = 2
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use feast_core::{
    Money, PricingRules, TaxRate, CART_STORAGE_KEY, DEFAULT_DELIVERY_FEE_CENTS,
    DEFAULT_TAX_RATE_BPS, USER_STORAGE_KEY,
};

use crate::error::{StateError, StateResult};

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the persisted state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Key of the serialized cart.
    #[serde(default = "default_cart_key")]
    pub cart_key: String,

    /// Key of the serialized user profile.
    #[serde(default = "default_user_key")]
    pub user_key: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("feast.db")
}

fn default_cart_key() -> String {
    CART_STORAGE_KEY.to_string()
}

fn default_user_key() -> String {
    USER_STORAGE_KEY.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: default_database_path(),
            cart_key: default_cart_key(),
            user_key: default_user_key(),
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Checkout charges and currency display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Flat delivery fee per order, in cents.
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee_cents: i64,

    /// Tax on the subtotal in basis points (800 = 8%).
    #[serde(default = "default_tax_rate")]
    pub tax_rate_bps: u32,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u8,
}

fn default_delivery_fee() -> i64 {
    DEFAULT_DELIVERY_FEE_CENTS
}

fn default_tax_rate() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_currency_decimals() -> u8 {
    2
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            delivery_fee_cents: default_delivery_fee(),
            tax_rate_bps: default_tax_rate(),
            currency_symbol: default_currency_symbol(),
            currency_decimals: default_currency_decimals(),
        }
    }
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub pricing: PricingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`feast.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StateResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StateResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StateError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StateResult<()> {
        if self.storage.cart_key.trim().is_empty() || self.storage.user_key.trim().is_empty() {
            return Err(StateError::InvalidConfig(
                "storage keys must not be empty".into(),
            ));
        }

        if self.storage.cart_key == self.storage.user_key {
            return Err(StateError::InvalidConfig(format!(
                "cart_key and user_key must differ, both are '{}'",
                self.storage.cart_key
            )));
        }

        if self.pricing.delivery_fee_cents < 0 {
            return Err(StateError::InvalidConfig(format!(
                "delivery_fee_cents must not be negative, got {}",
                self.pricing.delivery_fee_cents
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FEAST_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = PathBuf::from(path);
        }

        if let Ok(fee) = std::env::var("FEAST_DELIVERY_FEE_CENTS") {
            match fee.parse::<i64>() {
                Ok(cents) => self.pricing.delivery_fee_cents = cents,
                Err(_) => warn!(value = %fee, "Ignoring unparsable FEAST_DELIVERY_FEE_CENTS"),
            }
        }

        // Percent, e.g. "8.25"
        if let Ok(rate) = std::env::var("FEAST_TAX_RATE") {
            match rate.parse::<f64>() {
                Ok(pct) if pct >= 0.0 => {
                    self.pricing.tax_rate_bps = TaxRate::from_percentage(pct).bps();
                }
                _ => warn!(value = %rate, "Ignoring invalid FEAST_TAX_RATE"),
            }
        }

        if let Ok(symbol) = std::env::var("FEAST_CURRENCY_SYMBOL") {
            self.pricing.currency_symbol = symbol;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "feast", "app")
            .map(|dirs| dirs.config_dir().join("feast.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Checkout charges as core pricing rules.
    pub fn pricing_rules(&self) -> PricingRules {
        PricingRules {
            delivery_fee: Money::from_cents(self.pricing.delivery_fee_cents),
            tax_rate: TaxRate::from_bps(self.pricing.tax_rate_bps),
        }
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust
    /// use feast_state::AppConfig;
    ///
    /// let config = AppConfig::default();
    /// assert_eq!(config.format_currency(1379), "$13.79");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let decimals = u32::from(self.pricing.currency_decimals);
        let divisor = 10_i64.pow(decimals);
        let whole = (cents / divisor).abs();
        let frac = (cents % divisor).abs();
        let sign = if cents < 0 { "-" } else { "" };

        if decimals > 0 {
            format!(
                "{}{}{}.{:0width$}",
                sign,
                self.pricing.currency_symbol,
                whole,
                frac,
                width = decimals as usize
            )
        } else {
            format!("{}{}{}", sign, self.pricing.currency_symbol, whole)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
