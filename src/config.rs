//! Runtime configuration, read from the environment.

use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use std::env;
use std::str::FromStr;

/// Environment variable holding the balance given to newly registered accounts.
pub const OPENING_BALANCE_VAR: &str = "LEDGER_OPENING_BALANCE";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerConfig {
    /// Balance every new account starts with. Zero unless configured.
    pub opening_balance: Money,
}

impl LedgerConfig {
    /// Reads configuration from the process environment.
    ///
    /// Unset variables fall back to defaults; malformed or negative values
    /// are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LedgerConfig::default();

        if let Some(raw) = lookup(OPENING_BALANCE_VAR) {
            let balance = Money::from_str(&raw).map_err(|e| {
                LedgerError::InvalidConfig(format!("{}='{}': {}", OPENING_BALANCE_VAR, raw, e))
            })?;
            if balance.is_negative() {
                return Err(LedgerError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    OPENING_BALANCE_VAR, balance
                )));
            }
            config.opening_balance = balance;
        }

        Ok(config)
    }
}
