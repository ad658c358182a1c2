use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::{Currency, PrepaymentStrategy};

/// lender configuration, created once at startup and handed to the loan book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LenderConfig {
    pub lender_name: String,
    pub default_currency: Currency,
    pub limits: LoanLimits,
    pub prepayment_strategy: PrepaymentStrategy,
    pub notifications: NotificationConfig,
}

/// default principal ceiling; `null` in json lifts it
pub const DEFAULT_MAX_PRINCIPAL: i64 = 1_000_000_000_000_000;

/// bounds enforced on loan applications and term edits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanLimits {
    pub min_principal: Money,
    pub max_principal: Option<Money>,
    pub max_annual_rate_percent: Decimal,
    pub max_term_months: u32,
}

/// notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// appended to every message body
    pub signature: Option<String>,
}

impl Default for LenderConfig {
    fn default() -> Self {
        Self {
            lender_name: "Microfinance".to_string(),
            default_currency: Currency::Uzs,
            limits: LoanLimits::default(),
            prepayment_strategy: PrepaymentStrategy::ReduceEmi,
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for LoanLimits {
    fn default() -> Self {
        Self {
            min_principal: Money::ONE,
            max_principal: Some(Money::from_major(DEFAULT_MAX_PRINCIPAL)),
            max_annual_rate_percent: dec!(100),
            max_term_months: 360,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            signature: None,
        }
    }
}

impl LenderConfig {
    /// create a configuration for the named lender with default limits
    pub fn new(lender_name: impl Into<String>, default_currency: Currency) -> Self {
        Self {
            lender_name: lender_name.into(),
            default_currency,
            ..Default::default()
        }
    }

    /// short-term microloans: small principal, at most two years
    pub fn microloans(lender_name: impl Into<String>, default_currency: Currency) -> Self {
        Self {
            limits: LoanLimits {
                min_principal: Money::from_major(10),
                max_annual_rate_percent: dec!(60),
                max_term_months: 24,
                ..LoanLimits::default()
            },
            ..Self::new(lender_name, default_currency)
        }
    }

    /// parse from json; omitted fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lender_name.trim().is_empty() {
            return Err(LoanError::InvalidConfiguration {
                message: "lender_name must not be empty".to_string(),
            });
        }
        self.limits.validate()
    }
}

impl LoanLimits {
    pub fn validate(&self) -> Result<()> {
        if self.min_principal.is_negative() {
            return Err(LoanError::InvalidConfiguration {
                message: format!("min_principal must not be negative, got {}", self.min_principal),
            });
        }
        if let Some(max) = self.max_principal {
            if max < self.min_principal {
                return Err(LoanError::InvalidConfiguration {
                    message: format!(
                        "max_principal {} is below min_principal {}",
                        max, self.min_principal
                    ),
                });
            }
        }
        if self.max_annual_rate_percent < Decimal::ZERO {
            return Err(LoanError::InvalidConfiguration {
                message: "max_annual_rate_percent must not be negative".to_string(),
            });
        }
        if self.max_term_months == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "max_term_months must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LenderConfig::from_json_str(
            r#"{ "lender_name": "Baraka Credit", "limits": { "max_term_months": 18 } }"#,
        )
        .unwrap();

        assert_eq!(config.lender_name, "Baraka Credit");
        assert_eq!(config.default_currency, Currency::Uzs);
        assert_eq!(config.limits.max_term_months, 18);
        assert_eq!(config.limits.max_annual_rate_percent, dec!(100));
        assert_eq!(
            config.limits.max_principal,
            Some(Money::from_major(DEFAULT_MAX_PRINCIPAL))
        );
        assert!(config.notifications.enabled);

        let unbounded = LenderConfig::from_json_str(r#"{ "limits": { "max_principal": null } }"#).unwrap();
        assert_eq!(unbounded.limits.max_principal, None);
    }

    #[test]
    fn test_json_round_trip() {
        let config = LenderConfig::microloans("Baraka Credit", Currency::Usd);
        let json = config.to_json_pretty().unwrap();
        assert_eq!(LenderConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let err = LenderConfig::from_json_str(r#"{ "limits": { "max_term_months": 0 } }"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidConfiguration { .. }));

        let mut config = LenderConfig::default();
        config.limits.max_principal = Some(Money::ZERO);
        assert!(config.validate().is_err());

        config.limits.max_principal = None;
        config.lender_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = LenderConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, LoanError::Serialization(_)));
    }
}
