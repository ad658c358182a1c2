use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{LenderConfig, LoanLimits};
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::payments::{generate_schedule, monthly_payment, Payment};
use crate::types::{BorrowerId, Currency};

/// loan application as submitted from the dashboard form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub borrower_id: BorrowerId,
    pub principal: Decimal,
    #[serde(default)]
    pub currency: Option<Currency>,
    pub annual_rate_percent: Decimal,
    /// signed so that a bad form value is reported instead of failing to parse
    pub term_months: i64,
    pub origination_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LoanApplication {
    pub fn new(
        borrower_id: BorrowerId,
        principal: Decimal,
        annual_rate_percent: Decimal,
        term_months: i64,
        origination_date: NaiveDate,
    ) -> Self {
        Self {
            borrower_id,
            principal,
            currency: None,
            annual_rate_percent,
            term_months,
            origination_date,
            notes: None,
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// validate against the lender's limits
    pub fn to_terms(&self, config: &LenderConfig) -> Result<LoanTerms> {
        let (principal, annual_rate, term_months) = validate_financials(
            self.principal,
            self.annual_rate_percent,
            self.term_months,
            &config.limits,
        )?;

        Ok(LoanTerms {
            principal,
            currency: self.currency.unwrap_or(config.default_currency),
            annual_rate,
            term_months,
            origination_date: self.origination_date,
        })
    }
}

/// validated financial terms of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub currency: Currency,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub origination_date: NaiveDate,
}

impl LoanTerms {
    pub fn monthly_payment(&self) -> Money {
        monthly_payment(self.principal, self.annual_rate, self.term_months)
    }

    pub fn schedule(&self, today: NaiveDate) -> Vec<Payment> {
        generate_schedule(
            self.principal,
            self.annual_rate,
            self.term_months,
            self.origination_date,
            today,
        )
    }

    pub fn validate(&self, limits: &LoanLimits) -> Result<()> {
        validate_financials(
            self.principal.as_decimal(),
            self.annual_rate.as_percentage(),
            self.term_months as i64,
            limits,
        )
        .map(|_| ())
    }
}

/// replacement values for an existing loan's terms; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsUpdate {
    pub principal: Option<Decimal>,
    pub currency: Option<Currency>,
    pub annual_rate_percent: Option<Decimal>,
    pub term_months: Option<i64>,
    pub origination_date: Option<NaiveDate>,
}

impl TermsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &TermsUpdate::default()
    }

    /// merge into `current` and validate the result
    pub fn apply_to(&self, current: &LoanTerms, limits: &LoanLimits) -> Result<LoanTerms> {
        let (principal, annual_rate, term_months) = validate_financials(
            self.principal.unwrap_or(current.principal.as_decimal()),
            self.annual_rate_percent
                .unwrap_or(current.annual_rate.as_percentage()),
            self.term_months.unwrap_or(current.term_months as i64),
            limits,
        )?;

        Ok(LoanTerms {
            principal,
            currency: self.currency.unwrap_or(current.currency),
            annual_rate,
            term_months,
            origination_date: self.origination_date.unwrap_or(current.origination_date),
        })
    }
}

fn validate_financials(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: i64,
    limits: &LoanLimits,
) -> Result<(Money, Rate, u32)> {
    let principal = Money::from_decimal(principal);
    if !principal.is_positive() {
        return Err(LoanError::validation("principal", "must be greater than zero"));
    }
    if principal < limits.min_principal {
        return Err(LoanError::validation(
            "principal",
            format!("must be at least {}", limits.min_principal),
        ));
    }
    if let Some(max) = limits.max_principal {
        if principal > max {
            return Err(LoanError::validation(
                "principal",
                format!("must not exceed {}", max),
            ));
        }
    }

    if annual_rate_percent < Decimal::ZERO {
        return Err(LoanError::validation("annual_rate_percent", "must not be negative"));
    }
    if annual_rate_percent > limits.max_annual_rate_percent {
        return Err(LoanError::validation(
            "annual_rate_percent",
            format!("must not exceed {}", limits.max_annual_rate_percent),
        ));
    }

    if term_months < 1 {
        return Err(LoanError::validation("term_months", "must be at least 1"));
    }
    if term_months > limits.max_term_months as i64 {
        return Err(LoanError::validation(
            "term_months",
            format!("must not exceed {}", limits.max_term_months),
        ));
    }

    let annual_rate = Rate::from_percent(annual_rate_percent);
    let term_months = term_months as u32;
    if monthly_payment(principal, annual_rate, term_months).is_zero() {
        return Err(LoanError::validation(
            "principal",
            "too large to amortize over the requested term",
        ));
    }

    Ok((principal, annual_rate, term_months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn field_of(err: LoanError) -> &'static str {
        match err {
            LoanError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_application() {
        let config = LenderConfig::default();
        let terms = LoanApplication::new(Uuid::new_v4(), dec!(50000), dec!(5.5), 36, date())
            .to_terms(&config)
            .unwrap();

        assert_eq!(terms.principal, Money::from_major(50_000));
        assert_eq!(terms.annual_rate, Rate::from_percent(dec!(5.5)));
        assert_eq!(terms.term_months, 36);
        assert_eq!(terms.currency, config.default_currency);
        assert_eq!(terms.schedule(date()).len(), 36);
    }

    #[test]
    fn test_invalid_fields_are_named() {
        let config = LenderConfig::default();
        let borrower = Uuid::new_v4();

        let err = LoanApplication::new(borrower, dec!(0), dec!(5), 12, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "principal");

        let err = LoanApplication::new(borrower, dec!(1000), dec!(-1), 12, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "annual_rate_percent");

        let err = LoanApplication::new(borrower, dec!(1000), dec!(5), 0, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "term_months");

        let err = LoanApplication::new(borrower, dec!(1000), dec!(5), -3, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "term_months");
    }

    #[test]
    fn test_limits_enforced() {
        let config = LenderConfig::microloans("Baraka Credit", Currency::Usd);
        let borrower = Uuid::new_v4();

        let err = LoanApplication::new(borrower, dec!(5), dec!(20), 12, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "principal");

        let err = LoanApplication::new(borrower, dec!(500), dec!(75), 12, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "annual_rate_percent");

        let err = LoanApplication::new(borrower, dec!(500), dec!(20), 36, date())
            .to_terms(&config)
            .unwrap_err();
        assert_eq!(field_of(err), "term_months");
    }

    #[test]
    fn test_unamortizable_principal_rejected() {
        let borrower = Uuid::new_v4();
        let huge = dec!(70000000000000000000000000000);

        // default ceiling
        let err = LoanApplication::new(borrower, huge, dec!(100), 360, date())
            .to_terms(&LenderConfig::default())
            .unwrap_err();
        assert_eq!(field_of(err), "principal");

        // no ceiling: the schedule itself cannot be represented
        let mut config = LenderConfig::default();
        config.limits.max_principal = None;
        let err = LoanApplication::new(borrower, huge, dec!(100), 360, date())
            .to_terms(&config)
            .unwrap_err();
        assert!(matches!(
            err,
            LoanError::Validation { field: "principal", ref message } if message.contains("amortize")
        ));
    }

    #[test]
    fn test_form_payload_deserializes() {
        let json = format!(
            r#"{{
                "borrower_id": "{}",
                "principal": "1500.50",
                "currency": "USD",
                "annual_rate_percent": 18,
                "term_months": 12,
                "origination_date": "2024-05-01"
            }}"#,
            Uuid::new_v4()
        );
        let application: LoanApplication = serde_json::from_str(&json).unwrap();
        let terms = application.to_terms(&LenderConfig::default()).unwrap();

        assert_eq!(terms.currency, Currency::Usd);
        assert_eq!(terms.principal, Money::from_decimal(dec!(1500.50)));
        assert!(application.notes.is_none());

        let lowercase = json.replace("\"USD\"", "\"usd\"");
        let application: LoanApplication = serde_json::from_str(&lowercase).unwrap();
        assert_eq!(application.currency, Some(Currency::Usd));
    }

    #[test]
    fn test_terms_update_merges() {
        let config = LenderConfig::default();
        let current = LoanApplication::new(Uuid::new_v4(), dec!(1000), dec!(12), 12, date())
            .to_terms(&config)
            .unwrap();

        let update = TermsUpdate {
            term_months: Some(6),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert!(TermsUpdate::default().is_empty());

        let updated = update.apply_to(&current, &config.limits).unwrap();
        assert_eq!(updated.term_months, 6);
        assert_eq!(updated.principal, current.principal);
        assert_eq!(updated.annual_rate, current.annual_rate);
        assert_eq!(updated.origination_date, current.origination_date);

        let bad = TermsUpdate {
            principal: Some(dec!(-10)),
            ..Default::default()
        };
        assert!(bad.apply_to(&current, &config.limits).is_err());
    }
}
