use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::types::{LoanId, PrepaymentStrategy};

use super::amortization::{generate_tail, term_for_payment, Payment};

/// outcome of a principal prepayment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentResult {
    pub strategy: PrepaymentStrategy,
    pub amount_applied: Money,
    pub old_balance: Money,
    pub new_balance: Money,
    pub old_installment: Money,
    pub new_installment: Money,
    pub old_remaining_months: u32,
    pub new_remaining_months: u32,
    pub interest_saved: Money,
}

/// applies a principal prepayment to the unpaid part of a schedule
pub struct PrepaymentHandler {
    loan_id: LoanId,
    strategy: PrepaymentStrategy,
}

impl PrepaymentHandler {
    pub fn new(loan_id: LoanId, strategy: PrepaymentStrategy) -> Self {
        Self { loan_id, strategy }
    }

    /// Reduce the balance left after the last paid installment by `amount`
    /// and rebuild every installment after it. Installments up to and
    /// including the last paid one are kept as they are.
    pub fn apply(
        &self,
        amount: Money,
        payments: &mut Vec<Payment>,
        annual_rate: Rate,
        origination_date: NaiveDate,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<PrepaymentResult> {
        let first = payments.first().ok_or(LoanError::ScheduleMissing)?;

        let last_paid = payments.iter().filter(|p| p.is_paid()).max_by_key(|p| p.month);
        let (old_balance, first_month) = match last_paid {
            Some(p) => (p.remaining_balance, p.month + 1),
            None => (first.opening_balance(), first.month),
        };

        if !amount.is_positive() || amount >= old_balance {
            return Err(LoanError::InvalidPrepayment {
                amount,
                outstanding: old_balance,
            });
        }

        let split = payments
            .iter()
            .position(|p| p.month >= first_month)
            .unwrap_or(payments.len());
        let tail = &payments[split..];

        let old_installment = tail.first().map(|p| p.monthly_payment).unwrap_or(Money::ZERO);
        let old_remaining_months = tail.len() as u32;
        let old_tail_interest: Money = tail.iter().map(|p| p.interest_payment).sum();

        let new_balance = old_balance - amount;
        let new_remaining_months = match self.strategy {
            PrepaymentStrategy::ReduceEmi => old_remaining_months.max(1),
            PrepaymentStrategy::ReduceTerm => {
                term_for_payment(new_balance, annual_rate, old_installment)
                    .clamp(1, old_remaining_months.max(1))
            }
        };

        let new_tail = generate_tail(
            new_balance,
            annual_rate,
            new_remaining_months,
            first_month,
            origination_date,
            now.date_naive(),
        );

        let new_installment = new_tail.first().map(|p| p.monthly_payment).unwrap_or(Money::ZERO);
        let new_tail_interest: Money = new_tail.iter().map(|p| p.interest_payment).sum();

        payments.truncate(split);
        payments.extend(new_tail);

        events.emit(Event::PrepaymentApplied {
            loan_id: self.loan_id,
            amount,
            strategy: self.strategy,
            new_balance,
            new_installment,
            remaining_months: new_remaining_months,
            timestamp: now,
        });

        Ok(PrepaymentResult {
            strategy: self.strategy,
            amount_applied: amount,
            old_balance,
            new_balance,
            old_installment,
            new_installment,
            old_remaining_months,
            new_remaining_months,
            interest_saved: (old_tail_interest - new_tail_interest).max(Money::ZERO),
        })
    }
}
