use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::payments::{refresh_statuses, Payment, ScheduleProgress};
use crate::types::LoanStatus;

/// mutable part of a loan: status, schedule and bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanState {
    pub status: LoanStatus,
    /// absent until the loan is first approved
    pub payments: Option<Vec<Payment>>,
    pub prepaid_principal: Money,
    pub rejection_reason: Option<String>,

    // dates
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl LoanState {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            status: LoanStatus::Pending,
            payments: None,
            prepaid_principal: Money::ZERO,
            rejection_reason: None,
            created_at,
            updated_at: created_at,
            last_status_change: created_at,
            approved_at: None,
            closed_at: None,
        }
    }

    pub fn has_schedule(&self) -> bool {
        self.payments.as_ref().is_some_and(|p| !p.is_empty())
    }

    pub fn payments(&self) -> &[Payment] {
        self.payments.as_deref().unwrap_or(&[])
    }

    pub fn payments_mut(&mut self) -> Result<&mut Vec<Payment>> {
        match self.payments.as_mut() {
            Some(payments) if !payments.is_empty() => Ok(payments),
            _ => Err(LoanError::ScheduleMissing),
        }
    }

    pub fn payment_mut(&mut self, month: u32) -> Result<&mut Payment> {
        self.payments_mut()?
            .iter_mut()
            .find(|p| p.month == month)
            .ok_or(LoanError::PaymentNotFound { month })
    }

    pub fn all_paid(&self) -> bool {
        self.has_schedule() && self.payments().iter().all(Payment::is_paid)
    }

    pub fn progress(&self) -> ScheduleProgress {
        ScheduleProgress::from_payments(self.payments())
    }

    /// recompute overdue/upcoming on the stored schedule
    pub fn refresh(&mut self, today: NaiveDate) {
        if let Some(payments) = self.payments.as_mut() {
            refresh_statuses(payments, today);
        }
    }

    pub fn update_status(&mut self, new_status: LoanStatus, timestamp: DateTime<Utc>) {
        self.status = new_status;
        self.last_status_change = timestamp;
        self.updated_at = timestamp;

        match new_status {
            LoanStatus::Approved => {
                if self.approved_at.is_none() {
                    self.approved_at = Some(timestamp);
                }
            }
            LoanStatus::Rejected | LoanStatus::Paid => self.closed_at = Some(timestamp),
            LoanStatus::Pending => {}
        }
    }

    pub fn touch(&mut self, timestamp: DateTime<Utc>) {
        self.updated_at = timestamp;
    }
}
