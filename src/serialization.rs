//! serializable views for the dashboard and the customer lookup page
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::borrower::Borrower;
use crate::decimal::Money;
use crate::loan::Loan;
use crate::payments::{Payment, ScheduleProgress};
use crate::types::{BorrowerId, Currency, LoanId, LoanStatus, PaymentStatus};

/// one schedule row, amounts rounded to cents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentView {
    pub month: u32,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub monthly_payment: Money,
    pub principal_payment: Money,
    pub interest_payment: Money,
    pub remaining_balance: Money,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentView {
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            month: payment.month,
            due_date: payment.due_date,
            status: payment.status,
            monthly_payment: payment.monthly_payment.to_cents(),
            principal_payment: payment.principal_payment.to_cents(),
            interest_payment: payment.interest_payment.to_cents(),
            remaining_balance: payment.remaining_balance.to_cents(),
            paid_at: payment.paid_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceView {
    pub monthly_payment: Money,
    pub outstanding_principal: Money,
    pub total_paid: Money,
    pub prepaid_principal: Money,
    pub paid_installments: u32,
    pub overdue_installments: u32,
    pub total_installments: u32,
    pub next_due_date: Option<NaiveDate>,
    pub next_due_amount: Option<Money>,
}

impl BalanceView {
    fn from_schedule(loan: &Loan, schedule: &[Payment]) -> Self {
        let progress = ScheduleProgress::from_payments(schedule);
        let next_due = schedule.iter().find(|p| !p.is_paid());

        Self {
            monthly_payment: loan.monthly_payment().to_cents(),
            outstanding_principal: progress.principal_outstanding.to_cents(),
            total_paid: loan.total_paid().to_cents(),
            prepaid_principal: loan.state.prepaid_principal.to_cents(),
            paid_installments: progress.paid_installments,
            overdue_installments: progress.overdue_installments,
            total_installments: progress.total_installments,
            next_due_date: next_due.map(|p| p.due_date),
            next_due_amount: next_due.map(|p| p.monthly_payment.to_cents()),
        }
    }
}

/// full loan detail for the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub borrower_name: Option<String>,
    pub status: LoanStatus,
    pub currency: Currency,
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
    pub origination_date: NaiveDate,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub balance: BalanceView,
    pub schedule: Vec<PaymentView>,
}

impl LoanView {
    /// `schedule` must already carry statuses for the viewing date
    pub fn from_loan(loan: &Loan, borrower: Option<&Borrower>, schedule: &[Payment]) -> Self {
        Self {
            id: loan.id,
            borrower_id: loan.borrower_id,
            borrower_name: borrower.map(|b| b.full_name.clone()),
            status: loan.status(),
            currency: loan.terms.currency,
            principal: loan.terms.principal.to_cents(),
            annual_rate_percent: loan.terms.annual_rate.as_percentage().normalize(),
            term_months: loan.terms.term_months,
            origination_date: loan.terms.origination_date,
            notes: loan.notes.clone(),
            rejection_reason: loan.state.rejection_reason.clone(),
            created_at: loan.state.created_at,
            approved_at: loan.state.approved_at,
            closed_at: loan.state.closed_at,
            balance: BalanceView::from_schedule(loan, schedule),
            schedule: schedule.iter().map(PaymentView::from_payment).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// what a customer sees after looking up their loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupView {
    pub loan_id: LoanId,
    pub borrower_name: String,
    pub status: LoanStatus,
    pub currency: Currency,
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
    pub balance: BalanceView,
    pub schedule: Vec<PaymentView>,
}

impl LookupView {
    pub fn from_loan(loan: &Loan, borrower: &Borrower, schedule: &[Payment]) -> Self {
        Self {
            loan_id: loan.id,
            borrower_name: borrower.full_name.clone(),
            status: loan.status(),
            currency: loan.terms.currency,
            principal: loan.terms.principal.to_cents(),
            annual_rate_percent: loan.terms.annual_rate.as_percentage().normalize(),
            term_months: loan.terms.term_months,
            balance: BalanceView::from_schedule(loan, schedule),
            schedule: schedule.iter().map(PaymentView::from_payment).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub paid: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: LoanStatus) {
        match status {
            LoanStatus::Pending => self.pending += 1,
            LoanStatus::Approved => self.approved += 1,
            LoanStatus::Rejected => self.rejected += 1,
            LoanStatus::Paid => self.paid += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.paid
    }
}

/// headline figures for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    pub borrowers: usize,
    pub loans: StatusCounts,
    pub issued_by_currency: BTreeMap<Currency, Money>,
    pub outstanding_by_currency: BTreeMap<Currency, Money>,
    pub overdue_by_currency: BTreeMap<Currency, Money>,
    pub collected_by_currency: BTreeMap<Currency, Money>,
    pub overdue_installments: u32,
    pub loans_with_overdue: usize,
}

impl DashboardSummary {
    pub fn new(as_of: NaiveDate, borrowers: usize) -> Self {
        Self {
            as_of,
            borrowers,
            loans: StatusCounts::default(),
            issued_by_currency: BTreeMap::new(),
            outstanding_by_currency: BTreeMap::new(),
            overdue_by_currency: BTreeMap::new(),
            collected_by_currency: BTreeMap::new(),
            overdue_installments: 0,
            loans_with_overdue: 0,
        }
    }

    /// add one loan, with its schedule refreshed for `as_of`
    pub fn add_loan(&mut self, loan: &Loan, schedule: &[Payment]) {
        self.loans.record(loan.status());

        let currency = loan.terms.currency;
        if matches!(loan.status(), LoanStatus::Approved | LoanStatus::Paid) {
            *self.issued_by_currency.entry(currency).or_default() += loan.terms.principal;
            *self.collected_by_currency.entry(currency).or_default() += loan.total_paid();
        }

        if loan.status() != LoanStatus::Approved {
            return;
        }

        let progress = ScheduleProgress::from_payments(schedule);
        *self.outstanding_by_currency.entry(currency).or_default() += progress.principal_outstanding;

        if progress.overdue_installments > 0 {
            *self.overdue_by_currency.entry(currency).or_default() += progress.amount_overdue;
            self.overdue_installments += progress.overdue_installments;
            self.loans_with_overdue += 1;
        }
    }

    /// round every amount to cents
    pub fn finish(mut self) -> Self {
        for map in [
            &mut self.issued_by_currency,
            &mut self.outstanding_by_currency,
            &mut self.overdue_by_currency,
            &mut self.collected_by_currency,
        ] {
            for amount in map.values_mut() {
                *amount = amount.to_cents();
            }
        }
        self
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
