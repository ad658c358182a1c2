use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::application::LoanTerms;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::payments::{AmortizationSchedule, Payment, PrepaymentHandler, PrepaymentResult};
use crate::state::LoanState;
use crate::types::{BorrowerId, LoanId, LoanStatus, PaymentStatus, PrepaymentStrategy};

/// a loan and its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub terms: LoanTerms,
    pub notes: Option<String>,
    pub state: LoanState,
    #[serde(skip)]
    pub events: EventStore,
}

impl Loan {
    /// new loan in `Pending`, without a schedule
    pub fn create(
        borrower_id: BorrowerId,
        terms: LoanTerms,
        notes: Option<String>,
        time: &SafeTimeProvider,
    ) -> Self {
        let now = time.now();
        let mut loan = Self {
            id: Uuid::new_v4(),
            borrower_id,
            terms,
            notes,
            state: LoanState::new(now),
            events: EventStore::new(),
        };

        loan.events.emit(Event::LoanCreated {
            loan_id: loan.id,
            borrower_id,
            principal: loan.terms.principal,
            currency: loan.terms.currency,
            term_months: loan.terms.term_months,
            timestamp: now,
        });

        loan
    }

    pub fn status(&self) -> LoanStatus {
        self.state.status
    }

    /// `Pending -> Approved`; the schedule is generated if there is none yet
    pub fn approve(&mut self, time: &SafeTimeProvider) -> Result<()> {
        self.ensure_transition(LoanStatus::Approved)?;
        let now = time.now();

        if !self.state.has_schedule() {
            let payments = self.terms.schedule(now.date_naive());
            let summary = AmortizationSchedule::from_payments(
                self.terms.principal,
                self.terms.annual_rate,
                self.terms.term_months,
                self.terms.origination_date,
                payments,
            );

            self.events.emit(Event::ScheduleGenerated {
                loan_id: self.id,
                installments: summary.payments.len() as u32,
                monthly_payment: summary.monthly_payment,
                total_interest: summary.total_interest,
                timestamp: now,
            });
            self.state.payments = Some(summary.payments);
        }

        self.change_status(LoanStatus::Approved, "approved by lender", time);
        self.events.emit(Event::LoanApproved {
            loan_id: self.id,
            timestamp: now,
        });

        Ok(())
    }

    /// `Pending -> Rejected`
    pub fn reject(&mut self, reason: Option<String>, time: &SafeTimeProvider) -> Result<()> {
        self.ensure_transition(LoanStatus::Rejected)?;

        self.state.rejection_reason = reason.clone();
        self.change_status(LoanStatus::Rejected, "rejected by lender", time);
        self.events.emit(Event::LoanRejected {
            loan_id: self.id,
            reason,
            timestamp: time.now(),
        });

        Ok(())
    }

    /// Replace the loan's terms. An approved loan gets a fresh schedule and
    /// loses any paid marks and prepayments; other statuses keep whatever
    /// schedule they have. Paid loans are closed and refuse edits.
    pub fn edit_terms(&mut self, terms: LoanTerms, time: &SafeTimeProvider) -> Result<()> {
        if self.state.status == LoanStatus::Paid {
            return Err(LoanError::LoanNotEditable {
                status: self.state.status,
            });
        }

        let now = time.now();
        let old = std::mem::replace(&mut self.terms, terms);

        self.events.emit(Event::TermsEdited {
            loan_id: self.id,
            old_principal: old.principal,
            new_principal: self.terms.principal,
            old_rate: old.annual_rate,
            new_rate: self.terms.annual_rate,
            old_term_months: old.term_months,
            new_term_months: self.terms.term_months,
            old_origination_date: old.origination_date,
            new_origination_date: self.terms.origination_date,
            timestamp: now,
        });

        if self.state.status == LoanStatus::Approved {
            let discarded_paid = self.state.progress().paid_installments;
            let payments = self.terms.schedule(now.date_naive());

            debug!(
                loan_id = %self.id,
                discarded_paid,
                installments = payments.len(),
                "regenerating schedule after term edit"
            );

            self.events.emit(Event::ScheduleRegenerated {
                loan_id: self.id,
                installments: payments.len() as u32,
                monthly_payment: payments.first().map(|p| p.monthly_payment).unwrap_or(Money::ZERO),
                discarded_paid,
                timestamp: now,
            });
            self.state.payments = Some(payments);
            self.state.prepaid_principal = Money::ZERO;
        }

        self.state.touch(now);
        Ok(())
    }

    /// Mark installment `month` as paid. When it was the last unpaid one on
    /// an approved loan, the loan moves to `Paid`.
    pub fn mark_payment_paid(&mut self, month: u32, time: &SafeTimeProvider) -> Result<()> {
        let now = time.now();
        let payment = self.state.payment_mut(month)?;

        if payment.is_paid() {
            return Ok(());
        }

        payment.status = PaymentStatus::Paid;
        payment.paid_at = Some(now);
        let (amount, due_date) = (payment.monthly_payment, payment.due_date);

        self.events.emit(Event::InstallmentPaid {
            loan_id: self.id,
            month,
            amount,
            due_date,
            timestamp: now,
        });
        self.state.touch(now);

        if self.state.status == LoanStatus::Approved && self.state.all_paid() {
            self.change_status(LoanStatus::Paid, "all installments paid", time);
            self.events.emit(Event::LoanPaidOff {
                loan_id: self.id,
                total_paid: self.total_paid(),
                timestamp: now,
            });
        }

        Ok(())
    }

    /// Pay down principal ahead of schedule and rebuild the unpaid installments.
    pub fn apply_prepayment(
        &mut self,
        amount: Money,
        strategy: PrepaymentStrategy,
        time: &SafeTimeProvider,
    ) -> Result<PrepaymentResult> {
        if self.state.status != LoanStatus::Approved {
            return Err(LoanError::LoanNotActive {
                status: self.state.status,
            });
        }

        let now = time.now();
        let handler = PrepaymentHandler::new(self.id, strategy);
        let payments = self.state.payments_mut()?;
        let result = handler.apply(
            amount,
            payments,
            self.terms.annual_rate,
            self.terms.origination_date,
            now,
            &mut self.events,
        )?;

        self.state.prepaid_principal += amount;
        self.state.touch(now);
        Ok(result)
    }

    /// schedule with overdue/upcoming recomputed for `time`
    pub fn schedule(&self, time: &SafeTimeProvider) -> Vec<Payment> {
        let today = time.now().date_naive();
        let mut payments = self.state.payments().to_vec();
        for payment in payments.iter_mut() {
            payment.refresh_status(today);
        }
        payments
    }

    /// persist overdue/upcoming for `time` on the stored schedule
    pub fn refresh_statuses(&mut self, time: &SafeTimeProvider) {
        self.state.refresh(time.now().date_naive());
    }

    pub fn monthly_payment(&self) -> Money {
        self.state
            .payments()
            .iter()
            .find(|p| !p.is_paid())
            .or(self.state.payments().first())
            .map(|p| p.monthly_payment)
            .unwrap_or_else(|| self.terms.monthly_payment())
    }

    pub fn total_paid(&self) -> Money {
        self.state.payments().iter().filter(|p| p.is_paid()).map(|p| p.monthly_payment).sum::<Money>()
            + self.state.prepaid_principal
    }

    /// principal still owed on the schedule; zero without one
    pub fn outstanding_principal(&self) -> Money {
        self.state.progress().principal_outstanding
    }

    /// earliest unpaid installment
    pub fn next_due(&self) -> Option<&Payment> {
        self.state.payments().iter().find(|p| !p.is_paid())
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn ensure_transition(&self, to: LoanStatus) -> Result<()> {
        if self.state.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(LoanError::InvalidTransition {
                from: self.state.status,
                to,
            })
        }
    }

    fn change_status(&mut self, new_status: LoanStatus, reason: &str, time: &SafeTimeProvider) {
        let now = time.now();
        let old_status = self.state.status;
        self.state.update_status(new_status, now);

        debug!(loan_id = %self.id, ?old_status, ?new_status, reason, "loan status changed");

        self.events.emit(Event::StatusChanged {
            loan_id: self.id,
            old_status,
            new_status,
            reason: reason.to_string(),
            timestamp: now,
        });
    }
}
