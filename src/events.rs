use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{BorrowerId, Currency, LoanId, LoanStatus, PrepaymentStrategy};

/// all events emitted by loans and the loan book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanCreated {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        principal: Money,
        currency: Currency,
        term_months: u32,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
    LoanPaidOff {
        loan_id: LoanId,
        total_paid: Money,
        timestamp: DateTime<Utc>,
    },
    LoanDeleted {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
    TermsEdited {
        loan_id: LoanId,
        old_principal: Money,
        new_principal: Money,
        old_rate: Rate,
        new_rate: Rate,
        old_term_months: u32,
        new_term_months: u32,
        old_origination_date: NaiveDate,
        new_origination_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    // schedule events
    ScheduleGenerated {
        loan_id: LoanId,
        installments: u32,
        monthly_payment: Money,
        total_interest: Money,
        timestamp: DateTime<Utc>,
    },
    ScheduleRegenerated {
        loan_id: LoanId,
        installments: u32,
        monthly_payment: Money,
        discarded_paid: u32,
        timestamp: DateTime<Utc>,
    },

    // payment events
    InstallmentPaid {
        loan_id: LoanId,
        month: u32,
        amount: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    PrepaymentApplied {
        loan_id: LoanId,
        amount: Money,
        strategy: PrepaymentStrategy,
        new_balance: Money,
        new_installment: Money,
        remaining_months: u32,
        timestamp: DateTime<Utc>,
    },

    // borrower events
    BorrowerRegistered {
        borrower_id: BorrowerId,
        full_name: String,
        timestamp: DateTime<Utc>,
    },
    BorrowerRemoved {
        borrower_id: BorrowerId,
        timestamp: DateTime<Utc>,
    },

    // status change events
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// loan the event belongs to, if any
    pub fn loan_id(&self) -> Option<LoanId> {
        match self {
            Event::LoanCreated { loan_id, .. }
            | Event::LoanApproved { loan_id, .. }
            | Event::LoanRejected { loan_id, .. }
            | Event::LoanPaidOff { loan_id, .. }
            | Event::LoanDeleted { loan_id, .. }
            | Event::TermsEdited { loan_id, .. }
            | Event::ScheduleGenerated { loan_id, .. }
            | Event::ScheduleRegenerated { loan_id, .. }
            | Event::InstallmentPaid { loan_id, .. }
            | Event::PrepaymentApplied { loan_id, .. }
            | Event::StatusChanged { loan_id, .. } => Some(*loan_id),
            Event::BorrowerRegistered { .. } | Event::BorrowerRemoved { .. } => None,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn extend(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
