use thiserror::Error;

use crate::decimal::Money;
use crate::types::{BorrowerId, LoanId, LoanStatus};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("payment not found: month {month} is not in the schedule")]
    PaymentNotFound {
        month: u32,
    },

    #[error("loan has no payment schedule")]
    ScheduleMissing,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("loan not active: current status is {status}")]
    LoanNotActive {
        status: LoanStatus,
    },

    #[error("loan terms cannot be edited in status {status}")]
    LoanNotEditable {
        status: LoanStatus,
    },

    #[error("invalid prepayment {amount}: outstanding balance is {outstanding}")]
    InvalidPrepayment {
        amount: Money,
        outstanding: Money,
    },

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("borrower not found: {id}")]
    BorrowerNotFound {
        id: BorrowerId,
    },

    #[error("borrower {id} still has {loans} loan(s)")]
    BorrowerHasLoans {
        id: BorrowerId,
        loans: usize,
    },

    #[error("loan {id} is approved and still running")]
    LoanStillActive {
        id: LoanId,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("notification failed: {message}")]
    Notification {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoanError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LoanError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
