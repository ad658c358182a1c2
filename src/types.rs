use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a borrower
pub type BorrowerId = Uuid;

/// currencies the lender issues loans in; parsed leniently, written as the upper-case code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "UZS")]
    Uzs,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Uzs => "UZS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "UZS" => Ok(Currency::Uzs),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// application received, no schedule yet
    Pending,
    /// approved, schedule generated
    Approved,
    /// application declined
    Rejected,
    /// every installment paid
    Paid,
}

impl LoanStatus {
    /// transitions that may be requested directly.
    /// `Approved -> Paid` is only reached through installment payments.
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Pending, LoanStatus::Approved) | (LoanStatus::Pending, LoanStatus::Rejected)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Paid)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Upcoming,
    Overdue,
}

/// how a principal prepayment reshapes the unpaid part of the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PrepaymentStrategy {
    /// keep the remaining months, lower the installment
    #[default]
    ReduceEmi,
    /// keep the installment, finish earlier
    ReduceTerm,
}
