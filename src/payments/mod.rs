pub mod amortization;
pub mod prepayment;

pub use amortization::{
    add_months, generate_schedule, monthly_payment, refresh_statuses, AmortizationSchedule,
    Payment,
};
pub use prepayment::{PrepaymentHandler, PrepaymentResult};

use crate::decimal::Money;
use crate::types::PaymentStatus;

/// figures derived from a schedule's paid/unpaid split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleProgress {
    pub paid_installments: u32,
    pub overdue_installments: u32,
    pub total_installments: u32,
    pub amount_paid: Money,
    pub amount_overdue: Money,
    pub principal_outstanding: Money,
}

impl ScheduleProgress {
    /// tally a schedule; statuses are taken as they are, refresh them first
    pub fn from_payments(payments: &[Payment]) -> Self {
        let mut progress = ScheduleProgress {
            total_installments: payments.len() as u32,
            ..Default::default()
        };

        for payment in payments {
            match payment.status {
                PaymentStatus::Paid => {
                    progress.paid_installments += 1;
                    progress.amount_paid += payment.monthly_payment;
                }
                PaymentStatus::Overdue => {
                    progress.overdue_installments += 1;
                    progress.amount_overdue += payment.monthly_payment;
                    progress.principal_outstanding += payment.principal_payment;
                }
                PaymentStatus::Upcoming => {
                    progress.principal_outstanding += payment.principal_payment;
                }
            }
        }

        progress.principal_outstanding = progress.principal_outstanding.max(Money::ZERO);
        progress
    }

    pub fn is_complete(&self) -> bool {
        self.total_installments > 0 && self.paid_installments == self.total_installments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use chrono::NaiveDate;

    #[test]
    fn test_progress_tally() {
        let origination = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let mut schedule = generate_schedule(Money::from_major(1_000), Rate::ZERO, 4, origination, today);
        schedule[0].status = PaymentStatus::Paid;

        let progress = ScheduleProgress::from_payments(&schedule);
        assert_eq!(progress.total_installments, 4);
        assert_eq!(progress.paid_installments, 1);
        // march 10 is past, april and may are not
        assert_eq!(progress.overdue_installments, 1);
        assert_eq!(progress.amount_paid, Money::from_major(250));
        assert_eq!(progress.amount_overdue, Money::from_major(250));
        assert_eq!(progress.principal_outstanding, Money::from_major(750));
        assert!(!progress.is_complete());

        for p in schedule.iter_mut() {
            p.status = PaymentStatus::Paid;
        }
        assert!(ScheduleProgress::from_payments(&schedule).is_complete());
    }

    #[test]
    fn test_empty_schedule_is_not_complete() {
        assert!(!ScheduleProgress::from_payments(&[]).is_complete());
    }
}
