use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::NotificationConfig;
use crate::errors::Result;
use crate::events::Event;
use crate::types::{Currency, LoanId};

/// short message for the lender's chat or mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub loan_id: Option<LoanId>,
    pub subject: String,
    pub body: String,
}

/// delivery channel; implemented outside this crate for real transports
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<()>;
}

/// details the rendered text needs that events do not carry
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub borrower_name: Option<&'a str>,
    pub currency: Option<Currency>,
}

impl Notification {
    /// text for events worth telling someone about; `None` for the rest
    pub fn render(event: &Event, ctx: RenderContext<'_>, config: &NotificationConfig) -> Option<Self> {
        let who = ctx.borrower_name.unwrap_or("borrower");
        let cur = ctx.currency.map(|c| format!(" {}", c)).unwrap_or_default();

        let (subject, body) = match event {
            Event::LoanCreated { principal, term_months, .. } => (
                "New loan application".to_string(),
                format!(
                    "{} applied for {}{} over {} months.",
                    who,
                    principal.to_cents(),
                    cur,
                    term_months
                ),
            ),
            Event::LoanApproved { .. } => (
                "Loan approved".to_string(),
                format!("The loan for {} was approved and the payment schedule is ready.", who),
            ),
            Event::LoanRejected { reason, .. } => (
                "Loan rejected".to_string(),
                match reason {
                    Some(reason) => format!("The loan for {} was rejected: {}.", who, reason),
                    None => format!("The loan for {} was rejected.", who),
                },
            ),
            Event::InstallmentPaid { month, amount, due_date, .. } => (
                format!("Installment {} paid", month),
                format!(
                    "{} paid installment {} ({}{}, due {}).",
                    who,
                    month,
                    amount.to_cents(),
                    cur,
                    due_date.format("%Y-%m-%d")
                ),
            ),
            Event::LoanPaidOff { total_paid, .. } => (
                "Loan fully repaid".to_string(),
                format!("{} has repaid the loan in full ({}{}).", who, total_paid.to_cents(), cur),
            ),
            Event::PrepaymentApplied {
                amount,
                new_installment,
                remaining_months,
                ..
            } => (
                "Principal prepayment".to_string(),
                format!(
                    "{} prepaid {}{}. New installment {}{} for {} months.",
                    who,
                    amount.to_cents(),
                    cur,
                    new_installment.to_cents(),
                    cur,
                    remaining_months
                ),
            ),
            _ => return None,
        };

        let body = match &config.signature {
            Some(signature) => format!("{}\n\n{}", body, signature),
            None => body,
        };

        Some(Self {
            loan_id: event.loan_id(),
            subject,
            body,
        })
    }
}

/// keeps every notification in memory; shares its buffer between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        // a plain vec has no invariant a panicking holder could break
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            borrower_name: Some("Dilnoza Karimova"),
            currency: Some(Currency::Usd),
        }
    }

    #[test]
    fn test_render_installment_paid() {
        let loan_id = Uuid::new_v4();
        let event = Event::InstallmentPaid {
            loan_id,
            month: 3,
            amount: Money::from_decimal(dec!(1509.79509022)),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            timestamp: Utc::now(),
        };

        let n = Notification::render(&event, ctx(), &NotificationConfig::default()).unwrap();
        assert_eq!(n.loan_id, Some(loan_id));
        assert_eq!(n.subject, "Installment 3 paid");
        assert_eq!(
            n.body,
            "Dilnoza Karimova paid installment 3 (1509.80 USD, due 2024-04-01)."
        );
    }

    #[test]
    fn test_signature_and_silent_events() {
        let config = NotificationConfig {
            enabled: true,
            signature: Some("-- Baraka Credit".to_string()),
        };
        let event = Event::LoanRejected {
            loan_id: Uuid::new_v4(),
            reason: None,
            timestamp: Utc::now(),
        };
        let n = Notification::render(&event, ctx(), &config).unwrap();
        assert!(n.body.ends_with("\n\n-- Baraka Credit"));

        let silent = Event::BorrowerRemoved {
            borrower_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert!(Notification::render(&silent, ctx(), &config).is_none());
    }

    #[test]
    fn test_memory_notifier_shares_buffer() {
        let notifier = MemoryNotifier::new();
        let handle = notifier.clone();

        notifier
            .send(&Notification {
                loan_id: None,
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .unwrap();

        assert_eq!(handle.sent().len(), 1);
    }

    #[test]
    fn test_memory_notifier_survives_poisoned_lock() {
        let notifier = MemoryNotifier::new();
        let message = Notification {
            loan_id: None,
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        notifier.send(&message).unwrap();

        let handle = notifier.clone();
        let poisoned = std::thread::spawn(move || {
            let _guard = handle.sent.lock().unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(poisoned.is_err());
        assert!(notifier.sent.is_poisoned());

        // reads and writes both see the same buffer
        assert_eq!(notifier.sent().len(), 1);
        notifier.send(&message).unwrap();
        assert_eq!(notifier.sent().len(), 2);
    }

    #[test]
    fn test_notifiers_can_cross_threads() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Notifier>();
        assert_send_sync::<MemoryNotifier>();
    }
}
