use hourglass_rs::{SafeTimeProvider, TimeSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::application::{LoanApplication, TermsUpdate};
use crate::borrower::{Borrower, BorrowerProfile};
use crate::config::LenderConfig;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::loan::Loan;
use crate::notifications::{Notification, Notifier, RenderContext};
use crate::payments::{AmortizationSchedule, PrepaymentResult};
use crate::serialization::{DashboardSummary, LoanView, LookupView};
use crate::types::{BorrowerId, LoanId, LoanStatus, PrepaymentStrategy};

/// selection for `LoanBook::loans`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub borrower_id: Option<BorrowerId>,
}

impl LoanFilter {
    pub fn status(status: LoanStatus) -> Self {
        Self {
            status: Some(status),
            borrower_id: None,
        }
    }

    pub fn borrower(borrower_id: BorrowerId) -> Self {
        Self {
            status: None,
            borrower_id: Some(borrower_id),
        }
    }

    fn matches(&self, loan: &Loan) -> bool {
        self.status.map_or(true, |s| loan.status() == s)
            && self.borrower_id.map_or(true, |b| loan.borrower_id == b)
    }
}

/// persisted form of a loan book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub borrowers: Vec<Borrower>,
    pub loans: Vec<Loan>,
}

/// The lender's borrowers and loans.
///
/// Built once at startup from a `LenderConfig` and a time provider and
/// passed to whatever handles requests. Every mutating operation collects
/// the affected loan's events into the book's own store and hands
/// renderable ones to the registered notifiers.
pub struct LoanBook {
    config: LenderConfig,
    time: SafeTimeProvider,
    borrowers: HashMap<BorrowerId, Borrower>,
    loans: HashMap<LoanId, Loan>,
    events: EventStore,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl LoanBook {
    pub fn new(config: LenderConfig, time: SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            time,
            borrowers: HashMap::new(),
            loans: HashMap::new(),
            events: EventStore::new(),
            notifiers: Vec::new(),
        })
    }

    /// time source from `TIME_SOURCE` / `TIME_START`
    pub fn from_env(config: LenderConfig) -> Result<Self> {
        Self::new(config, SafeTimeProvider::new(TimeSource::from_env()))
    }

    pub fn config(&self) -> &LenderConfig {
        &self.config
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn add_notifier(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    // borrowers

    #[instrument(name = "loan_book.register_borrower", skip(self, profile), err)]
    pub fn register_borrower(&mut self, profile: BorrowerProfile) -> Result<BorrowerId> {
        let now = self.time.now();
        let borrower = Borrower::register(profile, now)?;
        let id = borrower.id;

        self.dispatch(vec![Event::BorrowerRegistered {
            borrower_id: id,
            full_name: borrower.full_name.clone(),
            timestamp: now,
        }]);
        self.borrowers.insert(id, borrower);

        info!(borrower_id = %id, "borrower registered");
        Ok(id)
    }

    #[instrument(name = "loan_book.update_borrower", skip(self, profile), err)]
    pub fn update_borrower(&mut self, id: BorrowerId, profile: BorrowerProfile) -> Result<()> {
        self.borrowers
            .get_mut(&id)
            .ok_or(LoanError::BorrowerNotFound { id })?
            .update(profile)
    }

    #[instrument(name = "loan_book.remove_borrower", skip(self), err)]
    pub fn remove_borrower(&mut self, id: BorrowerId) -> Result<()> {
        if !self.borrowers.contains_key(&id) {
            return Err(LoanError::BorrowerNotFound { id });
        }

        let loans = self.loans.values().filter(|l| l.borrower_id == id).count();
        if loans > 0 {
            return Err(LoanError::BorrowerHasLoans { id, loans });
        }

        self.borrowers.remove(&id);
        self.dispatch(vec![Event::BorrowerRemoved {
            borrower_id: id,
            timestamp: self.time.now(),
        }]);
        Ok(())
    }

    pub fn borrower(&self, id: BorrowerId) -> Option<&Borrower> {
        self.borrowers.get(&id)
    }

    /// all borrowers, by name
    pub fn borrowers(&self) -> Vec<&Borrower> {
        let mut borrowers: Vec<&Borrower> = self.borrowers.values().collect();
        borrowers.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        borrowers
    }

    // loans

    /// schedule an application would get, without recording anything
    pub fn preview(&self, application: &LoanApplication) -> Result<AmortizationSchedule> {
        let terms = application.to_terms(&self.config)?;
        Ok(AmortizationSchedule::generate(
            terms.principal,
            terms.annual_rate,
            terms.term_months,
            terms.origination_date,
            self.time.now().date_naive(),
        ))
    }

    #[instrument(name = "loan_book.create_loan", skip(self), err)]
    pub fn create_loan(&mut self, application: LoanApplication) -> Result<LoanId> {
        let borrower_id = application.borrower_id;
        if !self.borrowers.contains_key(&borrower_id) {
            return Err(LoanError::BorrowerNotFound { id: borrower_id });
        }

        let terms = application.to_terms(&self.config)?;
        let notes = application
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let loan = Loan::create(borrower_id, terms, notes, &self.time);
        let id = loan.id;
        self.loans.insert(id, loan);
        self.collect(id);

        info!(loan_id = %id, %borrower_id, "loan application recorded");
        Ok(id)
    }

    #[instrument(name = "loan_book.approve", skip(self), err)]
    pub fn approve_loan(&mut self, id: LoanId) -> Result<()> {
        self.loans
            .get_mut(&id)
            .ok_or(LoanError::LoanNotFound { id })?
            .approve(&self.time)?;
        self.collect(id);
        Ok(())
    }

    #[instrument(name = "loan_book.reject", skip(self), err)]
    pub fn reject_loan(&mut self, id: LoanId, reason: Option<String>) -> Result<()> {
        self.loans
            .get_mut(&id)
            .ok_or(LoanError::LoanNotFound { id })?
            .reject(reason, &self.time)?;
        self.collect(id);
        Ok(())
    }

    /// Apply a terms edit. An empty update changes nothing.
    #[instrument(name = "loan_book.edit_terms", skip(self), err)]
    pub fn edit_loan_terms(&mut self, id: LoanId, update: &TermsUpdate) -> Result<()> {
        let loan = self.loans.get_mut(&id).ok_or(LoanError::LoanNotFound { id })?;
        if update.is_empty() {
            return Ok(());
        }

        let terms = update.apply_to(&loan.terms, &self.config.limits)?;
        loan.edit_terms(terms, &self.time)?;
        self.collect(id);
        Ok(())
    }

    #[instrument(name = "loan_book.mark_payment_paid", skip(self), err)]
    pub fn mark_payment_paid(&mut self, id: LoanId, month: u32) -> Result<LoanStatus> {
        let loan = self.loans.get_mut(&id).ok_or(LoanError::LoanNotFound { id })?;
        loan.mark_payment_paid(month, &self.time)?;
        let status = loan.status();
        self.collect(id);
        Ok(status)
    }

    /// Principal prepayment; `strategy` falls back to the configured default.
    #[instrument(name = "loan_book.prepay", skip(self), err)]
    pub fn prepay(
        &mut self,
        id: LoanId,
        amount: Decimal,
        strategy: Option<PrepaymentStrategy>,
    ) -> Result<PrepaymentResult> {
        let strategy = strategy.unwrap_or(self.config.prepayment_strategy);
        let loan = self.loans.get_mut(&id).ok_or(LoanError::LoanNotFound { id })?;
        let result = loan.apply_prepayment(Money::from_decimal(amount), strategy, &self.time)?;
        self.collect(id);
        Ok(result)
    }

    #[instrument(name = "loan_book.delete_loan", skip(self), err)]
    pub fn delete_loan(&mut self, id: LoanId) -> Result<()> {
        let loan = self.loans.get(&id).ok_or(LoanError::LoanNotFound { id })?;
        if loan.status() == LoanStatus::Approved {
            return Err(LoanError::LoanStillActive { id });
        }

        self.loans.remove(&id);
        self.dispatch(vec![Event::LoanDeleted {
            loan_id: id,
            timestamp: self.time.now(),
        }]);
        Ok(())
    }

    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.get(&id)
    }

    /// matching loans, newest first
    pub fn loans(&self, filter: LoanFilter) -> Vec<&Loan> {
        let mut loans: Vec<&Loan> = self.loans.values().filter(|l| filter.matches(l)).collect();
        loans.sort_by(|a, b| {
            b.state
                .created_at
                .cmp(&a.state.created_at)
                .then(a.id.cmp(&b.id))
        });
        loans
    }

    /// dashboard detail with overdue flags as of now
    pub fn loan_view(&self, id: LoanId) -> Result<LoanView> {
        let loan = self.loans.get(&id).ok_or(LoanError::LoanNotFound { id })?;
        let schedule = loan.schedule(&self.time);
        Ok(LoanView::from_loan(loan, self.borrowers.get(&loan.borrower_id), &schedule))
    }

    /// Customer-facing lookup. A phone that does not belong to the loan's
    /// borrower is reported exactly like an unknown loan.
    #[instrument(name = "loan_book.lookup", skip(self, phone), err)]
    pub fn lookup(&self, id: LoanId, phone: &str) -> Result<LookupView> {
        let not_found = || LoanError::LoanNotFound { id };

        let loan = self.loans.get(&id).ok_or_else(not_found)?;
        let borrower = self
            .borrowers
            .get(&loan.borrower_id)
            .filter(|b| b.phone_matches(phone))
            .ok_or_else(not_found)?;

        let schedule = loan.schedule(&self.time);
        Ok(LookupView::from_loan(loan, borrower, &schedule))
    }

    pub fn dashboard(&self) -> DashboardSummary {
        let mut summary = DashboardSummary::new(self.time.now().date_naive(), self.borrowers.len());
        for loan in self.loans.values() {
            summary.add_loan(loan, &loan.schedule(&self.time));
        }
        summary.finish()
    }

    /// persist overdue/upcoming on every stored schedule; returns the number
    /// of overdue installments
    pub fn refresh_overdue(&mut self) -> u32 {
        let mut overdue = 0;
        for loan in self.loans.values_mut() {
            loan.refresh_statuses(&self.time);
            overdue += loan.state.progress().overdue_installments;
        }
        overdue
    }

    // persistence

    pub fn snapshot(&self) -> BookSnapshot {
        let mut borrowers: Vec<Borrower> = self.borrowers.values().cloned().collect();
        borrowers.sort_by_key(|b| (b.created_at, b.id));
        let mut loans: Vec<Loan> = self.loans.values().cloned().collect();
        loans.sort_by_key(|l| (l.state.created_at, l.id));
        BookSnapshot { borrowers, loans }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// rebuild a book from a snapshot; every loan must reference a known borrower
    pub fn restore(config: LenderConfig, time: SafeTimeProvider, snapshot: BookSnapshot) -> Result<Self> {
        let mut book = Self::new(config, time)?;
        book.borrowers = snapshot
            .borrowers
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        for loan in snapshot.loans {
            if !book.borrowers.contains_key(&loan.borrower_id) {
                return Err(LoanError::BorrowerNotFound { id: loan.borrower_id });
            }
            book.loans.insert(loan.id, loan);
        }

        info!(
            borrowers = book.borrowers.len(),
            loans = book.loans.len(),
            "loan book restored"
        );
        Ok(book)
    }

    pub fn from_json(config: LenderConfig, time: SafeTimeProvider, json: &str) -> Result<Self> {
        let snapshot: BookSnapshot = serde_json::from_str(json)?;
        Self::restore(config, time, snapshot)
    }

    /// move a loan's pending events into the book
    fn collect(&mut self, id: LoanId) {
        let events = self
            .loans
            .get_mut(&id)
            .map(Loan::take_events)
            .unwrap_or_default();
        self.dispatch(events);
    }

    fn dispatch(&mut self, events: Vec<Event>) {
        if self.config.notifications.enabled && !self.notifiers.is_empty() {
            for event in &events {
                let loan = event.loan_id().and_then(|id| self.loans.get(&id));
                let ctx = RenderContext {
                    borrower_name: loan
                        .and_then(|l| self.borrowers.get(&l.borrower_id))
                        .map(|b| b.full_name.as_str()),
                    currency: loan.map(|l| l.terms.currency),
                };

                let Some(notification) = Notification::render(event, ctx, &self.config.notifications) else {
                    continue;
                };

                for notifier in &self.notifiers {
                    if let Err(e) = notifier.send(&notification) {
                        warn!(error = %e, subject = %notification.subject, "notification not delivered");
                    }
                }
            }
        }

        self.events.extend(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MemoryNotifier;
    use crate::types::{Currency, PaymentStatus};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send(&self, _notification: &Notification) -> Result<()> {
            Err(LoanError::Notification {
                message: "chat unreachable".to_string(),
            })
        }
    }

    fn test_book() -> LoanBook {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ));
        LoanBook::new(LenderConfig::new("Baraka Credit", Currency::Uzs), time).unwrap()
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn borrower(book: &mut LoanBook, name: &str, phone: &str) -> BorrowerId {
        book.register_borrower(BorrowerProfile::new(name, phone)).unwrap()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut book = test_book();
        let notifier = MemoryNotifier::new();
        book.add_notifier(Box::new(notifier.clone()));

        let b = borrower(&mut book, "Dilnoza Karimova", "+998 90 123 45 67");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(3000), dec!(24), 3, start()).with_currency(Currency::Usd))
            .unwrap();
        assert_eq!(book.loan(id).unwrap().status(), LoanStatus::Pending);

        book.approve_loan(id).unwrap();
        assert_eq!(book.mark_payment_paid(id, 1).unwrap(), LoanStatus::Approved);
        assert_eq!(book.mark_payment_paid(id, 2).unwrap(), LoanStatus::Approved);
        assert_eq!(book.mark_payment_paid(id, 3).unwrap(), LoanStatus::Paid);

        let subjects: Vec<String> = notifier.sent().into_iter().map(|n| n.subject).collect();
        assert_eq!(
            subjects,
            vec![
                "New loan application",
                "Loan approved",
                "Installment 1 paid",
                "Installment 2 paid",
                "Installment 3 paid",
                "Loan fully repaid",
            ]
        );
        assert!(notifier.sent()[1].body.contains("Dilnoza Karimova"));

        // loan events have been moved into the book
        assert!(book.loan(id).unwrap().events.events().is_empty());
        assert!(book.events().iter().any(|e| matches!(e, Event::LoanPaidOff { .. })));
    }

    #[test]
    fn test_unknown_ids() {
        let mut book = test_book();
        let missing = uuid::Uuid::new_v4();

        assert!(matches!(book.approve_loan(missing), Err(LoanError::LoanNotFound { .. })));
        assert!(matches!(
            book.create_loan(LoanApplication::new(missing, dec!(100), dec!(10), 3, start())),
            Err(LoanError::BorrowerNotFound { .. })
        ));
        assert!(matches!(book.remove_borrower(missing), Err(LoanError::BorrowerNotFound { .. })));
    }

    #[test]
    fn test_mark_paid_errors_surface() {
        let mut book = test_book();
        let b = borrower(&mut book, "Aziz", "901234567");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()))
            .unwrap();

        assert!(matches!(book.mark_payment_paid(id, 1), Err(LoanError::ScheduleMissing)));
        book.approve_loan(id).unwrap();
        assert!(matches!(
            book.mark_payment_paid(id, 9),
            Err(LoanError::PaymentNotFound { month: 9 })
        ));
    }

    #[test]
    fn test_edit_terms_through_book() {
        let mut book = test_book();
        let b = borrower(&mut book, "Aziz", "901234567");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()))
            .unwrap();
        book.approve_loan(id).unwrap();
        book.mark_payment_paid(id, 1).unwrap();

        // empty update is not an edit
        book.edit_loan_terms(id, &TermsUpdate::default()).unwrap();
        assert!(book.loan(id).unwrap().state.payments()[0].is_paid());

        let update = TermsUpdate {
            term_months: Some(12),
            ..Default::default()
        };
        book.edit_loan_terms(id, &update).unwrap();
        let loan = book.loan(id).unwrap();
        assert_eq!(loan.state.payments().len(), 12);
        assert!(loan.state.payments().iter().all(|p| !p.is_paid()));

        let invalid = TermsUpdate {
            annual_rate_percent: Some(dec!(-2)),
            ..Default::default()
        };
        assert!(matches!(
            book.edit_loan_terms(id, &invalid),
            Err(LoanError::Validation { field: "annual_rate_percent", .. })
        ));
    }

    #[test]
    fn test_prepay_uses_configured_strategy() {
        let mut book = test_book();
        book.config.prepayment_strategy = PrepaymentStrategy::ReduceTerm;
        let b = borrower(&mut book, "Aziz", "901234567");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(12000), dec!(12), 24, start()))
            .unwrap();
        book.approve_loan(id).unwrap();

        let result = book.prepay(id, dec!(6000), None).unwrap();
        assert_eq!(result.strategy, PrepaymentStrategy::ReduceTerm);
        assert!(result.new_remaining_months < 24);

        let result = book.prepay(id, dec!(100), Some(PrepaymentStrategy::ReduceEmi)).unwrap();
        assert_eq!(result.strategy, PrepaymentStrategy::ReduceEmi);
    }

    #[test]
    fn test_lookup_requires_matching_phone() {
        let mut book = test_book();
        let b = borrower(&mut book, "Dilnoza Karimova", "+998 90 123 45 67");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(3000), dec!(24), 3, start()))
            .unwrap();
        book.approve_loan(id).unwrap();

        let view = book.lookup(id, "998-90-123-45-67").unwrap();
        assert_eq!(view.borrower_name, "Dilnoza Karimova");
        assert_eq!(view.schedule.len(), 3);
        assert_eq!(view.balance.total_installments, 3);

        assert!(matches!(book.lookup(id, "+998 90 000 00 00"), Err(LoanError::LoanNotFound { .. })));
        assert!(matches!(
            book.lookup(uuid::Uuid::new_v4(), "+998901234567"),
            Err(LoanError::LoanNotFound { .. })
        ));
    }

    #[test]
    fn test_dashboard_and_overdue() {
        let mut book = test_book();
        let control = book.time().test_control().unwrap();
        let a = borrower(&mut book, "Aziz", "901234567");
        let d = borrower(&mut book, "Dilnoza", "907654321");

        let approved = book
            .create_loan(LoanApplication::new(a, dec!(1200), dec!(0), 6, start()))
            .unwrap();
        book.approve_loan(approved).unwrap();
        let rejected = book
            .create_loan(LoanApplication::new(d, dec!(500), dec!(10), 6, start()))
            .unwrap();
        book.reject_loan(rejected, Some("incomplete documents".to_string())).unwrap();
        book.create_loan(
            LoanApplication::new(d, dec!(700), dec!(10), 6, start()).with_currency(Currency::Usd),
        )
        .unwrap();

        // two installments fall due, one gets paid
        control.advance(Duration::days(65));
        book.mark_payment_paid(approved, 1).unwrap();

        let summary = book.dashboard();
        assert_eq!(summary.borrowers, 2);
        assert_eq!(summary.loans.total(), 3);
        assert_eq!(summary.loans.approved, 1);
        assert_eq!(summary.loans.rejected, 1);
        assert_eq!(summary.loans.pending, 1);
        assert_eq!(summary.overdue_installments, 1);
        assert_eq!(summary.loans_with_overdue, 1);
        assert_eq!(summary.issued_by_currency.get(&Currency::Uzs), Some(&Money::from_major(1_200)));
        assert_eq!(summary.outstanding_by_currency.get(&Currency::Uzs), Some(&Money::from_major(1_000)));
        assert_eq!(summary.overdue_by_currency.get(&Currency::Uzs), Some(&Money::from_major(200)));
        assert_eq!(summary.collected_by_currency.get(&Currency::Uzs), Some(&Money::from_major(200)));
        assert!(summary.issued_by_currency.get(&Currency::Usd).is_none());

        let view = book.loan_view(approved).unwrap();
        assert_eq!(view.schedule[1].status, PaymentStatus::Overdue);
        assert_eq!(view.balance.overdue_installments, 1);

        assert_eq!(book.refresh_overdue(), 1);
        assert_eq!(
            book.loan(approved).unwrap().state.payments()[1].status,
            PaymentStatus::Overdue
        );

        assert_eq!(book.loans(LoanFilter::status(LoanStatus::Pending)).len(), 1);
        assert_eq!(book.loans(LoanFilter::borrower(d)).len(), 2);
        assert_eq!(book.loans(LoanFilter::default()).len(), 3);
    }

    #[test]
    fn test_delete_and_remove_rules() {
        let mut book = test_book();
        let b = borrower(&mut book, "Aziz", "901234567");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()))
            .unwrap();
        book.approve_loan(id).unwrap();

        assert!(matches!(book.delete_loan(id), Err(LoanError::LoanStillActive { .. })));
        assert!(matches!(
            book.remove_borrower(b),
            Err(LoanError::BorrowerHasLoans { loans: 1, .. })
        ));

        let pending = book
            .create_loan(LoanApplication::new(b, dec!(300), dec!(12), 3, start()))
            .unwrap();
        book.delete_loan(pending).unwrap();
        assert!(book.loan(pending).is_none());
    }

    #[test]
    fn test_failing_notifier_does_not_fail_operation() {
        let mut book = test_book();
        book.add_notifier(Box::new(FailingNotifier));
        let b = borrower(&mut book, "Aziz", "901234567");

        let id = book
            .create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()))
            .unwrap();
        book.approve_loan(id).unwrap();
        assert_eq!(book.loan(id).unwrap().status(), LoanStatus::Approved);
    }

    #[test]
    fn test_disabled_notifications() {
        let mut book = test_book();
        book.config.notifications.enabled = false;
        let notifier = MemoryNotifier::new();
        book.add_notifier(Box::new(notifier.clone()));

        let b = borrower(&mut book, "Aziz", "901234567");
        book.create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()))
            .unwrap();

        assert!(notifier.sent().is_empty());
        assert!(!book.events().is_empty());
    }

    #[test]
    fn test_json_snapshot_round_trip() {
        let mut book = test_book();
        let b = borrower(&mut book, "Aziz", "901234567");
        let id = book
            .create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()).with_notes("bakery oven"))
            .unwrap();
        book.approve_loan(id).unwrap();
        book.mark_payment_paid(id, 1).unwrap();

        let json = book.to_json().unwrap();
        let restored = LoanBook::from_json(book.config().clone(), book.time().clone(), &json).unwrap();

        let loan = restored.loan(id).unwrap();
        assert_eq!(loan.status(), LoanStatus::Approved);
        assert_eq!(loan.notes.as_deref(), Some("bakery oven"));
        assert_eq!(loan.state.payments(), book.loan(id).unwrap().state.payments());
        assert_eq!(restored.borrower(b), book.borrower(b));
    }

    #[test]
    fn test_restore_rejects_orphan_loans() {
        let mut book = test_book();
        let b = borrower(&mut book, "Aziz", "901234567");
        book.create_loan(LoanApplication::new(b, dec!(1200), dec!(12), 6, start()))
            .unwrap();

        let mut snapshot = book.snapshot();
        snapshot.borrowers.clear();
        assert!(matches!(
            LoanBook::restore(book.config().clone(), book.time().clone(), snapshot),
            Err(LoanError::BorrowerNotFound { .. })
        ));
    }

    #[test]
    fn test_book_can_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<LoanBook>();

        let mut book = test_book();
        book.add_notifier(Box::new(MemoryNotifier::new()));
        let registered = std::thread::spawn(move || {
            book.register_borrower(BorrowerProfile::new("Aziz", "901234567"))
                .map(|_| book.borrowers().len())
        })
        .join()
        .unwrap();
        assert_eq!(registered.unwrap(), 1);
    }

    #[test]
    fn test_preview_rejects_oversized_principal() {
        let mut book = test_book();
        let application = LoanApplication::new(
            uuid::Uuid::new_v4(),
            dec!(60000000000000000000000000000),
            dec!(100),
            12,
            start(),
        );

        assert!(matches!(
            book.preview(&application),
            Err(LoanError::Validation { field: "principal", .. })
        ));

        book.config.limits.max_principal = None;
        assert!(matches!(
            book.preview(&application),
            Err(LoanError::Validation { field: "principal", .. })
        ));
    }

    #[test]
    fn test_preview_does_not_record() {
        let book = test_book();
        let schedule = book
            .preview(&LoanApplication::new(uuid::Uuid::new_v4(), dec!(50000), dec!(5.5), 36, start()))
            .unwrap();

        assert_eq!(schedule.payments.len(), 36);
        assert_eq!(schedule.monthly_payment.to_cents(), Money::from_decimal(dec!(1509.80)));
        assert!(book.loans(LoanFilter::default()).is_empty());
    }
}
