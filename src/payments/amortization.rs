use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::PaymentStatus;

/// one installment in a payment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub month: u32,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub monthly_payment: Money,
    pub principal_payment: Money,
    pub interest_payment: Money,
    pub remaining_balance: Money,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// balance before this installment was applied
    pub fn opening_balance(&self) -> Money {
        self.remaining_balance + self.principal_payment
    }

    /// recompute overdue/upcoming against `today`; paid entries are left alone
    pub fn refresh_status(&mut self, today: NaiveDate) {
        if !self.is_paid() {
            self.status = status_for(self.due_date, today);
        }
    }
}

/// amortization schedule with totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub origination_date: NaiveDate,
    pub monthly_payment: Money,
    pub payments: Vec<Payment>,
    pub total_interest: Money,
    pub total_payable: Money,
}

impl AmortizationSchedule {
    /// generate a full schedule; degenerate input gives an empty one
    pub fn generate(
        principal: Money,
        interest_rate: Rate,
        term_months: u32,
        origination_date: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        let payments = generate_schedule(principal, interest_rate, term_months, origination_date, today);
        Self::from_payments(principal, interest_rate, term_months, origination_date, payments)
    }

    /// wrap an existing list of installments
    pub fn from_payments(
        principal: Money,
        interest_rate: Rate,
        term_months: u32,
        origination_date: NaiveDate,
        payments: Vec<Payment>,
    ) -> Self {
        let total_interest = payments.iter().map(|p| p.interest_payment).sum();
        let total_payable = payments.iter().map(|p| p.monthly_payment).sum();
        let monthly_payment = payments
            .first()
            .map(|p| p.monthly_payment)
            .unwrap_or(Money::ZERO);

        Self {
            principal,
            interest_rate,
            term_months,
            origination_date,
            monthly_payment,
            payments,
            total_interest,
            total_payable,
        }
    }

    pub fn get_payment(&self, month: u32) -> Option<&Payment> {
        self.payments.iter().find(|p| p.month == month)
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

/// fixed monthly installment that amortizes `principal` over `term_months`.
///
/// Returns zero for a non-positive principal, a negative rate or a zero term
/// so that half-filled application forms can call this freely. Inputs whose
/// schedule totals would not fit in a `Decimal` are treated the same way.
pub fn monthly_payment(principal: Money, annual_rate: Rate, term_months: u32) -> Money {
    if !principal.is_positive() || annual_rate.is_negative() || term_months == 0 {
        return Money::ZERO;
    }

    let i = annual_rate.monthly_rate().as_decimal();
    let n = Decimal::from(term_months);
    let p = principal.as_decimal();

    // M = P * i / (1 - (1 + i)^-n)
    let annuity = Decimal::ONE - discount_factor(i, term_months);
    let payment = if annuity.is_zero() {
        // no compounding at this precision: straight-line
        p.checked_div(n)
    } else {
        p.checked_mul(i).and_then(|interest| interest.checked_div(annuity))
    };

    // every schedule total is bounded by n * M
    payment
        .filter(|m| m.checked_mul(n).is_some())
        .map(Money::from_decimal)
        .unwrap_or(Money::ZERO)
}

/// `(1 + i)^-k`; shrinks towards zero instead of overflowing for long terms
fn discount_factor(i: Decimal, k: u32) -> Decimal {
    let v = one_period_discount(i);
    (0..k).fold(Decimal::ONE, |acc, _| acc.checked_mul(v).unwrap_or(Decimal::ZERO))
}

fn one_period_discount(i: Decimal) -> Decimal {
    Decimal::ONE
        .checked_div(Decimal::ONE + i)
        .unwrap_or(Decimal::ONE)
}

/// full payment schedule for a fresh loan, months `1..=term_months`
pub fn generate_schedule(
    principal: Money,
    annual_rate: Rate,
    term_months: u32,
    origination_date: NaiveDate,
    today: NaiveDate,
) -> Vec<Payment> {
    let installment = monthly_payment(principal, annual_rate, term_months);
    if installment.is_zero() {
        return Vec::new();
    }

    build_installments(
        principal,
        annual_rate,
        installment,
        term_months,
        1,
        origination_date,
        today,
    )
}

/// schedule continuing an existing loan: `count` installments starting at
/// month `first_month`, amortizing `balance` to zero.
pub(crate) fn generate_tail(
    balance: Money,
    annual_rate: Rate,
    count: u32,
    first_month: u32,
    origination_date: NaiveDate,
    today: NaiveDate,
) -> Vec<Payment> {
    let installment = monthly_payment(balance, annual_rate, count);
    if installment.is_zero() {
        return Vec::new();
    }

    build_installments(
        balance,
        annual_rate,
        installment,
        count,
        first_month,
        origination_date,
        today,
    )
}

fn build_installments(
    opening_balance: Money,
    annual_rate: Rate,
    installment: Money,
    count: u32,
    first_month: u32,
    origination_date: NaiveDate,
    today: NaiveDate,
) -> Vec<Payment> {
    let monthly_rate = annual_rate.monthly_rate().as_decimal();
    let Some(closing) = closing_balances(opening_balance, monthly_rate, count) else {
        return Vec::new();
    };

    let mut payments = Vec::with_capacity(count as usize);
    let mut balance = opening_balance;

    for (month, remaining_balance) in (first_month..).zip(closing) {
        let interest_payment = balance.apply_rate(monthly_rate);
        let principal_payment = balance - remaining_balance;
        balance = remaining_balance;

        let due_date = add_months(origination_date, month);

        payments.push(Payment {
            month,
            due_date,
            status: status_for(due_date, today),
            monthly_payment: installment,
            principal_payment,
            interest_payment,
            remaining_balance,
            paid_at: None,
        });
    }

    payments
}

/// Balance left after each of `count` level installments,
/// `B_k = B_0 * (1 - v^(n-k)) / (1 - v^n)` with `v = 1 / (1 + i)`.
///
/// Taken from the closed form rather than by subtracting installments, so
/// rounding does not compound over long terms and the last balance is
/// exactly zero.
fn closing_balances(opening: Money, monthly_rate: Decimal, count: u32) -> Option<Vec<Money>> {
    if count == 0 {
        return None;
    }

    let v = one_period_discount(monthly_rate);

    // v^m for m = 0..=count
    let mut powers = Vec::with_capacity(count as usize + 1);
    let mut acc = Decimal::ONE;
    powers.push(acc);
    for _ in 0..count {
        acc = acc.checked_mul(v).unwrap_or(Decimal::ZERO);
        powers.push(acc);
    }

    let annuity = Decimal::ONE - powers[count as usize];
    let n = Decimal::from(count);

    (1..=count)
        .map(|k| {
            let share = if annuity.is_zero() {
                Decimal::from(count - k).checked_div(n)?
            } else {
                (Decimal::ONE - powers[(count - k) as usize]).checked_div(annuity)?
            };
            opening.as_decimal().checked_mul(share).map(Money::from_decimal)
        })
        .collect()
}

/// recompute overdue/upcoming on every unpaid installment
pub fn refresh_statuses(payments: &mut [Payment], today: NaiveDate) {
    for payment in payments.iter_mut() {
        payment.refresh_status(today);
    }
}

/// number of months needed to clear `principal` paying `installment` each month
pub(crate) fn term_for_payment(principal: Money, annual_rate: Rate, installment: Money) -> u32 {
    if !principal.is_positive() || !installment.is_positive() {
        return 0;
    }

    let monthly_rate = annual_rate.monthly_rate().as_decimal();
    let mut remaining = principal;
    let mut months = 0;

    while remaining > TERM_RESIDUE && months < MAX_TERM_SEARCH {
        let interest = remaining.apply_rate(monthly_rate);
        let principal_payment = installment - interest;

        if !principal_payment.is_positive() {
            break;
        }

        remaining -= principal_payment;
        months += 1;
    }

    months
}

const MAX_TERM_SEARCH: u32 = 1200;

/// rounding dust left after the last installment of a term search
const TERM_RESIDUE: Money = Money::CENT;

fn status_for(due_date: NaiveDate, today: NaiveDate) -> PaymentStatus {
    if due_date < today {
        PaymentStatus::Overdue
    } else {
        PaymentStatus::Upcoming
    }
}

/// calendar month arithmetic, clamped to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}
