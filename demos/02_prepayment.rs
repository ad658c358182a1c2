/// prepayment - paying down principal early with both strategies
use chrono::{NaiveDate, TimeZone, Utc};
use microloan_book::{
    BorrowerProfile, Currency, LenderConfig, LoanApplication, LoanBook, PrepaymentStrategy,
    SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let mut book = LoanBook::new(LenderConfig::new("Baraka Credit", Currency::Usd), time)?;
    let borrower = book.register_borrower(BorrowerProfile::new("Aziz Rakhimov", "+998 90 765 43 21"))?;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for strategy in [PrepaymentStrategy::ReduceEmi, PrepaymentStrategy::ReduceTerm] {
        let loan = book.create_loan(LoanApplication::new(borrower, dec!(12_000), dec!(18), 24, start))?;
        book.approve_loan(loan)?;
        book.mark_payment_paid(loan, 1)?;

        let result = book.prepay(loan, dec!(4_000), Some(strategy))?;
        println!("=== {:?} ===", strategy);
        println!("balance:      {} -> {}", result.old_balance.to_cents(), result.new_balance.to_cents());
        println!("installment:  {} -> {}", result.old_installment.to_cents(), result.new_installment.to_cents());
        println!("months left:  {} -> {}", result.old_remaining_months, result.new_remaining_months);
        println!("interest saved: {}\n", result.interest_saved.to_cents());
    }

    Ok(())
}
