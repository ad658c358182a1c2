/// json state - dashboard summary, customer lookup and a saved snapshot
use chrono::{NaiveDate, TimeZone, Utc};
use microloan_book::{
    BorrowerProfile, Currency, LenderConfig, LoanApplication, LoanBook, SafeTimeProvider,
    TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
    ));
    let config = LenderConfig::new("Baraka Credit", Currency::Uzs);
    let mut book = LoanBook::new(config.clone(), time.clone())?;

    let borrower = book.register_borrower(BorrowerProfile::new("Dilnoza Karimova", "+998901234567"))?;
    let loan = book.create_loan(
        LoanApplication::new(borrower, dec!(2_500), dec!(20), 12, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_currency(Currency::Usd),
    )?;
    book.approve_loan(loan)?;
    book.mark_payment_paid(loan, 1)?;

    println!("{}", book.dashboard().to_json_pretty()?);
    println!("{}", book.lookup(loan, "998 90 123 45 67")?.to_json_pretty()?);

    let json = book.to_json()?;
    let restored = LoanBook::from_json(config, time, &json)?;
    println!("restored {} loan(s)", restored.loans(Default::default()).len());

    Ok(())
}
