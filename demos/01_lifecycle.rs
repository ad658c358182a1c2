/// lifecycle - application, approval, repayment and overdue tracking
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use microloan_book::{
    BorrowerProfile, Currency, LenderConfig, LoanApplication, LoanBook, MemoryNotifier,
    SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let mut book = LoanBook::new(LenderConfig::microloans("Baraka Credit", Currency::Uzs), time)?;
    let notifier = MemoryNotifier::new();
    book.add_notifier(Box::new(notifier.clone()));

    let borrower = book.register_borrower(
        BorrowerProfile::new("Dilnoza Karimova", "+998 90 123 45 67").with_notes("market stall"),
    )?;

    let loan = book.create_loan(LoanApplication::new(
        borrower,
        dec!(6_000_000),
        dec!(36),
        6,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ))?;
    book.approve_loan(loan)?;

    // two months pass, one installment gets paid
    controller.advance(Duration::days(62));
    book.mark_payment_paid(loan, 1)?;

    let view = book.loan_view(loan)?;
    println!("status: {}", view.status);
    println!("overdue installments: {}", view.balance.overdue_installments);
    println!("outstanding principal: {}", view.balance.outstanding_principal);

    for month in 2..=6 {
        book.mark_payment_paid(loan, month)?;
    }
    println!("status after last installment: {}", book.loan(loan).unwrap().status());

    println!("\nnotifications:");
    for n in notifier.sent() {
        println!("  [{}] {}", n.subject, n.body);
    }

    Ok(())
}
