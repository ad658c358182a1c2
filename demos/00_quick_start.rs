/// quick start - payment quote and schedule for a single loan
use microloan_book::chrono::NaiveDate;
use microloan_book::{generate_schedule, monthly_payment, Money, Rate};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let principal = Money::from_major(50_000);
    let rate = Rate::from_percent(dec!(5.5));

    // fixed monthly installment for a 3 year loan
    println!("monthly payment: {}", monthly_payment(principal, rate, 36).to_cents());

    let start = NaiveDate::from_ymd_opt(2024, 1, 15).ok_or("bad date")?;
    for p in generate_schedule(principal, rate, 36, start, start).iter().take(3) {
        println!(
            "#{:<2} due {}  interest {:>8}  principal {:>8}  balance {:>10}",
            p.month,
            p.due_date,
            p.interest_payment.to_cents(),
            p.principal_payment.to_cents(),
            p.remaining_balance.to_cents()
        );
    }

    Ok(())
}
