pub mod application;
pub mod book;
pub mod borrower;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod loan;
pub mod notifications;
pub mod payments;
pub mod serialization;
pub mod state;
pub mod types;

// re-export key types
pub use application::{LoanApplication, LoanTerms, TermsUpdate};
pub use book::{BookSnapshot, LoanBook, LoanFilter};
pub use borrower::{normalize_phone, Borrower, BorrowerProfile};
pub use config::{LenderConfig, LoanLimits, NotificationConfig};
pub use decimal::{Money, Rate};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use loan::Loan;
pub use notifications::{MemoryNotifier, Notification, Notifier, RenderContext};
pub use payments::{
    generate_schedule, monthly_payment, AmortizationSchedule, Payment, PrepaymentHandler,
    PrepaymentResult, ScheduleProgress,
};
pub use serialization::{BalanceView, DashboardSummary, LoanView, LookupView, PaymentView};
pub use state::LoanState;
pub use types::{BorrowerId, Currency, LoanId, LoanStatus, PaymentStatus, PrepaymentStrategy};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
