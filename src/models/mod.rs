//! Persisted row types for settlement-service.

pub mod cash;
pub mod debt;
pub mod invoice;
pub mod partner;
pub mod settlement;

pub use cash::{BankAccount, CashDirection, CashLedgerEntry, FinancialCategory};
pub use debt::{DebtRecord, DebtStatus, DebtType, PaymentRecord};
pub use invoice::{Invoice, PaymentStatus};
pub use partner::{Partner, PartnerType};
pub use settlement::{Settlement, SettlementLine};
