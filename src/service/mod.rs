pub mod aggregator;
pub mod ledger;
pub mod notifications;

pub use aggregator::{
    filter_by_date_range, filter_by_source, filter_by_status, summarize, summarize_json,
    TransactionFilter,
};
pub use ledger::{LedgerService, LedgerSnapshot, PgTransactionSource, TransactionSource};
pub use notifications::NotificationCenter;
