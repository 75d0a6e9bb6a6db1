pub mod notification;
pub mod summary;
pub mod transaction;

pub use notification::{NewNotification, Notification, NotificationLevel};
pub use summary::TransactionSummary;
pub use transaction::{DebitCredit, DocumentSource, PaymentStatus, Transaction, TransactionScope};
