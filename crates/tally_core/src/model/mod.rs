mod task;
mod transaction;

pub use task::{Task, TaskDraft, TaskPatch};
pub use transaction::{Transaction, TransactionDraft, TransactionKind, TransactionPatch};
