pub mod config;
pub mod error;
pub mod model;
pub mod state;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod transactions;

pub use store::{Dispatch, Module, Store, TaskStore, TransactionStore};
