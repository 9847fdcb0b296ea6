pub mod json_store;

use crate::error::AppError;

pub use json_store::{JsonFileSlots, MemorySlots, store_dir};

/// Named key-value slots holding one serialized state each.
pub trait SlotStore {
    /// Contents of `slot`, or `None` when it has never been written.
    fn read(&self, slot: &str) -> Result<Option<String>, AppError>;

    /// Replaces the whole contents of `slot`.
    fn write(&mut self, slot: &str, contents: &str) -> Result<(), AppError>;
}
