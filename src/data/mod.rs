//! Data module - CSV loading and aggregation

pub(crate) mod loader;
mod processor;

pub use loader::{DataLoader, Datasets};
pub use processor::{DataProcessor, ProcessorError};
