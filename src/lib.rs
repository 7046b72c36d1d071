pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod dump;
pub mod error;
pub mod filter;
pub mod models;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use filter::{CompareOp, Condition};
pub use models::*;
pub use store::TableStore;

/// Builds a [`Row`] from anything convertible into [`Value`]
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Value::from($value)),*]
    };
}

#[cfg(test)]
mod tests;
