//! Adapters for the domain ports.

pub mod clock;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod tracing_sink;

use crate::error::{EngineError, Result};
use std::fmt::Display;

/// Optimistic version check shared by the stores. `stored` is `None` when the
/// record does not exist, which matches an expected version of 0.
pub(crate) fn check_version(
    entity: &'static str,
    id: &impl Display,
    stored: Option<u64>,
    expected: u64,
) -> Result<()> {
    let current = stored.unwrap_or(0);
    if current == expected {
        Ok(())
    } else {
        Err(EngineError::ConcurrencyConflict(format!(
            "{entity} {id} is at version {current}, expected {expected}"
        )))
    }
}
