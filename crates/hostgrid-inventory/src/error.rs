//! Error types for inventory construction.

use thiserror::Error;

/// Result type alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors raised while building an inventory snapshot. These indicate a
/// caller bug, not a recoverable runtime condition.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("duplicate hostname in snapshot: {0}")]
    DuplicateHostname(String),

    #[error("node lists itself as its parent: {0}")]
    SelfParent(String),
}
