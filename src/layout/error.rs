use thiserror::Error;

/// Failures surfaced by the packing engine.
///
/// A band that could not be filled as planned is not an error: the allocator
/// degrades to its fallback bands locally and never reports it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("unknown layout rule `{0}`")]
    UnknownRule(String),

    #[error("column count must be positive, got {0}")]
    InvalidColumns(i64),

    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),

    /// Post-loop bookkeeping check: every lesser item must have been placed.
    #[error("allocator finished with {remaining} lesser item(s) unconsumed")]
    InsufficientInventory { remaining: usize },
}

impl LayoutError {
    /// Configuration problems are detected before any band is produced.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LayoutError::UnknownRule(_) | LayoutError::InvalidColumns(_) | LayoutError::InvalidConfig(_)
        )
    }
}
