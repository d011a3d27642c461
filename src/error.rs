//! Error type shared by every allocator in the crate.

use thiserror::Error;

/// Result alias used by every allocator operation.
pub type Result<T> = std::result::Result<T, AllocError>;

/// Failures reported by [`Allocator`](crate::Allocator) operations.
///
/// Freeing memory never fails: an unrecognised or already-freed pointer is
/// ignored, so there is no variant for it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// Zero size, a null buffer where one is required, or a pointer the
  /// allocator does not own passed to `resize`.
  #[error("invalid input: {0}")]
  InvalidInput(&'static str),

  /// Size of zero or an alignment that is not a power of two.
  #[error("invalid layout: size = {size}, align = {align}")]
  InvalidLayout { size: usize, align: usize },

  /// The backing allocator is exhausted, or a fixed buffer is full.
  #[error("out of memory: requested {size} bytes aligned to {align}")]
  OutOfMemory { size: usize, align: usize },
}

impl AllocError {
  pub(crate) fn oom(
    size: usize,
    align: usize,
  ) -> Self {
    AllocError::OutOfMemory { size, align }
  }

  /// Whether this is an exhaustion error rather than a caller mistake.
  pub fn is_out_of_memory(&self) -> bool {
    matches!(self, AllocError::OutOfMemory { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    assert_eq!(
      AllocError::oom(64, 8).to_string(),
      "out of memory: requested 64 bytes aligned to 8"
    );
    assert_eq!(
      AllocError::InvalidInput("zero size").to_string(),
      "invalid input: zero size"
    );
    assert!(AllocError::oom(1, 1).is_out_of_memory());
    assert!(!(AllocError::InvalidLayout { size: 0, align: 1 }).is_out_of_memory());
  }
}
