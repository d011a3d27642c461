use std::{alloc, mem};

use crate::error::{AllocError, Result};

/// Byte size and alignment of a memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
  pub size: usize,
  pub align: usize,
}

impl Layout {
  pub const fn from_size_align(
    size: usize,
    align: usize,
  ) -> Self {
    Self { size, align }
  }

  /// Layout of a single `T`.
  pub const fn new<T>() -> Self {
    Self {
      size: mem::size_of::<T>(),
      align: mem::align_of::<T>(),
    }
  }

  /// Layout of `n` consecutive `T`s.
  pub fn array<T>(n: usize) -> Result<Self> {
    let size = mem::size_of::<T>()
      .checked_mul(n)
      .ok_or(AllocError::InvalidInput("array size overflows usize"))?;
    Ok(Self {
      size,
      align: mem::align_of::<T>(),
    })
  }

  /// Checks the layout before it reaches an allocator.
  ///
  /// An alignment of zero is accepted and normalised to one; a zero size
  /// or a non-power-of-two alignment is rejected.
  pub fn validate(self) -> Result<Self> {
    let align = normalize_align(self.align);
    if self.size == 0 || !align.is_power_of_two() {
      return Err(AllocError::InvalidLayout {
        size: self.size,
        align: self.align,
      });
    }
    Ok(Self {
      size: self.size,
      align,
    })
  }
}

impl From<alloc::Layout> for Layout {
  fn from(layout: alloc::Layout) -> Self {
    Self {
      size: layout.size(),
      align: layout.align(),
    }
  }
}

/// Maps an alignment of zero to one.
#[inline]
pub fn normalize_align(align: usize) -> usize {
  align.max(1)
}

/// Validates a raw `(size, align)` request, returning the normalised alignment.
pub(crate) fn check_request(
  size: usize,
  align: usize,
) -> Result<usize> {
  if size == 0 {
    return Err(AllocError::InvalidInput("zero-sized allocation"));
  }
  Layout::from_size_align(size, align)
    .validate()
    .map(|layout| layout.align)
}
