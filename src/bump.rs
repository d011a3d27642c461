use crate::{
  align::{align_up, is_aligned},
  block::{HEADER_SIZE, Header},
  slice::Slice,
};

/// Bump region over one contiguous buffer with stack-discipline frees.
///
/// Shared by the fixed allocator (one region over the caller's buffer) and
/// the arena (one region per chunk).
///
/// ```text
///   base                                        used      capacity
///   │                                           │         │
///   ▼                                           ▼         ▼
///   ┌─────┬──────────┬─────┬──────────┬─────────┬─────────┐
///   │ hdr │ block A  │ hdr │ block B  │ (pad)   │  free   │
///   └─────┴──────────┴─────┴──────────┴─────────┴─────────┘
///                      │
///                      └── prev_offset = end of A; freeing B rewinds here
/// ```
///
/// Only the block that ends exactly at `used` can be freed or resized in
/// place. Anything else stays where it is until the whole region is reset.
#[derive(Debug)]
pub(crate) struct BumpRegion {
  base: *mut u8,
  capacity: usize,
  used: usize,
}

impl BumpRegion {
  pub(crate) fn new(mem: Slice) -> Self {
    Self {
      base: mem.ptr,
      capacity: mem.len,
      used: 0,
    }
  }

  pub(crate) fn used(&self) -> usize {
    self.used
  }

  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }

  pub(crate) fn remaining(&self) -> usize {
    self.capacity - self.used
  }

  pub(crate) fn reset(&mut self) {
    self.used = 0;
  }

  fn base_addr(&self) -> usize {
    self.base as usize
  }

  /// Payload offset an allocation of `size`/`align` would get, if it fits.
  fn fit(
    &self,
    size: usize,
    align: usize,
  ) -> Option<usize> {
    let base = self.base_addr();
    let start = align_up(base.checked_add(self.used + HEADER_SIZE)?, align)? - base;
    let end = start.checked_add(size)?;

    if end > self.capacity {
      return None;
    }

    Some(start)
  }

  pub(crate) fn alloc(
    &mut self,
    size: usize,
    align: usize,
  ) -> Option<Slice> {
    let start = self.fit(size, align)?;

    unsafe {
      let payload = self.base.add(start);
      Header::new(self.used).write_before(payload);
      self.used = start + size;

      Some(Slice::new(payload, size))
    }
  }

  pub(crate) fn owns(
    &self,
    mem: Slice,
  ) -> bool {
    let base = self.base_addr();
    mem.addr() >= base + HEADER_SIZE && mem.end() <= base + self.capacity
  }

  pub(crate) fn is_top(
    &self,
    mem: Slice,
  ) -> bool {
    self.owns(mem) && mem.end() == self.base_addr() + self.used
  }

  /// Rewinds `used` if `mem` is the most recent allocation.
  ///
  /// Returns `false` when `mem` is not on top. That block is left in place
  /// and its bytes stay unusable until the region is reset.
  pub(crate) fn free_top(
    &mut self,
    mem: Slice,
  ) -> bool {
    if !self.is_top(mem) {
      return false;
    }

    self.used = unsafe { Header::read_before(mem.ptr) }.prev_offset;
    true
  }

  /// Resizes `mem` without moving it, if possible.
  ///
  /// The top block may grow into the trailing free space or shrink and give
  /// bytes back. Any other block may only shrink; its tail stays stranded.
  pub(crate) fn resize_in_place(
    &mut self,
    mem: Slice,
    new_size: usize,
    align: usize,
  ) -> Option<Slice> {
    if !self.owns(mem) || !is_aligned(mem.addr(), align) {
      return None;
    }

    let start = mem.addr() - self.base_addr();

    if self.is_top(mem) {
      let end = start.checked_add(new_size)?;
      if end > self.capacity {
        return None;
      }
      self.used = end;
      return Some(Slice::new(mem.ptr, new_size));
    }

    if new_size <= mem.len {
      return Some(Slice::new(mem.ptr, new_size));
    }

    None
  }
}
