use std::{cell::RefCell, marker::PhantomData};

use tracing::trace;

use crate::{
  allocator::{Allocator, relocate},
  bump::BumpRegion,
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

/// Bump allocator over a buffer supplied by the caller.
///
/// Frees and in-place resizes only take effect for the most recent
/// allocation. Once the buffer is full every request fails with
/// [`AllocError::OutOfMemory`]; there is no growth.
pub struct FixedAllocator<'buf> {
  region: RefCell<BumpRegion>,
  _buffer: PhantomData<&'buf mut [u8]>,
}

impl<'buf> FixedAllocator<'buf> {
  pub fn new(buffer: &'buf mut [u8]) -> Self {
    Self {
      region: RefCell::new(BumpRegion::new(Slice::new(
        buffer.as_mut_ptr(),
        buffer.len(),
      ))),
      _buffer: PhantomData,
    }
  }

  /// Builds a fixed allocator over raw memory, typically a block obtained
  /// from another allocator.
  ///
  /// # Safety
  ///
  /// `mem` must stay valid and otherwise unused for `'buf`.
  pub unsafe fn from_raw(mem: Slice) -> Result<Self> {
    if mem.is_null() || mem.len == 0 {
      return Err(AllocError::InvalidInput("fixed allocator needs a non-empty buffer"));
    }

    Ok(Self {
      region: RefCell::new(BumpRegion::new(mem)),
      _buffer: PhantomData,
    })
  }

  pub fn used(&self) -> usize {
    self.region.borrow().used()
  }

  pub fn capacity(&self) -> usize {
    self.region.borrow().capacity()
  }

  pub fn remaining(&self) -> usize {
    self.region.borrow().remaining()
  }

  /// Forgets every allocation. Outstanding slices must not be used again.
  pub fn reset(&mut self) {
    self.region.get_mut().reset();
  }
}

impl Allocator for FixedAllocator<'_> {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;

    let mem = self
      .region
      .borrow_mut()
      .alloc(size, align)
      .ok_or(AllocError::oom(size, align))?;

    trace!(size, align, ptr = ?mem.ptr, "fixed alloc");
    Ok(mem)
  }

  fn resize(
    &self,
    mem: Slice,
    new_size: usize,
    align: usize,
  ) -> Result<Slice> {
    if mem.is_null() {
      return self.alloc(new_size, align);
    }
    if new_size == 0 {
      self.free(mem);
      return Ok(Slice::empty());
    }

    let align = check_request(new_size, align)?;

    let in_place = self
      .region
      .borrow_mut()
      .resize_in_place(mem, new_size, align);
    if let Some(resized) = in_place {
      trace!(old = mem.len, new = new_size, ptr = ?mem.ptr, "fixed resize in place");
      return Ok(resized);
    }

    relocate(self, mem, new_size, align)
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    if mem.is_null() {
      return;
    }

    // Only the top block can be handed back; anything older leaks until reset.
    if !self.region.borrow_mut().free_top(mem) {
      trace!(ptr = ?mem.ptr, "fixed free ignored, not the most recent allocation");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::HEADER_SIZE;

  #[test]
  fn test_lifo_reuse() {
    let mut buf = [0u8; 256];
    let fixed = FixedAllocator::new(&mut buf);

    let first = fixed.alloc(32, 8).unwrap();
    fixed.free(first);
    let second = fixed.alloc(32, 8).unwrap();

    assert_eq!(first.ptr, second.ptr);
  }

  #[test]
  fn test_non_lifo_free_is_ignored() {
    let mut buf = [0u8; 256];
    let fixed = FixedAllocator::new(&mut buf);

    let a = fixed.alloc(16, 8).unwrap();
    let _b = fixed.alloc(16, 8).unwrap();
    let used = fixed.used();

    fixed.free(a);

    assert_eq!(fixed.used(), used);
    assert_ne!(fixed.alloc(16, 8).unwrap().ptr, a.ptr);
  }

  #[test]
  fn test_out_of_memory() {
    let mut buf = [0u8; 64];
    let fixed = FixedAllocator::new(&mut buf);

    assert_eq!(fixed.alloc(128, 1), Err(AllocError::oom(128, 1)));
    assert!(fixed.alloc(64 - HEADER_SIZE, 1).is_ok());
    assert!(fixed.alloc(1, 1).unwrap_err().is_out_of_memory());
  }

  #[test]
  fn test_invalid_requests() {
    let mut buf = [0u8; 64];
    let fixed = FixedAllocator::new(&mut buf);

    assert!(matches!(fixed.alloc(0, 8), Err(AllocError::InvalidInput(_))));
    assert!(matches!(fixed.alloc(8, 3), Err(AllocError::InvalidLayout { .. })));
    assert!(unsafe { FixedAllocator::from_raw(Slice::empty()) }.is_err());
  }

  #[test]
  fn test_from_raw_over_borrowed_block() {
    let heap = crate::c_alloc::CAllocator;
    let block = heap.alloc(256, 16).unwrap();

    {
      let fixed = unsafe { FixedAllocator::from_raw(block) }.unwrap();
      assert_eq!(fixed.capacity(), 256);

      let a = fixed.alloc(64, 16).unwrap();
      assert!(block.contains(a.addr()) && a.end() <= block.end());
      assert_eq!(a.addr() % 16, 0);

      fixed.free(a);
      assert_eq!(fixed.used(), 0);
      assert!(fixed.alloc(512, 1).unwrap_err().is_out_of_memory());
    }

    heap.free(block);
  }

  #[test]
  fn test_resize_top_in_place_and_relocate() {
    let mut buf = [0u8; 512];
    let fixed = FixedAllocator::new(&mut buf);

    let a = fixed.alloc(16, 8).unwrap();
    unsafe { a.as_bytes_mut() }.copy_from_slice(&[7u8; 16]);

    let grown = fixed.resize(a, 64, 8).unwrap();
    assert_eq!(grown.ptr, a.ptr);

    let _b = fixed.alloc(8, 8).unwrap();
    let moved = fixed.resize(grown, 128, 8).unwrap();
    assert_ne!(moved.ptr, grown.ptr);
    assert_eq!(&unsafe { moved.as_bytes() }[..16], &[7u8; 16]);
  }

  #[test]
  fn test_resize_null_and_zero() {
    let mut buf = [0u8; 128];
    let fixed = FixedAllocator::new(&mut buf);

    let mem = fixed.resize(Slice::empty(), 24, 8).unwrap();
    assert_eq!(mem.len, 24);

    assert_eq!(fixed.resize(mem, 0, 8), Ok(Slice::empty()));
    assert_eq!(fixed.used(), 0);
  }

  #[test]
  fn test_reset() {
    let mut buf = [0u8; 128];
    let mut fixed = FixedAllocator::new(&mut buf);

    let first = fixed.alloc(40, 8).unwrap();
    let _ = fixed.alloc(40, 8).unwrap();
    fixed.reset();

    assert_eq!(fixed.used(), 0);
    assert_eq!(fixed.remaining(), fixed.capacity());
    assert_eq!(fixed.alloc(40, 8).unwrap().ptr, first.ptr);
  }
}
