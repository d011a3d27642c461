use std::{mem, ptr};

use libc::c_void;
use tracing::trace;

use crate::{
  allocator::{Allocator, Backing, relocate},
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

/// Alignment `malloc` guarantees on the platforms we target.
const MIN_ALIGN: usize = 2 * mem::size_of::<usize>();

/// The platform heap: `malloc`, `posix_memalign`, `realloc` and `free`.
///
/// This is the backing allocator every configurable allocator falls back
/// to when none is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct CAllocator;

static C_ALLOCATOR: CAllocator = CAllocator;

/// Handle to the process-wide [`CAllocator`].
pub fn default_backing() -> Backing<'static> {
  &C_ALLOCATOR
}

fn malloc_can_align(
  size: usize,
  align: usize,
) -> bool {
  align <= MIN_ALIGN && align <= size
}

impl Allocator for CAllocator {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;

    let ptr = unsafe {
      if malloc_can_align(size, align) {
        libc::malloc(size)
      } else {
        let mut out: *mut c_void = ptr::null_mut();
        let align = align.max(mem::size_of::<usize>());
        if libc::posix_memalign(&mut out, align, size) != 0 {
          ptr::null_mut()
        } else {
          out
        }
      }
    } as *mut u8;

    if ptr.is_null() {
      return Err(AllocError::oom(size, align));
    }

    trace!(size, align, ptr = ?ptr, "c alloc");
    Ok(Slice::new(ptr, size))
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
    if !malloc_can_align(new_size, align) {
      return relocate(self, mem, new_size, align);
    }

    // On failure the old block is untouched and still owned by the caller.
    let ptr = unsafe { libc::realloc(mem.ptr as *mut c_void, new_size) } as *mut u8;
    if ptr.is_null() {
      return Err(AllocError::oom(new_size, align));
    }

    trace!(old = mem.len, new = new_size, ptr = ?ptr, "c realloc");
    Ok(Slice::new(ptr, new_size))
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    if mem.is_null() {
      return;
    }

    trace!(ptr = ?mem.ptr, "c free");
    unsafe { libc::free(mem.ptr as *mut c_void) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_alignment() {
    let heap = CAllocator;

    for align in [1, 8, 16, 64, 4096] {
      let mem = heap.alloc(24, align).unwrap();
      assert_eq!(mem.addr() % align, 0);
      heap.free(mem);
    }
  }

  #[test]
  fn test_resize_preserves_prefix() {
    let heap = CAllocator;

    let mem = heap.alloc(16, 8).unwrap();
    unsafe { mem.as_bytes_mut() }.copy_from_slice(&[0xEE; 16]);

    let grown = heap.resize(mem, 1 << 16, 8).unwrap();
    assert_eq!(unsafe { grown.as_bytes() }[..16], [0xEE; 16]);

    let over_aligned = heap.resize(grown, 32, 256).unwrap();
    assert_eq!(over_aligned.addr() % 256, 0);
    assert_eq!(unsafe { over_aligned.as_bytes() }[..16], [0xEE; 16]);

    heap.free(over_aligned);
  }

  #[test]
  fn test_rejects_zero_size() {
    assert!(matches!(
      CAllocator.alloc(0, 8),
      Err(AllocError::InvalidInput(_))
    ));
  }
}
