use std::{ptr, slice};

/// Non-owning `(pointer, length)` view of memory.
///
/// Allocators hand these out and take them back. The length passed back to
/// `free`/`resize` must be the one most recently returned for that pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
  pub ptr: *mut u8,
  pub len: usize,
}

impl Slice {
  pub const fn new(
    ptr: *mut u8,
    len: usize,
  ) -> Self {
    Self { ptr, len }
  }

  pub const fn empty() -> Self {
    Self {
      ptr: ptr::null_mut(),
      len: 0,
    }
  }

  pub fn is_null(&self) -> bool {
    self.ptr.is_null()
  }

  pub fn addr(&self) -> usize {
    self.ptr as usize
  }

  /// Address one past the last byte.
  pub fn end(&self) -> usize {
    self.addr() + self.len
  }

  pub fn contains(
    &self,
    addr: usize,
  ) -> bool {
    addr >= self.addr() && addr < self.end()
  }

  /// # Safety
  ///
  /// The slice must describe live memory not aliased mutably elsewhere.
  pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
    if self.is_null() {
      return &[];
    }
    unsafe { slice::from_raw_parts(self.ptr, self.len) }
  }

  /// # Safety
  ///
  /// The slice must describe live memory with no other live references.
  pub unsafe fn as_bytes_mut<'a>(&self) -> &'a mut [u8] {
    if self.is_null() {
      return &mut [];
    }
    unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
  }
}

impl Default for Slice {
  fn default() -> Self {
    Self::empty()
  }
}

/// Copies `min(src.len, dst.len)` bytes from `src` into `dst`.
///
/// # Safety
///
/// Both slices must describe live memory; they may not overlap.
pub(crate) unsafe fn copy_prefix(
  src: Slice,
  dst: Slice,
) {
  let count = src.len.min(dst.len);
  if count == 0 || src.is_null() || dst.is_null() {
    return;
  }
  unsafe { ptr::copy_nonoverlapping(src.ptr, dst.ptr, count) };
}
