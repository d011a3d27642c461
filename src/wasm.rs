use std::{arch::wasm32, cell::Cell};

use crate::{
  align::align_up,
  allocator::{Allocator, relocate},
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

const WASM_PAGE: usize = 64 * 1024;

/// Bump allocator over linear memory grown with `memory.grow`.
///
/// Linear memory never shrinks, so only the most recent allocation can be
/// given back, by rewinding the bump pointer.
#[derive(Debug, Default)]
pub struct WasmAllocator {
  next: Cell<usize>,
  end: Cell<usize>,
}

impl WasmAllocator {
  pub const fn new() -> Self {
    Self {
      next: Cell::new(0),
      end: Cell::new(0),
    }
  }

  fn grow(
    &self,
    bytes: usize,
  ) -> Option<()> {
    let pages = bytes.div_ceil(WASM_PAGE);
    let previous = wasm32::memory_grow(0, pages);
    if previous == usize::MAX {
      return None;
    }

    let start = previous * WASM_PAGE;
    if self.end.get() != start {
      self.next.set(start);
    }
    self.end.set(start + pages * WASM_PAGE);
    Some(())
  }
}

impl Allocator for WasmAllocator {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;
    let oom = AllocError::oom(size, align);

    let mut start = align_up(self.next.get(), align).ok_or(oom)?;
    if start.checked_add(size).ok_or(oom)? > self.end.get() {
      self.grow(size.checked_add(align).ok_or(oom)?).ok_or(oom)?;
      start = align_up(self.next.get(), align).ok_or(oom)?;
    }

    self.next.set(start + size);
    Ok(Slice::new(start as *mut u8, size))
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
    if mem.addr() % align == 0 {
      let is_top = mem.end() == self.next.get();
      if new_size <= mem.len || (is_top && mem.addr() + new_size <= self.end.get()) {
        if is_top {
          self.next.set(mem.addr() + new_size);
        }
        return Ok(Slice::new(mem.ptr, new_size));
      }
    }

    relocate(self, mem, new_size, align)
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    if !mem.is_null() && mem.end() == self.next.get() {
      self.next.set(mem.addr());
    }
  }
}
