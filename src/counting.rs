use std::cell::Cell;

use crate::{
  allocator::{Allocator, Backing},
  c_alloc::default_backing,
  error::Result,
  slice::Slice,
};

/// Pass-through allocator that counts what flows through it.
///
/// Handy as the backing of another allocator to check that everything it
/// took was handed back. Counters follow the calls made; a `free` the inner
/// allocator ignores is still counted.
pub struct CountingAllocator<'a> {
  inner: Backing<'a>,
  allocs: Cell<usize>,
  frees: Cell<usize>,
  live: Cell<usize>,
  live_bytes: Cell<usize>,
}

impl<'a> CountingAllocator<'a> {
  pub fn new(inner: Backing<'a>) -> Self {
    Self {
      inner,
      allocs: Cell::new(0),
      frees: Cell::new(0),
      live: Cell::new(0),
      live_bytes: Cell::new(0),
    }
  }

  pub fn allocs(&self) -> usize {
    self.allocs.get()
  }

  pub fn frees(&self) -> usize {
    self.frees.get()
  }

  /// Allocations made and not yet freed.
  pub fn live(&self) -> usize {
    self.live.get()
  }

  pub fn live_bytes(&self) -> usize {
    self.live_bytes.get()
  }

  fn record_alloc(
    &self,
    mem: Slice,
  ) {
    self.allocs.set(self.allocs.get() + 1);
    self.live.set(self.live.get() + 1);
    self.live_bytes.set(self.live_bytes.get() + mem.len);
  }

  fn record_free(
    &self,
    mem: Slice,
  ) {
    self.frees.set(self.frees.get() + 1);
    self.live.set(self.live.get().saturating_sub(1));
    self.live_bytes.set(self.live_bytes.get().saturating_sub(mem.len));
  }
}

impl Default for CountingAllocator<'_> {
  fn default() -> Self {
    Self::new(default_backing())
  }
}

impl Allocator for CountingAllocator<'_> {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let mem = self.inner.alloc(size, align)?;
    self.record_alloc(mem);
    Ok(mem)
  }

  fn resize(
    &self,
    mem: Slice,
    new_size: usize,
    align: usize,
  ) -> Result<Slice> {
    let resized = self.inner.resize(mem, new_size, align)?;

    if mem.is_null() {
      self.record_alloc(resized);
    } else if new_size == 0 {
      self.record_free(mem);
    } else {
      let bytes = self.live_bytes.get().saturating_sub(mem.len) + resized.len;
      self.live_bytes.set(bytes);
    }

    Ok(resized)
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    if mem.is_null() {
      return;
    }
    self.inner.free(mem);
    self.record_free(mem);
  }
}
