use std::{cell::RefCell, mem};

use tracing::{debug, trace};

use crate::{
  align::align_up,
  allocator::{Allocator, Backing, relocate},
  c_alloc::default_backing,
  config::{DEFAULT_SLAB_SIZE, or_default},
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

#[derive(Clone, Copy, Default)]
pub struct SlabConfig<'a> {
  /// Minimum size of each slab. Zero selects [`DEFAULT_SLAB_SIZE`].
  pub slab_size: usize,
  /// Where slabs come from. `None` selects the platform heap.
  pub backing: Option<Backing<'a>>,
}

struct Slab {
  mem: Slice,
  offset: usize,
}

impl Slab {
  fn bump(
    &mut self,
    size: usize,
    align: usize,
  ) -> Option<Slice> {
    let base = self.mem.addr();
    let start = align_up(base.checked_add(self.offset)?, align)? - base;
    let end = start.checked_add(size)?;

    if end > self.mem.len {
      return None;
    }

    self.offset = end;
    Some(Slice::new(unsafe { self.mem.ptr.add(start) }, size))
  }
}

/// Bump allocator that never frees individual allocations.
///
/// Meant for "allocate many, free none" workloads: [`free`](Allocator::free)
/// does nothing and every slab is handed back in one go by
/// [`destroy`](SlabAllocator::destroy). Requests larger than the slab size
/// get a slab of their own.
pub struct SlabAllocator<'a> {
  backing: Backing<'a>,
  slab_size: usize,
  slabs: RefCell<Vec<Slab>>,
}

impl<'a> SlabAllocator<'a> {
  pub fn new(config: SlabConfig<'a>) -> Self {
    Self {
      backing: config.backing.unwrap_or(default_backing()),
      slab_size: or_default(config.slab_size, DEFAULT_SLAB_SIZE),
      slabs: RefCell::new(Vec::new()),
    }
  }

  pub fn slab_count(&self) -> usize {
    self.slabs.borrow().len()
  }

  /// Returns every slab to the backing allocator.
  pub fn destroy(&mut self) {
    let slabs = mem::take(self.slabs.get_mut());
    if !slabs.is_empty() {
      debug!(slabs = slabs.len(), "slab allocator destroyed");
    }

    for slab in slabs {
      self.backing.free(slab.mem);
    }
  }
}

impl Default for SlabAllocator<'_> {
  fn default() -> Self {
    Self::new(SlabConfig::default())
  }
}

impl Drop for SlabAllocator<'_> {
  fn drop(&mut self) {
    self.destroy();
  }
}

impl Allocator for SlabAllocator<'_> {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;
    let mut slabs = self.slabs.borrow_mut();

    if let Some(mem) = slabs.last_mut().and_then(|slab| slab.bump(size, align)) {
      trace!(size, align, ptr = ?mem.ptr, "slab alloc");
      return Ok(mem);
    }

    let capacity = size.max(self.slab_size);
    let slab_align = align.max(mem::align_of::<usize>());
    let mut slab = Slab {
      mem: self.backing.alloc(capacity, slab_align)?,
      offset: 0,
    };
    debug!(capacity, align = slab_align, ptr = ?slab.mem.ptr, "slab acquired");

    let Some(mem) = slab.bump(size, align) else {
      self.backing.free(slab.mem);
      return Err(AllocError::oom(size, align));
    };
    slabs.push(slab);

    trace!(size, align, ptr = ?mem.ptr, slabs = slabs.len(), "slab alloc in new slab");
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

    if new_size <= mem.len && mem.addr() % align == 0 {
      return Ok(Slice::new(mem.ptr, new_size));
    }

    // The old region stays stranded in its slab.
    relocate(self, mem, new_size, align)
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    // Slabs are only released as a whole.
    trace!(ptr = ?mem.ptr, "slab free ignored");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::counting::CountingAllocator;

  #[test]
  fn test_free_never_reuses() {
    let slab = SlabAllocator::default();

    let first = slab.alloc(32, 8).unwrap();
    slab.free(first);
    let second = slab.alloc(32, 8).unwrap();

    assert_ne!(first.ptr, second.ptr);
  }

  #[test]
  fn test_bump_respects_alignment() {
    let slab = SlabAllocator::default();

    for align in [1, 2, 4, 8, 16, 32, 64, 128] {
      let mem = slab.alloc(3, align).unwrap();
      assert_eq!(mem.addr() % align, 0);
    }
    assert_eq!(slab.slab_count(), 1);
  }

  #[test]
  fn test_new_slab_when_full() {
    let slab = SlabAllocator::new(SlabConfig {
      slab_size: 64,
      ..Default::default()
    });

    slab.alloc(48, 8).unwrap();
    slab.alloc(48, 8).unwrap();
    assert_eq!(slab.slab_count(), 2);

    let big = slab.alloc(1000, 8).unwrap();
    assert_eq!(big.len, 1000);
    assert_eq!(slab.slab_count(), 3);
  }

  #[test]
  fn test_resize() {
    let slab = SlabAllocator::default();

    let mem = slab.alloc(64, 8).unwrap();
    unsafe { mem.as_bytes_mut() }.fill(3);

    let shrunk = slab.resize(mem, 16, 8).unwrap();
    assert_eq!(shrunk.ptr, mem.ptr);

    let grown = slab.resize(shrunk, 128, 8).unwrap();
    assert_ne!(grown.ptr, mem.ptr);
    assert!(unsafe { grown.as_bytes() }[..16].iter().all(|&b| b == 3));
  }

  /// Backing that hands out less than it was asked for.
  struct ShortBacking<'a> {
    inner: &'a CountingAllocator<'a>,
  }

  impl Allocator for ShortBacking<'_> {
    fn alloc(
      &self,
      size: usize,
      align: usize,
    ) -> Result<Slice> {
      let mem = self.inner.alloc(size, align)?;
      Ok(Slice::new(mem.ptr, 1))
    }

    fn resize(
      &self,
      mem: Slice,
      new_size: usize,
      align: usize,
    ) -> Result<Slice> {
      self.inner.resize(mem, new_size, align)
    }

    fn free(
      &self,
      mem: Slice,
    ) {
      self.inner.free(mem);
    }
  }

  #[test]
  fn test_unusable_new_slab_is_returned() {
    let heap = CountingAllocator::default();
    let short = ShortBacking { inner: &heap };
    let slab = SlabAllocator::new(SlabConfig {
      slab_size: 128,
      backing: Some(&short),
    });

    assert!(slab.alloc(100, 8).unwrap_err().is_out_of_memory());
    assert_eq!(slab.slab_count(), 0);
    assert_eq!(heap.live(), 0);
    assert_eq!(heap.frees(), heap.allocs());
  }

  #[test]
  fn test_destroy_releases_all_slabs() {
    let heap = CountingAllocator::default();
    let mut slab = SlabAllocator::new(SlabConfig {
      slab_size: 128,
      backing: Some(&heap),
    });

    for _ in 0..10 {
      slab.alloc(100, 4).unwrap();
    }
    assert_eq!(heap.live(), 10);

    slab.destroy();
    assert_eq!(heap.live(), 0);
    assert_eq!(slab.slab_count(), 0);
  }
}
