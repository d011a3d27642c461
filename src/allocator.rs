use std::ptr;

use crate::{error::Result, layout::Layout, slice::Slice};

/// Uniform interface implemented by every allocator in the crate.
///
/// Methods take `&self` so that a handle (`&dyn Allocator`) can be copied
/// freely into containers and into other allocators as their backing.
/// Implementations keep their bookkeeping in `Cell`/`RefCell`, which makes
/// them `!Sync`: an instance must not be shared across threads without
/// external locking.
pub trait Allocator {
  /// Returns at least `size` bytes aligned to `align`.
  ///
  /// `size == 0` is an error. `align == 0` is treated as `1`.
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice>;

  /// Grows or shrinks `mem` to `new_size` bytes.
  ///
  /// A null `mem` behaves as [`alloc`](Allocator::alloc) and a `new_size` of
  /// zero behaves as [`free`](Allocator::free), returning an empty slice.
  /// The returned slice may live at a different address; the old one must
  /// not be used afterwards.
  fn resize(
    &self,
    mem: Slice,
    new_size: usize,
    align: usize,
  ) -> Result<Slice>;

  /// Releases `mem`. Pointers the allocator does not recognise are ignored.
  fn free(
    &self,
    mem: Slice,
  );

  fn alloc_layout(
    &self,
    layout: Layout,
  ) -> Result<Slice> {
    self.alloc(layout.size, layout.align)
  }

  fn resize_layout(
    &self,
    mem: Slice,
    layout: Layout,
  ) -> Result<Slice> {
    self.resize(mem, layout.size, layout.align)
  }

  /// Like [`alloc`](Allocator::alloc), with the returned bytes set to zero.
  fn alloc_zeroed(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let mem = self.alloc(size, align)?;
    unsafe { ptr::write_bytes(mem.ptr, 0, mem.len) };
    Ok(mem)
  }
}

/// Copyable handle to the allocator another allocator draws its memory from.
pub type Backing<'a> = &'a dyn Allocator;

impl<A: Allocator + ?Sized> Allocator for &A {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    (**self).alloc(size, align)
  }

  fn resize(
    &self,
    mem: Slice,
    new_size: usize,
    align: usize,
  ) -> Result<Slice> {
    (**self).resize(mem, new_size, align)
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    (**self).free(mem)
  }
}

/// Resize fallback shared by the allocators: allocate, copy the common
/// prefix, then free the old block.
pub(crate) fn relocate<A: Allocator + ?Sized>(
  allocator: &A,
  mem: Slice,
  new_size: usize,
  align: usize,
) -> Result<Slice> {
  let fresh = allocator.alloc(new_size, align)?;
  unsafe { crate::slice::copy_prefix(mem, fresh) };
  allocator.free(mem);
  Ok(fresh)
}
