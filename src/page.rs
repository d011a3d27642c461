use std::ptr;

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void};
use tracing::{debug, trace};

use crate::{
  align::align_up,
  allocator::{Allocator, relocate},
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

/// Allocates whole pages straight from the OS with `mmap`.
///
/// Every request is rounded up to the page size, so this is only sensible
/// as the backing of an arena, slab or GPA. Alignments larger than a page
/// are served by over-mapping and unmapping the excess.
#[derive(Debug, Clone, Copy)]
pub struct PageAllocator {
  page_size: usize,
}

impl PageAllocator {
  pub fn new() -> Self {
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    Self {
      page_size: if page_size > 0 { page_size as usize } else { 4096 },
    }
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  fn round(
    &self,
    len: usize,
  ) -> Option<usize> {
    align_up(len, self.page_size)
  }

  unsafe fn map(len: usize) -> *mut u8 {
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };
    if addr == MAP_FAILED { ptr::null_mut() } else { addr as *mut u8 }
  }

  unsafe fn unmap(
    addr: usize,
    len: usize,
  ) {
    if len > 0 {
      unsafe { libc::munmap(addr as *mut c_void, len) };
    }
  }
}

impl Default for PageAllocator {
  fn default() -> Self {
    Self::new()
  }
}

impl Allocator for PageAllocator {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;
    let len = self.round(size).ok_or(AllocError::oom(size, align))?;

    if align <= self.page_size {
      let ptr = unsafe { Self::map(len) };
      if ptr.is_null() {
        return Err(AllocError::oom(size, align));
      }
      trace!(size, pages = len / self.page_size, ptr = ?ptr, "page alloc");
      return Ok(Slice::new(ptr, size));
    }

    // Map enough to find an aligned window, then trim both ends.
    let total = len
      .checked_add(align - self.page_size)
      .ok_or(AllocError::oom(size, align))?;
    let raw = unsafe { Self::map(total) };
    if raw.is_null() {
      return Err(AllocError::oom(size, align));
    }

    let start = raw as usize;
    let aligned = align_up(start, align).ok_or(AllocError::oom(size, align))?;
    unsafe {
      Self::unmap(start, aligned - start);
      Self::unmap(aligned + len, start + total - (aligned + len));
    }

    debug!(size, align, ptr = aligned, "page alloc over-aligned");
    Ok(Slice::new(aligned as *mut u8, size))
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
    let old_len = self.round(mem.len).ok_or(AllocError::InvalidInput("corrupt length"))?;
    let new_len = self.round(new_size).ok_or(AllocError::oom(new_size, align))?;

    if mem.addr() % align == 0 && new_len <= old_len {
      unsafe { Self::unmap(mem.addr() + new_len, old_len - new_len) };
      trace!(old = mem.len, new = new_size, ptr = ?mem.ptr, "page resize in place");
      return Ok(Slice::new(mem.ptr, new_size));
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

    if let Some(len) = self.round(mem.len) {
      trace!(ptr = ?mem.ptr, len, "page free");
      unsafe { Self::unmap(mem.addr(), len) };
    }
  }
}
