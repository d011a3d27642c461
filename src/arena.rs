use std::{cell::RefCell, mem};

use tracing::{debug, trace};

use crate::{
  align::align_up,
  allocator::{Allocator, Backing, relocate},
  block::HEADER_SIZE,
  bump::BumpRegion,
  c_alloc::default_backing,
  config::{DEFAULT_CHUNK_SIZE, or_default},
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

#[derive(Clone, Copy, Default)]
pub struct ArenaConfig<'a> {
  /// Minimum size of each chunk. Zero selects [`DEFAULT_CHUNK_SIZE`].
  pub chunk_size: usize,
  /// Where chunks come from. `None` selects the platform heap.
  pub backing: Option<Backing<'a>>,
}

struct Chunk {
  mem: Slice,
  align: usize,
  region: BumpRegion,
}

/// Chunked bump allocator with LIFO free.
///
/// ```text
///   chunks[0]            chunks[1]            chunks[2]  (current)
///   ┌────────────┐       ┌────────────┐       ┌────────────┐
///   │ A │ B │    │  ◄──  │ C │        │  ◄──  │ D │ E │    │
///   └────────────┘ prev  └────────────┘ prev  └────────────┘
/// ```
///
/// Only the newest allocation of the current chunk can be freed. When that
/// empties the chunk and an older chunk exists, the chunk goes back to the
/// backing allocator and the previous one becomes current again, so
/// alloc/free cycles never grow the chunk list.
pub struct ArenaAllocator<'a> {
  backing: Backing<'a>,
  chunk_size: usize,
  chunks: RefCell<Vec<Chunk>>,
}

impl<'a> ArenaAllocator<'a> {
  pub fn new(config: ArenaConfig<'a>) -> Self {
    Self {
      backing: config.backing.unwrap_or(default_backing()),
      chunk_size: or_default(config.chunk_size, DEFAULT_CHUNK_SIZE),
      chunks: RefCell::new(Vec::new()),
    }
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.borrow().len()
  }

  /// Bytes in use in the current chunk, headers and padding included.
  pub fn current_used(&self) -> usize {
    self.chunks.borrow().last().map_or(0, |chunk| chunk.region.used())
  }

  fn new_chunk(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Chunk> {
    let chunk_align = align.max(mem::align_of::<usize>());
    let needed = align_up(HEADER_SIZE, align)
      .and_then(|start| start.checked_add(size))
      .ok_or(AllocError::oom(size, align))?;
    let capacity = needed.max(self.chunk_size);

    let mem = self.backing.alloc(capacity, chunk_align)?;
    debug!(capacity, align = chunk_align, ptr = ?mem.ptr, "arena chunk acquired");

    Ok(Chunk {
      mem,
      align: chunk_align,
      region: BumpRegion::new(mem),
    })
  }

  fn release_chunk(
    &self,
    chunk: Chunk,
  ) {
    debug!(capacity = chunk.mem.len, ptr = ?chunk.mem.ptr, "arena chunk released");
    self.backing.free(chunk.mem);
  }

  /// Releases every chunk except the oldest and rewinds that one, keeping
  /// it for reuse. Outstanding slices must not be used again.
  pub fn reset(&mut self) {
    let chunks = self.chunks.get_mut();
    let newer = if chunks.is_empty() { Vec::new() } else { chunks.split_off(1) };
    if let Some(first) = chunks.first_mut() {
      first.region.reset();
    }

    for chunk in newer.into_iter().rev() {
      self.release_chunk(chunk);
    }
  }

  /// Returns every chunk to the backing allocator.
  pub fn destroy(&mut self) {
    let chunks = mem::take(self.chunks.get_mut());
    if !chunks.is_empty() {
      debug!(chunks = chunks.len(), "arena destroyed");
    }

    for chunk in chunks.into_iter().rev() {
      self.release_chunk(chunk);
    }
  }
}

impl Default for ArenaAllocator<'_> {
  fn default() -> Self {
    Self::new(ArenaConfig::default())
  }
}

impl Drop for ArenaAllocator<'_> {
  fn drop(&mut self) {
    self.destroy();
  }
}

impl Allocator for ArenaAllocator<'_> {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;
    let mut chunks = self.chunks.borrow_mut();

    if let Some(mem) = chunks.last_mut().and_then(|chunk| chunk.region.alloc(size, align)) {
      trace!(size, align, ptr = ?mem.ptr, "arena alloc");
      return Ok(mem);
    }

    let mut chunk = self.new_chunk(size, align)?;
    debug_assert!(chunk.align >= align);
    let Some(mem) = chunk.region.alloc(size, align) else {
      self.release_chunk(chunk);
      return Err(AllocError::oom(size, align));
    };
    chunks.push(chunk);

    trace!(size, align, ptr = ?mem.ptr, chunks = chunks.len(), "arena alloc in new chunk");
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
      .chunks
      .borrow_mut()
      .iter_mut()
      .rev()
      .find(|chunk| chunk.region.owns(mem))
      .and_then(|chunk| chunk.region.resize_in_place(mem, new_size, align));
    if let Some(resized) = in_place {
      trace!(old = mem.len, new = new_size, ptr = ?mem.ptr, "arena resize in place");
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

    let mut chunks = self.chunks.borrow_mut();
    let count = chunks.len();
    let Some(current) = chunks.last_mut() else {
      return;
    };

    // Non-LIFO frees and blocks in older chunks are left alone; their bytes
    // come back when the chunk is unwound or the arena is destroyed.
    if !current.region.free_top(mem) {
      trace!(ptr = ?mem.ptr, "arena free ignored, not the top of the current chunk");
      return;
    }
    trace!(ptr = ?mem.ptr, used = current.region.used(), "arena free");

    if current.region.used() == 0 && count > 1 {
      let empty = chunks.pop();
      drop(chunks);
      if let Some(empty) = empty {
        self.release_chunk(empty);
      }
    }
  }
}
