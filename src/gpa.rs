//! General-purpose allocator with segregated power-of-two size classes.
//!
//! ```text
//!   class 0 (1 B)    ─► [bucket]
//!   class 3 (8 B)    ─► [bucket: ■■□■□□□□ …] ─► [bucket: ■□□□□□□□ …]
//!   class 6 (64 B)   ─► [bucket: ■■■■■■■■ …]
//!   …
//!   class 12 (4 KiB) ─► [bucket: ■]
//!
//!   large            ─► {ptr, len} ─► {ptr, len} ─► …
//! ```
//!
//! A request is rounded up to `next_power_of_two(max(size, align))`. If that
//! object size fits in a bucket it is served from the first bucket of its
//! class with a free slot, otherwise it goes straight to the backing
//! allocator and is tracked in the large list.

use std::cell::{Cell, RefCell};

use tracing::{debug, trace, warn};

use crate::{
  align::log2_pow2,
  allocator::{Allocator, Backing, relocate},
  bitmap::{BitSet, Bitmap},
  c_alloc::default_backing,
  config::{DEFAULT_BUCKET_SIZE, MAX_BUCKET_SIZE, NUM_SMALL_BUCKETS, or_default},
  error::{AllocError, Result},
  layout::check_request,
  slice::Slice,
};

#[derive(Clone, Copy, Default)]
pub struct GpaConfig<'a> {
  /// Bytes of slot storage per bucket, which is also the largest object
  /// served from buckets. Zero selects [`DEFAULT_BUCKET_SIZE`]; other
  /// values are rounded up to a power of two and capped at
  /// [`MAX_BUCKET_SIZE`].
  pub bucket_size: usize,
  /// Where buckets and large allocations come from. `None` selects the
  /// platform heap.
  pub backing: Option<Backing<'a>>,
}

/// Fixed-size slots of one size class carved out of one backing block.
struct Bucket {
  storage: Slice,
  obj_size: usize,
  slots: Bitmap,
  used_count: usize,
}

impl Bucket {
  fn new(
    backing: Backing<'_>,
    bucket_size: usize,
    obj_size: usize,
  ) -> Result<Self> {
    let slot_count = bucket_size / obj_size;
    let storage = backing.alloc(slot_count * obj_size, obj_size)?;
    debug!(obj_size, slot_count, ptr = ?storage.ptr, "gpa bucket created");

    Ok(Self {
      storage,
      obj_size,
      slots: Bitmap::new(slot_count),
      used_count: 0,
    })
  }

  fn is_full(&self) -> bool {
    self.used_count == self.slots.len()
  }

  fn take_slot(&mut self) -> Option<*mut u8> {
    let slot = self.slots.first_zero()?;
    self.slots.set(slot);
    self.used_count += 1;
    Some(unsafe { self.storage.ptr.add(slot * self.obj_size) })
  }

  /// Slot index of a live allocation starting at `addr`.
  fn live_slot(
    &self,
    addr: usize,
  ) -> Option<usize> {
    let offset = addr - self.storage.addr();
    if offset % self.obj_size != 0 {
      return None;
    }
    let slot = offset / self.obj_size;
    self.slots.get(slot).then_some(slot)
  }
}

struct LargeAlloc {
  mem: Slice,
}

/// Where a pointer handed out by the allocator lives.
enum Owner {
  Slot { class: usize, bucket: usize, slot: usize },
  Large { index: usize },
}

pub struct GpAllocator<'a> {
  backing: Backing<'a>,
  bucket_size: usize,
  classes: RefCell<[Vec<Bucket>; NUM_SMALL_BUCKETS]>,
  /// Classes that currently have at least one bucket.
  occupied: Cell<BitSet<1>>,
  large: RefCell<Vec<LargeAlloc>>,
}

impl<'a> GpAllocator<'a> {
  pub fn new(config: GpaConfig<'a>) -> Self {
    let bucket_size = or_default(config.bucket_size, DEFAULT_BUCKET_SIZE)
      .checked_next_power_of_two()
      .unwrap_or(MAX_BUCKET_SIZE)
      .min(MAX_BUCKET_SIZE);

    Self {
      backing: config.backing.unwrap_or(default_backing()),
      bucket_size,
      classes: RefCell::new(std::array::from_fn(|_| Vec::new())),
      occupied: Cell::new(BitSet::new()),
      large: RefCell::new(Vec::new()),
    }
  }

  pub fn bucket_size(&self) -> usize {
    self.bucket_size
  }

  /// Size class serving a `size`/`align` request, or `None` when the request
  /// takes the large-allocation path.
  pub fn size_class(
    &self,
    size: usize,
    align: usize,
  ) -> Option<usize> {
    let obj_size = size.max(align).checked_next_power_of_two()?;
    if obj_size > self.bucket_size {
      return None;
    }

    let class = log2_pow2(obj_size);
    (class < NUM_SMALL_BUCKETS).then_some(class)
  }

  pub fn bucket_count(
    &self,
    class: usize,
  ) -> usize {
    self.classes.borrow().get(class).map_or(0, Vec::len)
  }

  pub fn large_count(&self) -> usize {
    self.large.borrow().len()
  }

  fn alloc_small(
    &self,
    class: usize,
    size: usize,
  ) -> Result<Slice> {
    let mut classes = self.classes.borrow_mut();
    let buckets = &mut classes[class];

    // Oldest bucket with room first; new buckets go to the back.
    let index = match buckets.iter().position(|bucket| !bucket.is_full()) {
      Some(index) => index,
      None => {
        buckets.push(Bucket::new(self.backing, self.bucket_size, 1 << class)?);
        self.mark_class(class, true);
        buckets.len() - 1
      }
    };

    let ptr = buckets[index]
      .take_slot()
      .ok_or(AllocError::oom(size, 1 << class))?;

    trace!(size, class, ptr = ?ptr, "gpa small alloc");
    Ok(Slice::new(ptr, size))
  }

  fn alloc_large(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let mem = self.backing.alloc(size, align)?;
    self.large.borrow_mut().push(LargeAlloc { mem });

    trace!(size, align, ptr = ?mem.ptr, "gpa large alloc");
    Ok(mem)
  }

  fn mark_class(
    &self,
    class: usize,
    occupied: bool,
  ) {
    let mut set = self.occupied.get();
    if occupied {
      set.set(class);
    } else {
      set.clear(class);
    }
    self.occupied.set(set);
  }

  /// Finds the bucket slot or large allocation `mem` belongs to.
  ///
  /// Buckets are matched by address range, large allocations by pointer
  /// equality. A pointer that is in range of a bucket but not on a live
  /// slot has no owner.
  fn owner(
    &self,
    mem: Slice,
  ) -> Option<Owner> {
    let addr = mem.addr();
    let classes = self.classes.borrow();

    for class in self.occupied.get().iter_ones() {
      for (index, bucket) in classes[class].iter().enumerate() {
        if bucket.storage.contains(addr) {
          return bucket.live_slot(addr).map(|slot| Owner::Slot {
            class,
            bucket: index,
            slot,
          });
        }
      }
    }

    self
      .large
      .borrow()
      .iter()
      .position(|entry| entry.mem.ptr == mem.ptr)
      .map(|index| Owner::Large { index })
  }

  fn release_slot(
    &self,
    class: usize,
    index: usize,
    slot: usize,
  ) {
    let mut classes = self.classes.borrow_mut();
    let buckets = &mut classes[class];
    let bucket = &mut buckets[index];

    bucket.slots.clear(slot);
    bucket.used_count -= 1;
    trace!(class, slot, "gpa small free");

    if bucket.used_count == 0 {
      let empty = buckets.remove(index);
      if buckets.is_empty() {
        self.mark_class(class, false);
      }
      drop(classes);

      debug!(obj_size = empty.obj_size, ptr = ?empty.storage.ptr, "gpa bucket released");
      self.backing.free(empty.storage);
    }
  }

  /// Returns every bucket and large allocation to the backing allocator.
  pub fn destroy(&mut self) {
    let classes = self.classes.get_mut();
    let mut buckets = 0;
    for list in classes.iter_mut() {
      for bucket in list.drain(..) {
        self.backing.free(bucket.storage);
        buckets += 1;
      }
    }
    self.occupied.set(BitSet::new());

    let large = std::mem::take(self.large.get_mut());
    let large_count = large.len();
    for entry in large {
      self.backing.free(entry.mem);
    }

    if buckets + large_count > 0 {
      debug!(buckets, large = large_count, "gpa destroyed");
    }
  }
}

impl Default for GpAllocator<'_> {
  fn default() -> Self {
    Self::new(GpaConfig::default())
  }
}

impl Drop for GpAllocator<'_> {
  fn drop(&mut self) {
    self.destroy();
  }
}

impl Allocator for GpAllocator<'_> {
  fn alloc(
    &self,
    size: usize,
    align: usize,
  ) -> Result<Slice> {
    let align = check_request(size, align)?;

    match self.size_class(size, align) {
      Some(class) => self.alloc_small(class, size),
      None => self.alloc_large(size, align),
    }
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

    match self.owner(mem) {
      Some(Owner::Slot { class, .. }) => {
        if self.size_class(new_size, align) == Some(class) {
          trace!(old = mem.len, new = new_size, class, "gpa resize within class");
          return Ok(Slice::new(mem.ptr, new_size));
        }
        relocate(self, mem, new_size, align)
      }
      Some(Owner::Large { index }) => {
        let current = self.large.borrow()[index].mem;
        let resized = self.backing.resize(current, new_size, align)?;
        self.large.borrow_mut()[index].mem = resized;

        trace!(old = current.len, new = new_size, ptr = ?resized.ptr, "gpa large resize");
        Ok(resized)
      }
      None => Err(AllocError::InvalidInput(
        "resize of a pointer not owned by this allocator",
      )),
    }
  }

  fn free(
    &self,
    mem: Slice,
  ) {
    if mem.is_null() {
      return;
    }

    match self.owner(mem) {
      Some(Owner::Slot { class, bucket, slot }) => self.release_slot(class, bucket, slot),
      Some(Owner::Large { index }) => {
        let entry = self.large.borrow_mut().swap_remove(index);
        trace!(ptr = ?entry.mem.ptr, len = entry.mem.len, "gpa large free");
        self.backing.free(entry.mem);
      }
      // Unknown or already-freed pointers are ignored so a double free
      // cannot corrupt the buckets.
      None => warn!(ptr = ?mem.ptr, "gpa free of unrecognised pointer ignored"),
    }
  }
}
