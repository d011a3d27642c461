//! Behavioural properties shared by the allocators, exercised through the
//! public interface and through chained backings.

use cualloc::{
  AllocError, Allocator, ArenaAllocator, ArenaConfig, CountingAllocator, FixedAllocator,
  GpAllocator, GpaConfig, SlabAllocator, SlabConfig, Slice,
};

// ============================================================================
// Reuse
// ============================================================================

/// Allocating and freeing a 4 KiB block a thousand times must keep reusing
/// the same memory instead of growing the backing.
#[test]
fn test_gpa_slot_reuse_stays_within_backing() {
  let mut buffer = vec![0u8; 32 * 1024];
  let fixed = FixedAllocator::new(&mut buffer);
  let arena = ArenaAllocator::new(ArenaConfig {
    chunk_size: 4096,
    backing: Some(&fixed),
  });
  let gpa = GpAllocator::new(GpaConfig {
    backing: Some(&arena),
    ..Default::default()
  });

  let first = gpa.alloc(4096, 8).unwrap();
  gpa.free(first);

  for _ in 0..1000 {
    let mem = gpa.alloc(4096, 8).unwrap();
    assert_eq!(mem.ptr, first.ptr);
    unsafe { mem.as_bytes_mut() }.fill(0xAA);
    gpa.free(mem);
  }

  assert_eq!(arena.chunk_count(), 1);
}

#[test]
fn test_arena_lifo_reuse() {
  let arena = ArenaAllocator::default();

  let a = arena.alloc(32, 8).unwrap();
  arena.free(a);
  let b = arena.alloc(32, 8).unwrap();

  assert_eq!(a.ptr, b.ptr);
  assert_eq!(arena.chunk_count(), 1);
}

#[test]
fn test_arena_non_lifo_alloc() {
  let arena = ArenaAllocator::default();

  let a = arena.alloc(16, 8).unwrap();
  let _b = arena.alloc(16, 8).unwrap();
  arena.free(a);
  let c = arena.alloc(16, 8).unwrap();

  assert_ne!(c.ptr, a.ptr);
}

/// Frees only ever fold back the current chunk. A block in an older chunk is
/// reused once everything allocated after it has been freed in LIFO order.
#[test]
fn test_arena_old_chunk_reuse_needs_full_unwind() {
  let arena = ArenaAllocator::new(ArenaConfig {
    chunk_size: 256,
    ..Default::default()
  });

  let x = arena.alloc(64, 8).unwrap();
  let blocks: Vec<_> = (0..20).map(|_| arena.alloc(1000, 8).unwrap()).collect();
  assert_eq!(arena.chunk_count(), 21);

  arena.free(x);
  let y = arena.alloc(64, 8).unwrap();
  assert_ne!(y.ptr, x.ptr);

  arena.free(y);
  for block in blocks.into_iter().rev() {
    arena.free(block);
  }
  assert_eq!(arena.chunk_count(), 1);

  arena.free(x);
  let z = arena.alloc(64, 8).unwrap();
  assert_eq!(z.ptr, x.ptr);
}

#[test]
fn test_slab_never_reuses_freed_block() {
  let slab = SlabAllocator::new(SlabConfig::default());

  for size in [1, 16, 256, 4096, 10_000] {
    let a = slab.alloc(size, 8).unwrap();
    slab.free(a);
    let b = slab.alloc(size, 8).unwrap();
    assert_ne!(a.ptr, b.ptr);
  }
}

// ============================================================================
// Resize
// ============================================================================

fn check_resize_in_place_then_relocate(allocator: &dyn Allocator) {
  let a = allocator.alloc(64, 8).unwrap();
  unsafe { a.as_bytes_mut() }
    .iter_mut()
    .enumerate()
    .for_each(|(i, byte)| *byte = i as u8);

  let shrunk = allocator.resize(a, 32, 8).unwrap();
  assert_eq!(shrunk.ptr, a.ptr);

  let grown = allocator.resize(shrunk, 128, 8).unwrap();
  assert_eq!(grown.ptr, a.ptr);

  let _pin = allocator.alloc(8, 8).unwrap();
  let moved = allocator.resize(grown, 512, 8).unwrap();
  assert_ne!(moved.ptr, a.ptr);

  let expected: Vec<u8> = (0..32).collect();
  assert_eq!(&unsafe { moved.as_bytes() }[..32], expected.as_slice());
}

#[test]
fn test_fixed_resize() {
  let mut buffer = vec![0u8; 2048];
  let fixed = FixedAllocator::new(&mut buffer);
  check_resize_in_place_then_relocate(&fixed);
}

#[test]
fn test_arena_resize() {
  let arena = ArenaAllocator::default();
  check_resize_in_place_then_relocate(&arena);
}

#[test]
fn test_resize_null_allocates_and_zero_frees() {
  let arena = ArenaAllocator::default();
  let gpa = GpAllocator::default();
  let slab = SlabAllocator::default();
  let allocators: [&dyn Allocator; 3] = [&arena, &gpa, &slab];

  for allocator in allocators {
    let mem = allocator.resize(Slice::empty(), 40, 8).unwrap();
    assert_eq!(mem.len, 40);
    assert_eq!(allocator.resize(mem, 0, 8), Ok(Slice::empty()));
  }

  assert_eq!(arena.current_used(), 0);
  assert_eq!(gpa.bucket_count(gpa.size_class(40, 8).unwrap()), 0);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_gpa_double_free_keeps_state_consistent() {
  let heap = CountingAllocator::default();
  let gpa = GpAllocator::new(GpaConfig {
    backing: Some(&heap),
    ..Default::default()
  });

  let mem = gpa.alloc(24, 8).unwrap();
  gpa.free(mem);
  gpa.free(mem);
  assert_eq!(heap.live(), 0);

  let a = gpa.alloc(24, 8).unwrap();
  let b = gpa.alloc(24, 8).unwrap();
  unsafe {
    a.as_bytes_mut().fill(1);
    b.as_bytes_mut().fill(2);
    assert!(a.as_bytes().iter().all(|&x| x == 1));
  }
  assert_ne!(a.ptr, b.ptr);
  assert_eq!(heap.live(), 1);
}

#[test]
fn test_exhaustion_is_reported() {
  let mut buffer = vec![0u8; 1024];
  let fixed = FixedAllocator::new(&mut buffer);

  assert_eq!(fixed.alloc(4096, 8), Err(AllocError::OutOfMemory { size: 4096, align: 8 }));

  let gpa = GpAllocator::new(GpaConfig {
    backing: Some(&fixed),
    ..Default::default()
  });
  assert!(gpa.alloc(100_000, 8).unwrap_err().is_out_of_memory());
  assert!(gpa.alloc(2048, 8).unwrap_err().is_out_of_memory());
  assert_eq!(gpa.large_count(), 0);
}

#[test]
fn test_invalid_requests_are_rejected_everywhere() {
  let mut buffer = vec![0u8; 256];
  let fixed = FixedAllocator::new(&mut buffer);
  let arena = ArenaAllocator::default();
  let gpa = GpAllocator::default();
  let slab = SlabAllocator::default();
  let allocators: [&dyn Allocator; 4] = [&fixed, &arena, &gpa, &slab];

  for allocator in allocators {
    assert!(matches!(allocator.alloc(0, 8), Err(AllocError::InvalidInput(_))));
    assert!(matches!(
      allocator.alloc(8, 12),
      Err(AllocError::InvalidLayout { .. })
    ));
    assert!(allocator.alloc(8, 0).is_ok());
  }
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_drop_returns_everything_to_backing() {
  let heap = CountingAllocator::default();
  {
    let arena = ArenaAllocator::new(ArenaConfig {
      chunk_size: 512,
      backing: Some(&heap),
    });
    let gpa = GpAllocator::new(GpaConfig {
      backing: Some(&arena),
      ..Default::default()
    });
    let slab = SlabAllocator::new(SlabConfig {
      slab_size: 256,
      backing: Some(&heap),
    });

    for size in [3, 30, 300, 3000, 30_000] {
      gpa.alloc(size, 8).unwrap();
      slab.alloc(size, 8).unwrap();
    }
    assert!(heap.live() > 0);
  }

  assert_eq!(heap.live(), 0);
  assert_eq!(heap.allocs(), heap.frees());
}
