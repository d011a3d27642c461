//! Defaults shared by the allocator configurations.

/// Arena chunk size used when `ArenaConfig::chunk_size` is zero.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Slab size used when `SlabConfig::slab_size` is zero.
pub const DEFAULT_SLAB_SIZE: usize = 4096;

/// Largest small-object class of the general-purpose allocator when
/// `GpaConfig::bucket_size` is zero.
pub const DEFAULT_BUCKET_SIZE: usize = 4096;

/// Number of power-of-two size classes, `1 << 0` through `1 << 15` bytes.
pub const NUM_SMALL_BUCKETS: usize = 16;

/// Largest bucket size a configuration may ask for.
pub const MAX_BUCKET_SIZE: usize = 1 << (NUM_SMALL_BUCKETS - 1);

pub(crate) fn or_default(
  value: usize,
  default: usize,
) -> usize {
  if value == 0 { default } else { value }
}
