/// Rounds `$value` up to the machine word size.
///
/// Used for in-band header sizes, which must keep the payload that follows
/// them word aligned.
///
/// ```rust
/// use cualloc::align;
///
/// let word = std::mem::size_of::<usize>();
/// assert_eq!(align!(1), word);
/// assert_eq!(align!(word), word);
/// assert_eq!(align!(word + 1), 2 * word);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, ::core::mem::size_of::<usize>())
  };
}

/// Rounds `$value` up to `$align`, which must be a power of two.
///
/// ```rust
/// use cualloc::align_to;
///
/// assert_eq!(align_to!(17, 16), 32);
/// assert_eq!(align_to!(32, 16), 32);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Rounds `value` up to `align`, returning `None` on overflow.
///
/// `align` must be a power of two.
#[inline]
pub fn align_up(
  value: usize,
  align: usize,
) -> Option<usize> {
  debug_assert!(align.is_power_of_two());
  value.checked_add(align - 1)?;
  Some(align_to!(value, align))
}

#[inline]
pub fn is_aligned(
  value: usize,
  align: usize,
) -> bool {
  value & (align - 1) == 0
}

/// Base-2 logarithm of a power of two.
#[inline]
pub fn log2_pow2(value: usize) -> usize {
  debug_assert!(value.is_power_of_two());
  value.trailing_zeros() as usize
}
