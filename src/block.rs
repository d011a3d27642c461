use std::{mem, ptr};

/// In-band header written immediately before every payload handed out by a
/// [`BumpRegion`](crate::bump::BumpRegion).
///
/// ```text
///   ┌──────────────┬─────────┬─────────────────────┐
///   │ prev_offset  │ padding │      payload        │
///   └──────────────┴─────────┴─────────────────────┘
///                  ▲         ▲
///                  │         └── returned pointer (aligned)
///                  └── header sits right before the payload,
///                      padding is before the header
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  /// Region `used` value before this allocation was made.
  pub prev_offset: usize,
}

pub const HEADER_SIZE: usize = crate::align!(mem::size_of::<Header>());

impl Header {
  pub fn new(prev_offset: usize) -> Self {
    Self { prev_offset }
  }

  /// Stores the header right before `payload`.
  ///
  /// # Safety
  ///
  /// `payload - HEADER_SIZE .. payload` must be writable memory owned by
  /// the caller. The payload alignment may be smaller than the header's,
  /// so the write is unaligned.
  pub unsafe fn write_before(
    self,
    payload: *mut u8,
  ) {
    unsafe { ptr::write_unaligned(payload.sub(HEADER_SIZE) as *mut Header, self) };
  }

  /// Loads the header stored right before `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by a region that wrote a header.
  pub unsafe fn read_before(payload: *const u8) -> Self {
    unsafe { ptr::read_unaligned(payload.sub(HEADER_SIZE) as *const Header) }
  }
}
