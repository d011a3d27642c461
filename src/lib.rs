//! # cualloc - Composable Memory Allocators
//!
//! A family of allocators sharing one small interface ([`Allocator`]:
//! `alloc`, `resize`, `free`), each able to draw its memory from another
//! one. Containers take a `&dyn Allocator` and never see what sits behind it.
//!
//! ## Overview
//!
//! ```text
//!   Delegation chain:
//!
//!   ┌──────────────┐   buckets /    ┌──────────────┐   chunks    ┌──────────────┐
//!   │ GpAllocator  │ ─────────────► │ArenaAllocator│ ──────────► │ CAllocator   │
//!   │ size classes │  large allocs  │ bump + LIFO  │             │ PageAllocator│
//!   └──────────────┘                └──────────────┘             └──────────────┘
//!          ▲
//!          │ alloc / resize / free
//!     containers
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   cualloc
//!   ├── align      - Alignment macros (align!, align_to!) and helpers
//!   ├── allocator  - The Allocator trait
//!   ├── layout     - (size, align) requests
//!   ├── slice      - Non-owning (ptr, len) views
//!   ├── fixed      - FixedAllocator over a caller buffer
//!   ├── arena      - ArenaAllocator, chunked with LIFO free
//!   ├── slab       - SlabAllocator, bulk release only
//!   ├── gpa        - GpAllocator, segregated size classes
//!   ├── bitmap     - Bitmap and BitSet
//!   ├── c_alloc    - CAllocator, the platform heap
//!   ├── page       - PageAllocator, mmap-backed (unix)
//!   ├── wasm       - WasmAllocator, linear memory (wasm32)
//!   └── counting   - CountingAllocator, bookkeeping wrapper
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cualloc::{Allocator, ArenaAllocator, ArenaConfig, GpAllocator, GpaConfig};
//!
//! let arena = ArenaAllocator::new(ArenaConfig {
//!     chunk_size: 64 * 1024,
//!     ..Default::default()
//! });
//! let gpa = GpAllocator::new(GpaConfig {
//!     backing: Some(&arena),
//!     ..Default::default()
//! });
//!
//! let mem = gpa.alloc(48, 8).unwrap();
//! assert_eq!(mem.addr() % 8, 0);
//!
//! let mem = gpa.resize(mem, 60, 8).unwrap();
//! gpa.free(mem);
//! ```
//!
//! ## How Bump Allocation Works
//!
//! The fixed allocator and every arena chunk write a header before each
//! block holding the bump offset from before the allocation:
//!
//! ```text
//!   ┌─────┬──────────┬─────┬──────────┬────────────────────┐
//!   │ hdr │ block A  │ hdr │ block B  │     free space     │
//!   └─────┴──────────┴─────┴──────────┴────────────────────┘
//!                                     ▲
//!                                     └── used
//! ```
//!
//! Freeing B reads its header and moves `used` back to the end of A.
//! Freeing A while B is alive does nothing.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: allocators are `!Sync`; share one across
//!   threads only behind a lock
//! - **No compaction**: live blocks never move unless `resize` says so
//! - **Callers track sizes**: `free`/`resize` expect the length last returned
//!
//! ## Safety
//!
//! The allocators hand out raw memory as [`Slice`]s. Reading or writing
//! through them is `unsafe` and only valid until the block is freed, the
//! allocator is reset, or it is destroyed.

pub mod align;
pub mod allocator;
pub mod arena;
pub mod bitmap;
mod block;
mod bump;
pub mod c_alloc;
pub mod config;
pub mod counting;
pub mod error;
pub mod fixed;
pub mod gpa;
pub mod layout;
#[cfg(unix)]
pub mod page;
pub mod slab;
pub mod slice;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use allocator::{Allocator, Backing};
pub use arena::{ArenaAllocator, ArenaConfig};
pub use bitmap::{BitSet, Bitmap};
pub use c_alloc::{CAllocator, default_backing};
pub use counting::CountingAllocator;
pub use error::{AllocError, Result};
pub use fixed::FixedAllocator;
pub use gpa::{GpAllocator, GpaConfig};
pub use layout::Layout;
#[cfg(unix)]
pub use page::PageAllocator;
pub use slab::{SlabAllocator, SlabConfig};
pub use slice::Slice;
#[cfg(target_arch = "wasm32")]
pub use wasm::WasmAllocator;
