use std::io::Read;

use cualloc::{
  Allocator, ArenaAllocator, ArenaConfig, FixedAllocator, GpAllocator, GpaConfig, Layout,
  SlabAllocator, SlabConfig, Slice,
};
use tracing_subscriber::EnvFilter;

/// Waits for ENTER when the demo runs with `--step`, so memory can be
/// inspected with `pmap` or `gdb` between stages.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn report(
  label: &str,
  layout: Layout,
  mem: Slice,
) {
  println!(
    "[{}] {} bytes aligned to {}, address = {:?}, addr % align = {}",
    label,
    layout.size,
    layout.align,
    mem.ptr,
    mem.addr() % layout.align.max(1),
  );
}

fn main() -> cualloc::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let step = std::env::args().any(|arg| arg == "--step");

  // --------------------------------------------------------------------
  // 1) Fixed allocator over a stack buffer: LIFO free, then exhaustion.
  // --------------------------------------------------------------------
  let mut buffer = [0u8; 256];
  let fixed = FixedAllocator::new(&mut buffer);

  let layout_u64 = Layout::new::<u64>();
  let first = fixed.alloc_layout(layout_u64)?;
  report("1 fixed", layout_u64, first);
  fixed.free(first);
  let again = fixed.alloc_layout(layout_u64)?;
  println!("[1] freed block reused? {}", again.ptr == first.ptr);

  match fixed.alloc(1024, 8) {
    Ok(_) => println!("[1] unexpected success"),
    Err(err) => println!("[1] 1 KiB from a 256 byte buffer: {}", err),
  }

  pause(step);

  // --------------------------------------------------------------------
  // 2) Arena: grows by chunks, unwinds them on LIFO free.
  // --------------------------------------------------------------------
  let arena = ArenaAllocator::new(ArenaConfig {
    chunk_size: 1024,
    ..Default::default()
  });

  let blocks = (0..6)
    .map(|_| arena.alloc(400, 16))
    .collect::<cualloc::Result<Vec<_>>>()?;
  println!("\n[2] six 400 byte blocks -> {} chunks", arena.chunk_count());

  for block in blocks.into_iter().rev() {
    arena.free(block);
  }
  println!("[2] after LIFO unwind -> {} chunk", arena.chunk_count());

  pause(step);

  // --------------------------------------------------------------------
  // 3) Slab: free is a no-op, memory only comes back on destroy.
  // --------------------------------------------------------------------
  let slab = SlabAllocator::new(SlabConfig::default());
  let a = slab.alloc(32, 8)?;
  slab.free(a);
  let b = slab.alloc(32, 8)?;
  println!("\n[3] slab reused freed block? {}", a.ptr == b.ptr);

  pause(step);

  // --------------------------------------------------------------------
  // 4) General-purpose allocator on top of the arena.
  // --------------------------------------------------------------------
  let gpa = GpAllocator::new(GpaConfig {
    backing: Some(&arena),
    ..Default::default()
  });

  let layout_array = Layout::array::<u16>(16)?;
  let small = gpa.alloc_layout(layout_array)?;
  report("4 gpa small", layout_array, small);

  let large = gpa.alloc(64 * 1024, 64)?;
  println!(
    "[4] 64 KiB goes to the large list: {} entry, {} arena chunks",
    gpa.large_count(),
    arena.chunk_count()
  );

  gpa.free(small);
  gpa.free(large);
  gpa.free(large);
  println!("[4] double free ignored, large list = {}", gpa.large_count());

  pause(step);

  println!("\n[5] End of walkthrough. Allocators release their memory on drop.");
  Ok(())
}
