//! Deferred deallocation for render-graph objects
//!
//! Voices, buses and convolution kernels are wrapped in `basedrop::Owned` /
//! `basedrop::Shared`. Dropping them on the audio thread only enqueues a
//! pointer; the memory is released on a dedicated collector thread.
//!
//! A voice carries its reverb's frequency-domain history (megabytes for a
//! long tail), so freeing it inline in the audio callback would glitch.
//!
//! ```ignore
//! use basedrop::Owned;
//! use drift_core::engine::gc::gc_handle;
//!
//! let voice = Owned::new(&gc_handle(), voice);
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("drift-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread only
            let mut collector = Collector::new();
            let _ = tx.send(collector.handle());

            log::info!("Render GC thread started");

            loop {
                collector.collect();
                thread::sleep(Duration::from_millis(100));
            }
        })
        .expect("Failed to spawn render GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Handle for creating `Owned<T>` / `Shared<T>` allocations
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
