//! Rendering contexts.
//!
//! A context is an isolated graphics-device session. Device buffers belong
//! to exactly one context and must be freed from the thread on which that
//! context is current; deletion requests from other threads or from caches
//! that die first are parked in the context's deferred-delete queue.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{BufferHandle, GeometryDevice};

/// Identifier of a rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

/// What the context's driver can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextCapabilities {
    /// Supports indexed drawing from CPU vertex arrays.
    pub vertex_arrays: bool,
    /// Supports device buffer objects.
    pub buffer_objects: bool,
}

impl ContextCapabilities {
    /// Vertex arrays and buffer objects.
    pub fn all() -> Self {
        Self {
            vertex_arrays: true,
            buffer_objects: true,
        }
    }

    /// Vertex arrays only.
    pub fn arrays_only() -> Self {
        Self {
            vertex_arrays: true,
            buffer_objects: false,
        }
    }

    /// Buffer objects only.
    pub fn buffers_only() -> Self {
        Self {
            vertex_arrays: false,
            buffer_objects: true,
        }
    }

    /// Neither; only immediate submission works.
    pub fn none() -> Self {
        Self::default()
    }
}

/// One rendering context plus the device resources it owns.
///
/// The context, not the cache, is the arena for buffer lifetimes: a buffer
/// registered here outlives the cache that created it and is freed either
/// by an explicit [`queue_delete`] + [`process_deferred_deletions`] pair or
/// wholesale by [`destroy`] on teardown.
///
/// [`queue_delete`]: RenderContext::queue_delete
/// [`process_deferred_deletions`]: RenderContext::process_deferred_deletions
/// [`destroy`]: RenderContext::destroy
#[derive(Debug)]
pub struct RenderContext {
    id: ContextId,
    capabilities: ContextCapabilities,
    live: Mutex<HashSet<BufferHandle>>,
    deferred: Mutex<Vec<BufferHandle>>,
    destroyed: AtomicBool,
    color_invalidated: AtomicBool,
}

impl RenderContext {
    /// Create a context with the given id and capabilities.
    pub fn new(id: ContextId, capabilities: ContextCapabilities) -> Arc<Self> {
        log::debug!("{id}: created ({capabilities:?})");
        Arc::new(Self {
            id,
            capabilities,
            live: Mutex::new(HashSet::new()),
            deferred: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            color_invalidated: AtomicBool::new(false),
        })
    }

    /// Context id.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Driver capabilities of this context.
    pub fn capabilities(&self) -> ContextCapabilities {
        self.capabilities
    }

    /// Register a buffer as owned by this context.
    pub(crate) fn track_buffer(&self, handle: BufferHandle) {
        if self.is_destroyed() {
            log::warn!("{}: tracking {handle} after teardown", self.id);
            return;
        }
        self.live.lock().unwrap().insert(handle);
    }

    /// Queue a buffer for deletion on this context's own thread.
    ///
    /// Safe to call from any thread and after teardown (then a no-op).
    pub fn queue_delete(&self, handle: BufferHandle) {
        // The move from `live` to `deferred` happens under the `live` lock
        // so that a concurrent destroy() sees the handle in exactly one of
        // the two sets.
        let mut live = self.live.lock().unwrap();
        if live.remove(&handle) {
            self.deferred.lock().unwrap().push(handle);
            log::trace!("{}: queued {handle} for deferred deletion", self.id);
        }
    }

    /// Free all queued buffers. Must run on the thread where this context
    /// is current.
    pub fn process_deferred_deletions(&self, device: &dyn GeometryDevice) {
        let queued: Vec<BufferHandle> = std::mem::take(&mut *self.deferred.lock().unwrap());
        for handle in queued {
            device.delete_buffer(self.id, handle);
        }
    }

    /// Tear the context down, freeing every buffer it still owns.
    ///
    /// Works regardless of whether the caches that created the buffers are
    /// still alive. Idempotent.
    pub fn destroy(&self, device: &dyn GeometryDevice) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Drain `live` before `deferred`: queue_delete() moves handles from
        // live to deferred under the live lock, so any move racing this
        // teardown has completed its push by the time the drain below
        // returns, and the handle is freed from one set or the other.
        let live: Vec<BufferHandle> = self.live.lock().unwrap().drain().collect();
        log::debug!("{}: teardown, freeing {} buffers", self.id, live.len());
        for handle in live {
            device.delete_buffer(self.id, handle);
        }
        self.process_deferred_deletions(device);
    }

    /// Whether [`destroy`](RenderContext::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Number of buffers currently owned by this context.
    pub fn live_buffer_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// Number of buffers waiting in the deferred-delete queue.
    pub fn deferred_delete_count(&self) -> usize {
        self.deferred.lock().unwrap().len()
    }

    /// Note that per-vertex color streaming clobbered the current color.
    pub fn invalidate_current_color(&self) {
        self.color_invalidated.store(true, Ordering::Release);
    }

    /// Consume the current-color-invalidated flag.
    pub fn take_color_invalidated(&self) -> bool {
        self.color_invalidated.swap(false, Ordering::AcqRel)
    }
}

// Contexts are shared across caches and threads.
static_assertions::assert_impl_all!(RenderContext: Send, Sync);
