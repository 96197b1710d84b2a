//! Per-context device buffer caching.
//!
//! One `DeviceBufferCache` serves one attribute kind across all rendering
//! contexts. Buffers are created lazily on first bind for a context and
//! re-uploaded only when the backing data's version counter changed, never
//! by content comparison. Ownership of the device handle lives in the
//! context's arena, so context teardown works even after the cache is gone;
//! conversely, dropping the cache queues deferred deletes instead of
//! touching the device from an arbitrary thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::device::{BufferHandle, BufferUsage, ContextId, GeometryDevice, RenderContext};
use crate::error::RenderError;

/// Which attribute array a cache serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex positions.
    Coordinate,
    /// Vertex normals.
    Normal,
    /// Packed RGBA colors.
    Color,
    /// Texture coordinates for the given unit (0 = primary).
    Texcoord(usize),
    /// Primitive indices.
    Index,
}

impl BufferKind {
    fn usage(&self) -> BufferUsage {
        match self {
            Self::Index => BufferUsage::INDEX,
            _ => BufferUsage::VERTEX,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Coordinate => "coordinates".to_string(),
            Self::Normal => "normals".to_string(),
            Self::Color => "colors".to_string(),
            Self::Texcoord(unit) => format!("texcoords unit {unit}"),
            Self::Index => "indices".to_string(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    handle: BufferHandle,
    uploaded_version: Option<u64>,
    /// Weak: the context arena owns the buffer, not this cache.
    context: Weak<RenderContext>,
}

/// Lazily-created, version-gated device buffers, one per context.
#[derive(Debug)]
pub struct DeviceBufferCache {
    kind: BufferKind,
    entries: Mutex<HashMap<ContextId, Entry>>,
}

impl DeviceBufferCache {
    /// Create an empty cache for the given attribute kind.
    pub fn new(kind: BufferKind) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get this context's buffer, creating it on first use and re-uploading
    /// `data` when `version` differs from the last upload for this context.
    ///
    /// # Panics
    ///
    /// Panics when `data` is empty: binding a buffer with no data is a
    /// programmer error.
    pub fn bind(
        &self,
        device: &dyn GeometryDevice,
        ctx: &Arc<RenderContext>,
        data: &[u8],
        version: u64,
    ) -> Result<BufferHandle, RenderError> {
        assert!(
            !data.is_empty(),
            "binding {} buffer with no data",
            self.kind.label()
        );

        if ctx.is_destroyed() {
            return Err(RenderError::ContextDestroyed(ctx.id().0));
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = match entries.entry(ctx.id()) {
            std::collections::hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let handle =
                    device.create_buffer(ctx.id(), self.kind.usage(), &self.kind.label())?;
                ctx.track_buffer(handle);
                log::debug!("{}: created {} buffer {handle}", ctx.id(), self.kind.label());
                vacant.insert(Entry {
                    handle,
                    uploaded_version: None,
                    context: Arc::downgrade(ctx),
                })
            }
        };

        if entry.uploaded_version != Some(version) {
            device.upload_buffer(ctx.id(), entry.handle, data);
            entry.uploaded_version = Some(version);
        }
        Ok(entry.handle)
    }

    /// Whether a buffer already exists for the given context.
    pub fn has_buffer_for(&self, ctx: ContextId) -> bool {
        self.entries.lock().unwrap().contains_key(&ctx)
    }

    /// Number of contexts with a live buffer in this cache.
    pub fn context_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Drop for DeviceBufferCache {
    fn drop(&mut self) {
        let entries = self.entries.get_mut().unwrap();
        for entry in entries.values() {
            // A dead context already freed the buffer through its arena.
            if let Some(ctx) = entry.context.upgrade() {
                ctx.queue_delete(entry.handle);
            }
        }
    }
}

static_assertions::assert_impl_all!(DeviceBufferCache: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ContextCapabilities, DeviceEvent, RecordingDevice};

    fn context(id: u32) -> Arc<RenderContext> {
        RenderContext::new(ContextId(id), ContextCapabilities::all())
    }

    #[test]
    fn test_lazy_creation_and_version_gated_upload() {
        let device = RecordingDevice::new();
        let ctx = context(1);
        let cache = DeviceBufferCache::new(BufferKind::Coordinate);
        let data = [1u8, 2, 3, 4];

        let handle = cache.bind(&device, &ctx, &data, 1).unwrap();
        // Same version: no second upload.
        assert_eq!(cache.bind(&device, &ctx, &data, 1).unwrap(), handle);
        // New version: re-upload, same handle.
        assert_eq!(cache.bind(&device, &ctx, &data, 2).unwrap(), handle);

        let uploads =
            device.count_events(|e| matches!(e, DeviceEvent::BufferUploaded { .. }));
        let creations =
            device.count_events(|e| matches!(e, DeviceEvent::BufferCreated { .. }));
        assert_eq!(creations, 1);
        assert_eq!(uploads, 2);
    }

    #[test]
    fn test_one_buffer_per_context() {
        let device = RecordingDevice::new();
        let ctx_a = context(1);
        let ctx_b = context(2);
        let cache = DeviceBufferCache::new(BufferKind::Normal);
        let data = [0u8; 12];

        let a = cache.bind(&device, &ctx_a, &data, 1).unwrap();
        let b = cache.bind(&device, &ctx_b, &data, 1).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.context_count(), 2);
        assert!(cache.has_buffer_for(ContextId(1)));
        assert!(!cache.has_buffer_for(ContextId(3)));
    }

    #[test]
    #[should_panic(expected = "no data")]
    fn test_bind_without_data_panics() {
        let device = RecordingDevice::new();
        let ctx = context(1);
        let cache = DeviceBufferCache::new(BufferKind::Color);
        let _ = cache.bind(&device, &ctx, &[], 1);
    }

    #[test]
    fn test_drop_queues_deferred_deletes() {
        let device = RecordingDevice::new();
        let ctx = context(1);
        {
            let cache = DeviceBufferCache::new(BufferKind::Coordinate);
            cache.bind(&device, &ctx, &[0u8; 4], 1).unwrap();
            assert_eq!(ctx.live_buffer_count(), 1);
        }
        // Cache is gone; the buffer waits in the deferred queue.
        assert_eq!(ctx.live_buffer_count(), 0);
        assert_eq!(ctx.deferred_delete_count(), 1);
        assert_eq!(device.live_buffer_count(), 1);

        ctx.process_deferred_deletions(&device);
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn test_context_teardown_with_cache_still_alive() {
        let device = RecordingDevice::new();
        let ctx = context(1);
        let cache = DeviceBufferCache::new(BufferKind::Coordinate);
        cache.bind(&device, &ctx, &[0u8; 4], 1).unwrap();

        ctx.destroy(&device);
        assert_eq!(device.live_buffer_count(), 0);

        // A destroyed context can no longer host buffers.
        let err = cache.bind(&device, &context_destroyed(&device), &[0u8; 4], 2);
        assert!(err.is_err());

        // Dropping the cache afterwards must not double-free.
        drop(cache);
        ctx.process_deferred_deletions(&device);
        assert_eq!(
            device.count_events(|e| matches!(e, DeviceEvent::BufferDeleted { .. })),
            1
        );
    }

    fn context_destroyed(device: &RecordingDevice) -> Arc<RenderContext> {
        let ctx = context(9);
        ctx.destroy(device);
        ctx
    }
}
