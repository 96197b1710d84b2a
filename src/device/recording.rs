//! Recording device for tests and development.
//!
//! Performs no GPU work; validates the call contract and records every call
//! so tests can assert which render path was taken and which resources were
//! touched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    ArrayBinding, BufferBinding, BufferHandle, BufferUsage, ContextId, GeometryDevice,
    ImmediateVertex, RenderContext,
};
use crate::error::RenderError;
use crate::indexer::PrimitiveKind;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A buffer was created.
    BufferCreated {
        /// Owning context.
        ctx: ContextId,
        /// New handle.
        handle: BufferHandle,
    },
    /// A buffer's contents were (re)uploaded.
    BufferUploaded {
        /// Owning context.
        ctx: ContextId,
        /// Target handle.
        handle: BufferHandle,
        /// Uploaded byte count.
        bytes: usize,
    },
    /// A buffer was freed.
    BufferDeleted {
        /// Owning context.
        ctx: ContextId,
        /// Freed handle.
        handle: BufferHandle,
    },
    /// An indexed draw sourced from CPU arrays.
    DrawArrays {
        /// Current context.
        ctx: ContextId,
        /// Primitive kind.
        kind: PrimitiveKind,
        /// Number of indices drawn.
        index_count: usize,
    },
    /// An indexed draw sourced from device buffers.
    DrawBuffers {
        /// Current context.
        ctx: ContextId,
        /// Primitive kind.
        kind: PrimitiveKind,
        /// Number of indices drawn.
        index_count: usize,
    },
    /// A completed immediate-mode batch.
    ImmediateBatch {
        /// Current context.
        ctx: ContextId,
        /// Primitive kind.
        kind: PrimitiveKind,
        /// Number of vertices submitted between begin and end.
        vertex_count: usize,
    },
}

#[derive(Debug)]
struct BufferState {
    ctx: ContextId,
    uploaded_bytes: usize,
}

/// A [`GeometryDevice`] that records calls instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_handle: AtomicU64,
    buffers: Mutex<HashMap<BufferHandle, BufferState>>,
    events: Mutex<Vec<DeviceEvent>>,
    open_batch: Mutex<Option<(ContextId, PrimitiveKind, usize)>>,
}

impl RecordingDevice {
    /// Create an empty recording device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer and register it with the context's arena in one step.
    pub fn create_tracked_buffer(
        &self,
        ctx: &Arc<RenderContext>,
        usage: BufferUsage,
        label: &str,
    ) -> Result<BufferHandle, RenderError> {
        let handle = self.create_buffer(ctx.id(), usage, label)?;
        ctx.track_buffer(handle);
        Ok(handle)
    }

    /// Snapshot of all recorded events, in call order.
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Forget all recorded events (live buffers are kept).
    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Number of buffers created and not yet deleted.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }

    /// Count recorded events matching a predicate.
    pub fn count_events(&self, predicate: impl Fn(&DeviceEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    fn record(&self, event: DeviceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl GeometryDevice for RecordingDevice {
    fn name(&self) -> &str {
        "Recording Device"
    }

    fn create_buffer(
        &self,
        ctx: ContextId,
        _usage: BufferUsage,
        label: &str,
    ) -> Result<BufferHandle, RenderError> {
        let handle = BufferHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.buffers.lock().unwrap().insert(
            handle,
            BufferState {
                ctx,
                uploaded_bytes: 0,
            },
        );
        log::trace!("RecordingDevice: created {handle} ({label}) on {ctx}");
        self.record(DeviceEvent::BufferCreated { ctx, handle });
        Ok(handle)
    }

    fn upload_buffer(&self, ctx: ContextId, handle: BufferHandle, data: &[u8]) {
        let mut buffers = self.buffers.lock().unwrap();
        let state = buffers
            .get_mut(&handle)
            .unwrap_or_else(|| panic!("upload to unknown {handle}"));
        assert_eq!(state.ctx, ctx, "{handle} uploaded from the wrong context");
        state.uploaded_bytes = data.len();
        drop(buffers);
        log::trace!("RecordingDevice: uploaded {} bytes to {handle}", data.len());
        self.record(DeviceEvent::BufferUploaded {
            ctx,
            handle,
            bytes: data.len(),
        });
    }

    fn delete_buffer(&self, ctx: ContextId, handle: BufferHandle) {
        let removed = self.buffers.lock().unwrap().remove(&handle);
        assert!(removed.is_some(), "delete of unknown {handle}");
        log::trace!("RecordingDevice: deleted {handle} on {ctx}");
        self.record(DeviceEvent::BufferDeleted { ctx, handle });
    }

    fn draw_indexed_arrays(
        &self,
        ctx: ContextId,
        kind: PrimitiveKind,
        indices: &[i32],
        arrays: &ArrayBinding<'_>,
    ) {
        let vertex_count = arrays.positions.len();
        assert_eq!(arrays.normals.len(), vertex_count);
        for &index in indices {
            assert!(
                (index as usize) < vertex_count,
                "index {index} out of range for {vertex_count} vertices"
            );
        }
        self.record(DeviceEvent::DrawArrays {
            ctx,
            kind,
            index_count: indices.len(),
        });
    }

    fn draw_indexed_buffers(
        &self,
        ctx: ContextId,
        kind: PrimitiveKind,
        index_buffer: BufferHandle,
        index_count: usize,
        buffers: &BufferBinding,
    ) {
        let known = self.buffers.lock().unwrap();
        let mut bound = vec![index_buffer, buffers.coordinates, buffers.normals];
        bound.extend(buffers.texcoords);
        bound.extend(buffers.colors);
        bound.extend(buffers.multi_texcoords.iter().copied());
        for handle in bound {
            let state = known
                .get(&handle)
                .unwrap_or_else(|| panic!("draw with unknown {handle}"));
            assert!(
                state.uploaded_bytes > 0,
                "draw with {handle} bound but no data uploaded"
            );
        }
        drop(known);
        self.record(DeviceEvent::DrawBuffers {
            ctx,
            kind,
            index_count,
        });
    }

    fn begin_immediate(&self, ctx: ContextId, kind: PrimitiveKind) {
        let mut batch = self.open_batch.lock().unwrap();
        assert!(batch.is_none(), "begin_immediate with a batch already open");
        *batch = Some((ctx, kind, 0));
    }

    fn immediate_vertex(&self, ctx: ContextId, _vertex: &ImmediateVertex) {
        let mut batch = self.open_batch.lock().unwrap();
        let (batch_ctx, _, count) = batch
            .as_mut()
            .expect("immediate_vertex without begin_immediate");
        assert_eq!(*batch_ctx, ctx, "immediate_vertex on the wrong context");
        *count += 1;
    }

    fn end_immediate(&self, ctx: ContextId) {
        let (batch_ctx, kind, vertex_count) = self
            .open_batch
            .lock()
            .unwrap()
            .take()
            .expect("end_immediate without begin_immediate");
        assert_eq!(batch_ctx, ctx, "end_immediate on the wrong context");
        self.record(DeviceEvent::ImmediateBatch {
            ctx,
            kind,
            vertex_count,
        });
    }
}

static_assertions::assert_impl_all!(RecordingDevice: Send, Sync);
