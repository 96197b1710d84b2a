//! Device abstraction layer.
//!
//! The raw graphics API is out of scope for this crate; what the cache
//! consumes is a capability-queryable device. [`GeometryDevice`] is the
//! seam: buffer management plus the three draw styles (indexed draws from
//! device buffers, indexed draws from CPU arrays, and one-vertex-at-a-time
//! immediate submission). [`RecordingDevice`] is the built-in no-op
//! implementation used by tests.

mod context;
mod recording;

pub use context::{ContextCapabilities, ContextId, RenderContext};
pub use recording::{DeviceEvent, RecordingDevice};

use bitflags::bitflags;
use glam::{Vec3, Vec4};

use crate::error::RenderError;
use crate::indexer::PrimitiveKind;

bitflags! {
    /// Usage flags for device buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer holds per-vertex attribute data.
        const VERTEX = 1 << 0;
        /// Buffer holds primitive indices.
        const INDEX = 1 << 1;
    }
}

/// Opaque handle to a device buffer.
///
/// Handles are only meaningful to the device that issued them and are never
/// shared across contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

impl std::fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// CPU attribute arrays bound for an indexed vertex-array draw.
///
/// `texcoords` and `colors` are `None` when the cache decided the batch can
/// be drawn without streaming them (no texture coordinates seen, or one
/// color for the whole batch).
#[derive(Debug, Clone)]
pub struct ArrayBinding<'a> {
    /// Positions, one per vertex.
    pub positions: &'a [Vec3],
    /// Normals, one per vertex.
    pub normals: &'a [Vec3],
    /// Primary texture coordinates, when streamed.
    pub texcoords: Option<&'a [Vec4]>,
    /// Packed RGBA bytes (4 per vertex), when streamed per vertex.
    pub colors: Option<&'a [u8]>,
    /// Per-unit texture coordinates for units 1..N.
    pub multi_texcoords: Vec<&'a [Vec4]>,
}

/// Device buffers bound for an indexed device-buffer draw.
#[derive(Debug, Clone)]
pub struct BufferBinding {
    /// Coordinate (position) buffer.
    pub coordinates: BufferHandle,
    /// Normal buffer.
    pub normals: BufferHandle,
    /// Primary texture-coordinate buffer, when streamed.
    pub texcoords: Option<BufferHandle>,
    /// Packed color buffer, when streamed per vertex.
    pub colors: Option<BufferHandle>,
    /// Per-unit texture-coordinate buffers for units 1..N.
    pub multi_texcoords: Vec<BufferHandle>,
}

/// One vertex submitted on the immediate path.
#[derive(Debug, Clone, PartialEq)]
pub struct ImmediateVertex {
    /// Position.
    pub position: Vec3,
    /// Normal.
    pub normal: Vec3,
    /// Primary texture coordinate, when streamed.
    pub texcoord: Option<Vec4>,
    /// Per-unit texture coordinates for units 1..N.
    pub multi_texcoords: Vec<Vec4>,
    /// Packed RGBA color, when streamed per vertex.
    pub rgba: Option<[u8; 4]>,
}

/// The capability-queryable graphics device consumed by the cache.
///
/// Buffer creation may fail (and the caller falls back to a lower render
/// path); everything else models synchronous calls into the graphics API
/// and must only be invoked from the thread owning the current context.
pub trait GeometryDevice: Send + Sync {
    /// Device name for diagnostics.
    fn name(&self) -> &str;

    /// Create an empty device buffer owned by `ctx`.
    fn create_buffer(
        &self,
        ctx: ContextId,
        usage: BufferUsage,
        label: &str,
    ) -> Result<BufferHandle, RenderError>;

    /// Upload (or re-specify) the full contents of a buffer.
    fn upload_buffer(&self, ctx: ContextId, handle: BufferHandle, data: &[u8]);

    /// Free a device buffer.
    fn delete_buffer(&self, ctx: ContextId, handle: BufferHandle);

    /// Draw indexed primitives sourcing attributes from CPU arrays.
    fn draw_indexed_arrays(
        &self,
        ctx: ContextId,
        kind: PrimitiveKind,
        indices: &[i32],
        arrays: &ArrayBinding<'_>,
    );

    /// Draw indexed primitives sourcing attributes and indices from device
    /// buffers.
    ///
    /// Every bound buffer must have been uploaded; binding an empty buffer
    /// is a programmer error.
    fn draw_indexed_buffers(
        &self,
        ctx: ContextId,
        kind: PrimitiveKind,
        index_buffer: BufferHandle,
        index_count: usize,
        buffers: &BufferBinding,
    );

    /// Open an immediate-mode primitive batch.
    fn begin_immediate(&self, ctx: ContextId, kind: PrimitiveKind);

    /// Submit one vertex to the open immediate batch.
    fn immediate_vertex(&self, ctx: ContextId, vertex: &ImmediateVertex);

    /// Close the open immediate batch.
    fn end_immediate(&self, ctx: ContextId);
}
