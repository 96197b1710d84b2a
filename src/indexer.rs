//! Primitive topology accumulation.
//!
//! A [`PrimitiveIndexer`] is a dumb append-only accumulator of vertex-array
//! indices plus a draw-mode dispatcher. It never reorders or normalizes
//! winding; the owning cache is responsible for index validity and
//! consistency. The state machine is Open (accepting `add_*`) → Closed
//! (render-only), with `close()` the only transition.

use std::sync::Arc;

use crate::buffer_cache::{BufferKind, DeviceBufferCache};
use crate::device::{ArrayBinding, BufferBinding, GeometryDevice, RenderContext};
use crate::error::RenderError;
use crate::sort;

/// The primitive kind an indexer accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Index triples.
    Triangles,
    /// Index pairs.
    Lines,
    /// Single indices.
    Points,
}

impl PrimitiveKind {
    /// Number of indices per primitive.
    pub fn indices_per_primitive(&self) -> usize {
        match self {
            Self::Triangles => 3,
            Self::Lines => 2,
            Self::Points => 1,
        }
    }

    /// Lowercase name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Triangles => "triangles",
            Self::Lines => "lines",
            Self::Points => "points",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexerState {
    Open,
    Closed,
}

/// Accumulates primitive connectivity referencing deduplicated vertex
/// indices.
#[derive(Debug)]
pub struct PrimitiveIndexer {
    kind: PrimitiveKind,
    state: IndexerState,
    indices: Vec<i32>,
    /// Bumped when the index sequence changes; gates index-buffer reupload.
    version: u64,
    /// Per-context device index buffer, created lazily once closed.
    index_buffers: DeviceBufferCache,
}

impl PrimitiveIndexer {
    /// Create an open, empty indexer for the given kind.
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            state: IndexerState::Open,
            indices: Vec::new(),
            version: 0,
            index_buffers: DeviceBufferCache::new(BufferKind::Index),
        }
    }

    /// Primitive kind of this indexer.
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    /// Append one triangle, in the order given.
    pub fn add_triangle(&mut self, i0: i32, i1: i32, i2: i32) {
        assert_eq!(self.kind, PrimitiveKind::Triangles, "kind mismatch");
        self.assert_open("add_triangle");
        self.indices.extend_from_slice(&[i0, i1, i2]);
        self.version += 1;
    }

    /// Append one line, in the order given.
    pub fn add_line(&mut self, i0: i32, i1: i32) {
        assert_eq!(self.kind, PrimitiveKind::Lines, "kind mismatch");
        self.assert_open("add_line");
        self.indices.extend_from_slice(&[i0, i1]);
        self.version += 1;
    }

    /// Append one point.
    pub fn add_point(&mut self, i0: i32) {
        assert_eq!(self.kind, PrimitiveKind::Points, "kind mismatch");
        self.assert_open("add_point");
        self.indices.push(i0);
        self.version += 1;
    }

    /// Compact the index sequence and transition to Closed.
    ///
    /// Idempotent; there is no reverse transition.
    pub fn close(&mut self) {
        if self.state == IndexerState::Closed {
            return;
        }
        self.indices.shrink_to_fit();
        self.state = IndexerState::Closed;
        log::trace!(
            "indexer({}): closed with {} indices",
            self.kind.label(),
            self.indices.len()
        );
    }

    /// Whether `close()` has run.
    pub fn is_closed(&self) -> bool {
        self.state == IndexerState::Closed
    }

    /// Number of accumulated indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of complete primitives.
    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.kind.indices_per_primitive()
    }

    /// The accumulated index sequence.
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    /// Reorder triangle triples in place by ascending depth.
    ///
    /// Only valid for a closed triangle indexer; the sequence length never
    /// changes, so Closed-state read-only-topology still holds.
    pub fn sort_triangles_by(&mut self, depths: &mut [f32]) {
        assert_eq!(self.kind, PrimitiveKind::Triangles, "kind mismatch");
        assert!(self.is_closed(), "sort_triangles_by before close()");
        sort::shell_sort_triangles(&mut self.indices, depths);
        self.version += 1;
    }

    /// Draw via the CPU vertex-array path.
    ///
    /// # Panics
    ///
    /// Panics when called before `close()`.
    pub fn render_arrays(
        &self,
        device: &dyn GeometryDevice,
        ctx: &RenderContext,
        arrays: &ArrayBinding<'_>,
    ) {
        self.assert_closed("render_arrays");
        if self.indices.is_empty() {
            return;
        }
        device.draw_indexed_arrays(ctx.id(), self.kind, &self.indices, arrays);
    }

    /// Draw via the device-buffer path, binding (and lazily creating or
    /// re-uploading) this indexer's per-context index buffer.
    ///
    /// # Panics
    ///
    /// Panics when called before `close()`.
    pub fn render_buffers(
        &self,
        device: &dyn GeometryDevice,
        ctx: &Arc<RenderContext>,
        buffers: &BufferBinding,
    ) -> Result<(), RenderError> {
        self.assert_closed("render_buffers");
        if self.indices.is_empty() {
            return Ok(());
        }
        let index_buffer = self.index_buffers.bind(
            device,
            ctx,
            bytemuck::cast_slice(&self.indices),
            self.version,
        )?;
        device.draw_indexed_buffers(
            ctx.id(),
            self.kind,
            index_buffer,
            self.indices.len(),
            buffers,
        );
        Ok(())
    }

    fn assert_open(&self, operation: &str) {
        assert!(
            self.state == IndexerState::Open,
            "indexer({}): {operation} after close()",
            self.kind.label()
        );
    }

    fn assert_closed(&self, operation: &str) {
        assert!(
            self.state == IndexerState::Closed,
            "indexer({}): {operation} before close()",
            self.kind.label()
        );
    }
}
