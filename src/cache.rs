//! The primitive vertex cache.
//!
//! [`PrimitiveVertexCache`] is the orchestrator: it deduplicates incoming
//! per-vertex attribute bundles into compact parallel arrays, accumulates
//! triangle/line/point connectivity, and renders the result through the
//! fastest path the current context supports — device buffers, CPU vertex
//! arrays, or immediate per-vertex submission.
//!
//! Population (`add_*`, `close`, `fit`, `depth_sort_triangles`) is exclusive
//! on one instance; rendering takes `&self` and distinct instances may
//! render concurrently from different threads.

use std::sync::Arc;

use glam::Vec4;

use crate::arrays::AttributeArrays;
use crate::buffer_cache::{BufferKind, DeviceBufferCache};
use crate::device::{
    ArrayBinding, BufferBinding, GeometryDevice, ImmediateVertex, RenderContext,
};
use crate::error::RenderError;
use crate::indexer::{PrimitiveIndexer, PrimitiveKind};
use crate::settings::RenderSettings;
use crate::sort;
use crate::source::{ColorSource, TexcoordBinding, VertexSource};
use crate::vertex::{AttributeVertex, VertexDeduplicationTable};

/// Vertex deduplication and indexing cache for one batch of scene-graph
/// geometry.
pub struct PrimitiveVertexCache {
    settings: Arc<RenderSettings>,
    color_source: ColorSource,
    /// Source policy for texture units 1..N.
    texcoord_bindings: Vec<TexcoordBinding>,

    table: VertexDeduplicationTable,
    arrays: AttributeArrays,
    triangles: PrimitiveIndexer,
    lines: PrimitiveIndexer,
    points: PrimitiveIndexer,

    coordinate_buffers: DeviceBufferCache,
    normal_buffers: DeviceBufferCache,
    color_buffers: DeviceBufferCache,
    texcoord_buffers: DeviceBufferCache,
    multi_texcoord_buffers: Vec<DeviceBufferCache>,

    /// Resolved color of the very first vertex this cache saw.
    first_color: Option<[u8; 4]>,
    /// Monotonic: set once any resolved color differs from `first_color`.
    color_per_vertex: bool,
    /// Whether unit-0 texture coordinates are streamed. Fixed at
    /// construction: texturing is a property of the batch's material, not
    /// something to infer from coordinate values.
    has_texcoords: bool,
    closed: bool,
    /// Last depth-sort plane, bit-compared to skip redundant sorts.
    sort_plane: Option<Vec4>,
}

impl PrimitiveVertexCache {
    /// Create an empty cache.
    ///
    /// `textured` declares whether the batch's material textures unit 0; a
    /// textured batch streams its primary coordinates even when they are all
    /// equal. `texcoord_bindings[u]` configures texture unit `u + 1`; unit 0
    /// always takes the vertex's primary texture coordinate.
    pub fn new(
        settings: Arc<RenderSettings>,
        color_source: ColorSource,
        textured: bool,
        texcoord_bindings: Vec<TexcoordBinding>,
    ) -> Self {
        let extra_units = texcoord_bindings.len();
        Self {
            settings,
            color_source,
            arrays: AttributeArrays::new(extra_units),
            texcoord_bindings,
            table: VertexDeduplicationTable::new(),
            triangles: PrimitiveIndexer::new(PrimitiveKind::Triangles),
            lines: PrimitiveIndexer::new(PrimitiveKind::Lines),
            points: PrimitiveIndexer::new(PrimitiveKind::Points),
            coordinate_buffers: DeviceBufferCache::new(BufferKind::Coordinate),
            normal_buffers: DeviceBufferCache::new(BufferKind::Normal),
            color_buffers: DeviceBufferCache::new(BufferKind::Color),
            texcoord_buffers: DeviceBufferCache::new(BufferKind::Texcoord(0)),
            multi_texcoord_buffers: (1..=extra_units)
                .map(|unit| DeviceBufferCache::new(BufferKind::Texcoord(unit)))
                .collect(),
            first_color: None,
            color_per_vertex: false,
            has_texcoords: textured || extra_units > 0,
            closed: false,
            sort_plane: None,
        }
    }

    /// Create an untextured cache with default settings and a single opaque
    /// white material.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(RenderSettings::default()),
            ColorSource::opaque_white(),
            false,
            Vec::new(),
        )
    }

    /// Add one triangle. Vertices are deduplicated; indices are forwarded
    /// to the triangle indexer in the order given.
    pub fn add_triangle(
        &mut self,
        v0: &dyn VertexSource,
        v1: &dyn VertexSource,
        v2: &dyn VertexSource,
    ) {
        assert!(!self.closed, "add_triangle after close()");
        let i0 = self.insert_vertex(v0);
        let i1 = self.insert_vertex(v1);
        let i2 = self.insert_vertex(v2);
        self.triangles.add_triangle(i0, i1, i2);
    }

    /// Add one line segment.
    pub fn add_line(&mut self, v0: &dyn VertexSource, v1: &dyn VertexSource) {
        assert!(!self.closed, "add_line after close()");
        let i0 = self.insert_vertex(v0);
        let i1 = self.insert_vertex(v1);
        self.lines.add_line(i0, i1);
    }

    /// Add one point.
    pub fn add_point(&mut self, v0: &dyn VertexSource) {
        assert!(!self.closed, "add_point after close()");
        let i0 = self.insert_vertex(v0);
        self.points.add_point(i0);
    }

    /// Finalize all indexers and compact the cache for rendering.
    ///
    /// Idempotent. No primitives can be added afterwards.
    pub fn close(&mut self) {
        if !self.closed {
            self.triangles.close();
            self.lines.close();
            self.points.close();
            self.closed = true;
            log::debug!(
                "cache closed: {} vertices, {} triangles, {} lines, {} points",
                self.arrays.len(),
                self.triangles.primitive_count(),
                self.lines.primitive_count(),
                self.points.primitive_count()
            );
        }
        self.fit();
    }

    /// Trim the attribute arrays to exact size and discard the dedup table.
    ///
    /// The table is write-once-read-many during population; after the last
    /// primitive it only wastes memory.
    pub fn fit(&mut self) {
        self.arrays.fit();
        self.table.clear();
    }

    /// Reorder triangles back-to-front against a view plane given in the
    /// geometry's local space, ascending by the mean plane distance of each
    /// triangle's vertices.
    ///
    /// A second call with a bit-identical plane is a no-op.
    ///
    /// # Panics
    ///
    /// Panics when called before `close()`.
    pub fn depth_sort_triangles(&mut self, plane: Vec4) {
        assert!(self.closed, "depth_sort_triangles before close()");
        if let Some(previous) = self.sort_plane {
            if previous.to_array().map(f32::to_bits) == plane.to_array().map(f32::to_bits) {
                log::trace!("depth sort skipped: plane unchanged");
                return;
            }
        }
        self.sort_plane = Some(plane);
        if self.triangles.primitive_count() < 2 {
            return;
        }
        let mut depths =
            sort::triangle_depths(self.triangles.indices(), self.arrays.positions(), plane);
        self.triangles.sort_triangles_by(&mut depths);
    }

    /// Render the accumulated triangles.
    pub fn render_triangles(&self, device: &dyn GeometryDevice, ctx: &Arc<RenderContext>) {
        self.render_indexer(&self.triangles, device, ctx);
    }

    /// Render the accumulated lines.
    pub fn render_lines(&self, device: &dyn GeometryDevice, ctx: &Arc<RenderContext>) {
        self.render_indexer(&self.lines, device, ctx);
    }

    /// Render the accumulated points.
    pub fn render_points(&self, device: &dyn GeometryDevice, ctx: &Arc<RenderContext>) {
        self.render_indexer(&self.points, device, ctx);
    }

    /// Number of unique vertices in the cache.
    pub fn vertex_count(&self) -> usize {
        self.arrays.len()
    }

    /// Number of accumulated triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.primitive_count()
    }

    /// Number of accumulated lines.
    pub fn line_count(&self) -> usize {
        self.lines.primitive_count()
    }

    /// Number of accumulated points.
    pub fn point_count(&self) -> usize {
        self.points.primitive_count()
    }

    /// Whether per-vertex colors must be streamed (resolved colors were not
    /// uniform across the batch). Monotonic within one cache.
    pub fn color_per_vertex(&self) -> bool {
        self.color_per_vertex
    }

    /// Whether texture coordinates are streamed for this batch.
    pub fn has_texcoords(&self) -> bool {
        self.has_texcoords
    }

    /// Whether `close()` has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The triangle index sequence (for inspection; primarily tests).
    pub fn triangle_indices(&self) -> &[i32] {
        self.triangles.indices()
    }

    fn insert_vertex(&mut self, source: &dyn VertexSource) -> i32 {
        let rgba = self.color_source.resolve(source.material_index());
        match self.first_color {
            None => self.first_color = Some(rgba),
            Some(first) => {
                if rgba != first {
                    self.color_per_vertex = true;
                }
            }
        }

        let vertex = AttributeVertex {
            position: source.point(),
            normal: source.normal(),
            texcoord: source.texture_coords(),
            bumpcoord: source.bump_coords(),
            rgba,
            texcoord_idx: source.texcoord_detail_index().unwrap_or(-1),
        };
        let (index, is_new) = self.table.lookup_or_insert(&vertex);
        if is_new {
            self.arrays.push_vertex(&vertex, &self.texcoord_bindings);
        }
        index
    }

    /// Pick the render path per the capability/heuristic priority: device
    /// buffers, then CPU vertex arrays, then immediate submission.
    fn render_indexer(
        &self,
        indexer: &PrimitiveIndexer,
        device: &dyn GeometryDevice,
        ctx: &Arc<RenderContext>,
    ) {
        assert!(self.closed, "render before close()");
        if indexer.index_count() == 0 {
            return;
        }

        let capabilities = ctx.capabilities();
        let use_buffers = capabilities.buffer_objects
            && (self.coordinate_buffers.has_buffer_for(ctx.id())
                || self.settings.should_create_vbo(self.vertex_count()));

        if use_buffers {
            match self.render_with_buffers(indexer, device, ctx) {
                Ok(()) => {
                    log::trace!("{}: {} via device buffers", ctx.id(), indexer.kind().label());
                    self.after_draw(ctx);
                    return;
                }
                Err(err) => {
                    // Capability/resource trouble is never fatal here.
                    log::warn!(
                        "{}: device buffer path failed ({err}), falling back",
                        ctx.id()
                    );
                }
            }
        }

        if capabilities.vertex_arrays {
            log::trace!("{}: {} via vertex arrays", ctx.id(), indexer.kind().label());
            indexer.render_arrays(device, ctx, &self.array_binding());
        } else {
            log::trace!("{}: {} via immediate mode", ctx.id(), indexer.kind().label());
            self.render_immediate(indexer, device, ctx);
        }
        self.after_draw(ctx);
    }

    fn render_with_buffers(
        &self,
        indexer: &PrimitiveIndexer,
        device: &dyn GeometryDevice,
        ctx: &Arc<RenderContext>,
    ) -> Result<(), RenderError> {
        let version = self.arrays.version();
        let coordinates =
            self.coordinate_buffers
                .bind(device, ctx, self.arrays.position_bytes(), version)?;
        let normals =
            self.normal_buffers
                .bind(device, ctx, self.arrays.normal_bytes(), version)?;
        let colors = if self.color_per_vertex {
            Some(self.color_buffers.bind(device, ctx, self.arrays.rgba(), version)?)
        } else {
            None
        };
        let texcoords = if self.has_texcoords {
            Some(self.texcoord_buffers.bind(
                device,
                ctx,
                self.arrays.texcoord_bytes(),
                version,
            )?)
        } else {
            None
        };
        let mut multi_texcoords = Vec::with_capacity(self.multi_texcoord_buffers.len());
        for (slot, cache) in self.multi_texcoord_buffers.iter().enumerate() {
            multi_texcoords.push(cache.bind(
                device,
                ctx,
                self.arrays.multi_texcoord_bytes(slot + 1),
                version,
            )?);
        }

        let binding = BufferBinding {
            coordinates,
            normals,
            texcoords,
            colors,
            multi_texcoords,
        };
        indexer.render_buffers(device, ctx, &binding)
    }

    fn array_binding(&self) -> ArrayBinding<'_> {
        ArrayBinding {
            positions: self.arrays.positions(),
            normals: self.arrays.normals(),
            texcoords: self.has_texcoords.then(|| self.arrays.texcoords()),
            colors: self.color_per_vertex.then(|| self.arrays.rgba()),
            multi_texcoords: (1..=self.arrays.extra_unit_count())
                .map(|unit| self.arrays.multi_texcoords(unit))
                .collect(),
        }
    }

    fn render_immediate(
        &self,
        indexer: &PrimitiveIndexer,
        device: &dyn GeometryDevice,
        ctx: &Arc<RenderContext>,
    ) {
        let rgba = self.arrays.rgba();
        device.begin_immediate(ctx.id(), indexer.kind());
        for &index in indexer.indices() {
            let i = index as usize;
            let vertex = ImmediateVertex {
                position: self.arrays.positions()[i],
                normal: self.arrays.normals()[i],
                texcoord: self.has_texcoords.then(|| self.arrays.texcoords()[i]),
                multi_texcoords: (1..=self.arrays.extra_unit_count())
                    .map(|unit| self.arrays.multi_texcoords(unit)[i])
                    .collect(),
                rgba: self
                    .color_per_vertex
                    .then(|| [rgba[i * 4], rgba[i * 4 + 1], rgba[i * 4 + 2], rgba[i * 4 + 3]]),
            };
            device.immediate_vertex(ctx.id(), &vertex);
        }
        device.end_immediate(ctx.id());
    }

    /// Per-vertex color streaming clobbers the device's current color; let
    /// the shared state tracker know.
    fn after_draw(&self, ctx: &RenderContext) {
        if self.color_per_vertex {
            ctx.invalidate_current_color();
        }
    }
}

impl std::fmt::Debug for PrimitiveVertexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveVertexCache")
            .field("vertex_count", &self.vertex_count())
            .field("triangle_count", &self.triangle_count())
            .field("line_count", &self.line_count())
            .field("point_count", &self.point_count())
            .field("color_per_vertex", &self.color_per_vertex)
            .field("closed", &self.closed)
            .finish()
    }
}

// Caches move across threads between population and rendering.
static_assertions::assert_impl_all!(PrimitiveVertexCache: Send, Sync);

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::device::{ContextCapabilities, ContextId, DeviceEvent, RecordingDevice};
    use crate::source::SimpleVertex;

    fn vertex(x: f32, y: f32, z: f32) -> SimpleVertex {
        SimpleVertex::at(Vec3::new(x, y, z))
    }

    fn context(id: u32, capabilities: ContextCapabilities) -> Arc<RenderContext> {
        RenderContext::new(ContextId(id), capabilities)
    }

    fn force_vbo_settings() -> Arc<RenderSettings> {
        Arc::new(RenderSettings {
            force_vbo: true,
            ..RenderSettings::default()
        })
    }

    #[test]
    fn test_shared_vertices_are_deduplicated() {
        let mut cache = PrimitiveVertexCache::with_defaults();
        let (a, b, c, d) = (
            vertex(0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0),
            vertex(0.0, 1.0, 0.0),
            vertex(1.0, 1.0, 0.0),
        );
        cache.add_triangle(&a, &b, &c);
        cache.add_triangle(&b, &c, &d);

        assert_eq!(cache.vertex_count(), 4);
        assert_eq!(cache.triangle_count(), 2);
        assert_eq!(cache.triangle_indices(), &[0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_all_indices_stay_in_range() {
        let mut cache = PrimitiveVertexCache::with_defaults();
        for i in 0..50 {
            let x = (i % 7) as f32;
            cache.add_triangle(&vertex(x, 0.0, 0.0), &vertex(x, 1.0, 0.0), &vertex(x, 2.0, 0.0));
            cache.add_line(&vertex(x, 0.0, 0.0), &vertex(x, 3.0, 0.0));
            cache.add_point(&vertex(x, 4.0, 0.0));
        }
        let n = cache.vertex_count() as i32;
        assert!(cache.triangle_indices().iter().all(|&i| i < n));
    }

    #[test]
    fn test_color_per_vertex_is_monotonic() {
        let colors = ColorSource::PackedRgba(vec![0xff0000ff, 0x00ff00ff]);
        let mut cache = PrimitiveVertexCache::new(
            Arc::new(RenderSettings::default()),
            colors,
            false,
            Vec::new(),
        );
        let mut red = vertex(0.0, 0.0, 0.0);
        red.material_index = 0;
        let mut green = vertex(1.0, 0.0, 0.0);
        green.material_index = 1;

        cache.add_line(&red, &red);
        assert!(!cache.color_per_vertex());

        cache.add_line(&red, &green);
        assert!(cache.color_per_vertex());

        // Never reverts.
        cache.add_line(&red, &red);
        assert!(cache.color_per_vertex());
    }

    #[test]
    fn test_material_index_clamped_not_fatal() {
        let colors = ColorSource::DiffuseTransparency {
            diffuse: vec![Vec3::X, Vec3::Y, Vec3::Z],
            transparency: vec![0.0, 0.0, 0.0],
        };
        let mut cache = PrimitiveVertexCache::new(
            Arc::new(RenderSettings::default()),
            colors,
            false,
            Vec::new(),
        );
        let mut v = vertex(0.0, 0.0, 0.0);
        v.material_index = 5; // only 3 diffuse colors: clamps to 2
        cache.add_point(&v);
        assert_eq!(cache.vertex_count(), 1);
    }

    #[test]
    fn test_close_and_fit_are_idempotent() {
        let mut cache = PrimitiveVertexCache::with_defaults();
        cache.add_triangle(
            &vertex(0.0, 0.0, 0.0),
            &vertex(1.0, 0.0, 0.0),
            &vertex(0.0, 1.0, 0.0),
        );
        cache.close();
        let count = cache.vertex_count();
        let indices = cache.triangle_indices().to_vec();
        cache.close();
        cache.fit();
        assert_eq!(cache.vertex_count(), count);
        assert_eq!(cache.triangle_indices(), indices.as_slice());
    }

    #[test]
    #[should_panic(expected = "after close()")]
    fn test_add_after_close_panics() {
        let mut cache = PrimitiveVertexCache::with_defaults();
        cache.close();
        cache.add_point(&vertex(0.0, 0.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "render before close()")]
    fn test_render_before_close_panics() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::all());
        let mut cache = PrimitiveVertexCache::with_defaults();
        cache.add_point(&vertex(0.0, 0.0, 0.0));
        cache.render_points(&device, &ctx);
    }

    fn depth_sorted_cache() -> PrimitiveVertexCache {
        let mut cache = PrimitiveVertexCache::with_defaults();
        // Three triangles at z = 4, 0, 2.
        for z in [4.0, 0.0, 2.0] {
            cache.add_triangle(
                &vertex(0.0, 0.0, z),
                &vertex(1.0, 0.0, z),
                &vertex(0.0, 1.0, z),
            );
        }
        cache.close();
        cache
    }

    #[test]
    fn test_depth_sort_orders_back_to_front() {
        let mut cache = depth_sorted_cache();
        cache.depth_sort_triangles(Vec4::new(0.0, 0.0, 1.0, 0.0));
        // Triangles now ordered by ascending z: 0, 2, 4.
        assert_eq!(cache.triangle_indices(), &[3, 4, 5, 6, 7, 8, 0, 1, 2]);
    }

    #[test]
    fn test_depth_sort_same_plane_is_noop() {
        let mut cache = depth_sorted_cache();
        let plane = Vec4::new(0.0, 0.0, 1.0, 0.0);
        cache.depth_sort_triangles(plane);
        let sorted = cache.triangle_indices().to_vec();
        cache.depth_sort_triangles(plane);
        assert_eq!(cache.triangle_indices(), sorted.as_slice());

        // A different plane re-sorts.
        cache.depth_sort_triangles(Vec4::new(0.0, 0.0, -1.0, 0.0));
        assert_eq!(cache.triangle_indices(), &[0, 1, 2, 6, 7, 8, 3, 4, 5]);
    }

    #[test]
    fn test_immediate_fallback_when_no_capabilities() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::none());
        let mut cache = PrimitiveVertexCache::with_defaults();
        cache.add_triangle(
            &vertex(0.0, 0.0, 0.0),
            &vertex(1.0, 0.0, 0.0),
            &vertex(0.0, 1.0, 0.0),
        );
        cache.close();
        cache.render_triangles(&device, &ctx);

        assert_eq!(
            device.events(),
            vec![DeviceEvent::ImmediateBatch {
                ctx: ContextId(1),
                kind: PrimitiveKind::Triangles,
                vertex_count: 3
            }]
        );
    }

    #[test]
    fn test_vertex_array_path() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::arrays_only());
        let mut cache = PrimitiveVertexCache::with_defaults();
        cache.add_line(&vertex(0.0, 0.0, 0.0), &vertex(1.0, 0.0, 0.0));
        cache.close();
        cache.render_lines(&device, &ctx);

        assert_eq!(
            device.events(),
            vec![DeviceEvent::DrawArrays {
                ctx: ContextId(1),
                kind: PrimitiveKind::Lines,
                index_count: 2
            }]
        );
    }

    #[test]
    fn test_device_buffer_path_creates_then_reuses() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::all());
        let mut cache = PrimitiveVertexCache::new(
            force_vbo_settings(),
            ColorSource::opaque_white(),
            false,
            Vec::new(),
        );
        cache.add_triangle(
            &vertex(0.0, 0.0, 0.0),
            &vertex(1.0, 0.0, 0.0),
            &vertex(0.0, 1.0, 0.0),
        );
        cache.close();

        cache.render_triangles(&device, &ctx);
        cache.render_triangles(&device, &ctx);

        // coordinates + normals + indices, created and uploaded exactly once.
        assert_eq!(
            device.count_events(|e| matches!(e, DeviceEvent::BufferCreated { .. })),
            3
        );
        assert_eq!(
            device.count_events(|e| matches!(e, DeviceEvent::BufferUploaded { .. })),
            3
        );
        assert_eq!(
            device.count_events(|e| matches!(e, DeviceEvent::DrawBuffers { .. })),
            2
        );
    }

    #[test]
    fn test_small_mesh_skips_vbo_by_heuristic() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::all());
        let mut cache = PrimitiveVertexCache::with_defaults();
        // 3 vertices < default min_vertex_count_for_vbo (20).
        cache.add_triangle(
            &vertex(0.0, 0.0, 0.0),
            &vertex(1.0, 0.0, 0.0),
            &vertex(0.0, 1.0, 0.0),
        );
        cache.close();
        cache.render_triangles(&device, &ctx);

        assert_eq!(
            device.count_events(|e| matches!(e, DeviceEvent::DrawArrays { .. })),
            1
        );
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn test_color_streaming_notifies_tracker() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::arrays_only());
        let colors = ColorSource::PackedRgba(vec![0xff0000ff, 0x00ff00ff]);
        let mut cache = PrimitiveVertexCache::new(
            Arc::new(RenderSettings::default()),
            colors,
            false,
            Vec::new(),
        );
        let mut red = vertex(0.0, 0.0, 0.0);
        red.material_index = 0;
        let mut green = vertex(1.0, 0.0, 0.0);
        green.material_index = 1;
        cache.add_line(&red, &green);
        cache.close();

        cache.render_lines(&device, &ctx);
        assert!(ctx.take_color_invalidated());
    }

    #[test]
    fn test_uniform_color_does_not_notify_tracker() {
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::arrays_only());
        let mut cache = PrimitiveVertexCache::with_defaults();
        cache.add_line(&vertex(0.0, 0.0, 0.0), &vertex(1.0, 0.0, 0.0));
        cache.close();

        cache.render_lines(&device, &ctx);
        assert!(!ctx.take_color_invalidated());
    }

    #[test]
    fn test_texcoord_detail_feeds_explicit_unit() {
        let coords = Arc::new(vec![
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(0.5, 0.5, 0.0, 1.0),
        ]);
        let mut cache = PrimitiveVertexCache::new(
            Arc::new(RenderSettings::default()),
            ColorSource::opaque_white(),
            false,
            vec![TexcoordBinding::Explicit(coords)],
        );
        let mut v = vertex(0.0, 0.0, 0.0);
        v.texcoord_detail_index = Some(1);
        v.bump_coords = Vec2::new(0.1, 0.2);
        cache.add_point(&v);

        assert!(cache.has_texcoords());
        assert_eq!(cache.vertex_count(), 1);
    }

    #[test]
    fn test_textured_batch_streams_uniform_coords() {
        // Texturing is declared up front, so a batch whose coordinates all
        // happen to share one value still gets its texcoord buffer.
        let device = RecordingDevice::new();
        let ctx = context(1, ContextCapabilities::all());
        let mut cache = PrimitiveVertexCache::new(
            force_vbo_settings(),
            ColorSource::opaque_white(),
            true,
            Vec::new(),
        );
        cache.add_triangle(
            &vertex(0.0, 0.0, 0.0),
            &vertex(1.0, 0.0, 0.0),
            &vertex(0.0, 1.0, 0.0),
        );
        assert!(cache.has_texcoords());
        cache.close();
        cache.render_triangles(&device, &ctx);

        // coordinates + normals + texcoords + indices.
        assert_eq!(
            device.count_events(|e| matches!(e, DeviceEvent::BufferCreated { .. })),
            4
        );
    }

    #[test]
    fn test_untextured_batch_skips_texcoord_streaming() {
        let cache = PrimitiveVertexCache::with_defaults();
        assert!(!cache.has_texcoords());
    }
}
