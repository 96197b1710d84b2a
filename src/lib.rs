//! # primcache
//!
//! Vertex deduplication and indexing cache for immediate-mode-style
//! scene-graph geometry.
//!
//! A scene-graph traversal emits per-vertex attribute bundles while
//! generating primitives; this crate turns that stream into compact,
//! render-ready data:
//!
//! - [`PrimitiveVertexCache`] deduplicates identical vertices into parallel
//!   attribute arrays and accumulates triangle/line/point connectivity.
//! - Rendering picks the fastest path the current [`RenderContext`]
//!   supports: per-context device buffers, CPU vertex arrays, or immediate
//!   per-vertex submission — falling back silently, never failing.
//! - [`PrimitiveVertexCache::depth_sort_triangles`] reorders triangles
//!   back-to-front for transparency.
//!
//! ## Example
//!
//! ```
//! use primcache::{
//!     ContextCapabilities, ContextId, PrimitiveVertexCache, RecordingDevice, RenderContext,
//!     SimpleVertex,
//! };
//! use glam::Vec3;
//!
//! let mut cache = PrimitiveVertexCache::with_defaults();
//! cache.add_triangle(
//!     &SimpleVertex::at(Vec3::new(0.0, 0.0, 0.0)),
//!     &SimpleVertex::at(Vec3::new(1.0, 0.0, 0.0)),
//!     &SimpleVertex::at(Vec3::new(0.0, 1.0, 0.0)),
//! );
//! cache.close();
//!
//! let device = RecordingDevice::new();
//! let ctx = RenderContext::new(ContextId(1), ContextCapabilities::all());
//! cache.render_triangles(&device, &ctx);
//! ```

pub mod arrays;
pub mod buffer_cache;
pub mod cache;
pub mod device;
pub mod error;
pub mod indexer;
pub mod settings;
pub mod sort;
pub mod source;
pub mod vertex;

// Re-export main types for convenience
pub use buffer_cache::{BufferKind, DeviceBufferCache};
pub use cache::PrimitiveVertexCache;
pub use device::{
    ArrayBinding, BufferBinding, BufferHandle, BufferUsage, ContextCapabilities, ContextId,
    DeviceEvent, GeometryDevice, ImmediateVertex, RecordingDevice, RenderContext,
};
pub use error::RenderError;
pub use indexer::{PrimitiveIndexer, PrimitiveKind};
pub use settings::RenderSettings;
pub use source::{ColorSource, SimpleVertex, TexcoordBinding, VertexSource};
pub use vertex::{AttributeVertex, VertexDeduplicationTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the caching subsystem.
///
/// Optional; only emits a startup log line.
pub fn init() {
    log::info!("primcache v{VERSION} initialized");
}
