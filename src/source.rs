//! Input interfaces for cache population.
//!
//! The scene-graph traversal that feeds a [`PrimitiveVertexCache`] is an
//! external collaborator. It supplies per-vertex attributes through
//! [`VertexSource`], material colors through [`ColorSource`], and per-unit
//! texture-coordinate policy through [`TexcoordBinding`].
//!
//! [`PrimitiveVertexCache`]: crate::cache::PrimitiveVertexCache

use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

/// Per-vertex attribute supplier.
///
/// One call per attribute per vertex; the cache copies everything by value,
/// so implementations may hand out transient data.
pub trait VertexSource {
    /// Vertex position in object space.
    fn point(&self) -> Vec3;
    /// Vertex normal.
    fn normal(&self) -> Vec3;
    /// Primary (unit 0) texture coordinate, homogeneous.
    fn texture_coords(&self) -> Vec4;
    /// Bump-mapping coordinate.
    fn bump_coords(&self) -> Vec2 {
        Vec2::ZERO
    }
    /// Index into the material's color arrays.
    fn material_index(&self) -> usize {
        0
    }
    /// Index into explicit per-unit texture-coordinate arrays, if the
    /// traversal provided one.
    fn texcoord_detail_index(&self) -> Option<i32> {
        None
    }
}

/// A plain value implementation of [`VertexSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleVertex {
    /// Position.
    pub point: Vec3,
    /// Normal.
    pub normal: Vec3,
    /// Primary texture coordinate.
    pub texture_coords: Vec4,
    /// Bump coordinate.
    pub bump_coords: Vec2,
    /// Material index.
    pub material_index: usize,
    /// Explicit texture-coordinate source index (None = no detail).
    pub texcoord_detail_index: Option<i32>,
}

impl SimpleVertex {
    /// Create a vertex with the given position and defaults for the rest.
    pub fn at(point: Vec3) -> Self {
        Self {
            point,
            normal: Vec3::Z,
            texture_coords: Vec4::new(0.0, 0.0, 0.0, 1.0),
            bump_coords: Vec2::ZERO,
            material_index: 0,
            texcoord_detail_index: None,
        }
    }
}

impl VertexSource for SimpleVertex {
    fn point(&self) -> Vec3 {
        self.point
    }
    fn normal(&self) -> Vec3 {
        self.normal
    }
    fn texture_coords(&self) -> Vec4 {
        self.texture_coords
    }
    fn bump_coords(&self) -> Vec2 {
        self.bump_coords
    }
    fn material_index(&self) -> usize {
        self.material_index
    }
    fn texcoord_detail_index(&self) -> Option<i32> {
        self.texcoord_detail_index
    }
}

/// Material color lookup for resolving a per-vertex packed RGBA color.
///
/// Out-of-range material indices are clamped, never an error: the diffuse
/// and transparency arrays are clamped independently of each other.
#[derive(Clone)]
pub enum ColorSource {
    /// Packed `0xRRGGBBAA` colors.
    PackedRgba(Vec<u32>),
    /// Separate diffuse colors and transparency values.
    DiffuseTransparency {
        /// Diffuse RGB per material index.
        diffuse: Vec<Vec3>,
        /// Transparency (0 = opaque) per material index.
        transparency: Vec<f32>,
    },
}

impl ColorSource {
    /// A single opaque white color.
    pub fn opaque_white() -> Self {
        Self::PackedRgba(vec![0xffff_ffff])
    }

    /// Resolve a material index to packed RGBA bytes.
    pub fn resolve(&self, material_index: usize) -> [u8; 4] {
        match self {
            Self::PackedRgba(colors) => {
                if colors.is_empty() {
                    return [0xff, 0xff, 0xff, 0xff];
                }
                let idx = material_index.min(colors.len() - 1);
                colors[idx].to_be_bytes()
            }
            Self::DiffuseTransparency {
                diffuse,
                transparency,
            } => {
                let rgb = if diffuse.is_empty() {
                    Vec3::ONE
                } else {
                    diffuse[material_index.min(diffuse.len() - 1)]
                };
                let alpha = if transparency.is_empty() {
                    0.0
                } else {
                    transparency[material_index.min(transparency.len() - 1)]
                };
                [
                    float_to_byte(rgb.x),
                    float_to_byte(rgb.y),
                    float_to_byte(rgb.z),
                    float_to_byte(1.0 - alpha),
                ]
            }
        }
    }
}

impl std::fmt::Debug for ColorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PackedRgba(colors) => f
                .debug_struct("ColorSource::PackedRgba")
                .field("len", &colors.len())
                .finish(),
            Self::DiffuseTransparency {
                diffuse,
                transparency,
            } => f
                .debug_struct("ColorSource::DiffuseTransparency")
                .field("diffuse_len", &diffuse.len())
                .field("transparency_len", &transparency.len())
                .finish(),
        }
    }
}

fn float_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Texture-coordinate generator for a [`TexcoordBinding::Generated`] unit.
pub type TexcoordGenerator = dyn Fn(Vec3, Vec3) -> Vec4 + Send + Sync;

/// Where a texture unit (unit index >= 1) sources its coordinates.
///
/// Resolved once per vertex at insertion time, in this precedence order:
/// explicit coordinates when the vertex carries a detail index, a generator
/// function of (position, normal), or a copy of the unit-0 coordinate.
#[derive(Clone)]
pub enum TexcoordBinding {
    /// Explicit per-unit coordinates, indexed by the vertex's
    /// texture-coordinate detail index.
    Explicit(Arc<Vec<Vec4>>),
    /// Coordinates computed from position and normal.
    Generated(Arc<TexcoordGenerator>),
    /// Fall back to the unit-0 primary coordinate.
    Default,
}

impl std::fmt::Debug for TexcoordBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(coords) => f
                .debug_struct("TexcoordBinding::Explicit")
                .field("len", &coords.len())
                .finish(),
            Self::Generated(_) => write!(f, "TexcoordBinding::Generated"),
            Self::Default => write!(f, "TexcoordBinding::Default"),
        }
    }
}
