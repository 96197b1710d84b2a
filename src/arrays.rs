//! Growable parallel attribute arrays.
//!
//! Every array is indexed by the deduplicated vertex index: slot `i` in all
//! arrays describes the same logical vertex. Texture units >= 1 grow in
//! lockstep with unit 0, with their per-unit source policy resolved at
//! insertion time.

use glam::{Vec2, Vec3, Vec4};

use crate::source::TexcoordBinding;
use crate::vertex::AttributeVertex;

/// Parallel per-vertex attribute storage.
#[derive(Debug, Default)]
pub struct AttributeArrays {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec4>,
    bumpcoords: Vec<Vec2>,
    rgba: Vec<u8>,
    /// Per texture unit (unit 1 at slot 0), one coordinate per vertex.
    multi_texcoords: Vec<Vec<Vec4>>,
    /// Bumped on every structural change; lets device buffer caches detect
    /// stale uploads without comparing contents.
    version: u64,
}

impl AttributeArrays {
    /// Create empty arrays serving `extra_units` texture units beyond unit 0.
    pub fn new(extra_units: usize) -> Self {
        Self {
            multi_texcoords: vec![Vec::new(); extra_units],
            ..Self::default()
        }
    }

    /// Append one vertex to every array.
    ///
    /// `bindings[u]` decides where texture unit `u + 1` sources its
    /// coordinate: explicit lookup through the vertex's detail index, a
    /// generator of (position, normal), or a copy of the unit-0 coordinate.
    ///
    /// # Panics
    ///
    /// Panics when an explicit binding is selected and the vertex's detail
    /// index is out of range for the bound coordinate array.
    pub fn push_vertex(&mut self, vertex: &AttributeVertex, bindings: &[TexcoordBinding]) {
        debug_assert_eq!(bindings.len(), self.multi_texcoords.len());

        self.positions.push(vertex.position);
        self.normals.push(vertex.normal);
        self.texcoords.push(vertex.texcoord);
        self.bumpcoords.push(vertex.bumpcoord);
        self.rgba.extend_from_slice(&vertex.rgba);

        for (unit, binding) in bindings.iter().enumerate() {
            let coord = match binding {
                TexcoordBinding::Explicit(coords) if vertex.texcoord_idx >= 0 => {
                    let idx = vertex.texcoord_idx as usize;
                    assert!(
                        idx < coords.len(),
                        "texture unit {}: detail index {} out of range ({} coords)",
                        unit + 1,
                        idx,
                        coords.len()
                    );
                    coords[idx]
                }
                TexcoordBinding::Generated(generator) => {
                    generator(vertex.position, vertex.normal)
                }
                // Explicit without a detail index falls back like Default.
                TexcoordBinding::Explicit(_) | TexcoordBinding::Default => vertex.texcoord,
            };
            self.multi_texcoords[unit].push(coord);
        }

        self.version += 1;
        debug_assert!(self.check_consistency());
    }

    /// Number of vertices stored.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no vertex has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Trim every array to its exact length.
    ///
    /// Idempotent; only capacity is released, so the data version stays
    /// unchanged.
    pub fn fit(&mut self) {
        self.positions.shrink_to_fit();
        self.normals.shrink_to_fit();
        self.texcoords.shrink_to_fit();
        self.bumpcoords.shrink_to_fit();
        self.rgba.shrink_to_fit();
        for coords in &mut self.multi_texcoords {
            coords.shrink_to_fit();
        }
    }

    /// Data version for upload caching.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Positions, one per vertex.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Normals, one per vertex.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Primary texture coordinates, one per vertex.
    pub fn texcoords(&self) -> &[Vec4] {
        &self.texcoords
    }

    /// Bump coordinates, one per vertex.
    pub fn bumpcoords(&self) -> &[Vec2] {
        &self.bumpcoords
    }

    /// Packed RGBA bytes, four per vertex.
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Number of texture units served beyond unit 0.
    pub fn extra_unit_count(&self) -> usize {
        self.multi_texcoords.len()
    }

    /// Coordinates for texture unit `unit` (1-based), one per vertex.
    pub fn multi_texcoords(&self, unit: usize) -> &[Vec4] {
        assert!(unit >= 1, "unit 0 is served by texcoords()");
        &self.multi_texcoords[unit - 1]
    }

    /// Positions as raw bytes for device upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Normals as raw bytes for device upload.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Primary texture coordinates as raw bytes for device upload.
    pub fn texcoord_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texcoords)
    }

    /// Per-unit texture coordinates as raw bytes for device upload.
    pub fn multi_texcoord_bytes(&self, unit: usize) -> &[u8] {
        bytemuck::cast_slice(self.multi_texcoords(unit))
    }

    fn check_consistency(&self) -> bool {
        let n = self.positions.len();
        self.normals.len() == n
            && self.texcoords.len() == n
            && self.bumpcoords.len() == n
            && self.rgba.len() == n * 4
            && self.multi_texcoords.iter().all(|c| c.len() == n)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn vertex(texcoord_idx: i32) -> AttributeVertex {
        AttributeVertex {
            position: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::Y,
            texcoord: Vec4::new(0.25, 0.75, 0.0, 1.0),
            bumpcoord: Vec2::new(0.5, 0.5),
            rgba: [10, 20, 30, 40],
            texcoord_idx,
        }
    }

    #[test]
    fn test_arrays_grow_in_lockstep() {
        let mut arrays = AttributeArrays::new(2);
        let bindings = vec![TexcoordBinding::Default, TexcoordBinding::Default];
        arrays.push_vertex(&vertex(-1), &bindings);
        arrays.push_vertex(&vertex(-1), &bindings);

        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays.normals().len(), 2);
        assert_eq!(arrays.bumpcoords().len(), 2);
        assert_eq!(arrays.rgba().len(), 8);
        assert_eq!(arrays.multi_texcoords(1).len(), 2);
        assert_eq!(arrays.multi_texcoords(2).len(), 2);
    }

    #[test]
    fn test_default_binding_copies_unit_zero() {
        let mut arrays = AttributeArrays::new(1);
        arrays.push_vertex(&vertex(-1), &[TexcoordBinding::Default]);
        assert_eq!(arrays.multi_texcoords(1)[0], arrays.texcoords()[0]);
    }

    #[test]
    fn test_explicit_binding_uses_detail_index() {
        let coords = Arc::new(vec![Vec4::ZERO, Vec4::ONE, Vec4::splat(2.0)]);
        let mut arrays = AttributeArrays::new(1);
        arrays.push_vertex(&vertex(2), &[TexcoordBinding::Explicit(coords)]);
        assert_eq!(arrays.multi_texcoords(1)[0], Vec4::splat(2.0));
    }

    #[test]
    fn test_explicit_binding_without_detail_falls_back() {
        let coords = Arc::new(vec![Vec4::ONE]);
        let mut arrays = AttributeArrays::new(1);
        arrays.push_vertex(&vertex(-1), &[TexcoordBinding::Explicit(coords)]);
        assert_eq!(arrays.multi_texcoords(1)[0], arrays.texcoords()[0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_explicit_binding_out_of_range_panics() {
        let coords = Arc::new(vec![Vec4::ONE]);
        let mut arrays = AttributeArrays::new(1);
        arrays.push_vertex(&vertex(3), &[TexcoordBinding::Explicit(coords)]);
    }

    #[test]
    fn test_generated_binding() {
        let generator = Arc::new(|position: Vec3, normal: Vec3| {
            Vec4::new(position.x, normal.y, 0.0, 1.0)
        });
        let mut arrays = AttributeArrays::new(1);
        arrays.push_vertex(&vertex(-1), &[TexcoordBinding::Generated(generator)]);
        assert_eq!(arrays.multi_texcoords(1)[0], Vec4::new(1.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_version_bumps_on_push() {
        let mut arrays = AttributeArrays::new(0);
        let v0 = arrays.version();
        arrays.push_vertex(&vertex(-1), &[]);
        assert!(arrays.version() > v0);
    }

    #[test]
    fn test_fit_is_idempotent() {
        let mut arrays = AttributeArrays::new(0);
        arrays.push_vertex(&vertex(-1), &[]);
        arrays.fit();
        let version = arrays.version();
        let len = arrays.len();
        arrays.fit();
        assert_eq!(arrays.version(), version);
        assert_eq!(arrays.len(), len);
    }

    #[test]
    fn test_byte_views_have_expected_sizes() {
        let mut arrays = AttributeArrays::new(1);
        arrays.push_vertex(&vertex(-1), &[TexcoordBinding::Default]);
        assert_eq!(arrays.position_bytes().len(), 12);
        assert_eq!(arrays.normal_bytes().len(), 12);
        assert_eq!(arrays.texcoord_bytes().len(), 16);
        assert_eq!(arrays.multi_texcoord_bytes(1).len(), 16);
    }
}
