//! Vertex attribute bundles and the deduplication table.
//!
//! [`AttributeVertex`] carries one vertex's full attribute set;
//! [`VertexDeduplicationTable`] maps each distinct bundle to a compact,
//! stable array index so that identical vertices share a single slot in the
//! attribute arrays.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use glam::{Vec2, Vec3, Vec4};

/// One vertex's complete attribute bundle.
///
/// Values are copied in and never mutated afterwards. Equality is exact,
/// bit-level comparison over every field; the hash deliberately covers only
/// the geometric fields (see [`AttributeVertex::geometric_hash`]).
#[derive(Debug, Clone, Copy)]
pub struct AttributeVertex {
    /// Position in object space.
    pub position: Vec3,
    /// Normal.
    pub normal: Vec3,
    /// Primary (unit 0) texture coordinate, homogeneous.
    pub texcoord: Vec4,
    /// Bump-mapping coordinate.
    pub bumpcoord: Vec2,
    /// Packed RGBA color bytes.
    pub rgba: [u8; 4],
    /// Index into explicit per-unit texture-coordinate arrays, -1 = none.
    pub texcoord_idx: i32,
}

impl AttributeVertex {
    /// XOR-fold of the raw 32-bit words of the geometric fields: position,
    /// normal and the primary texture coordinate.
    ///
    /// Bump coordinate, color and the texture-coordinate source index are
    /// intentionally left out: collisions on those fields are rare and are
    /// resolved by the full equality check instead. The hashed subset is
    /// spelled out field by field so it can never silently drift with the
    /// struct layout.
    pub fn geometric_hash(&self) -> u32 {
        let mut h = 0u32;
        for f in [self.position.x, self.position.y, self.position.z] {
            h ^= f.to_bits();
        }
        for f in [self.normal.x, self.normal.y, self.normal.z] {
            h ^= f.to_bits();
        }
        for f in [
            self.texcoord.x,
            self.texcoord.y,
            self.texcoord.z,
            self.texcoord.w,
        ] {
            h ^= f.to_bits();
        }
        h
    }

    fn bits(&self) -> ([u32; 12], [u8; 4], i32) {
        (
            [
                self.position.x.to_bits(),
                self.position.y.to_bits(),
                self.position.z.to_bits(),
                self.normal.x.to_bits(),
                self.normal.y.to_bits(),
                self.normal.z.to_bits(),
                self.texcoord.x.to_bits(),
                self.texcoord.y.to_bits(),
                self.texcoord.z.to_bits(),
                self.texcoord.w.to_bits(),
                self.bumpcoord.x.to_bits(),
                self.bumpcoord.y.to_bits(),
            ],
            self.rgba,
            self.texcoord_idx,
        )
    }
}

impl PartialEq for AttributeVertex {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

// Bit-level comparison makes float equality total.
impl Eq for AttributeVertex {}

impl Hash for AttributeVertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.geometric_hash());
    }
}

/// Maps attribute bundles to dense, stable array indices.
///
/// Indices are assigned in first-seen order starting at zero and are never
/// reassigned. The table is write-once-read-many during cache population
/// and cleared by [`fit`] once all topology references are resolved.
///
/// [`fit`]: crate::cache::PrimitiveVertexCache::fit
#[derive(Debug, Default)]
pub struct VertexDeduplicationTable {
    map: HashMap<AttributeVertex, i32>,
}

impl VertexDeduplicationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a vertex, inserting it with the next free index when unseen.
    ///
    /// Returns `(index, is_new)`. On `is_new` the caller must append the
    /// vertex's attributes to every parallel array at exactly `index`.
    ///
    /// # Panics
    ///
    /// Panics when the unique-vertex count would exceed `i32::MAX`.
    pub fn lookup_or_insert(&mut self, vertex: &AttributeVertex) -> (i32, bool) {
        let next = self.map.len();
        match self.map.entry(*vertex) {
            std::collections::hash_map::Entry::Occupied(entry) => (*entry.get(), false),
            std::collections::hash_map::Entry::Vacant(entry) => {
                assert!(
                    next <= i32::MAX as usize,
                    "vertex cache overflow: more than {} unique vertices",
                    i32::MAX
                );
                entry.insert(next as i32);
                (next as i32, true)
            }
        }
    }

    /// Number of unique vertices seen so far.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no vertex has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Discard all entries. Assigned indices in the attribute arrays stay
    /// valid; only the lookup side is released.
    pub fn clear(&mut self) {
        self.map.clear();
        self.map.shrink_to_fit();
    }
}
