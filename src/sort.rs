//! Depth metric and triangle sorting for back-to-front rendering.

use glam::{Vec3, Vec4};

/// Mean signed plane distance of each triangle's three vertices.
///
/// The plane is `(n.x, n.y, n.z, d)` in the geometry's local space, with
/// distance computed as `n . p + d`.
pub fn triangle_depths(indices: &[i32], positions: &[Vec3], plane: Vec4) -> Vec<f32> {
    debug_assert_eq!(indices.len() % 3, 0);
    let normal = plane.truncate();
    indices
        .chunks_exact(3)
        .map(|tri| {
            let sum: f32 = tri
                .iter()
                .map(|&i| normal.dot(positions[i as usize]) + plane.w)
                .sum();
            sum / 3.0
        })
        .collect()
}

/// In-place shell sort of triangle index triples by ascending depth.
///
/// `depths[t]` keys the triple `indices[t * 3 .. t * 3 + 3]`; keys move with
/// their triples. Not stable: triangles with equal depth may end up in any
/// relative order.
pub fn shell_sort_triangles(indices: &mut [i32], depths: &mut [f32]) {
    let n = depths.len();
    assert_eq!(indices.len(), n * 3, "one depth per index triple");
    if n < 2 {
        return;
    }

    // Knuth gap sequence: 1, 4, 13, 40, ...
    let mut gap = 1;
    while gap < n / 3 {
        gap = gap * 3 + 1;
    }
    while gap >= 1 {
        for i in gap..n {
            let mut j = i;
            while j >= gap && depths[j - gap] > depths[j] {
                depths.swap(j - gap, j);
                for k in 0..3 {
                    indices.swap((j - gap) * 3 + k, j * 3 + k);
                }
                j -= gap;
            }
        }
        gap /= 3;
    }
}
