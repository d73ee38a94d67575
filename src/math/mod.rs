use cgmath::{InnerSpace, Vector2, Vector3};

/// Unsigned area of the planar triangle spanned by three UV coordinates.
///
/// Computed in `f32` so that UVs which are exactly collinear (or repeated)
/// give exactly `0.0`.
pub fn uv_triangle_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
    let a = Vector2::from(a);
    let e1 = Vector2::from(b) - a;
    let e2 = Vector2::from(c) - a;
    (e1.perp_dot(e2) * 0.5).abs()
}

/// Squared distance between two positions.
pub fn distance_squared(a: [f32; 3], b: [f32; 3]) -> f32 {
    (Vector3::from(a) - Vector3::from(b)).magnitude2()
}

/// Integer grid cell of a position for a given cell size.
pub fn grid_cell(p: [f32; 3], cell_size: f32) -> [i64; 3] {
    [
        (p[0] / cell_size).floor() as i64,
        (p[1] / cell_size).floor() as i64,
        (p[2] / cell_size).floor() as i64,
    ]
}

/// Axis-aligned bounds of a position set, `None` when empty.
pub fn bounds(positions: &[[f32; 3]]) -> Option<([f32; 3], [f32; 3])> {
    let first = *positions.first()?;
    let mut min = first;
    let mut max = first;
    for p in positions.iter().skip(1) {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    Some((min, max))
}
