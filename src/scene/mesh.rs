use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::MaterialId;
use crate::math;

/// A polygon. Corner data (`uvs`, `normals`) is parallel to `vertices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: Vec<u32>,
    /// Empty when the mesh has no UV layer.
    pub uvs: Vec<[f32; 2]>,
    /// Empty when the source had no normals.
    pub normals: Vec<[f32; 3]>,
    /// Index into the owning mesh's `materials` slot list.
    pub material_index: usize,
}

impl Face {
    pub fn triangle(vertices: [u32; 3], uvs: [[f32; 2]; 3]) -> Self {
        Self {
            vertices: vertices.to_vec(),
            uvs: uvs.to_vec(),
            normals: Vec::new(),
            material_index: 0,
        }
    }

    /// Area of the triangle formed by the first three UVs.
    pub fn uv_area(&self) -> Option<f32> {
        match self.uvs.as_slice() {
            [a, b, c, ..] => Some(math::uv_triangle_area(*a, *b, *c)),
            _ => None,
        }
    }

    /// Fan triangulation as corner indices into this face.
    pub fn triangle_corners(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (1..self.vertices.len().saturating_sub(1)).map(|i| [0, i, i + 1])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub faces: Vec<Face>,
    /// Material slots; faces index into this list.
    pub materials: Vec<MaterialId>,
    pub has_uv_layer: bool,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.faces
            .iter()
            .map(|f| f.vertices.len().saturating_sub(2))
            .sum()
    }

    /// Slot index of `material`, appending a new slot when missing.
    pub fn ensure_material_slot(&mut self, material: MaterialId) -> usize {
        match self.materials.iter().position(|m| *m == material) {
            Some(slot) => slot,
            None => {
                self.materials.push(material);
                self.materials.len() - 1
            }
        }
    }

    /// Append `other` into this mesh, remapping vertex and material slots.
    pub fn append(&mut self, other: Mesh) {
        let vertex_offset = self.positions.len() as u32;
        let slot_map: Vec<usize> = other
            .materials
            .iter()
            .map(|m| self.ensure_material_slot(*m))
            .collect();

        self.positions.extend(other.positions);
        self.has_uv_layer |= other.has_uv_layer;

        for mut face in other.faces {
            for v in face.vertices.iter_mut() {
                *v += vertex_offset;
            }
            // Faces from an unmaterialed mesh stay on slot 0 like the host join.
            face.material_index = slot_map.get(face.material_index).copied().unwrap_or(0);
            self.faces.push(face);
        }
    }

    /// Merge vertices closer than `distance`, dropping faces that collapse
    /// below three distinct corners. Returns the number of vertices removed.
    pub fn remove_doubles(&mut self, distance: f32) -> usize {
        if self.positions.is_empty() {
            return 0;
        }

        let cell_size = distance.max(f32::EPSILON);
        let max_dist_sq = distance * distance;
        let mut grid: HashMap<[i64; 3], Vec<u32>> = HashMap::new();
        let mut kept: Vec<[f32; 3]> = Vec::with_capacity(self.positions.len());
        let mut remap: Vec<u32> = Vec::with_capacity(self.positions.len());

        for &p in &self.positions {
            let cell = math::grid_cell(p, cell_size);
            let mut target = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let key = [
                            cell[0].saturating_add(dx),
                            cell[1].saturating_add(dy),
                            cell[2].saturating_add(dz),
                        ];
                        if let Some(candidates) = grid.get(&key) {
                            for &k in candidates {
                                if math::distance_squared(kept[k as usize], p) <= max_dist_sq {
                                    target = Some(k);
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }

            let index = match target {
                Some(k) => k,
                None => {
                    let k = kept.len() as u32;
                    kept.push(p);
                    grid.entry(cell).or_default().push(k);
                    k
                }
            };
            remap.push(index);
        }

        let removed = self.positions.len() - kept.len();
        self.positions = kept;

        let faces = std::mem::take(&mut self.faces);
        for face in faces {
            if let Some(face) = collapse_face(face, &remap) {
                self.faces.push(face);
            }
        }

        removed
    }
}

/// Remap a face's vertices, dropping corners that repeat their predecessor.
fn collapse_face(face: Face, remap: &[u32]) -> Option<Face> {
    let corner_count = face.vertices.len();
    let mut out = Face {
        vertices: Vec::with_capacity(corner_count),
        uvs: Vec::with_capacity(face.uvs.len()),
        normals: Vec::with_capacity(face.normals.len()),
        material_index: face.material_index,
    };

    for corner in 0..corner_count {
        let v = remap[face.vertices[corner] as usize];
        if out.vertices.last() == Some(&v) {
            continue;
        }
        out.vertices.push(v);
        if let Some(uv) = face.uvs.get(corner) {
            out.uvs.push(*uv);
        }
        if let Some(n) = face.normals.get(corner) {
            out.normals.push(*n);
        }
    }

    while out.vertices.len() > 1 && out.vertices.first() == out.vertices.last() {
        out.vertices.pop();
        out.uvs.truncate(out.vertices.len());
        out.normals.truncate(out.vertices.len());
    }

    let mut distinct = out.vertices.clone();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 3 {
        return None;
    }
    Some(out)
}
