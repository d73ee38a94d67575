// Common test utilities: an in-memory backend, scene builders, OBJ fixtures
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use zone_glb_tools_lib::backend::SceneBackend;
use zone_glb_tools_lib::scene::{Face, Material, MaterialId, Mesh, PrincipledBsdf, Scene};

/// Backend that "imports" preset scenes keyed by path and records exports
/// instead of writing files.
#[derive(Default)]
pub struct FakeBackend {
    pub scene: Scene,
    pub presets: HashMap<PathBuf, Scene>,
    pub exports: Vec<(PathBuf, Scene)>,
    pub clears: usize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(mut self, path: impl Into<PathBuf>, scene: Scene) -> Self {
        self.presets.insert(path.into(), scene);
        self
    }
}

impl SceneBackend for FakeBackend {
    fn clear(&mut self) -> Result<()> {
        self.clears += 1;
        self.scene.clear();
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<()> {
        let preset = self
            .presets
            .get(path)
            .ok_or_else(|| anyhow!("no preset for {}", path.display()))?;
        self.scene = preset.clone();
        Ok(())
    }

    fn export(&mut self, path: &Path) -> Result<()> {
        self.exports.push((path.to_path_buf(), self.scene.clone()));
        Ok(())
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
}

/// Opaque principled material.
pub fn opaque_material(name: &str) -> Material {
    Material::with_bsdf(name, PrincipledBsdf::default())
}

/// Principled material with `alpha` and no texture links.
pub fn material_with_alpha(name: &str, alpha: f32) -> Material {
    Material::with_bsdf(
        name,
        PrincipledBsdf {
            alpha,
            ..Default::default()
        },
    )
}

/// Unit quad at `offset` as two triangles with distinct, non-degenerate UVs.
pub fn quad_mesh(name: &str, offset: [f32; 3], material: MaterialId) -> Mesh {
    let [x, y, z] = offset;
    let mut mesh = Mesh::new(name);
    mesh.positions = vec![
        [x, y, z],
        [x + 1.0, y, z],
        [x + 1.0, y + 1.0, z],
        [x, y + 1.0, z],
    ];
    mesh.faces = vec![
        Face::triangle([0, 1, 2], [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]),
        Face::triangle([0, 2, 3], [[0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
    ];
    mesh.materials = vec![material];
    mesh.has_uv_layer = true;
    mesh
}

/// Single triangle whose UVs all sit on one point.
pub fn degenerate_uv_mesh(name: &str, material: MaterialId) -> Mesh {
    let mut mesh = Mesh::new(name);
    mesh.positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    mesh.faces = vec![Face::triangle([0, 1, 2], [[0.5, 0.5]; 3])];
    mesh.materials = vec![material];
    mesh.has_uv_layer = true;
    mesh
}

/// Scene with one opaque material and one quad object.
pub fn single_quad_scene() -> Scene {
    let mut scene = Scene::new();
    let mat = scene.add_material(opaque_material("wall"));
    scene.add_object("prop", quad_mesh("prop", [0.0, 0.0, 0.0], mat));
    scene
}

/// Zone of two quads sharing an edge along x = 1.
pub fn adjacent_quads_scene() -> Scene {
    let mut scene = Scene::new();
    let mat = scene.add_material(opaque_material("ground"));
    scene.add_object("PI_0", quad_mesh("PI_0", [0.0, 0.0, 0.0], mat));
    scene.add_object("PI_1", quad_mesh("PI_1", [1.0, 0.0, 0.0], mat));
    scene
}

pub const TEST_MTL: &str = "newmtl wall\nKd 1 1 1\nd 1\nillum 1\n\
newmtl water\nKd 0.2 0.3 0.8\nd 0\nillum 9\n\
newmtl broken_uv\nKd 1 1 1\nd 1\nillum 1\n";

/// Two triangles sharing the edge 1-3, plus a triangle with collapsed UVs.
pub const TEST_OBJ: &str = "mtllib test.mtl\n\
v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 5 0 0\nv 6 0 0\nv 5 1 0\n\
vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvt 0.5 0.5\n\
g ground\nusemtl wall\nf 1/1 2/2 3/3\n\
g water\nusemtl water\nf 1/1 3/3 4/4\n\
g collision\nusemtl broken_uv\nf 5/5 6/5 7/5\n";

/// Write `<root>/<dir>/<stem>.obj` and its `test.mtl` next to it.
pub fn write_obj_fixture(root: &Path, dir: &str, stem: &str, obj: &str) -> PathBuf {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("test.mtl"), TEST_MTL).unwrap();
    let path = dir.join(format!("{}.obj", stem));
    fs::write(&path, obj).unwrap();
    path
}
