//! In-memory scene model shared by the backends and the fixup passes.
//!
//! A scene is transient: it is cleared and rebuilt for every converted file.

pub mod material;
pub mod mesh;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub use material::{BlendMethod, Material, NodeTree, PrincipledBsdf, PrincipledSocket};
pub use mesh::{Face, Mesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub usize);

/// A texture image referenced by image texture nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub mesh: Mesh,
}

/// Vertex/face/triangle totals over the objects in the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStatistics {
    pub objects: usize,
    pub vertices: usize,
    pub faces: usize,
    pub triangles: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub materials: Vec<Material>,
    pub images: Vec<Image>,
    /// Index into `objects`.
    pub active_object: Option<usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every object, mesh, material and image.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.materials.clear();
        self.images.clear();
        self.active_object = None;
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.materials.is_empty() && self.images.is_empty()
    }

    pub fn add_object(&mut self, name: &str, mesh: Mesh) -> usize {
        self.objects.push(SceneObject {
            name: name.to_string(),
            mesh,
        });
        self.objects.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_image(&mut self, name: &str, path: PathBuf) -> ImageId {
        self.images.push(Image {
            name: name.to_string(),
            path,
        });
        ImageId(self.images.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id.0)
    }

    pub fn find_material(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(MaterialId)
    }

    pub fn find_object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.objects.iter().map(|o| &o.mesh)
    }

    pub fn meshes_mut(&mut self) -> impl Iterator<Item = &mut Mesh> {
        self.objects.iter_mut().map(|o| &mut o.mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes().map(Mesh::vertex_count).sum()
    }

    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            objects: self.objects.len(),
            vertices: self.vertex_count(),
            faces: self.meshes().map(|m| m.faces.len()).sum(),
            triangles: self.meshes().map(Mesh::triangle_count).sum(),
        }
    }

    /// Join every object into the active one (the first object when none is
    /// active). Returns the index of the joined object, which is always 0.
    pub fn join_all(&mut self) -> Result<usize> {
        if self.objects.is_empty() {
            return Err(anyhow!("Cannot join: scene has no objects"));
        }
        let active = self.active_object.unwrap_or(0);
        if active >= self.objects.len() {
            return Err(anyhow!(
                "Active object index {} out of range ({} objects)",
                active,
                self.objects.len()
            ));
        }

        let mut target = self.objects.remove(active);
        for other in std::mem::take(&mut self.objects) {
            target.mesh.append(other.mesh);
        }
        self.objects.push(target);
        self.active_object = Some(0);
        Ok(0)
    }

    /// Merge coincident vertices of every mesh. Returns the total removed.
    pub fn remove_doubles(&mut self, distance: f32) -> usize {
        self.meshes_mut().map(|m| m.remove_doubles(distance)).sum()
    }

    pub fn rename_object(&mut self, index: usize, name: &str) -> Result<()> {
        let obj = self
            .objects
            .get_mut(index)
            .ok_or_else(|| anyhow!("No object at index {}", index))?;
        obj.name = name.to_string();
        obj.mesh.name = name.to_string();
        Ok(())
    }
}
