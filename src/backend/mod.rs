//! Scene backends: the importer/exporter host the conversion pipeline drives.
//!
//! The pipeline only talks to [`SceneBackend`]; [`ObjGlbBackend`] is the
//! shipped implementation (OBJ in via `tobj`, GLB out via `gltf::json`).
//! Tests substitute an in-memory backend.

pub mod glb;
pub mod gltf_export;
pub mod obj_import;

use std::path::Path;

use anyhow::{Context, Result};

use crate::scene::Scene;

/// Host operations the conversion pipeline depends on.
///
/// Statistics, join and remove-doubles have scene-model defaults; a backend
/// wrapping a real DCC host would forward them to the host's operators.
pub trait SceneBackend {
    /// Remove every object, mesh, material and image. Must succeed on an
    /// empty scene.
    fn clear(&mut self) -> Result<()>;

    /// Import a source file into the current scene.
    fn import(&mut self, path: &Path) -> Result<()>;

    /// Export the current scene to `path`.
    fn export(&mut self, path: &Path) -> Result<()>;

    fn scene(&self) -> &Scene;

    fn scene_mut(&mut self) -> &mut Scene;

    /// Total vertex count over the scene's objects.
    fn vertex_count(&self) -> usize {
        self.scene().vertex_count()
    }

    /// Join all objects into one; returns the index of the joined object.
    fn join_all(&mut self) -> Result<usize> {
        self.scene_mut().join_all()
    }

    /// Merge vertices closer than `distance`; returns how many were removed.
    fn remove_doubles(&mut self, distance: f32) -> Result<usize> {
        Ok(self.scene_mut().remove_doubles(distance))
    }
}

/// OBJ importer + GLB exporter backend.
#[derive(Debug, Default)]
pub struct ObjGlbBackend {
    scene: Scene,
}

impl ObjGlbBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneBackend for ObjGlbBackend {
    fn clear(&mut self) -> Result<()> {
        self.scene.clear();
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<()> {
        obj_import::import_obj(&mut self.scene, path)
    }

    fn export(&mut self, path: &Path) -> Result<()> {
        let (json, bin) = gltf_export::build_gltf(&self.scene)
            .with_context(|| format!("Failed to build glTF for {}", path.display()))?;
        glb::write_glb(&json, &bin, path)
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
}
