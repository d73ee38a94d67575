// End-to-end batch runs: OBJ fixtures in a temp dir, GLB files out

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use zone_glb_tools_lib::backend::ObjGlbBackend;
use zone_glb_tools_lib::config::ConvertConfig;
use zone_glb_tools_lib::pipeline::batch::run_batch;
use zone_glb_tools_lib::pipeline::AssetKind;
use zone_glb_tools_lib::scene::Material;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn config_for(tmp: &TempDir) -> ConvertConfig {
    ConvertConfig::new(tmp.path().join("export"), tmp.path().join("glb"))
}

fn load_glb(path: &Path) -> gltf::Gltf {
    let bytes = fs::read(path).unwrap();
    assert_eq!(&bytes[0..4], b"glTF");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
    assert_eq!(
        u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize,
        bytes.len()
    );
    gltf::Gltf::from_slice(&bytes).unwrap()
}

#[test]
fn converts_zones_and_objects() {
    let tmp = TempDir::new().unwrap();
    let export = tmp.path().join("export");
    write_obj_fixture(&export, "zones", "gfaydark", TEST_OBJ);
    write_obj_fixture(&export, "objects", "tree", TEST_OBJ);
    write_obj_fixture(&export, "objects", "empty", "");
    fs::write(export.join("objects").join("notes.txt"), "not a model").unwrap();

    let config = config_for(&tmp);
    let mut backend = ObjGlbBackend::new();
    let report = run_batch(&mut backend, &config);

    assert!(report.is_success(), "{:?}", report);
    assert_eq!(report.exported(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.files.len(), 3);

    let glb = tmp.path().join("glb");
    assert!(glb.join("zones/gfaydark.glb").exists());
    assert!(glb.join("objects/tree.glb").exists());
    assert!(!glb.join("objects/empty.glb").exists());
    assert!(!glb.join("objects/notes.glb").exists());
}

#[test]
fn zone_exports_single_collision_node() {
    let tmp = TempDir::new().unwrap();
    write_obj_fixture(&tmp.path().join("export"), "zones", "gfaydark", TEST_OBJ);

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Zone];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);
    assert!(report.is_success(), "{:?}", report);

    let gltf = load_glb(&tmp.path().join("glb/zones/gfaydark.glb"));
    let nodes: Vec<_> = gltf.nodes().collect();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name(), Some("Geo-col"));
    assert!(nodes[0].mesh().is_some());
}

#[test]
fn noclip_and_transparent_materials_export_as_blend() {
    let tmp = TempDir::new().unwrap();
    write_obj_fixture(&tmp.path().join("export"), "objects", "tree", TEST_OBJ);

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);
    assert!(report.is_success(), "{:?}", report);

    let gltf = load_glb(&tmp.path().join("glb/objects/tree.glb"));
    let material = |name: &str| {
        gltf.materials()
            .find(|m| m.name() == Some(name))
            .unwrap_or_else(|| panic!("material {} missing", name))
    };

    let noclip = material("NOCLIP");
    assert_eq!(noclip.alpha_mode(), gltf::material::AlphaMode::Blend);
    assert_eq!(noclip.pbr_metallic_roughness().base_color_factor()[3], 0.0);

    let water = material("water");
    assert_eq!(water.alpha_mode(), gltf::material::AlphaMode::Blend);
    assert_eq!(water.pbr_metallic_roughness().base_color_factor()[3], 0.0);

    let wall = material("wall");
    assert_eq!(wall.alpha_mode(), gltf::material::AlphaMode::Opaque);

    // The collision triangle is the only face on the no-clip material.
    let noclip_primitives = gltf
        .meshes()
        .flat_map(|m| m.primitives())
        .filter(|p| p.material().name() == Some("NOCLIP"))
        .count();
    assert_eq!(noclip_primitives, 1);
}

#[test]
fn diffuse_texture_is_embedded() {
    let tmp = TempDir::new().unwrap();
    let objects = tmp.path().join("export/objects");
    let textures = tmp.path().join("export/textures");
    fs::create_dir_all(&objects).unwrap();
    fs::create_dir_all(&textures).unwrap();

    image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]))
        .save(textures.join("bark.png"))
        .unwrap();
    fs::write(
        objects.join("crate.mtl"),
        "newmtl bark\nKd 1 1 1\nd 1\nmap_Kd ..\\textures\\bark.png\n",
    )
    .unwrap();
    fs::write(
        objects.join("crate.obj"),
        "mtllib crate.mtl\nv 0 0 0\nv 1 0 0\nv 1 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nusemtl bark\nf 1/1 2/2 3/3\n",
    )
    .unwrap();

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);
    assert!(report.is_success(), "{:?}", report);

    let gltf = load_glb(&tmp.path().join("glb/objects/crate.glb"));
    assert_eq!(gltf.images().count(), 1);
    let bark = gltf.materials().find(|m| m.name() == Some("bark")).unwrap();
    assert!(bark.pbr_metallic_roughness().base_color_texture().is_some());
}

#[test]
fn unparseable_file_does_not_stop_the_batch() {
    let tmp = TempDir::new().unwrap();
    let export = tmp.path().join("export");
    write_obj_fixture(&export, "objects", "a_broken", "v not a number\nf 1 2 3\n");
    write_obj_fixture(&export, "objects", "b_ok", TEST_OBJ);

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);

    assert!(!report.is_success());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.exported(), 1);
    let failed = report.files.iter().find(|f| f.error.is_some()).unwrap();
    assert!(failed.input.ends_with("a_broken.obj"));
    assert_eq!(failed.error.as_ref().unwrap().kind, "import");
    assert!(tmp.path().join("glb/objects/b_ok.glb").exists());
}

#[test]
fn malformed_material_is_reported_and_batch_continues() {
    let tmp = TempDir::new().unwrap();
    let objects = tmp.path().join("export/objects");
    fs::create_dir_all(&objects).unwrap();
    let bad_path = objects.join("a.obj");
    let good_path = objects.join("b.obj");
    fs::write(&bad_path, "").unwrap();
    fs::write(&good_path, "").unwrap();

    let mut bad = single_quad_scene();
    let mut bare = Material::new("bare");
    bare.node_tree = None;
    bad.add_material(bare);
    let mut backend = FakeBackend::new()
        .with_preset(bad_path.clone(), bad)
        .with_preset(good_path.clone(), single_quad_scene());

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut backend, &config);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.exported(), 1);
    assert_eq!(report.files[0].input, bad_path);
    let error = report.files[0].error.as_ref().unwrap();
    assert_eq!(error.kind, "malformed_material");
    assert!(error.message.contains("bare"));
    assert_eq!(backend.exports.len(), 1);
    assert_eq!(backend.exports[0].0, tmp.path().join("glb/objects/b.glb"));
}

#[test]
fn missing_kind_directory_is_a_batch_error() {
    let tmp = TempDir::new().unwrap();
    let export = tmp.path().join("export");
    write_obj_fixture(&export, "objects", "tree", TEST_OBJ);

    let config = config_for(&tmp);
    let report = run_batch(&mut ObjGlbBackend::new(), &config);

    assert!(!report.is_success());
    assert_eq!(report.batch_errors.len(), 1);
    assert_eq!(report.batch_errors[0].path, export.join("zones"));
    assert_eq!(report.batch_errors[0].kind, "io");
    assert_eq!(report.exported(), 1);
    assert!(tmp.path().join("glb/objects/tree.glb").exists());
}

#[test]
fn uppercase_extension_is_converted() {
    let tmp = TempDir::new().unwrap();
    let objects = tmp.path().join("export/objects");
    fs::create_dir_all(&objects).unwrap();
    fs::write(objects.join("ROCK.OBJ"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);

    assert_eq!(report.exported(), 1);
    let gltf = load_glb(&tmp.path().join("glb/objects/ROCK.glb"));
    assert_eq!(gltf.meshes().count(), 1);
}

#[test]
fn report_serializes_outcomes() {
    let tmp = TempDir::new().unwrap();
    let export = tmp.path().join("export");
    write_obj_fixture(&export, "objects", "empty", "");
    write_obj_fixture(&export, "objects", "tree", TEST_OBJ);

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["kind"], "objects");
    assert_eq!(files[0]["outcome"]["status"], "skipped");
    assert_eq!(files[0]["outcome"]["reason"], "empty_import");
    assert_eq!(files[1]["outcome"]["status"], "exported");
    assert_eq!(files[1]["outcome"]["noclip_faces"], 1);
    assert!(files[1].get("error").is_none());
}

#[test]
fn object_exports_one_node_named_after_its_o_block() {
    let tmp = TempDir::new().unwrap();
    let obj = "mtllib test.mtl\no TREE\n\
v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
g PI_0\nusemtl wall\nf 1/1 2/2 3/3\n\
g PI_1\nusemtl water\nf 1/1 3/3 4/4\n";
    write_obj_fixture(&tmp.path().join("export"), "objects", "tree", obj);

    let mut config = config_for(&tmp);
    config.kinds = vec![AssetKind::Object];
    let report = run_batch(&mut ObjGlbBackend::new(), &config);
    assert!(report.is_success(), "{:?}", report);

    let gltf = load_glb(&tmp.path().join("glb/objects/tree.glb"));
    let nodes: Vec<_> = gltf.nodes().collect();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name(), Some("TREE"));
    let mesh = nodes[0].mesh().unwrap();
    assert_eq!(mesh.primitives().count(), 2);
}
