use std::fs;
use std::path::PathBuf;

use asset::{LoadError, LoadOptions, ShaderKind, TextureStatus, load_model};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("objview-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("textures")).expect("create scratch dir");
    dir
}

#[test]
fn loads_model_materials_and_textures_from_disk() {
    let dir = scratch_dir("disk");
    image::RgbImage::from_pixel(4, 4, image::Rgb([200, 100, 50]))
        .save(dir.join("textures").join("brick.png"))
        .expect("write png");

    fs::write(
        dir.join("room.mtl"),
        "newmtl Brick\nKa 0.2 0.2 0.2\nKd 1 1 1\nmap_Kd textures\\brick.png\n\
         newmtl Glass\nKd 1 1 1\nmap_Kd textures/brick.png\nmap_d textures/glass_alpha.png\n",
    )
    .expect("write mtl");
    fs::write(
        dir.join("room.obj"),
        "mtllib room.mtl\n\
         v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\n\
         vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvn 0 0 1\n\
         usemtl Glass\nf 1/1/1 2/2/1 3/3/1\n\
         usemtl Brick\nf 1/1/1 2/2/1 3/3/1 4/4/1\n",
    )
    .expect("write obj");

    let mesh = load_model(&dir, "room.obj", &LoadOptions::default()).expect("load model");

    // `textures\brick.png` and `textures/brick.png` are distinct names.
    assert_eq!(mesh.textures.len(), 3);
    let loaded = mesh
        .textures
        .iter()
        .filter(|(_, slot)| matches!(slot.status, TextureStatus::Loaded(_)))
        .count();
    assert_eq!(loaded, 2);

    let brick = mesh
        .textures
        .lookup("textures/brick.png")
        .and_then(|h| mesh.textures.get(h))
        .and_then(|s| s.data())
        .expect("brick texture");
    assert_eq!((brick.width, brick.height, brick.channels), (4, 4, 3));
    assert_eq!(brick.data.len(), 4 * 4 * 4);

    let shaders: Vec<_> = mesh.parts.iter().map(|p| (p.material, p.shader)).collect();
    assert_eq!(shaders, vec![(0, ShaderKind::Diffuse), (1, ShaderKind::Normal)]);
    assert_eq!(mesh.indices.len(), 9);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_material_file_respects_options() {
    let dir = scratch_dir("nomtl");
    fs::write(
        dir.join("tri.obj"),
        "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
    )
    .expect("write obj");

    let err = load_model(&dir, "tri.obj", &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, LoadError::Io { ref file, .. } if file == "gone.mtl"));

    let lenient = LoadOptions {
        require_materials: false,
        ..LoadOptions::default()
    };
    let mesh = load_model(&dir, "tri.obj", &lenient).expect("lenient load");
    assert_eq!(mesh.materials.len(), 1);
    assert_eq!(mesh.parts[0].shader, ShaderKind::Fallback);

    let _ = fs::remove_dir_all(&dir);
}
