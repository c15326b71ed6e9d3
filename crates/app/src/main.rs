//! Entry point for ObjView: logging + CLI flags, then hand off to the viewer.

use std::path::PathBuf;

use anyhow::Result;
use platform::{CameraMode, ViewerConfig};

fn parse_backend(val: &str) -> wgpu::Backends {
    // Accept: auto|vulkan|dx12|metal|gl
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_switch(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

fn parse_size(val: &str) -> Option<(u32, u32)> {
    let (sw, sh) = val.split_once('x').or_else(|| val.split_once('X'))?;
    Some((sw.parse().ok()?, sh.parse().ok()?))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--model=") {
            config.model = PathBuf::from(v);
        } else if let Some(v) = arg.strip_prefix("--gpu-backend=") {
            config.backends = parse_backend(v);
        } else if arg == "--show-fps" {
            config.show_fps = true;
        } else if let Some(v) = arg.strip_prefix("--show-fps=") {
            config.show_fps = parse_switch(v);
        } else if let Some(v) = arg.strip_prefix("--size=") {
            match parse_size(v) {
                Some((pw, ph)) => (w, h) = (Some(pw), Some(ph)),
                None => log::warn!("Ignoring malformed --size={}", v),
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            w = v.parse().ok().or(w);
        } else if let Some(v) = arg.strip_prefix("--height=") {
            h = v.parse().ok().or(h);
        } else if let Some(v) = arg.strip_prefix("--camera=") {
            config.camera = match v.to_ascii_lowercase().as_str() {
                "fly" => CameraMode::Fly,
                "orbit" => CameraMode::Orbit,
                other => {
                    log::warn!("Unknown camera '{}', using orbit.", other);
                    CameraMode::Orbit
                }
            };
        } else if let Some(v) = arg.strip_prefix("--bump=") {
            config.load.bump_mapping = parse_switch(v);
        } else if arg == "--allow-missing-materials" {
            config.load.require_materials = false;
        } else if !arg.starts_with("--") {
            // Bare argument: the model path.
            config.model = PathBuf::from(arg);
        } else {
            log::warn!("Unknown flag '{}'", arg);
        }
    }

    config.width = w.unwrap_or(config.width).max(1);
    config.height = h.unwrap_or(config.height).max(1);
    config
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = parse_args(std::env::args().skip(1));
    log::info!(
        "Starting ObjView. Model: {:?}, backend: {:?}, show_fps={}, window_size={}x{}, camera={:?}, bump={}",
        config.model,
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.camera,
        config.load.bump_mapping
    );

    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> ViewerConfig {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults() {
        let c = args(&[]);
        assert_eq!((c.width, c.height), (1280, 720));
        assert!(!c.show_fps);
        assert!(c.load.require_materials);
        assert!(c.load.bump_mapping);
        assert_eq!(c.camera, CameraMode::Orbit);
    }

    #[test]
    fn flags_override_defaults() {
        let c = args(&[
            "--model=scenes/room.obj",
            "--size=800x600",
            "--height=500",
            "--show-fps",
            "--camera=fly",
            "--bump=off",
            "--allow-missing-materials",
            "--gpu-backend=vulkan",
        ]);
        assert_eq!(c.model, PathBuf::from("scenes/room.obj"));
        assert_eq!((c.width, c.height), (800, 500));
        assert!(c.show_fps);
        assert_eq!(c.camera, CameraMode::Fly);
        assert!(!c.load.bump_mapping);
        assert!(!c.load.require_materials);
        assert_eq!(c.backends, wgpu::Backends::VULKAN);
    }

    #[test]
    fn bare_argument_is_model_and_bad_size_is_ignored() {
        let c = args(&["cube.obj", "--size=wide", "--width=0"]);
        assert_eq!(c.model, PathBuf::from("cube.obj"));
        assert_eq!((c.width, c.height), (1, 720));
    }
}
