//! Texture name table and CPU-side image data.
//! Materials register texture names while parsing; images are decoded once per
//! distinct name after the model has been read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Small stable index into a [`TextureTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u16);

impl TextureHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    /// Always RGBA8, tightly packed.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Channel count of the source image before expansion to RGBA.
    pub channels: u8,
}

impl TextureData {
    /// Wrap RGBA8 pixels. Returns `None` if the buffer size doesn't match.
    pub fn new_rgba8(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        (data.len() == expected && width > 0 && height > 0).then_some(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Decode an image file into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        let channels = img.color().channel_count();
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!(
            "Loaded {:?}, {}x{}, comp = {}",
            path,
            width,
            height,
            channels
        );
        Self::new_rgba8(width, height, channels, rgba.into_raw())
            .with_context(|| format!("Image {:?} has no pixels", path))
    }

    /// 1x1 opaque white, bound wherever a channel has no usable texture.
    pub fn white() -> Self {
        Self {
            data: vec![255; 4],
            width: 1,
            height: 1,
            channels: 4,
        }
    }
}

/// Decodes a texture referenced by name from a material file.
pub trait ImageLoader {
    fn load(&self, name: &str) -> anyhow::Result<TextureData>;
}

/// Loads images from disk relative to a base directory.
#[derive(Clone, Debug)]
pub struct FsImageLoader {
    base: PathBuf,
}

impl FsImageLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, name: &str) -> anyhow::Result<TextureData> {
        // Material files written on Windows often use backslashes.
        let relative: PathBuf = name.split(['/', '\\']).collect();
        TextureData::load(self.base.join(relative))
    }
}

#[derive(Clone, Debug, Default)]
pub enum TextureStatus {
    #[default]
    Unloaded,
    Loaded(TextureData),
    Failed,
}

#[derive(Clone, Debug)]
pub struct TextureSlot {
    pub name: String,
    pub status: TextureStatus,
}

impl TextureSlot {
    pub fn data(&self) -> Option<&TextureData> {
        match &self.status {
            TextureStatus::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

/// Deduplicated texture names in first-reference order.
#[derive(Clone, Debug, Default)]
pub struct TextureTable {
    slots: Vec<TextureSlot>,
    by_name: HashMap<String, TextureHandle>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `name`, allocating a slot on first use.
    /// Returns `None` only when the handle space is exhausted.
    pub fn intern(&mut self, name: &str) -> Option<TextureHandle> {
        if let Some(&handle) = self.by_name.get(name) {
            return Some(handle);
        }
        let handle = TextureHandle(u16::try_from(self.slots.len()).ok()?);
        self.slots.push(TextureSlot {
            name: name.to_string(),
            status: TextureStatus::Unloaded,
        });
        self.by_name.insert(name.to_string(), handle);
        Some(handle)
    }

    pub fn lookup(&self, name: &str) -> Option<TextureHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureSlot> {
        self.slots.get(handle.index())
    }

    /// `true` if the texture finished loading successfully.
    pub fn is_valid(&self, handle: TextureHandle) -> bool {
        self.get(handle).is_some_and(|s| s.data().is_some())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &TextureSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (TextureHandle(i as u16), s))
    }

    /// Decode every still-unloaded slot once. Failures are logged and the
    /// slot is marked failed; they never abort the load.
    pub fn load_all(&mut self, loader: &dyn ImageLoader) -> (usize, usize) {
        let (mut loaded, mut failed) = (0, 0);
        for slot in &mut self.slots {
            if !matches!(slot.status, TextureStatus::Unloaded) {
                continue;
            }
            slot.status = match loader.load(&slot.name) {
                Ok(data) => {
                    loaded += 1;
                    TextureStatus::Loaded(data)
                }
                Err(e) => {
                    log::warn!("Failed to load texture '{}': {:#}", slot.name, e);
                    failed += 1;
                    TextureStatus::Failed
                }
            };
        }
        (loaded, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyPng;

    impl ImageLoader for OnlyPng {
        fn load(&self, name: &str) -> anyhow::Result<TextureData> {
            if name.ends_with(".png") {
                Ok(TextureData::white())
            } else {
                anyhow::bail!("unsupported: {name}")
            }
        }
    }

    #[test]
    fn names_are_deduplicated() {
        let mut table = TextureTable::new();
        let a = table.intern("wall.png").expect("handle");
        let b = table.intern("floor.png").expect("handle");
        let c = table.intern("wall.png").expect("handle");
        assert_eq!(a, TextureHandle(0));
        assert_eq!(b, TextureHandle(1));
        assert_eq!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("floor.png"), Some(b));
    }

    #[test]
    fn failed_loads_mark_slot_invalid() {
        let mut table = TextureTable::new();
        let good = table.intern("a.png").expect("handle");
        let bad = table.intern("b.tga").expect("handle");
        assert!(!table.is_valid(good));

        let (loaded, failed) = table.load_all(&OnlyPng);
        assert_eq!((loaded, failed), (1, 1));
        assert!(table.is_valid(good));
        assert!(!table.is_valid(bad));
        assert!(matches!(
            table.get(bad).map(|s| &s.status),
            Some(TextureStatus::Failed)
        ));

        // Second pass doesn't retry.
        assert_eq!(table.load_all(&OnlyPng), (0, 0));
    }

    #[test]
    fn rgba8_size_is_checked() {
        assert!(TextureData::new_rgba8(2, 2, 3, vec![0; 16]).is_some());
        assert!(TextureData::new_rgba8(2, 2, 3, vec![0; 12]).is_none());
        assert!(TextureData::new_rgba8(0, 0, 4, Vec::new()).is_none());
    }
}
