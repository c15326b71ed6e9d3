//! Where model and material text comes from.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Opens text files by name relative to the model.
pub trait AssetSource {
    fn open(&self, name: &str) -> io::Result<Box<dyn BufRead + '_>>;
}

/// Files under a base directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    base: PathBuf,
}

impl DirSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl AssetSource for DirSource {
    fn open(&self, name: &str) -> io::Result<Box<dyn BufRead + '_>> {
        let path = self.base.join(name);
        log::debug!("Opening {}", path.display());
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// In-memory files, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(name.into(), contents.into());
        self
    }
}

impl AssetSource for MemorySource {
    fn open(&self, name: &str) -> io::Result<Box<dyn BufRead + '_>> {
        self.files
            .get(name)
            .map(|s| Box::new(Cursor::new(s.as_bytes())) as Box<dyn BufRead + '_>)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }
}
