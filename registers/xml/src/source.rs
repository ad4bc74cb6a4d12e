// Licensed under the Apache-2.0 license.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Where documents referenced by path come from.
///
/// Device descriptions reference their peripheral definitions by relative
/// path, so the reader of the top-level document needs a way to open those.
pub trait FileSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns true if `a` and `b` name the same document.
    fn same_file(&self, a: &Path, b: &Path) -> bool {
        normalize(a) == normalize(b)
    }
}

/// Reads documents from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsFileSource;

impl FileSource for FsFileSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn same_file(&self, a: &Path, b: &Path) -> bool {
        normalize(a) == normalize(b) || same_file::is_same_file(a, b).unwrap_or(false)
    }
}

/// In-memory documents keyed by (lexically normalized) path.
#[derive(Clone, Debug, Default)]
pub struct MemFileSource {
    files: HashMap<PathBuf, String>,
}

impl MemFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, contents: &str) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, contents: &str) {
        self.files
            .insert(normalize(path.as_ref()), contents.to_string());
    }
}

impl FileSource for MemFileSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}

/// Removes `.` components and folds `name/..` pairs without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            _ => out.push(component),
        }
    }
    out.iter().collect()
}
