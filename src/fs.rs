//! Shader source file access.
//!
//! The renderer only needs two things from a filesystem: a byte-exact text
//! read and a canonical path that identifies a file for caching and include
//! cycle detection. [`DiskFileSource`] serves real files, [`MemoryFileSource`]
//! serves in-memory trees for tests and embedded shaders.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

/// Read access to shader source text.
pub trait FileSource {
    /// Read the whole file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Resolve `path` to the canonical form used as a cache key.
    ///
    /// Fails with [`io::ErrorKind::NotFound`] if the file does not exist.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

impl<T: FileSource + ?Sized> FileSource for Arc<T> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }
}

/// Files on the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSource;

impl FileSource for DiskFileSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// In-memory file tree.
///
/// Cheap to clone; clones share the same files and read counters, so a test
/// can keep one handle while the loader owns another.
///
/// # Example
///
/// ```ignore
/// let files = MemoryFileSource::new();
/// files.insert("/shaders/common.glsl", "vec3 srgb(vec3 c);");
/// let loader = ShaderLoader::new(files.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSource {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
    reads: Arc<RwLock<HashMap<PathBuf, usize>>>,
}

impl MemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a file.
    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        self.files
            .write()
            .insert(normalize(path.as_ref()), contents.into());
    }

    /// Remove a file, returning its contents if it existed.
    pub fn remove(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.write().remove(&normalize(path.as_ref()))
    }

    /// Number of times `path` has been read.
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        self.reads
            .read()
            .get(&normalize(path.as_ref()))
            .copied()
            .unwrap_or(0)
    }
}

impl FileSource for MemoryFileSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let key = normalize(path);
        let contents = self.files.read().get(&key).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}", key.display()))
        })?;
        *self.reads.write().entry(key).or_insert(0) += 1;
        Ok(contents)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let key = normalize(path);
        if self.files.read().contains_key(&key) {
            Ok(key)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}", key.display()),
            ))
        }
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
