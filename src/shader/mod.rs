//! Shader loading, include preprocessing and program reflection.
//!
//! # Overview
//!
//! - [`ShaderPreprocessor`] - expands `#include` directives with a per-file cache
//! - [`split_sections`] - splits a program file into `#vertex`/`#fragment` sections
//! - [`ShaderLoader`] - compiles, links and introspects a [`ShaderProgram`]
//! - [`reflect`] - GLSL declaration scanner used for driver-side reflection
//!
//! # Source format
//!
//! ```glsl
//! #vertex
//! #version 330 core
//! #include "common/uniforms.glsl"
//! in vec3 inPosition;
//! void main() { gl_Position = matProjection * matView * matModel * vec4(inPosition, 1.0); }
//!
//! #fragment
//! #version 330 core
//! out vec4 outFinal;
//! uniform sampler2D materialAlbedo;
//! void main() { outFinal = vec4(1.0); }
//! ```

mod program;
pub mod reflect;
mod sections;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{GraphicsError, GraphicsResult};
use crate::fs::FileSource;

pub use program::{ShaderLoader, ShaderProgram};
pub use sections::{split_sections, ShaderSection};

/// Expands `#include` directives.
///
/// Include paths are relative to the directory of the including file unless
/// absolute. Included files are read once and cached by canonical path for
/// the lifetime of the preprocessor; a file may be included any number of
/// times, but never while it is already being expanded.
pub struct ShaderPreprocessor {
    files: Box<dyn FileSource>,
    cache: HashMap<PathBuf, Arc<str>>,
}

impl ShaderPreprocessor {
    pub fn new(files: impl FileSource + 'static) -> Self {
        Self {
            files: Box::new(files),
            cache: HashMap::new(),
        }
    }

    /// Read a root source file, bypassing the include cache.
    ///
    /// Returns the canonical path along with the text.
    pub fn read_root(&self, path: &Path) -> GraphicsResult<(PathBuf, String)> {
        let not_found = |err: std::io::Error| GraphicsError::SourceNotFound {
            path: path.to_path_buf(),
            reason: err.to_string(),
        };
        let canonical = self.files.canonicalize(path).map_err(not_found)?;
        let text = self.files.read_to_string(&canonical).map_err(not_found)?;
        Ok((canonical, text))
    }

    /// Expand all includes in `source`, which was read from `origin`.
    pub fn expand(&mut self, source: &str, origin: &Path) -> GraphicsResult<String> {
        let mut chain = vec![origin.to_path_buf()];
        let mut out = String::with_capacity(source.len());
        self.expand_into(source, origin, &mut chain, &mut out)?;
        Ok(out)
    }

    /// Number of distinct include files read so far.
    pub fn cached_file_count(&self) -> usize {
        self.cache.len()
    }

    /// Forget cached include text so edited files are read again.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn expand_into(
        &mut self,
        source: &str,
        origin: &Path,
        chain: &mut Vec<PathBuf>,
        out: &mut String,
    ) -> GraphicsResult<()> {
        for line in source.split_inclusive('\n') {
            let Some(target) = parse_include_directive(line.trim()) else {
                out.push_str(line);
                continue;
            };

            let canonical = self.resolve(target, origin)?;
            if chain.contains(&canonical) {
                let mut cycle = chain.clone();
                cycle.push(canonical);
                return Err(GraphicsError::IncludeCycle { chain: cycle });
            }

            let text = self.cached(&canonical, origin)?;
            chain.push(canonical.clone());
            self.expand_into(&text, &canonical, chain, out)?;
            chain.pop();

            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(())
    }

    fn resolve(&self, target: &str, origin: &Path) -> GraphicsResult<PathBuf> {
        let target = Path::new(target);
        let path = if target.is_absolute() {
            target.to_path_buf()
        } else {
            origin.parent().unwrap_or(Path::new("")).join(target)
        };
        self.files
            .canonicalize(&path)
            .map_err(|err| GraphicsError::IncludeNotFound {
                path,
                included_from: origin.to_path_buf(),
                reason: err.to_string(),
            })
    }

    fn cached(&mut self, canonical: &Path, origin: &Path) -> GraphicsResult<Arc<str>> {
        if let Some(text) = self.cache.get(canonical) {
            return Ok(Arc::clone(text));
        }
        let text: Arc<str> = self
            .files
            .read_to_string(canonical)
            .map_err(|err| GraphicsError::IncludeNotFound {
                path: canonical.to_path_buf(),
                included_from: origin.to_path_buf(),
                reason: err.to_string(),
            })?
            .into();
        log::debug!(target: "gl/shader", "cached include {}", canonical.display());
        self.cache.insert(canonical.to_path_buf(), Arc::clone(&text));
        Ok(text)
    }
}

/// Parse a `#include "path"` directive, returning the path if found.
fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("#include")?;
    let rest = rest.trim();
    // Support both #include "path" and #include <path>
    if let Some(inner) = rest.strip_prefix('"') {
        inner.strip_suffix('"')
    } else if let Some(inner) = rest.strip_prefix('<') {
        inner.strip_suffix('>')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSource;

    fn preprocessor(files: &[(&str, &str)]) -> (ShaderPreprocessor, MemoryFileSource) {
        let source = MemoryFileSource::new();
        for (path, text) in files {
            source.insert(path, *text);
        }
        (ShaderPreprocessor::new(source.clone()), source)
    }

    #[test]
    fn test_parse_include_directive() {
        assert_eq!(parse_include_directive("#include \"a.glsl\""), Some("a.glsl"));
        assert_eq!(parse_include_directive("#include <lib/b.glsl>"), Some("lib/b.glsl"));
        assert_eq!(parse_include_directive("#include a.glsl"), None);
        assert_eq!(parse_include_directive("#version 330"), None);
    }

    #[test]
    fn test_nested_relative_includes() {
        let (mut pre, _) = preprocessor(&[
            ("/s/lib/a.glsl", "float a;\n#include \"b.glsl\"\n"),
            ("/s/lib/b.glsl", "float b;"),
        ]);
        let out = pre
            .expand("#include \"lib/a.glsl\"\nvoid main() {}\n", Path::new("/s/main.glsl"))
            .unwrap();
        assert_eq!(out, "float a;\nfloat b;\nvoid main() {}\n");
    }

    #[test]
    fn test_indented_include_and_absolute_path() {
        let (mut pre, _) = preprocessor(&[("/common/x.glsl", "int x;\n")]);
        let out = pre
            .expand("   #include </common/x.glsl>\n", Path::new("/s/main.glsl"))
            .unwrap();
        assert_eq!(out, "int x;\n");
    }

    #[test]
    fn test_repeated_include_reads_once() {
        let (mut pre, files) = preprocessor(&[("/s/a.glsl", "int a;\n")]);
        let out = pre
            .expand(
                "#include \"a.glsl\"\n#include \"a.glsl\"\n",
                Path::new("/s/main.glsl"),
            )
            .unwrap();
        assert_eq!(out, "int a;\nint a;\n");
        assert_eq!(files.read_count("/s/a.glsl"), 1);

        pre.expand("#include \"a.glsl\"\n", Path::new("/s/other.glsl"))
            .unwrap();
        assert_eq!(files.read_count("/s/a.glsl"), 1);
        assert_eq!(pre.cached_file_count(), 1);

        pre.clear_cache();
        pre.expand("#include \"a.glsl\"\n", Path::new("/s/other.glsl"))
            .unwrap();
        assert_eq!(files.read_count("/s/a.glsl"), 2);
    }

    #[test]
    fn test_missing_include() {
        let (mut pre, _) = preprocessor(&[]);
        let err = pre
            .expand("#include \"a.glsl\"\n", Path::new("/s/main.glsl"))
            .unwrap_err();
        match err {
            GraphicsError::IncludeNotFound {
                path,
                included_from,
                ..
            } => {
                assert_eq!(path, PathBuf::from("/s/a.glsl"));
                assert_eq!(included_from, PathBuf::from("/s/main.glsl"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_include_cycle_rejected() {
        let (mut pre, _) = preprocessor(&[
            ("/s/a.glsl", "#include \"b.glsl\"\n"),
            ("/s/b.glsl", "#include \"a.glsl\"\n"),
        ]);
        let err = pre
            .expand("#include \"a.glsl\"\n", Path::new("/s/main.glsl"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphicsError::IncludeCycle {
                chain: vec![
                    PathBuf::from("/s/main.glsl"),
                    PathBuf::from("/s/a.glsl"),
                    PathBuf::from("/s/b.glsl"),
                    PathBuf::from("/s/a.glsl"),
                ]
            }
        );
    }

    #[test]
    fn test_self_include_rejected() {
        let (mut pre, _) = preprocessor(&[("/s/main.glsl", "#include \"main.glsl\"\n")]);
        let (origin, text) = pre.read_root(Path::new("/s/main.glsl")).unwrap();
        assert!(matches!(
            pre.expand(&text, &origin),
            Err(GraphicsError::IncludeCycle { .. })
        ));
    }

    #[test]
    fn test_read_root_missing() {
        let (pre, _) = preprocessor(&[]);
        assert!(matches!(
            pre.read_root(Path::new("/s/none.glsl")),
            Err(GraphicsError::SourceNotFound { .. })
        ));
    }
}
