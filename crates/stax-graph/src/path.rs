use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File extensions compiled as code. Anything else reached through a relative
/// import is either a stylesheet or a binary asset.
pub const CODE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "ts", "tsx"];

/// Key of the dependency graph: a resolved module file, relative to the
/// project root, `/`-separated, without a leading `./`.
///
/// Paths that resolve outside the root keep their `..` prefix, and absolute
/// paths (packages installed outside the project) stay absolute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePath(String);

impl ModulePath {
    /// Normalize `raw` into a module path.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().replace('\\', "/");
        let cleaned = PathBuf::from(&raw).clean();
        let mut normalized = cleaned.to_string_lossy().replace('\\', "/");
        if normalized == "." {
            normalized.clear();
        }
        Self(normalized)
    }

    /// Build a module path from a filesystem path, relative to `root` when
    /// the file lives below it.
    pub fn from_fs(root: &Path, path: &Path) -> Self {
        let cleaned = path.to_path_buf().clean();
        let root = root.to_path_buf().clean();
        match cleaned.strip_prefix(&root) {
            Ok(rel) => Self::new(rel.to_string_lossy()),
            Err(_) => Self::new(cleaned.to_string_lossy()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of this module on disk.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// Directory portion, `""` for modules at the root.
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// File name without its last extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Last extension without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    pub fn is_code(&self) -> bool {
        self.extension()
            .is_some_and(|ext| CODE_EXTENSIONS.contains(&ext))
    }

    pub fn is_css(&self) -> bool {
        self.extension() == Some("css")
    }

    /// Join a relative specifier onto this module's directory.
    ///
    /// ```
    /// use stax_graph::ModulePath;
    ///
    /// let importer = ModulePath::new("lib/index.ts");
    /// assert_eq!(importer.join_specifier("../util/a").as_str(), "util/a");
    /// ```
    pub fn join_specifier(&self, specifier: &str) -> Self {
        let dir = self.dir();
        if dir.is_empty() {
            Self::new(specifier)
        } else {
            Self::new(format!("{}/{}", dir, specifier))
        }
    }

    /// Whether this path leaves the root: a `..` prefix or an absolute path.
    pub fn is_outside_root(&self) -> bool {
        self.0 == ".." || self.0.starts_with("../") || Path::new(&self.0).is_absolute()
    }

    /// Path of the compiled output for this module, relative to the output root.
    pub fn output_file(&self) -> Self {
        let stem = self.file_stem();
        let dir = self.dir();
        if dir.is_empty() {
            Self(format!("{}.js", stem))
        } else {
            Self(format!("{}/{}.js", dir, stem))
        }
    }

    /// Append a raw suffix (used for extension probing).
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self::new(format!("{}{}", self.0, suffix))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModulePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ModulePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Relative ES module specifier from the directory `from_dir` to `target`.
///
/// Both arguments live in the same path space (module paths or output paths).
/// The result always starts with `./` or `../` so it can be handed to
/// `import()` unchanged.
pub fn relative_specifier(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from.len() {
        parts.push("..");
    }
    parts.extend(&to[common..]);

    let joined = parts.join("/");
    if joined.starts_with("../") || joined == ".." {
        joined
    } else {
        format!("./{}", joined)
    }
}
