use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File-walk parameters for one scanner. Exclusions always apply, regardless
/// of what extension set the caller asks for.
#[derive(Debug, Clone)]
pub struct WalkSpec {
    pub extensions: Vec<String>,
    pub exclude_dirs: &'static [&'static str],
    pub exclude_suffixes: &'static [&'static str],
    /// Extra file names (exact match) to include even without a matching
    /// extension, e.g. ".env.local".
    pub include_prefixes: &'static [&'static str],
}

pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];

pub const CONFIG_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "json", "yml", "yaml", "toml", "ini", "conf",
    "config", "properties", "env", "sh",
];

pub const SOURCE_EXCLUDE_DIRS: &[&str] = &[
    "node_modules", ".git", "dist", "build", ".next", "out", "coverage", "vendor",
];

pub const SOURCE_EXCLUDE_SUFFIXES: &[&str] = &[".min.js", ".d.ts", ".map"];

pub const SECRET_EXCLUDE_DIRS: &[&str] = SOURCE_EXCLUDE_DIRS;

pub const SECRET_EXCLUDE_SUFFIXES: &[&str] = &[
    ".min.js",
    ".d.ts",
    ".map",
    ".md",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

impl WalkSpec {
    pub fn sources(extensions: Option<&[&str]>) -> WalkSpec {
        WalkSpec {
            extensions: extensions
                .unwrap_or(SOURCE_EXTENSIONS)
                .iter()
                .map(|e| e.to_string())
                .collect(),
            exclude_dirs: SOURCE_EXCLUDE_DIRS,
            exclude_suffixes: SOURCE_EXCLUDE_SUFFIXES,
            include_prefixes: &[],
        }
    }

    pub fn secrets() -> WalkSpec {
        WalkSpec {
            extensions: CONFIG_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            exclude_dirs: SECRET_EXCLUDE_DIRS,
            exclude_suffixes: SECRET_EXCLUDE_SUFFIXES,
            include_prefixes: &[".env"],
        }
    }

    fn wants(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => return false,
        };
        if self.exclude_suffixes.iter().any(|s| name.ends_with(s)) {
            return false;
        }
        if self.include_prefixes.iter().any(|p| name.starts_with(p)) {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|want| want == ext))
            .unwrap_or(false)
    }
}

/// Resolve the walk to an absolute, deduplicated, deterministically ordered
/// file list. An unreadable or empty tree resolves to an empty list, never an
/// error.
pub fn collect_files(root: &Path, spec: &WalkSpec) -> Vec<PathBuf> {
    let files: BTreeSet<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            // The scan root itself is never excluded, even when the project
            // directory happens to be named "build" or "dist".
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_str().unwrap_or("");
            !(entry.file_type().is_dir() && spec.exclude_dirs.contains(&name))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| spec.wants(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();
    files.into_iter().collect()
}

/// Path relative to the scan root, for display in findings.
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
