//! Import resolution: mapping raw import strings onto project files.
//!
//! Resolution is best effort. An import that matches no known path is an
//! external dependency, not an error. Only a resolver backend that cannot
//! answer at all produces a [`GraphBuildError`].

use std::collections::HashMap;

use super::GraphBuildError;
use super::types::NodeIndex;

/// Source extensions stripped from paths and specifiers before matching.
const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rs", "go", "java", "kt", "php", "cs", "c", "h",
    "cpp", "hpp",
];

/// Directory-import file stems (`./utils` -> `utils/index.ts`).
const DIRECTORY_MODULES: &[&str] = &["index", "mod", "__init__"];

/// Lookup table of project paths, built once per graph.
#[derive(Debug, Default)]
pub struct PathIndex {
    /// Normalised path without extension -> node.
    by_key: HashMap<String, NodeIndex>,
    /// All keys sorted, used for suffix scans.
    keys: Vec<(String, NodeIndex)>,
}

impl PathIndex {
    pub fn new<'a>(paths: impl IntoIterator<Item = (NodeIndex, &'a str)>) -> Self {
        let mut keys: Vec<(String, NodeIndex)> = paths
            .into_iter()
            .map(|(idx, path)| (path_key(path), idx))
            .collect();
        keys.sort();
        let mut by_key = HashMap::with_capacity(keys.len());
        for (key, idx) in &keys {
            // First (lowest index for equal keys after sort) wins.
            by_key.entry(key.clone()).or_insert(*idx);
        }
        Self { by_key, keys }
    }

    /// Exact key, or the key's directory module.
    pub fn exact(&self, key: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.by_key.get(key) {
            return Some(idx);
        }
        DIRECTORY_MODULES
            .iter()
            .find_map(|stem| self.by_key.get(&format!("{key}/{stem}")).copied())
    }

    /// Shortest key ending with `/<suffix>` (or its directory module).
    pub fn suffix(&self, suffix: &str) -> Option<NodeIndex> {
        let direct = format!("/{suffix}");
        let dirs: Vec<String> = DIRECTORY_MODULES
            .iter()
            .map(|stem| format!("/{suffix}/{stem}"))
            .collect();
        self.keys
            .iter()
            .filter(|(key, _)| {
                key == suffix
                    || key.ends_with(&direct)
                    || dirs.iter().any(|d| key.ends_with(d.as_str()))
            })
            .min_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .map(|(_, idx)| *idx)
    }

    /// Shortest key whose file stem equals `basename`.
    pub fn basename(&self, basename: &str) -> Option<NodeIndex> {
        self.keys
            .iter()
            .filter(|(key, _)| key.rsplit('/').next() == Some(basename))
            .min_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .map(|(_, idx)| *idx)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Resolves one import of one file.
pub trait ImportResolver {
    /// Returns the target node, `None` for an external dependency.
    fn resolve(
        &self,
        importer: &str,
        specifier: &str,
        index: &PathIndex,
    ) -> Result<Option<NodeIndex>, GraphBuildError>;
}

/// Default resolver: relative joins, then suffix match, then basename match.
#[derive(Debug, Clone, Default)]
pub struct PathSuffixResolver;

impl ImportResolver for PathSuffixResolver {
    fn resolve(
        &self,
        importer: &str,
        specifier: &str,
        index: &PathIndex,
    ) -> Result<Option<NodeIndex>, GraphBuildError> {
        let spec = specifier.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
        if spec.is_empty() {
            return Ok(None);
        }

        if spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == ".." {
            let importer = normalise(importer);
            let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            let joined = join_relative(dir, &strip_extension(spec));
            return Ok(index.exact(&joined));
        }

        // Scoped npm packages are always external.
        if spec.starts_with('@') && !spec.starts_with("@/") {
            return Ok(None);
        }

        let module = module_path(importer, spec);
        if module.is_empty() {
            return Ok(None);
        }
        if let Some(idx) = index.exact(&module).or_else(|| index.suffix(&module)) {
            return Ok(Some(idx));
        }
        // Basename match only for multi-segment specifiers; a bare package
        // name would otherwise bind to any same-named local file.
        if module.contains('/') {
            if let Some(base) = module.rsplit('/').next() {
                return Ok(index.basename(base));
            }
        }
        Ok(None)
    }
}

fn normalise(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// Normalised path with the source extension removed.
pub fn path_key(path: &str) -> String {
    strip_extension(&normalise(path))
}

fn strip_extension(path: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((d, f)) => (Some(d), f),
        None => (None, path),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && SOURCE_EXTENSIONS.contains(&ext) => stem,
        _ => file,
    };
    match dir {
        Some(d) => format!("{d}/{stem}"),
        None => stem.to_string(),
    }
}

fn join_relative(dir: &str, spec: &str) -> String {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in spec.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Convert a non-relative specifier into a slash path.
fn module_path(importer: &str, spec: &str) -> String {
    let mut module = spec.replace("::", "/");
    if importer.ends_with(".py") && !module.contains('/') {
        module = module.replace('.', "/");
    } else {
        module = strip_extension(&module);
    }
    for prefix in ["@/", "~/", "crate/", "self/", "super/"] {
        if let Some(rest) = module.strip_prefix(prefix) {
            module = rest.to_string();
        }
    }
    module.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> PathIndex {
        PathIndex::new(paths.iter().copied().enumerate())
    }

    #[test]
    fn test_relative_import() {
        let idx = index(&["src/app/orders.service.ts", "src/app/db.ts"]);
        let r = PathSuffixResolver;
        assert_eq!(r.resolve("src/app/orders.service.ts", "./db", &idx).unwrap(), Some(1));
        assert_eq!(
            r.resolve("src/app/orders.service.ts", "../app/db.ts", &idx).unwrap(),
            Some(1)
        );
        assert_eq!(r.resolve("src/app/orders.service.ts", "./missing", &idx).unwrap(), None);
    }

    #[test]
    fn test_directory_import_resolves_index() {
        let idx = index(&["src/utils/index.ts", "src/main.ts"]);
        let r = PathSuffixResolver;
        assert_eq!(r.resolve("src/main.ts", "./utils", &idx).unwrap(), Some(0));
    }

    #[test]
    fn test_alias_and_suffix() {
        let idx = index(&["apps/api/src/auth/jwt.ts", "libs/auth/jwt.ts"]);
        let r = PathSuffixResolver;
        // Shortest matching key wins.
        assert_eq!(r.resolve("apps/api/src/x.ts", "@/auth/jwt", &idx).unwrap(), Some(1));
    }

    #[test]
    fn test_external_packages() {
        let idx = index(&["src/common.ts"]);
        let r = PathSuffixResolver;
        assert_eq!(r.resolve("src/a.ts", "@nestjs/common", &idx).unwrap(), None);
        assert_eq!(r.resolve("src/a.ts", "express", &idx).unwrap(), None);
        assert_eq!(r.resolve("src/a.ts", "  ", &idx).unwrap(), None);
    }

    #[test]
    fn test_python_and_rust_module_paths() {
        let idx = index(&["app/services/auth.py", "src/storage/memory.rs"]);
        let r = PathSuffixResolver;
        assert_eq!(
            r.resolve("app/main.py", "app.services.auth", &idx).unwrap(),
            Some(0)
        );
        assert_eq!(
            r.resolve("src/lib.rs", "crate::storage::memory", &idx).unwrap(),
            Some(1)
        );
    }

    #[test]
    fn test_basename_fallback() {
        let idx = index(&["packages/shared/src/money.ts"]);
        let r = PathSuffixResolver;
        assert_eq!(
            r.resolve("apps/web/cart.ts", "shared/lib/money", &idx).unwrap(),
            Some(0)
        );
    }

    #[test]
    fn test_path_key_keeps_inner_dots() {
        assert_eq!(path_key("./apps/orders.controller.ts"), "apps/orders.controller");
        assert_eq!(path_key("README"), "README");
        assert_eq!(path_key("config/.env"), "config/.env");
    }
}
