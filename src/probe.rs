use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source-file extension of the host language.
const SOURCE_EXT: &str = "py";

/// Entry-point file name of a package directory.
const PACKAGE_INIT: &str = "__init__.py";

/// Answers cheap existence questions about submodules of a package without
/// importing or type-checking them.
///
/// Results are memoized by `(package directory, submodule name)` for the
/// lifetime of the session: the same paths are probed on every scheduler
/// pass, and filesystem shape does not change mid-run. Live incremental
/// re-runs across filesystem edits would need the cache invalidated by the
/// host; that is a documented limitation, not handled here.
#[derive(Debug, Default)]
pub struct SubmoduleProbe {
    cache: HashMap<(PathBuf, String), bool>,
}

impl SubmoduleProbe {
    pub fn new() -> SubmoduleProbe {
        SubmoduleProbe::default()
    }

    /// Whether `package_dir` contains a submodule `name`, either as
    /// `name.py` or as a `name/__init__.py` package.
    pub fn has_submodule(&mut self, package_dir: &Path, name: &str) -> bool {
        let key = (package_dir.to_path_buf(), name.to_string());
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }

        let exists = package_dir.join(format!("{name}.{SOURCE_EXT}")).exists()
            || package_dir.join(name).join(PACKAGE_INIT).exists();

        self.cache.insert(key, exists);
        exists
    }
}
