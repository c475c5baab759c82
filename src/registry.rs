use std::collections::HashMap;

use tracing::{debug, info};

/// Module roots that are known not to be application packages: framework,
/// tooling, and common stdlib entry points. Used only before the installed
/// application list is known.
const KNOWN_NON_APP_ROOTS: &[&str] = &[
    "_typeshed",
    "abc",
    "builtins",
    "collections",
    "dataclasses",
    "django",
    "django_stubs_ext",
    "enum",
    "functools",
    "mypy",
    "os",
    "pathlib",
    "pkg_resources",
    "re",
    "setuptools",
    "sys",
    "typing",
    "typing_extensions",
];

/// Tracks which modules are application modules of interest and maps short
/// application labels to fully-qualified module names.
///
/// One registry per checking session; populated lazily when the project
/// configuration module is first fully processed.
#[derive(Debug, Default)]
pub struct AppRegistry {
    /// Ordered installed-application list, `None` until registered.
    installed_apps: Option<Vec<String>>,
    /// Explicit label → module registrations, consulted before any scan.
    labels: HashMap<String, String>,
}

impl AppRegistry {
    pub fn new() -> AppRegistry {
        AppRegistry::default()
    }

    /// Stores the canonical ordered application list. First write wins: the
    /// dependency declarator re-runs every pass, and re-registration must be
    /// a no-op so the declarator stays side-effect-free after the first pass.
    pub fn register_applications(&mut self, apps: Vec<String>) {
        if self.installed_apps.is_some() {
            return;
        }
        info!(count = apps.len(), "registered installed applications");
        self.installed_apps = Some(apps);
    }

    /// Whether the application list has been registered yet.
    pub fn applications_known(&self) -> bool {
        self.installed_apps.is_some()
    }

    pub fn installed_apps(&self) -> &[String] {
        self.installed_apps.as_deref().unwrap_or(&[])
    }

    /// Explicitly maps a label to a module. Accepted only for modules in the
    /// registered application list; explicit entries take precedence over the
    /// suffix scan in `resolve_label`.
    pub fn register_label(&mut self, label: impl Into<String>, module: impl Into<String>) {
        let module = module.into();
        if self.installed_apps().iter().any(|app| *app == module) {
            self.labels.insert(label.into(), module);
        }
    }

    /// Resolves an application label to its module name.
    ///
    /// The explicit label cache is consulted first; failing that, the
    /// registered application list is scanned for an entry whose last path
    /// component equals the label, and a hit is cached for later passes.
    pub fn resolve_label(&mut self, label: &str) -> Option<String> {
        if let Some(module) = self.labels.get(label) {
            return Some(module.clone());
        }

        let found = self
            .installed_apps()
            .iter()
            .find(|app| app.rsplit('.').next() == Some(label))
            .cloned()?;

        debug!(label, module = %found, "resolved application label");
        self.labels.insert(label.to_string(), found.clone());
        Some(found)
    }

    /// Whether `fullname` could be an application module.
    ///
    /// Before the application list is known this must never skip a genuine
    /// application, so it only rules out a fixed set of known non-application
    /// roots. Once the list is known, only exact membership counts.
    pub fn is_plausible_application(&self, fullname: &str) -> bool {
        if let Some(apps) = &self.installed_apps {
            return apps.iter().any(|app| app == fullname);
        }

        let root = fullname.split('.').next().unwrap_or(fullname);
        !KNOWN_NON_APP_ROOTS.contains(&root)
    }
}
