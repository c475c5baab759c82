use tracing::debug;

use crate::host::{Expr, ModuleFile, Stmt};
use crate::probe::SubmoduleProbe;
use crate::registry::AppRegistry;
use crate::types::DependencyEdge;

/// The framework's lazy settings proxy, backed by the real configuration
/// module.
pub const SETTINGS_PROXY_MODULE: &str = "django.conf";

/// Name of the assignment declaring the installed-application list inside the
/// configuration module.
pub const INSTALLED_APPS_NAME: &str = "INSTALLED_APPS";

/// Framework-bundled applications known in advance to define entities
/// directly; their `.models` edge is emitted without probing.
pub const CONTRIB_APPS_WITH_MODELS: &[&str] = &[
    "django.contrib.admin",
    "django.contrib.auth",
    "django.contrib.contenttypes",
    "django.contrib.flatpages",
    "django.contrib.redirects",
    "django.contrib.sessions",
    "django.contrib.sites",
];

/// Submodule holding relationship-bearing entity declarations.
const MODELS_SUBMODULE: &str = "models";

/// Submodule holding per-application configuration.
const APPS_SUBMODULE: &str = "apps";

/// Computes the extra modules the host scheduler must process before `file`,
/// simulating the framework's implicit, configuration-driven module loading.
///
/// Rules, tried in order:
/// 1. the settings proxy depends on the real configuration module;
/// 2. the configuration module depends on every declared application (the
///    list is registered with the App Registry as a side effect, first pass
///    only), plus `.models` for framework-bundled applications known to
///    define entities;
/// 3. a package entry point that could be an application depends on its
///    `models`/`apps` submodules, if the filesystem shape shows they exist.
///
/// Returns an empty list when no rule applies; never forces a load.
pub fn additional_dependencies(
    registry: &mut AppRegistry,
    probe: &mut SubmoduleProbe,
    settings_module: &str,
    file: &ModuleFile,
) -> Vec<DependencyEdge> {
    if file.fullname == SETTINGS_PROXY_MODULE {
        return vec![DependencyEdge::synthetic(settings_module)];
    }

    if file.fullname == settings_module {
        let apps = installed_apps(file);
        registry.register_applications(apps.clone());

        let mut edges: Vec<DependencyEdge> =
            apps.iter().map(DependencyEdge::synthetic).collect();
        edges.extend(
            apps.iter()
                .filter(|app| CONTRIB_APPS_WITH_MODELS.contains(&app.as_str()))
                .map(|app| DependencyEdge::synthetic(format!("{app}.{MODELS_SUBMODULE}"))),
        );
        debug!(
            module = %file.fullname,
            edges = edges.len(),
            "declared configuration-module dependencies"
        );
        return edges;
    }

    if file.is_package_init_file() && registry.is_plausible_application(&file.fullname) {
        let Some(package_dir) = file.package_dir() else {
            return Vec::new();
        };

        let mut edges = Vec::new();
        for submodule in [MODELS_SUBMODULE, APPS_SUBMODULE] {
            if probe.has_submodule(package_dir, submodule) {
                edges.push(DependencyEdge::synthetic(format!(
                    "{}.{submodule}",
                    file.fullname
                )));
            }
        }
        if !edges.is_empty() {
            debug!(
                module = %file.fullname,
                edges = edges.len(),
                "declared application submodule dependencies"
            );
        }
        return edges;
    }

    Vec::new()
}

/// Extracts the declared application list from the configuration module's
/// top-level statements: a single-name assignment to `INSTALLED_APPS` whose
/// value is a list literal. Non-string items are ignored.
pub fn installed_apps(file: &ModuleFile) -> Vec<String> {
    for stmt in &file.defs {
        let Stmt::Assign(assign) = stmt else {
            continue;
        };
        if assign.lvalues.len() != 1 || assign.lvalues[0] != INSTALLED_APPS_NAME {
            continue;
        }

        if let Expr::List(items) = &assign.rvalue {
            return items
                .iter()
                .filter_map(|item| match item {
                    Expr::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
        }
    }

    Vec::new()
}
