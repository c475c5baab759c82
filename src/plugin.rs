use std::collections::HashMap;
use std::path::Path;

use crate::config::{load_config, PluginConfig};
use crate::deps;
use crate::errors::Result;
use crate::host::{ClassDefContext, ModuleFile};
use crate::probe::SubmoduleProbe;
use crate::registry::AppRegistry;
use crate::resolver::{DeclKey, RelationResolver};
use crate::types::{DependencyEdge, ResolutionState};

/// Base entity type whose subclasses trigger the extension callback.
pub const BASE_ENTITY_FULLNAME: &str = "django.db.models.base.Model";

/// Session-owned plugin state: the App Registry, the memoized submodule
/// probe, and per-declaration resolution states, all carried across scheduler
/// passes.
///
/// Single-threaded by contract: the host scheduler drives passes
/// cooperatively and nothing here is safe for concurrent use.
#[derive(Debug)]
pub struct OrmLinkPlugin {
    settings_module: String,
    registry: AppRegistry,
    probe: SubmoduleProbe,
    states: HashMap<DeclKey, ResolutionState>,
}

impl OrmLinkPlugin {
    /// Creates a plugin session for the given project configuration module.
    pub fn new(settings_module: impl Into<String>) -> OrmLinkPlugin {
        OrmLinkPlugin {
            settings_module: settings_module.into(),
            registry: AppRegistry::new(),
            probe: SubmoduleProbe::new(),
            states: HashMap::new(),
        }
    }

    /// Creates a plugin session from a configuration file.
    pub fn from_config_path(config_path: &Path) -> Result<OrmLinkPlugin> {
        let config = load_config(config_path)?;
        Ok(OrmLinkPlugin::from_config(&config))
    }

    pub fn from_config(config: &PluginConfig) -> OrmLinkPlugin {
        OrmLinkPlugin::new(config.settings_module.clone())
    }

    pub fn settings_module(&self) -> &str {
        &self.settings_module
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    /// Resolution state of one relationship declaration, if it has been
    /// visited this session.
    pub fn resolution_state(&self, class_fullname: &str, field: &str) -> Option<&ResolutionState> {
        self.states.get(&DeclKey {
            class_fullname: class_fullname.to_string(),
            field: field.to_string(),
        })
    }

    /// Host hook: extra modules to schedule before `file`'s main pass,
    /// simulating the framework's implicit configuration-driven loading.
    /// Called once per module per pass.
    pub fn additional_dependencies(&mut self, file: &ModuleFile) -> Vec<DependencyEdge> {
        deps::additional_dependencies(
            &mut self.registry,
            &mut self.probe,
            &self.settings_module,
            file,
        )
    }

    /// Host hook: invoked once per discovered class whose base type is the
    /// framework's base entity type. Resolves the class's relationship
    /// declarations, deferring through `ctx.api` when targets are not yet
    /// available; on the final pass unresolved declarations become errors.
    pub fn handle_entity_class(&mut self, ctx: &mut ClassDefContext<'_>) -> Result<()> {
        RelationResolver::new(&mut self.registry, &mut self.states).process_class(ctx)
    }
}
