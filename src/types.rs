use serde::{Deserialize, Serialize};

/// Scheduler priority assigned to every synthetic dependency edge. Any value
/// that guarantees the target is processed before the dependent module's main
/// pass works; 10 matches the host's "medium" plugin priority.
pub const DEP_PRIORITY: i32 = 10;

/// Line marker for dependency edges that have no source location.
pub const SYNTHETIC_LINE: i32 = -1;

/// A named unit of the host project, potentially containing entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Short label used in relationship target strings.
    pub label: String,
    /// Fully-qualified module path of the application package.
    pub module: String,
}

/// Parsed form of a relationship target string.
///
/// The separator always wins: a dotted target is read as
/// `<application label>.<entity name>`, never as a dotted entity name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSpec {
    /// Bare entity name, local to the declaring entity's own module.
    Local { entity: String },
    /// `label.Entity` form targeting another application.
    Labelled { label: String, entity: String },
}

impl TargetSpec {
    /// Parses a raw target string into its local or labelled form.
    pub fn parse(raw: &str) -> TargetSpec {
        match raw.split_once('.') {
            Some((label, entity)) => TargetSpec::Labelled {
                label: label.to_string(),
                entity: entity.to_string(),
            },
            None => TargetSpec::Local {
                entity: raw.to_string(),
            },
        }
    }
}

/// A relationship declaration extracted from an entity class body.
///
/// Ephemeral: recomputed every time the owning class is visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    /// Name of the declaring field.
    pub field: String,
    /// Parsed target specification.
    pub target: TargetSpec,
    /// Reverse-accessor name, if one was declared.
    pub related_name: Option<String>,
    /// True only when the literal true was passed explicitly.
    pub nullable: bool,
}

/// Per-declaration resolution state, advanced once per scheduler pass.
///
/// `Resolved` and `Failed` are terminal: once reached, later passes never
/// change the state again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Unresolved,
    Deferred { reason: String },
    Resolved { target: String },
    Failed { reason: String },
}

impl ResolutionState {
    /// Returns `true` for the terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionState::Resolved { .. } | ResolutionState::Failed { .. }
        )
    }
}

/// Advisory dependency edge handed to the host scheduler.
///
/// Not persisted; recomputed every time the declarator is asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub priority: i32,
    pub target_module: String,
    pub line: i32,
}

impl DependencyEdge {
    /// Creates an edge with the fixed synthetic priority and line marker.
    pub fn synthetic(target_module: impl Into<String>) -> DependencyEdge {
        DependencyEdge {
            priority: DEP_PRIORITY,
            target_module: target_module.into(),
            line: SYNTHETIC_LINE,
        }
    }
}
