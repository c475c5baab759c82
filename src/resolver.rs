use std::collections::HashMap;

use tracing::debug;

use crate::errors::{OrmLinkError, Result};
use crate::host::{ClassDefContext, ClassInfo, Expr, Lookup, Stmt, TRUE_FULLNAME};
use crate::registry::AppRegistry;
use crate::synth::synthesize_reverse_accessor;
use crate::types::{RelationDecl, ResolutionState, TargetSpec};

/// Fully-qualified name of the framework's foreign-key field constructor.
pub const FOREIGN_KEY_FULLNAME: &str = "django.db.models.fields.related.ForeignKey";

/// Submodule of an application module holding its entities.
const MODELS_SUBMODULE: &str = "models";

/// Identifies one relationship declaration across scheduler passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclKey {
    pub class_fullname: String,
    pub field: String,
}

/// Extracts the relationship declarations from an entity class body.
///
/// A declaration is a single-name assignment whose value is a call to the
/// foreign-key constructor with a string-literal target (keyword `to` or
/// first positional argument). Calls of any other shape -- dynamic target
/// expressions included -- are silently skipped; handling them is a
/// deliberate scope limitation, not an error.
pub fn relation_declarations(cls: &ClassInfo) -> Vec<RelationDecl> {
    let mut decls = Vec::new();

    for stmt in &cls.defs {
        let Stmt::Assign(assign) = stmt else {
            continue;
        };
        if assign.lvalues.len() != 1 {
            continue;
        }
        let Expr::Call(call) = &assign.rvalue else {
            continue;
        };
        if call.callee_fullname != FOREIGN_KEY_FULLNAME {
            continue;
        }

        let Some(raw_target) = call.string_argument(Some("to"), Some(0)) else {
            continue;
        };

        // No default reverse-accessor name is synthesized when the argument
        // is absent or not a literal.
        let related_name = call
            .string_argument(Some("related_name"), Some(2))
            .map(str::to_string);

        // Nullable only when the literal true was passed explicitly.
        let nullable = call.name_argument("null") == Some(TRUE_FULLNAME);

        decls.push(RelationDecl {
            field: assign.lvalues[0].clone(),
            target: TargetSpec::parse(raw_target),
            related_name,
            nullable,
        });
    }

    decls
}

/// Advances relationship declarations through their resolution state machine,
/// one step per scheduler pass.
///
/// Borrows the session-owned App Registry and state map; per-pass checker
/// state comes in through the `ClassDefContext`.
pub struct RelationResolver<'a> {
    registry: &'a mut AppRegistry,
    states: &'a mut HashMap<DeclKey, ResolutionState>,
}

impl<'a> RelationResolver<'a> {
    pub fn new(
        registry: &'a mut AppRegistry,
        states: &'a mut HashMap<DeclKey, ResolutionState>,
    ) -> RelationResolver<'a> {
        RelationResolver { registry, states }
    }

    /// Processes every relationship declaration on the discovered class.
    ///
    /// Each declaration either completes (dependency trigger registered,
    /// reverse accessor synthesized), defers the whole class to a later pass,
    /// or fails. On the final pass deferral is no longer permitted: anything
    /// still unresolved becomes a hard error. Declarations already in a
    /// terminal state are left untouched.
    pub fn process_class(&mut self, ctx: &mut ClassDefContext<'_>) -> Result<()> {
        for decl in relation_declarations(ctx.cls) {
            self.process_declaration(ctx, &decl)?;
            if ctx.api.deferral_requested() {
                // The whole class is revisited next pass; no point scanning
                // the remaining declarations now.
                return Ok(());
            }
        }
        Ok(())
    }

    fn process_declaration(
        &mut self,
        ctx: &mut ClassDefContext<'_>,
        decl: &RelationDecl,
    ) -> Result<()> {
        let key = DeclKey {
            class_fullname: ctx.cls.fullname.clone(),
            field: decl.field.clone(),
        };
        if self.states.get(&key).is_some_and(ResolutionState::is_terminal) {
            return Ok(());
        }

        let final_pass = ctx.api.final_iteration();

        let target_fullname = match &decl.target {
            TargetSpec::Labelled { label, entity } => {
                match self.registry.resolve_label(label) {
                    Some(module) => format!("{module}.{MODELS_SUBMODULE}.{entity}"),
                    None if final_pass => {
                        self.states.insert(
                            key,
                            ResolutionState::Failed {
                                reason: format!("unknown application label '{label}'"),
                            },
                        );
                        return Err(OrmLinkError::UnknownAppLabel {
                            label: label.clone(),
                        });
                    }
                    None => {
                        debug!(
                            class = %ctx.cls.fullname,
                            field = %decl.field,
                            label,
                            "application label not yet registered, deferring"
                        );
                        self.states.insert(
                            key,
                            ResolutionState::Deferred {
                                reason: format!("application label '{label}' not yet registered"),
                            },
                        );
                        ctx.api.defer();
                        return Ok(());
                    }
                }
            }
            // A local target never consults the App Registry; the declaring
            // module is already the entities module.
            TargetSpec::Local { entity } => format!("{}.{entity}", ctx.cls.module()),
        };

        match ctx.api.symbols.lookup(&target_fullname) {
            Lookup::Materialized => {}
            // A placeholder is a target whose own definition is still under
            // construction; treating it as resolved would observe a partially
            // built type.
            Lookup::NotFound | Lookup::Placeholder if !final_pass => {
                debug!(
                    class = %ctx.cls.fullname,
                    field = %decl.field,
                    target = %target_fullname,
                    "target entity not yet materialized, deferring"
                );
                self.states.insert(
                    key,
                    ResolutionState::Deferred {
                        reason: format!("target '{target_fullname}' not yet materialized"),
                    },
                );
                ctx.api.defer();
                return Ok(());
            }
            Lookup::NotFound | Lookup::Placeholder => {
                self.states.insert(
                    key,
                    ResolutionState::Failed {
                        reason: format!("no entity named '{target_fullname}'"),
                    },
                );
                return Err(OrmLinkError::DanglingReference {
                    fullname: target_fullname,
                });
            }
        }

        // Edits to the declaring entity must invalidate cached analysis of
        // the target.
        ctx.api
            .add_plugin_dependency(ctx.cls.fullname.clone(), target_fullname.clone());

        if let Some(related_name) = &decl.related_name {
            synthesize_reverse_accessor(
                &mut ctx.api.symbols,
                &target_fullname,
                related_name,
                &ctx.cls.fullname,
            );
        }

        debug!(
            class = %ctx.cls.fullname,
            field = %decl.field,
            target = %target_fullname,
            "relationship resolved"
        );
        self.states.insert(
            key,
            ResolutionState::Resolved {
                target: target_fullname,
            },
        );
        Ok(())
    }
}
