use std::collections::HashMap;

use ormlink::errors::OrmLinkError;
use ormlink::host::{
    AssignStmt, CallArg, CallExpr, ClassDefContext, ClassInfo, Expr, Stmt, SymbolTable,
    Type, TypeCheckApi, TypeInfo,
};
use ormlink::registry::AppRegistry;
use ormlink::resolver::{
    relation_declarations, DeclKey, RelationResolver, FOREIGN_KEY_FULLNAME,
};
use ormlink::synth::MANAGER_FULLNAME;
use ormlink::types::{RelationDecl, ResolutionState, TargetSpec};

fn pos(value: Expr) -> CallArg {
    CallArg { name: None, value }
}

fn kw(name: &str, value: Expr) -> CallArg {
    CallArg {
        name: Some(name.to_string()),
        value,
    }
}

fn str_expr(s: &str) -> Expr {
    Expr::Str(s.to_string())
}

fn name_expr(fullname: &str) -> Expr {
    Expr::Name {
        fullname: fullname.to_string(),
    }
}

fn fk_assign(field: &str, args: Vec<CallArg>) -> Stmt {
    Stmt::Assign(AssignStmt {
        lvalues: vec![field.to_string()],
        rvalue: Expr::Call(CallExpr {
            callee_fullname: FOREIGN_KEY_FULLNAME.to_string(),
            args,
        }),
    })
}

fn entity_class(name: &str, fullname: &str, defs: Vec<Stmt>) -> ClassInfo {
    ClassInfo {
        name: name.to_string(),
        fullname: fullname.to_string(),
        defs,
    }
}

/// Checker API over a symbol table containing the given fully materialized
/// entity types.
fn api_with_types(types: &[&str], final_iteration: bool) -> TypeCheckApi {
    let mut symbols = SymbolTable::new();
    for fullname in types {
        symbols.insert_type(TypeInfo::new(*fullname));
    }
    TypeCheckApi::new(symbols, final_iteration)
}

fn registry_with(apps: &[&str]) -> AppRegistry {
    let mut registry = AppRegistry::new();
    registry.register_applications(apps.iter().map(|a| a.to_string()).collect());
    registry
}

/// ModelA in app1.models with a labelled relationship to app2.ModelB and a
/// reverse accessor named "a_s".
fn model_a() -> ClassInfo {
    entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![fk_assign(
            "model_b",
            vec![
                pos(str_expr("app2.ModelB")),
                kw("related_name", str_expr("a_s")),
                kw("on_delete", name_expr("django.db.models.deletion.CASCADE")),
                kw("null", name_expr("builtins.True")),
            ],
        )],
    )
}

// ---------------------------------------------------------------------------
// Declaration parsing
// ---------------------------------------------------------------------------

#[test]
fn test_parse_relation_declaration() {
    let decls = relation_declarations(&model_a());
    assert_eq!(
        decls,
        vec![RelationDecl {
            field: "model_b".to_string(),
            target: TargetSpec::Labelled {
                label: "app2".to_string(),
                entity: "ModelB".to_string(),
            },
            related_name: Some("a_s".to_string()),
            nullable: true,
        }]
    );
}

#[test]
fn test_parse_local_target() {
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![fk_assign("other", vec![kw("to", str_expr("ModelC"))])],
    );
    let decls = relation_declarations(&cls);
    assert_eq!(
        decls[0].target,
        TargetSpec::Local {
            entity: "ModelC".to_string(),
        }
    );
    assert_eq!(decls[0].related_name, None);
    assert!(!decls[0].nullable);
}

#[test]
fn test_parse_nullable_requires_literal_true() {
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![
            fk_assign(
                "a",
                vec![
                    pos(str_expr("ModelC")),
                    kw("null", name_expr("builtins.False")),
                ],
            ),
            fk_assign(
                "b",
                vec![pos(str_expr("ModelC")), kw("null", str_expr("yes"))],
            ),
        ],
    );
    let decls = relation_declarations(&cls);
    assert_eq!(decls.len(), 2);
    assert!(!decls[0].nullable);
    assert!(!decls[1].nullable);
}

#[test]
fn test_parse_skips_dynamic_target() {
    // A non-literal target expression is out of scope and silently ignored.
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![fk_assign(
            "model_b",
            vec![pos(name_expr("app2.models.ModelB"))],
        )],
    );
    assert!(relation_declarations(&cls).is_empty());
}

#[test]
fn test_parse_skips_unrelated_statements() {
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![
            Stmt::Other,
            Stmt::Assign(AssignStmt {
                lvalues: vec!["name".to_string()],
                rvalue: Expr::Call(CallExpr {
                    callee_fullname: "django.db.models.fields.CharField".to_string(),
                    args: vec![],
                }),
            }),
        ],
    );
    assert!(relation_declarations(&cls).is_empty());
}

#[test]
fn test_parse_positional_related_name() {
    // ForeignKey(to, on_delete, related_name) -- related_name is positional
    // argument 2 in the framework signature.
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![fk_assign(
            "model_b",
            vec![
                pos(str_expr("app2.ModelB")),
                pos(name_expr("django.db.models.deletion.CASCADE")),
                pos(str_expr("a_s")),
            ],
        )],
    );
    let decls = relation_declarations(&cls);
    assert_eq!(decls[0].related_name, Some("a_s".to_string()));
}

// ---------------------------------------------------------------------------
// Resolution state machine
// ---------------------------------------------------------------------------

#[test]
fn test_resolves_labelled_target() {
    // Scenario: app2.models has been fully processed; resolution succeeds,
    // ModelB gains the reverse accessor, and a dependency trigger links the
    // entities.
    let mut registry = registry_with(&["app1", "app2"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&["app2.models.ModelB"], false);
    let cls = model_a();
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("resolution should succeed");

    assert!(!api.deferral_requested());
    assert_eq!(
        states.get(&DeclKey {
            class_fullname: "app1.models.ModelA".to_string(),
            field: "model_b".to_string(),
        }),
        Some(&ResolutionState::Resolved {
            target: "app2.models.ModelB".to_string(),
        })
    );

    let triggers = api.plugin_dependencies();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].watched, "app1.models.ModelA");
    assert_eq!(triggers[0].dependent, "app2.models.ModelB");

    let model_b = api
        .symbols
        .type_info("app2.models.ModelB")
        .expect("ModelB should be in the table");
    let accessor = model_b.members.get("a_s").expect("a_s should be synthesized");
    assert!(accessor.plugin_generated);
    assert_eq!(
        accessor.typ,
        Type::instance(
            MANAGER_FULLNAME,
            vec![Type::instance("app1.models.ModelA", vec![])],
        )
    );
}

#[test]
fn test_defers_when_target_not_yet_defined() {
    let mut registry = registry_with(&["app1", "app2"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&[], false);
    let cls = model_a();
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("deferral is not an error");

    assert!(api.deferral_requested());
    assert!(matches!(
        states.values().next(),
        Some(ResolutionState::Deferred { .. })
    ));
}

#[test]
fn test_defers_on_placeholder_target() {
    // A placeholder means the host is mid-definition; it must never be
    // treated as resolved.
    let mut registry = registry_with(&["app1", "app2"]);
    let mut states = HashMap::new();
    let mut symbols = SymbolTable::new();
    symbols.insert_placeholder("app2.models.ModelB");
    let mut api = TypeCheckApi::new(symbols, false);
    let cls = model_a();
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("deferral is not an error");

    assert!(api.deferral_requested());
}

#[test]
fn test_unknown_label_defers_before_final_pass() {
    // app2 is not in INSTALLED_APPS; before the final pass this is still a
    // deferral, since the settings module may not have been processed yet.
    let mut registry = registry_with(&["app1"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&[], false);
    let cls = model_a();
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("deferral is not an error");

    assert!(api.deferral_requested());
}

#[test]
fn test_unknown_label_fails_on_final_pass() {
    let mut registry = registry_with(&["app1"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&[], true);
    let cls = model_a();
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    let err = RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect_err("unknown label on the final pass is fatal");

    match err {
        OrmLinkError::UnknownAppLabel { label } => assert_eq!(label, "app2"),
        other => panic!("expected UnknownAppLabel, got {other:?}"),
    }
    assert!(matches!(
        states.values().next(),
        Some(ResolutionState::Failed { .. })
    ));
}

#[test]
fn test_dangling_local_reference_fails_on_final_pass() {
    let mut registry = AppRegistry::new();
    let mut states = HashMap::new();
    let mut api = api_with_types(&[], true);
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![fk_assign("ghost", vec![pos(str_expr("NoSuchModel"))])],
    );
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    let err = RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect_err("dangling reference on the final pass is fatal");

    match err {
        OrmLinkError::DanglingReference { fullname } => {
            assert_eq!(fullname, "app1.models.NoSuchModel");
        }
        other => panic!("expected DanglingReference, got {other:?}"),
    }
}

#[test]
fn test_local_target_skips_registry() {
    // A bare target resolves inside the declaring module without the App
    // Registry being populated at all.
    let mut registry = AppRegistry::new();
    let mut states = HashMap::new();
    let mut api = api_with_types(&["app1.models.ModelC"], false);
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![fk_assign("other", vec![pos(str_expr("ModelC"))])],
    );
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("local resolution should succeed");

    assert_eq!(
        states.get(&DeclKey {
            class_fullname: "app1.models.ModelA".to_string(),
            field: "other".to_string(),
        }),
        Some(&ResolutionState::Resolved {
            target: "app1.models.ModelC".to_string(),
        })
    );
}

#[test]
fn test_resolved_declaration_is_idempotent_across_passes() {
    let mut registry = registry_with(&["app1", "app2"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&["app2.models.ModelB"], false);
    let cls = model_a();

    for final_iteration in [false, true] {
        api.start_pass(final_iteration);
        let mut ctx = ClassDefContext {
            cls: &cls,
            api: &mut api,
        };
        RelationResolver::new(&mut registry, &mut states)
            .process_class(&mut ctx)
            .expect("resolution should succeed");
    }

    // Exactly one trigger and one synthesized member after two passes.
    assert_eq!(api.plugin_dependencies().len(), 1);
    let model_b = api.symbols.type_info("app2.models.ModelB").unwrap();
    assert_eq!(model_b.members.len(), 1);
}

#[test]
fn test_failed_state_is_terminal() {
    let mut registry = registry_with(&["app1"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&[], true);
    let cls = model_a();

    {
        let mut ctx = ClassDefContext {
            cls: &cls,
            api: &mut api,
        };
        RelationResolver::new(&mut registry, &mut states)
            .process_class(&mut ctx)
            .expect_err("first final-pass visit fails");
    }

    // A later visit must not re-raise or change the state.
    api.start_pass(true);
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };
    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("terminal state is left untouched");
    assert!(matches!(
        states.values().next(),
        Some(ResolutionState::Failed { .. })
    ));
}

#[test]
fn test_deferral_stops_scanning_remaining_declarations() {
    let mut registry = registry_with(&["app1", "app2"]);
    let mut states = HashMap::new();
    let mut api = api_with_types(&["app1.models.ModelC"], false);
    let cls = entity_class(
        "ModelA",
        "app1.models.ModelA",
        vec![
            fk_assign("model_b", vec![pos(str_expr("app2.ModelB"))]),
            fk_assign("other", vec![pos(str_expr("ModelC"))]),
        ],
    );
    let mut ctx = ClassDefContext {
        cls: &cls,
        api: &mut api,
    };

    RelationResolver::new(&mut registry, &mut states)
        .process_class(&mut ctx)
        .expect("deferral is not an error");

    // The first declaration deferred, so the second was not visited this
    // pass; the whole class is revisited later anyway.
    assert!(api.deferral_requested());
    assert_eq!(states.len(), 1);
}
