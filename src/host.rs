use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Fully-qualified name of the host language's literal `True`.
pub const TRUE_FULLNAME: &str = "builtins.True";

/// Expression forms this core inspects. Anything else collapses to `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String literal.
    Str(String),
    /// A name reference, carried as its fully-qualified form.
    Name { fullname: String },
    /// List literal.
    List(Vec<Expr>),
    /// Call expression.
    Call(CallExpr),
    /// Any expression shape this core does not look inside.
    Other,
}

/// A call expression with its callee resolved to a fully-qualified name.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee_fullname: String,
    pub args: Vec<CallArg>,
}

/// One call argument; `name` is `None` for positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: Expr,
}

impl CallExpr {
    /// Looks up a string-literal argument, positionally first, then by
    /// keyword. Returns `None` when the argument is absent or is not a
    /// string literal.
    pub fn string_argument(&self, name: Option<&str>, pos: Option<usize>) -> Option<&str> {
        if let Some(pos) = pos {
            if let Some(arg) = self.args.get(pos) {
                if arg.name.is_none() {
                    if let Expr::Str(s) = &arg.value {
                        return Some(s);
                    }
                }
            }
        }

        if let Some(name) = name {
            if let Some(arg) = self.args.iter().find(|a| a.name.as_deref() == Some(name)) {
                if let Expr::Str(s) = &arg.value {
                    return Some(s);
                }
            }
        }

        None
    }

    /// Looks up a name-reference argument by keyword, returning its
    /// fully-qualified name.
    pub fn name_argument(&self, name: &str) -> Option<&str> {
        if let Some(arg) = self.args.iter().find(|a| a.name.as_deref() == Some(name)) {
            if let Expr::Name { fullname } = &arg.value {
                return Some(fullname);
            }
        }
        None
    }
}

/// Statement forms this core inspects.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(AssignStmt),
    /// Any statement shape this core does not look inside.
    Other,
}

/// An assignment statement with name-only left-hand sides.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub lvalues: Vec<String>,
    pub rvalue: Expr,
}

/// Per-pass view of a source module, as handed over by the host checker.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFile {
    pub fullname: String,
    pub path: PathBuf,
    pub is_package_init: bool,
    pub defs: Vec<Stmt>,
}

impl ModuleFile {
    /// Whether this module is a package entry point (`__init__` file).
    pub fn is_package_init_file(&self) -> bool {
        self.is_package_init
    }

    /// Directory of the package this entry point belongs to.
    pub fn package_dir(&self) -> Option<&Path> {
        self.path.parent()
    }
}

/// A discovered class definition, with its body statements.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub fullname: String,
    pub defs: Vec<Stmt>,
}

impl ClassInfo {
    /// Fully-qualified name of the module declaring this class.
    pub fn module(&self) -> &str {
        self.fullname
            .rsplit_once('.')
            .map(|(module, _)| module)
            .unwrap_or("")
    }
}

/// The concrete type this core can read from and synthesize members onto.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub fullname: String,
    pub members: BTreeMap<String, MemberSymbol>,
}

impl TypeInfo {
    pub fn new(fullname: impl Into<String>) -> TypeInfo {
        TypeInfo {
            fullname: fullname.into(),
            members: BTreeMap::new(),
        }
    }
}

/// A class-level member symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSymbol {
    pub typ: Type,
    /// Set for symbols injected by this core, never for user-written ones.
    pub plugin_generated: bool,
    /// Synthesized symbols are regenerated each session rather than
    /// serialized by the host's cross-run cache.
    pub no_serialize: bool,
}

/// The slice of the host's type representation this core needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Instance {
        class_fullname: String,
        args: Vec<Type>,
    },
}

impl Type {
    pub fn instance(class_fullname: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Instance {
            class_fullname: class_fullname.into(),
            args,
        }
    }
}

/// Symbol-table entry: either a fully materialized type or a placeholder the
/// host is still in the middle of defining.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolEntry {
    Placeholder,
    Type(TypeInfo),
}

/// Tri-state outcome of a symbol-table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    NotFound,
    Placeholder,
    Materialized,
}

/// Fully-qualified-name keyed symbol table.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Records a name the host has started but not finished defining.
    pub fn insert_placeholder(&mut self, fullname: impl Into<String>) {
        self.entries
            .insert(fullname.into(), SymbolEntry::Placeholder);
    }

    /// Records a fully materialized type, replacing any placeholder.
    pub fn insert_type(&mut self, info: TypeInfo) {
        self.entries
            .insert(info.fullname.clone(), SymbolEntry::Type(info));
    }

    pub fn lookup(&self, fullname: &str) -> Lookup {
        match self.entries.get(fullname) {
            None => Lookup::NotFound,
            Some(SymbolEntry::Placeholder) => Lookup::Placeholder,
            Some(SymbolEntry::Type(_)) => Lookup::Materialized,
        }
    }

    pub fn type_info(&self, fullname: &str) -> Option<&TypeInfo> {
        match self.entries.get(fullname) {
            Some(SymbolEntry::Type(info)) => Some(info),
            _ => None,
        }
    }

    pub fn type_info_mut(&mut self, fullname: &str) -> Option<&mut TypeInfo> {
        match self.entries.get_mut(fullname) {
            Some(SymbolEntry::Type(info)) => Some(info),
            _ => None,
        }
    }
}

/// A registered dependency trigger: whenever `watched` changes, the host
/// re-analyzes `dependent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTrigger {
    pub watched: String,
    pub dependent: String,
}

/// Per-pass checker API handed to the extension callback.
///
/// Deferral is cooperative: `defer()` only records a request; control returns
/// to the host scheduler, which runs another full pass unless the current one
/// is marked final.
#[derive(Debug, Default, Clone)]
pub struct TypeCheckApi {
    pub symbols: SymbolTable,
    final_iteration: bool,
    deferred: bool,
    triggers: Vec<DependencyTrigger>,
}

impl TypeCheckApi {
    pub fn new(symbols: SymbolTable, final_iteration: bool) -> TypeCheckApi {
        TypeCheckApi {
            symbols,
            final_iteration,
            deferred: false,
            triggers: Vec::new(),
        }
    }

    /// Whether the scheduler has marked the current pass as the last one.
    pub fn final_iteration(&self) -> bool {
        self.final_iteration
    }

    /// Begins a new scheduler pass, clearing any pending deferral request.
    pub fn start_pass(&mut self, final_iteration: bool) {
        self.final_iteration = final_iteration;
        self.deferred = false;
    }

    /// Requests that the scheduler run another pass over the current module.
    pub fn defer(&mut self) {
        self.deferred = true;
    }

    pub fn deferral_requested(&self) -> bool {
        self.deferred
    }

    /// Registers a dependency trigger `(watched, dependent)`.
    pub fn add_plugin_dependency(
        &mut self,
        watched: impl Into<String>,
        dependent: impl Into<String>,
    ) {
        let trigger = DependencyTrigger {
            watched: watched.into(),
            dependent: dependent.into(),
        };
        if !self.triggers.contains(&trigger) {
            self.triggers.push(trigger);
        }
    }

    pub fn plugin_dependencies(&self) -> &[DependencyTrigger] {
        &self.triggers
    }
}

/// Payload of the base-type extension point: the discovered class plus the
/// per-pass checker API.
#[derive(Debug)]
pub struct ClassDefContext<'a> {
    pub cls: &'a ClassInfo,
    pub api: &'a mut TypeCheckApi,
}
