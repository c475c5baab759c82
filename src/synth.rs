use tracing::debug;

use crate::host::{MemberSymbol, SymbolTable, Type};

/// Fully-qualified name of the framework's generic relation-manager type.
pub const MANAGER_FULLNAME: &str = "django.db.models.manager.Manager";

/// Injects a reverse-accessor member named `name` onto `target_fullname`,
/// typed as a collection of handles to `source_fullname` (the relation
/// manager parameterized by the source entity).
///
/// Skips silently when a member of that name already exists, whether from an
/// earlier pass or written by the user; existing symbols are never replaced.
/// The synthesized member is marked plugin-generated and excluded from the
/// host's cross-run serialization, so it is regenerated each session.
///
/// Returns `true` when a member was created.
pub fn synthesize_reverse_accessor(
    symbols: &mut SymbolTable,
    target_fullname: &str,
    name: &str,
    source_fullname: &str,
) -> bool {
    let Some(target) = symbols.type_info_mut(target_fullname) else {
        return false;
    };

    if target.members.contains_key(name) {
        return false;
    }

    let manager = Type::instance(
        MANAGER_FULLNAME,
        vec![Type::instance(source_fullname, Vec::new())],
    );
    target.members.insert(
        name.to_string(),
        MemberSymbol {
            typ: manager,
            plugin_generated: true,
            no_serialize: true,
        },
    );
    debug!(
        target = target_fullname,
        name, source = source_fullname, "synthesized reverse accessor"
    );
    true
}
